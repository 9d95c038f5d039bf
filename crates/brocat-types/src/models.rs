use serde::{Deserialize, Serialize};

/// Public projection of a user. The password digest never leaves the db crate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserView {
    pub id: i64,
    pub email: String,
    pub username: String,
    /// Ids of the brocats this user authored, in storage order.
    pub brocats: Vec<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrocatView {
    pub id: i64,
    pub title: Option<String>,
    pub thumbnail: String,
    pub audio: String,
    pub description: Option<String>,
    pub users_id: i64,
    /// Username of the author.
    pub author: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brocat_view_field_names() {
        let view = BrocatView {
            id: 3,
            title: Some("purr".into()),
            thumbnail: "a.png".into(),
            audio: "b.mp3".into(),
            description: None,
            users_id: 7,
            author: "tom".into(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["users_id"], 7);
        assert_eq!(json["author"], "tom");
        assert!(json["description"].is_null());
    }

    #[test]
    fn user_view_has_no_password() {
        let view = UserView {
            id: 1,
            email: "tom@example.com".into(),
            username: "tom".into(),
            brocats: vec![4, 9],
        };

        let json = serde_json::to_value(&view).unwrap();
        assert!(json.get("password").is_none());
        assert_eq!(json["brocats"], serde_json::json!([4, 9]));
    }
}
