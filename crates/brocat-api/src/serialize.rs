//! Projections from db entities to the JSON views in brocat-types.

use brocat_db::Database;
use brocat_db::models::{BrocatWithAuthor, User};
use brocat_types::models::{BrocatView, UserView};

pub fn user_view(user: &User, brocat_ids: Vec<i64>) -> UserView {
    UserView {
        id: user.id,
        email: user.email.clone(),
        username: user.username.clone(),
        brocats: brocat_ids,
    }
}

/// Project every user, looking up each one's brocat ids on demand.
pub fn user_views(db: &Database, users: &[User]) -> anyhow::Result<Vec<UserView>> {
    users
        .iter()
        .map(|user| Ok(user_view(user, db.brocat_ids_for_user(user.id)?)))
        .collect()
}

pub fn brocat_view(row: &BrocatWithAuthor) -> BrocatView {
    let b = &row.brocat;
    BrocatView {
        id: b.id,
        title: b.title.clone(),
        thumbnail: b.thumbnail.clone(),
        audio: b.audio.clone(),
        description: b.description.clone(),
        users_id: b.users_id,
        author: row.author.clone(),
    }
}

pub fn brocat_views(rows: &[BrocatWithAuthor]) -> Vec<BrocatView> {
    rows.iter().map(brocat_view).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use brocat_db::models::{NewBrocat, NewUser};

    #[test]
    fn projections_follow_storage_order() {
        let db = Database::open_in_memory().unwrap();
        let tom = db.create_user(&NewUser::new("tom@example.com", "tom", "abc123").unwrap()).unwrap();
        let jerry = db.create_user(&NewUser::new("jerry@example.com", "jerry", "abc123").unwrap()).unwrap();
        let b1 = db.insert_brocat(&NewBrocat::new(Some("one".into()), "1.png", "1.mp3", None, &tom)).unwrap();
        let b2 = db.insert_brocat(&NewBrocat::new(Some("two".into()), "2.png", "2.mp3", None, &tom)).unwrap();

        let users = user_views(&db, &db.list_users().unwrap()).unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].username, "tom");
        assert_eq!(users[0].brocats, vec![b1.id, b2.id]);
        assert_eq!(users[1].id, jerry.id);
        assert!(users[1].brocats.is_empty());

        let views = brocat_views(&db.list_brocats().unwrap());
        assert_eq!(views.iter().map(|v| v.id).collect::<Vec<_>>(), vec![b1.id, b2.id]);
        assert!(views.iter().all(|v| v.author == "tom" && v.users_id == tom.id));
    }
}
