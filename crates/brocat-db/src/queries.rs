use crate::Database;
use crate::error::classify;
use crate::models::{Brocat, BrocatWithAuthor, NewBrocat, NewUser, User};
use anyhow::Result;
use brocat_crypto::PasswordDigest;
use rusqlite::{Connection, Row};
use tracing::info;

const USER_COLUMNS: &str = "id, \"e-mail\", username, password";

const BROCAT_SELECT: &str =
    "SELECT b.id, b.title, b.thumbnail, b.audio, b.description, b.users_id, u.username
     FROM brocats b
     JOIN users u ON b.users_id = u.id";

impl Database {
    // -- Users --

    /// Insert a user. A duplicate email or username that slipped past validation
    /// comes back as [`crate::ConstraintViolation`].
    pub fn create_user(&self, new_user: &NewUser) -> Result<User> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO users (\"e-mail\", username, password) VALUES (?1, ?2, ?3)",
                rusqlite::params![new_user.email, new_user.username, new_user.password],
            )
            .map_err(classify)?;

            let id = conn.last_insert_rowid();
            info!("Created user {} ({})", new_user.username, id);
            Ok(User {
                id,
                email: new_user.email.clone(),
                username: new_user.username.clone(),
                password: new_user.password.clone(),
            })
        })
    }

    pub fn email_exists(&self, email: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE \"e-mail\" = ?1", [email], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn username_exists(&self, username: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM users WHERE username = ?1", [username], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "username = ?1", username))
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| query_user(conn, "id = ?1", id))
    }

    /// The user named `username` if `password` matches. An unknown username
    /// still costs one Argon2 verify, so both failures take the same time.
    pub fn authenticate(&self, username: &str, password: &str) -> Result<Option<User>> {
        match self.get_user_by_username(username)? {
            Some(user) if user.verify(password) => Ok(Some(user)),
            Some(_) => Ok(None),
            None => {
                PasswordDigest::verify_decoy(password);
                Ok(None)
            }
        }
    }

    pub fn list_users(&self) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS))?;
            let rows = stmt
                .query_map([], user_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Persist the digest currently held by `user`.
    pub fn save_password(&self, user: &User) -> Result<()> {
        self.with_conn_mut(|conn| {
            let updated = conn
                .execute(
                    "UPDATE users SET password = ?1 WHERE id = ?2",
                    rusqlite::params![user.password, user.id],
                )
                .map_err(classify)?;
            if updated == 0 {
                anyhow::bail!("User not found: {}", user.id);
            }
            info!("Password updated for user {}", user.id);
            Ok(())
        })
    }

    // -- Brocats --

    pub fn insert_brocat(&self, new_brocat: &NewBrocat) -> Result<Brocat> {
        self.with_conn_mut(|conn| {
            conn.execute(
                "INSERT INTO brocats (title, thumbnail, audio, description, users_id)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    new_brocat.title,
                    new_brocat.thumbnail,
                    new_brocat.audio,
                    new_brocat.description,
                    new_brocat.users_id,
                ],
            )
            .map_err(classify)?;

            Ok(Brocat {
                id: conn.last_insert_rowid(),
                title: new_brocat.title.clone(),
                thumbnail: new_brocat.thumbnail.clone(),
                audio: new_brocat.audio.clone(),
                description: new_brocat.description.clone(),
                users_id: new_brocat.users_id,
            })
        })
    }

    pub fn get_brocat(&self, id: i64) -> Result<Option<BrocatWithAuthor>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(&format!("{} WHERE b.id = ?1", BROCAT_SELECT), [id], brocat_from_row)
                .optional()?;
            Ok(row)
        })
    }

    /// All brocats in storage order.
    pub fn list_brocats(&self) -> Result<Vec<BrocatWithAuthor>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{} ORDER BY b.id", BROCAT_SELECT))?;
            let rows = stmt
                .query_map([], brocat_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Reverse side of the author relation, looked up on demand.
    pub fn brocat_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT id FROM brocats WHERE users_id = ?1 ORDER BY id")?;
            let ids = stmt
                .query_map([user_id], |row| row.get(0))?
                .collect::<std::result::Result<Vec<i64>, _>>()?;
            Ok(ids)
        })
    }
}

fn query_user<P: rusqlite::ToSql>(conn: &Connection, filter: &str, value: P) -> Result<Option<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users WHERE {}", USER_COLUMNS, filter))?;
    let row = stmt.query_row([value], user_from_row).optional()?;
    Ok(row)
}

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        email: row.get(1)?,
        username: row.get(2)?,
        password: row.get(3)?,
    })
}

fn brocat_from_row(row: &Row<'_>) -> rusqlite::Result<BrocatWithAuthor> {
    Ok(BrocatWithAuthor {
        brocat: Brocat {
            id: row.get(0)?,
            title: row.get(1)?,
            thumbnail: row.get(2)?,
            audio: row.get(3)?,
            description: row.get(4)?,
            users_id: row.get(5)?,
        },
        author: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
