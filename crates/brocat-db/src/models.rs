//! Entity types. These map directly to SQLite rows.
//! Distinct from brocat-types views so the password digest stays in this crate.

use anyhow::Result;
use brocat_crypto::PasswordDigest;

/// A user that passed validation but has no id yet.
#[derive(Debug)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub(crate) password: PasswordDigest,
}

impl NewUser {
    /// Hashes `password` immediately; the plaintext is not kept.
    pub fn new(email: impl Into<String>, username: impl Into<String>, password: &str) -> Result<Self> {
        Ok(Self {
            email: email.into(),
            username: username.into(),
            password: PasswordDigest::hash(password)?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub username: String,
    pub(crate) password: PasswordDigest,
}

impl User {
    /// Replace the stored digest with a fresh salted hash of `plaintext`.
    /// Persist with `Database::save_password`.
    pub fn set_password(&mut self, plaintext: &str) -> Result<()> {
        self.password = PasswordDigest::hash(plaintext)?;
        Ok(())
    }

    pub fn verify(&self, plaintext: &str) -> bool {
        self.password.verify(plaintext)
    }
}

/// A brocat ready to insert. The author is fixed by the constructor.
#[derive(Debug)]
pub struct NewBrocat {
    pub(crate) title: Option<String>,
    pub(crate) thumbnail: String,
    pub(crate) audio: String,
    pub(crate) description: Option<String>,
    pub(crate) users_id: i64,
}

impl NewBrocat {
    pub fn new(
        title: Option<String>,
        thumbnail: impl Into<String>,
        audio: impl Into<String>,
        description: Option<String>,
        acting_user: &User,
    ) -> Self {
        Self {
            title,
            thumbnail: thumbnail.into(),
            audio: audio.into(),
            description,
            users_id: acting_user.id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Brocat {
    pub id: i64,
    pub title: Option<String>,
    pub thumbnail: String,
    pub audio: String,
    pub description: Option<String>,
    pub users_id: i64,
}

/// A brocat joined with its author's username.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrocatWithAuthor {
    pub brocat: Brocat,
    pub author: String,
}
