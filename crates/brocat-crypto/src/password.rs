use std::fmt;
use std::sync::LazyLock;

use anyhow::{Result, anyhow};
use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};

/// Salted Argon2id digest of a password, kept as a PHC string.
///
/// The only way in is [`PasswordDigest::hash`] (or reading a column that
/// already holds a valid PHC string); the only way to use it is
/// [`PasswordDigest::verify`]. The digest text has no accessor.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordDigest(String);

/// Throwaway digest verified against when no account matches a login.
static DECOY: LazyLock<Option<PasswordDigest>> =
    LazyLock::new(|| PasswordDigest::hash("brocat-decoy-password").ok());

impl PasswordDigest {
    /// Hash `plaintext` with a fresh random salt.
    pub fn hash(plaintext: &str) -> Result<Self> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = Argon2::default()
            .hash_password(plaintext.as_bytes(), &salt)
            .map_err(|e| anyhow!("Password hashing failed: {}", e))?
            .to_string();

        Ok(Self(digest))
    }

    /// Recompute with the stored salt and parameters and compare in constant time.
    pub fn verify(&self, candidate: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(&self.0) else {
            return false;
        };

        Argon2::default()
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }

    /// Spend one full verify against a throwaway digest and return `false`.
    /// Used when the account does not exist so the failure costs the same.
    pub fn verify_decoy(candidate: &str) -> bool {
        if let Some(decoy) = DECOY.as_ref() {
            let _ = decoy.verify(candidate);
        }
        false
    }
}

impl fmt::Debug for PasswordDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordDigest(<redacted>)")
    }
}

impl ToSql for PasswordDigest {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.0.as_str()))
    }
}

impl FromSql for PasswordDigest {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let text = value.as_str()?;
        PasswordHash::new(text)
            .map_err(|e| FromSqlError::Other(format!("Not a password digest: {}", e).into()))?;
        Ok(Self(text.to_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn verify_matches_only_original() {
        let digest = PasswordDigest::hash("abc123").unwrap();
        assert!(digest.verify("abc123"));
        assert!(!digest.verify("abc124"));
        assert!(!digest.verify(""));
    }

    #[test]
    fn same_password_gets_fresh_salt() {
        let a = PasswordDigest::hash("abc123").unwrap();
        let b = PasswordDigest::hash("abc123").unwrap();
        assert_ne!(a, b);
        assert!(a.verify("abc123") && b.verify("abc123"));
    }

    #[test]
    fn decoy_never_matches() {
        assert!(DECOY.is_some());
        assert!(!PasswordDigest::verify_decoy("brocat-decoy-password"));
        assert!(!PasswordDigest::verify_decoy("abc123"));
    }

    #[test]
    fn digest_never_holds_plaintext() {
        let digest = PasswordDigest::hash("abc123").unwrap();
        assert!(!digest.0.contains("abc123"));
        assert!(digest.0.starts_with("$argon2id$"));
        assert_eq!(format!("{:?}", digest), "PasswordDigest(<redacted>)");
    }

    #[test]
    fn sqlite_roundtrip_and_plaintext_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE t (password TEXT NOT NULL);").unwrap();

        let digest = PasswordDigest::hash("secret9").unwrap();
        conn.execute("INSERT INTO t (password) VALUES (?1)", [&digest]).unwrap();
        let loaded: PasswordDigest = conn
            .query_row("SELECT password FROM t", [], |r| r.get(0))
            .unwrap();
        assert!(loaded.verify("secret9"));

        let plain = conn.query_row("SELECT 'secret9'", [], |r| r.get::<_, PasswordDigest>(0));
        assert!(plain.is_err());
    }
}
