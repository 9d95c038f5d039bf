use anyhow::Result;
use rusqlite::Connection;
use tracing::info;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);"
    )?;

    let version: i64 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |r| r.get(0))?;

    if version < 1 {
        info!("Running migration v1 (users, brocats)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                \"e-mail\"    TEXT NOT NULL UNIQUE,
                username    TEXT NOT NULL UNIQUE CHECK (length(username) <= 16),
                password    TEXT NOT NULL
            );

            CREATE TABLE brocats (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                title       TEXT CHECK (title IS NULL OR length(title) <= 100),
                thumbnail   TEXT NOT NULL CHECK (length(thumbnail) BETWEEN 1 AND 200),
                audio       TEXT NOT NULL CHECK (length(audio) BETWEEN 1 AND 200),
                description TEXT CHECK (description IS NULL OR length(description) <= 500),
                users_id    INTEGER NOT NULL REFERENCES users(id)
            );

            CREATE INDEX idx_brocats_users_id ON brocats(users_id);

            INSERT INTO schema_version (version) VALUES (1);
            "
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 1);
    }
}
