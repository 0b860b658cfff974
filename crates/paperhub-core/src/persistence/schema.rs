//! SQLite schema for paperhub storage

/// Schema version recorded in `schema_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQLite schema definition
pub struct Schema;

impl Schema {
    /// Get the complete schema SQL
    ///
    /// Column length limits are `CHECK` constraints: SQLite does not enforce
    /// `VARCHAR(n)`, and oversized input has to fail instead of truncating.
    pub fn create_tables() -> &'static str {
        r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER NOT NULL,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY CHECK (length(username) <= 50),
    password TEXT NOT NULL CHECK (length(password) <= 32)
);

CREATE TABLE IF NOT EXISTS papers (
    pid INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    title TEXT NOT NULL CHECK (length(title) <= 50),
    created INTEGER NOT NULL,
    description TEXT NOT NULL CHECK (length(description) <= 500),
    data TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_papers_username ON papers(username);
CREATE INDEX IF NOT EXISTS idx_papers_created ON papers(created DESC, pid);

CREATE TABLE IF NOT EXISTS tagnames (
    tagname TEXT PRIMARY KEY CHECK (length(tagname) BETWEEN 1 AND 50)
);

CREATE TABLE IF NOT EXISTS tags (
    pid INTEGER NOT NULL REFERENCES papers(pid) ON DELETE CASCADE,
    tagname TEXT NOT NULL REFERENCES tagnames(tagname) ON DELETE CASCADE,
    PRIMARY KEY (pid, tagname)
);

CREATE INDEX IF NOT EXISTS idx_tags_tagname ON tags(tagname);

CREATE TABLE IF NOT EXISTS likes (
    pid INTEGER NOT NULL REFERENCES papers(pid) ON DELETE CASCADE,
    username TEXT NOT NULL REFERENCES users(username) ON DELETE CASCADE,
    liked_at INTEGER NOT NULL,
    PRIMARY KEY (pid, username)
);

CREATE INDEX IF NOT EXISTS idx_likes_username ON likes(username);

-- Keyword index over title, description and full text; rowid = pid.
CREATE VIRTUAL TABLE IF NOT EXISTS papers_fts USING fts5(
    title, description, data
);
"#
    }

    /// SQL dropping every table, children first
    pub fn drop_tables() -> &'static str {
        r#"
DROP TABLE IF EXISTS papers_fts;
DROP TABLE IF EXISTS tags;
DROP TABLE IF EXISTS tagnames;
DROP TABLE IF EXISTS likes;
DROP TABLE IF EXISTS papers;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS schema_version;
"#
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_schema_applies_cleanly() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(Schema::create_tables()).unwrap();
        // Idempotent
        conn.execute_batch(Schema::create_tables()).unwrap();
        conn.execute_batch(Schema::drop_tables()).unwrap();
        conn.execute_batch(Schema::create_tables()).unwrap();
    }

    #[test]
    fn test_length_checks() {
        let conn = rusqlite::Connection::open_in_memory().unwrap();
        conn.execute_batch(Schema::create_tables()).unwrap();

        let long_name = "a".repeat(51);
        assert!(conn
            .execute("INSERT INTO users VALUES (?1, 'p')", [&long_name])
            .is_err());
        assert!(conn
            .execute("INSERT INTO users VALUES (?1, 'p')", [&long_name[..50]])
            .is_ok());
    }
}
