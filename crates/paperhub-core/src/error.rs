//! Error types for paperhub-core
//!
//! Every operation has its own taxonomy so that callers can tell integrity
//! violations apart from storage faults. Each type maps onto the numeric
//! status vocabulary through [`crate::status::StatusCode`].

use thiserror::Error;

use crate::model::Pid;

/// Result type alias for store operations
pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Storage fault raised by the underlying database.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// Any error reported by SQLite (constraint, I/O, syntax, ...)
    #[error("Storage error: {0}")]
    Storage(String),

    /// The connection mutex was poisoned by a panicking holder
    #[error("Connection lock poisoned: {0}")]
    LockPoisoned(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Storage(err.to_string())
    }
}

/// Failure of `signup`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignupError {
    /// A user with this exact username already exists
    #[error("Username already taken: {0}")]
    DuplicateUser(String),

    /// The insert itself failed (oversized field, storage fault)
    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Failure of `login`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoginError {
    /// No user with this username
    #[error("User not found: {0}")]
    UserNotFound(String),

    /// The user exists but the stored password differs
    #[error("Wrong password for user {0}")]
    WrongPassword(String),

    /// The combined match failed but neither specific cause applies
    #[error("Login failed for user {0}")]
    Inconsistent(String),

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Failure of a paper or like mutation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaperError {
    /// Tag names must be non-empty and purely alphanumeric
    #[error("Invalid tag name: {0:?}")]
    InvalidTag(String),

    /// No paper with this pid
    #[error("Paper not found: {0}")]
    PaperNotFound(Pid),

    /// Owners cannot like their own papers
    #[error("User {username} cannot like own paper {pid}")]
    SelfLike { username: String, pid: Pid },

    /// The (pid, username) like already exists
    #[error("User {username} already liked paper {pid}")]
    AlreadyLiked { username: String, pid: Pid },

    /// Unlike of a like that does not exist
    #[error("User {username} has not liked paper {pid}")]
    LikeNotFound { username: String, pid: Pid },

    #[error(transparent)]
    Storage(#[from] StoreError),
}

/// Configuration validation or parse error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Value is out of valid range
    #[error("Value out of range: {0}")]
    OutOfRange(String),

    /// Unknown journal mode or otherwise malformed value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// TOML or JSON could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),
}

impl From<rusqlite::Error> for SignupError {
    fn from(err: rusqlite::Error) -> Self {
        SignupError::Storage(err.into())
    }
}

impl From<rusqlite::Error> for LoginError {
    fn from(err: rusqlite::Error) -> Self {
        LoginError::Storage(err.into())
    }
}

impl From<rusqlite::Error> for PaperError {
    fn from(err: rusqlite::Error) -> Self {
        PaperError::Storage(err.into())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        ConfigError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_from_rusqlite() {
        let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, StoreError::Storage(_)));
        assert!(err.to_string().starts_with("Storage error"));
    }

    #[test]
    fn paper_error_display() {
        let err = PaperError::SelfLike {
            username: "alice".into(),
            pid: 7,
        };
        assert_eq!(err.to_string(), "User alice cannot like own paper 7");

        let err = PaperError::InvalidTag("not a tag".into());
        assert!(err.to_string().contains("\"not a tag\""));
    }

    #[test]
    fn storage_variant_is_transparent() {
        let err = SignupError::from(StoreError::Storage("CHECK constraint failed".into()));
        assert_eq!(err.to_string(), "Storage error: CHECK constraint failed");
    }
}
