//! Numeric status boundary.
//!
//! The request-handling layer consumes `(status, payload)` pairs: `0` means
//! success, any other value identifies the failure kind. The payload is
//! `None` on every failure and for operations that return nothing.

use chrono::{DateTime, Utc};

use crate::error::{LoginError, PaperError, SignupError, StoreError};
use crate::model::{PaperRecord, TagCount, TagPairCount};

/// Status code for a successful operation.
pub const SUCCESS: u8 = 0;

/// `(status, payload)` pair handed to the external layer.
pub type Status<T> = (u8, Option<T>);

/// Errors that know which status code they are reported as.
pub trait StatusCode {
    fn status_code(&self) -> u8;
}

impl StatusCode for StoreError {
    fn status_code(&self) -> u8 {
        1
    }
}

impl StatusCode for SignupError {
    fn status_code(&self) -> u8 {
        match self {
            SignupError::DuplicateUser(_) => 1,
            SignupError::Storage(_) => 2,
        }
    }
}

impl StatusCode for LoginError {
    fn status_code(&self) -> u8 {
        match self {
            LoginError::UserNotFound(_) => 1,
            LoginError::WrongPassword(_) => 2,
            LoginError::Inconsistent(_) | LoginError::Storage(_) => 3,
        }
    }
}

impl StatusCode for PaperError {
    fn status_code(&self) -> u8 {
        1
    }
}

/// Values that can travel as a status payload.
///
/// Operations without a return value report `None` even on success.
pub trait Payload: Sized {
    fn into_payload(self) -> Option<Self>;
}

impl Payload for () {
    fn into_payload(self) -> Option<Self> {
        None
    }
}

macro_rules! some_payload {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Payload for $ty {
                fn into_payload(self) -> Option<Self> {
                    Some(self)
                }
            }
        )*
    };
}

some_payload!(
    i64,
    u64,
    String,
    DateTime<Utc>,
    Vec<String>,
    Vec<PaperRecord>,
    Vec<TagCount>,
    Vec<TagPairCount>,
);

/// Collapse an operation result into its `(status, payload)` pair.
pub trait IntoStatus<T> {
    fn into_status(self) -> Status<T>;
}

impl<T: Payload, E: StatusCode + std::fmt::Display> IntoStatus<T> for Result<T, E> {
    fn into_status(self) -> Status<T> {
        match self {
            Ok(value) => (SUCCESS, value.into_payload()),
            Err(e) => {
                let code = e.status_code();
                tracing::debug!("Operation failed with status {}: {}", code, e);
                (code, None)
            }
        }
    }
}
