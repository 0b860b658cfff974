//! Paperhub Core - Data-access layer for a paper-sharing service
//!
//! This crate provides every operation behind the paperhub request layer:
//!
//! - **Mutations**: signup, login, paper creation/deletion, like/unlike
//! - **Queries**: timelines, tag and keyword search, liked papers, popularity, recommendations
//! - **Statistics**: like counts, active users, popular tags and tag pairs, per-user counts
//! - **Status**: the `(status, payload)` boundary consumed by the request layer
//! - **Persistence**: SQLite schema and store (FTS5 backs keyword search)
//! - **Config**: database location, journal mode and busy timeout
//!
//! # Architecture
//!
//! Operations are split across three traits ([`Mutations`], [`PaperQueries`],
//! [`Statistics`]) implemented by [`SqlitePaperStore`]. They return typed
//! errors; [`IntoStatus`] turns a result into the numeric status pair:
//!
//! ```text
//! store.like_paper(..)  →  Result<(), PaperError>  →  into_status()  →  (1, None)
//! ```
//!
//! Every mutation runs in one transaction. Uniqueness (usernames, likes) is
//! arbitrated by table constraints, not by the pre-checks.

pub mod config;
pub mod error;
pub mod model;
pub mod persistence;
pub mod recommend;
pub mod status;
pub mod store;

pub use config::{JournalMode, StoreConfig};
pub use error::{ConfigError, LoginError, PaperError, Result, SignupError, StoreError};
pub use model::{is_valid_tag, PaperRecord, Pid, TagCount, TagPairCount};
pub use persistence::{Schema, SqlitePaperStore, SCHEMA_VERSION};
pub use recommend::{Cohort, CohortLike, Scored};
pub use status::{IntoStatus, Payload, Status, StatusCode, SUCCESS};
pub use store::{Mutations, PaperQueries, Statistics};

/// Default `count` for paper feeds.
pub const DEFAULT_FEED_COUNT: usize = 10;

/// Default `count` for ranked statistics.
pub const DEFAULT_STATS_COUNT: usize = 1;
