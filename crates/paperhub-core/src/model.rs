use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// System-assigned paper identifier.
pub type Pid = i64;

/// One row of every list-returning paper query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub pid: Pid,
    /// Owner username
    pub username: String,
    pub title: String,
    /// Creation time, always UTC
    pub created: DateTime<Utc>,
    pub description: String,
}

/// Tag usage count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagCount {
    pub tagname: String,
    pub count: u64,
}

/// Co-occurrence count of an unordered tag pair, `first < second`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagPairCount {
    pub first: String,
    pub second: String,
    pub count: u64,
}

/// Tag names are non-empty and purely alphanumeric.
pub fn is_valid_tag(tag: &str) -> bool {
    !tag.is_empty() && tag.chars().all(char::is_alphanumeric)
}

impl From<PaperRecord> for (Pid, String, String, DateTime<Utc>, String) {
    fn from(r: PaperRecord) -> Self {
        (r.pid, r.username, r.title, r.created, r.description)
    }
}

impl From<TagCount> for (String, u64) {
    fn from(t: TagCount) -> Self {
        (t.tagname, t.count)
    }
}

impl From<TagPairCount> for (String, String, u64) {
    fn from(t: TagPairCount) -> Self {
        (t.first, t.second, t.count)
    }
}
