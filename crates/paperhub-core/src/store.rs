use chrono::{DateTime, Utc};

use crate::error::{LoginError, PaperError, SignupError, StoreError};
use crate::model::{PaperRecord, Pid, TagCount, TagPairCount};

/// Write-path operations. Each call is one transaction: it commits after all
/// of its writes succeed and leaves nothing behind otherwise.
pub trait Mutations: Send + Sync {
    /// Register a new user.
    fn signup(&self, uname: &str, pwd: &str) -> Result<(), SignupError>;

    /// Check a username/password pair.
    fn login(&self, uname: &str, pwd: &str) -> Result<(), LoginError>;

    /// Create a paper together with its tags. Returns the new pid.
    fn add_new_paper(
        &self,
        uname: &str,
        title: &str,
        desc: &str,
        text: &str,
        tags: &[&str],
    ) -> Result<Pid, PaperError>;

    /// Delete a paper and everything hanging off it. Deleting a pid that
    /// does not exist succeeds.
    fn delete_paper(&self, pid: Pid) -> Result<(), PaperError>;

    /// Record a like from `uname` on `pid`.
    fn like_paper(&self, uname: &str, pid: Pid) -> Result<(), PaperError>;

    /// Remove an existing like.
    fn unlike_paper(&self, uname: &str, pid: Pid) -> Result<(), PaperError>;
}

/// Paper feeds. Ordering and truncation to `count` are part of the result.
pub trait PaperQueries: Send + Sync {
    /// Papers owned by `uname`, newest first, ties by pid.
    fn get_timeline(&self, uname: &str, count: usize) -> Result<Vec<PaperRecord>, StoreError>;

    /// All papers, newest first, ties by pid.
    fn get_timeline_all(&self, count: usize) -> Result<Vec<PaperRecord>, StoreError>;

    /// Papers carrying `tag`, newest first, ties by pid.
    fn get_papers_by_tag(&self, tag: &str, count: usize) -> Result<Vec<PaperRecord>, StoreError>;

    /// Papers whose title, description or text contain `keyword` as a whole
    /// word (case-insensitive), newest first, ties by pid.
    fn get_papers_by_keyword(
        &self,
        keyword: &str,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError>;

    /// Papers liked by `uname`, most recently liked first, ties by pid.
    fn get_papers_by_liked(&self, uname: &str, count: usize)
        -> Result<Vec<PaperRecord>, StoreError>;

    /// Papers created after `begin_time` with at least one like, by like
    /// count descending, ties by pid.
    fn get_most_popular_papers(
        &self,
        begin_time: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError>;

    /// Papers liked by the user's cohort, by cohort score descending, ties
    /// by pid.
    fn get_recommend_papers(&self, uname: &str, count: usize)
        -> Result<Vec<PaperRecord>, StoreError>;
}

/// Aggregate counts. Absent users and papers yield zero or empty results.
pub trait Statistics: Send + Sync {
    fn get_likes(&self, pid: Pid) -> Result<u64, StoreError>;

    /// Tag names of a paper in lexical order.
    fn get_paper_tags(&self, pid: Pid) -> Result<Vec<String>, StoreError>;

    /// Usernames by number of papers descending, ties by username.
    fn get_most_active_users(&self, count: usize) -> Result<Vec<String>, StoreError>;

    /// Tags by number of papers descending, ties by tag name.
    fn get_most_popular_tags(&self, count: usize) -> Result<Vec<TagCount>, StoreError>;

    /// Unordered tag pairs by co-occurrence descending, ties by the pair.
    fn get_most_popular_tag_pairs(&self, count: usize) -> Result<Vec<TagPairCount>, StoreError>;

    fn get_number_papers_user(&self, uname: &str) -> Result<u64, StoreError>;

    fn get_number_liked_user(&self, uname: &str) -> Result<u64, StoreError>;

    /// Number of distinct tag names across the user's papers.
    fn get_number_tags_user(&self, uname: &str) -> Result<u64, StoreError>;
}
