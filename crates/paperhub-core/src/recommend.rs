//! Cohort-based paper recommendation.
//!
//! A user's cohort is every other user who liked at least one paper the user
//! liked. Candidates are papers liked by a cohort member that the user has
//! neither liked nor written; each is scored by how many distinct cohort
//! members liked it.
//!
//! The store loads the rows (stage one: the user's likes and cohort members,
//! stage two: the cohort's likes) and this module does the scoring.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BTreeSet};

use crate::model::Pid;

/// A like placed by a cohort member, with the liked paper's owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CohortLike {
    pub pid: Pid,
    pub username: String,
    pub owner: String,
}

/// A ranked candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scored {
    pub pid: Pid,
    /// Distinct cohort members who liked the paper
    pub score: usize,
}

/// The cohort of one user.
#[derive(Debug, Clone, Default)]
pub struct Cohort {
    user: String,
    liked: BTreeSet<Pid>,
    members: BTreeSet<String>,
}

impl Cohort {
    /// Build a cohort. The user is never a member of their own cohort.
    pub fn new(
        user: impl Into<String>,
        liked: impl IntoIterator<Item = Pid>,
        members: impl IntoIterator<Item = String>,
    ) -> Self {
        let user = user.into();
        let members = members.into_iter().filter(|m| *m != user).collect();
        Self {
            user,
            liked: liked.into_iter().collect(),
            members,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }

    /// Score candidate papers and keep the best `count`, ordered by score
    /// descending then pid ascending.
    ///
    /// Likes from non-members are ignored; papers the user liked or owns are
    /// never returned.
    pub fn rank<I>(&self, likes: I, count: usize) -> Vec<Scored>
    where
        I: IntoIterator<Item = CohortLike>,
    {
        let mut supporters: BTreeMap<Pid, BTreeSet<String>> = BTreeMap::new();
        for like in likes {
            if !self.members.contains(&like.username) {
                continue;
            }
            if self.liked.contains(&like.pid) || like.owner == self.user {
                continue;
            }
            supporters.entry(like.pid).or_default().insert(like.username);
        }

        let mut ranked: Vec<Scored> = supporters
            .into_iter()
            .map(|(pid, users)| Scored {
                pid,
                score: users.len(),
            })
            .collect();
        ranked.sort_by_key(|s| (Reverse(s.score), s.pid));
        ranked.truncate(count);
        ranked
    }
}
