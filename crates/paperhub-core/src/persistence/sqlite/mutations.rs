use rusqlite::{params, OptionalExtension, TransactionBehavior};

use super::{now_millis, SqlitePaperStore};
use crate::error::{LoginError, PaperError, SignupError};
use crate::model::{is_valid_tag, Pid};
use crate::store::Mutations;

impl Mutations for SqlitePaperStore {
    fn signup(&self, uname: &str, pwd: &str) -> Result<(), SignupError> {
        let mut conn = self.lock()?;
        // IMMEDIATE takes the write lock up front, so writers on other
        // handles wait on the busy timeout instead of failing to upgrade.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let existing: i64 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1",
            params![uname],
            |row| row.get(0),
        )?;
        if existing > 0 {
            tracing::warn!("Signup rejected, username {:?} is taken", uname);
            return Err(SignupError::DuplicateUser(uname.to_string()));
        }

        // The primary key stays the final arbiter.
        let inserted = tx.execute(
            "INSERT INTO users (username, password) VALUES (?1, ?2)
             ON CONFLICT(username) DO NOTHING",
            params![uname, pwd],
        )?;
        if inserted == 0 {
            tracing::warn!("Signup lost race for username {:?}", uname);
            return Err(SignupError::DuplicateUser(uname.to_string()));
        }

        tx.commit()?;
        tracing::debug!("Registered user {:?}", uname);
        Ok(())
    }

    fn login(&self, uname: &str, pwd: &str) -> Result<(), LoginError> {
        let conn = self.lock()?;

        let matched: i64 = conn.query_row(
            "SELECT COUNT(*) FROM users WHERE username = ?1 AND password = ?2",
            params![uname, pwd],
            |row| row.get(0),
        )?;
        if matched == 1 {
            return Ok(());
        }

        let stored: Option<String> = conn
            .query_row(
                "SELECT password FROM users WHERE username = ?1",
                params![uname],
                |row| row.get(0),
            )
            .optional()?;

        match stored {
            None => Err(LoginError::UserNotFound(uname.to_string())),
            Some(password) if password != pwd => Err(LoginError::WrongPassword(uname.to_string())),
            Some(_) => Err(LoginError::Inconsistent(uname.to_string())),
        }
    }

    fn add_new_paper(
        &self,
        uname: &str,
        title: &str,
        desc: &str,
        text: &str,
        tags: &[&str],
    ) -> Result<Pid, PaperError> {
        let mut conn = self.lock()?;
        // Dropping `tx` on any early return rolls back the paper row, new
        // vocabulary entries and associations together.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO papers (username, title, created, description, data)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![uname, title, now_millis(), desc, text],
        )?;
        let pid = tx.last_insert_rowid();

        for tag in tags {
            if !is_valid_tag(tag) {
                tracing::warn!("Rejecting paper {:?} by {:?}: invalid tag {:?}", title, uname, tag);
                return Err(PaperError::InvalidTag(tag.to_string()));
            }
            tx.execute(
                "INSERT INTO tagnames (tagname) VALUES (?1) ON CONFLICT(tagname) DO NOTHING",
                params![tag],
            )?;
            tx.execute(
                "INSERT INTO tags (pid, tagname) VALUES (?1, ?2)
                 ON CONFLICT(pid, tagname) DO NOTHING",
                params![pid, tag],
            )?;
        }

        tx.execute(
            "INSERT INTO papers_fts (rowid, title, description, data) VALUES (?1, ?2, ?3, ?4)",
            params![pid, title, desc, text],
        )?;

        tx.commit()?;
        tracing::debug!("Added paper {} by {:?} with {} tag(s)", pid, uname, tags.len());
        Ok(pid)
    }

    fn delete_paper(&self, pid: Pid) -> Result<(), PaperError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("DELETE FROM papers_fts WHERE rowid = ?1", params![pid])?;
        // Foreign key CASCADE handles tags and likes
        let rows = tx.execute("DELETE FROM papers WHERE pid = ?1", params![pid])?;

        tx.commit()?;
        if rows == 0 {
            tracing::debug!("Delete of paper {} matched nothing", pid);
        } else {
            tracing::debug!("Deleted paper {}", pid);
        }
        Ok(())
    }

    fn like_paper(&self, uname: &str, pid: Pid) -> Result<(), PaperError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let owner: Option<String> = tx
            .query_row(
                "SELECT username FROM papers WHERE pid = ?1",
                params![pid],
                |row| row.get(0),
            )
            .optional()?;
        let owner = owner.ok_or(PaperError::PaperNotFound(pid))?;

        if owner == uname {
            tracing::warn!("User {:?} tried to like own paper {}", uname, pid);
            return Err(PaperError::SelfLike {
                username: uname.to_string(),
                pid,
            });
        }

        // The (pid, username) key is the arbiter; zero rows means a like exists.
        let inserted = tx.execute(
            "INSERT INTO likes (pid, username, liked_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(pid, username) DO NOTHING",
            params![pid, uname, now_millis()],
        )?;
        if inserted == 0 {
            tracing::warn!("User {:?} already liked paper {}", uname, pid);
            return Err(PaperError::AlreadyLiked {
                username: uname.to_string(),
                pid,
            });
        }

        tx.commit()?;
        tracing::debug!("User {:?} liked paper {}", uname, pid);
        Ok(())
    }

    fn unlike_paper(&self, uname: &str, pid: Pid) -> Result<(), PaperError> {
        let mut conn = self.lock()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let rows = tx.execute(
            "DELETE FROM likes WHERE pid = ?1 AND username = ?2",
            params![pid, uname],
        )?;
        if rows == 0 {
            return Err(PaperError::LikeNotFound {
                username: uname.to_string(),
                pid,
            });
        }

        tx.commit()?;
        tracing::debug!("User {:?} unliked paper {}", uname, pid);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::error::StoreError;
    use crate::status::IntoStatus;
    use crate::store::{PaperQueries, Statistics};

    #[test]
    fn signup_then_duplicate() {
        let store = store_with_users(&["foo"]);
        let err = store.signup("foo", "other-password").unwrap_err();
        assert_eq!(err, SignupError::DuplicateUser("foo".into()));
        assert_eq!(store.signup("foo", "foo").into_status(), (1, None));
    }

    #[test]
    fn signup_oversized_fields_are_other_failures() {
        let store = SqlitePaperStore::open_in_memory().unwrap();
        let long_uname = "a".repeat(51);
        let long_pwd = "a".repeat(34);

        assert!(matches!(
            store.signup(&long_uname, "p"),
            Err(SignupError::Storage(StoreError::Storage(_)))
        ));
        assert_eq!(store.signup(&long_uname, "p").into_status(), (2, None));
        assert_eq!(store.signup("a", &long_pwd).into_status(), (2, None));

        // Nothing was truncated and stored
        assert_eq!(row_count(&store, "users"), 0);
        assert_eq!(store.signup("a", "p").into_status(), (0, None));
    }

    #[test]
    fn signup_is_case_sensitive() {
        let store = store_with_users(&["foo"]);
        assert!(store.signup("Foo", "x").is_ok());
    }

    #[test]
    fn login_outcomes() {
        let store = store_with_users(&["foo"]);
        assert_eq!(store.login("foo", "foo"), Ok(()));
        assert_eq!(
            store.login("nobody", "foo"),
            Err(LoginError::UserNotFound("nobody".into()))
        );
        assert_eq!(
            store.login("foo", "bar"),
            Err(LoginError::WrongPassword("foo".into()))
        );
        assert_eq!(store.login("foo", "FOO").into_status(), (2, None));
        assert_eq!(store.login("bar", "bar").into_status(), (1, None));
    }

    #[test]
    fn add_paper_returns_increasing_pids() {
        let store = store_with_users(&["foo"]);
        let p1 = store.add_new_paper("foo", "1", "d", "t", &["tag1"]).unwrap();
        let p2 = store.add_new_paper("foo", "2", "d", "t", &[]).unwrap();
        assert!(p2 > p1);
        assert_eq!(
            store.add_new_paper("foo", "3", "d", "t", &[]).into_status().0,
            0
        );
    }

    #[test]
    fn invalid_tag_leaves_no_trace() {
        let store = store_with_users(&["foo"]);
        store.add_new_paper("foo", "kept", "d", "t", &["tag1"]).unwrap();
        let before_vocab = row_count(&store, "tagnames");

        let result = store.add_new_paper("foo", "dropped", "d", "t", &["fresh", "bad-tag", "tag2"]);
        assert_eq!(result, Err(PaperError::InvalidTag("bad-tag".into())));

        let titles: Vec<String> = store
            .get_timeline("foo", 10)
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["kept".to_string()]);
        // "fresh" was inserted before the bad tag and rolled back with it
        assert_eq!(row_count(&store, "tagnames"), before_vocab);
        assert_eq!(row_count(&store, "tags"), 1);
        assert_eq!(row_count(&store, "papers_fts"), 1);
        assert!(store.get_papers_by_tag("fresh", 10).unwrap().is_empty());
    }

    #[test]
    fn oversized_paper_fields_fail() {
        let store = store_with_users(&["foo"]);
        let long_title = "t".repeat(51);
        let long_desc = "d".repeat(501);
        assert_eq!(
            store.add_new_paper("foo", &long_title, "d", "t", &["tag1"]).into_status(),
            (1, None)
        );
        assert_eq!(
            store.add_new_paper("foo", "t", &long_desc, "t", &[]).into_status(),
            (1, None)
        );
        assert_eq!(row_count(&store, "papers"), 0);
        assert_eq!(row_count(&store, "tagnames"), 0);
    }

    #[test]
    fn oversized_tag_fails() {
        let store = store_with_users(&["foo"]);
        let long_tag = "t".repeat(51);
        assert!(store.add_new_paper("foo", "t", "d", "x", &[long_tag.as_str()]).is_err());
        assert_eq!(row_count(&store, "papers"), 0);
    }

    #[test]
    fn repeated_tags_collapse() {
        let store = store_with_users(&["foo"]);
        let pid = store
            .add_new_paper("foo", "t", "d", "x", &["b", "a", "b", "a"])
            .unwrap();
        assert_eq!(store.get_paper_tags(pid).unwrap(), vec!["a", "b"]);
    }

    #[test]
    fn tags_are_case_sensitive_vocabulary() {
        let store = store_with_users(&["foo"]);
        store.add_new_paper("foo", "t", "d", "x", &["Tag", "tag"]).unwrap();
        assert_eq!(row_count(&store, "tagnames"), 2);
    }

    #[test]
    fn delete_paper_cascades() {
        let store = store_with_users(&["foo", "bar"]);
        let pid = store.add_new_paper("foo", "t", "d", "x", &["tag1", "tag2"]).unwrap();
        store.like_paper("bar", pid).unwrap();

        store.delete_paper(pid).unwrap();

        assert_eq!(row_count(&store, "papers"), 0);
        assert_eq!(row_count(&store, "tags"), 0);
        assert_eq!(row_count(&store, "likes"), 0);
        assert_eq!(row_count(&store, "papers_fts"), 0);
        // Vocabulary survives
        assert_eq!(row_count(&store, "tagnames"), 2);
        assert_eq!(store.get_likes(pid).unwrap(), 0);
    }

    #[test]
    fn delete_nonexistent_paper_succeeds() {
        let store = SqlitePaperStore::open_in_memory().unwrap();
        assert_eq!(store.delete_paper(12345).into_status(), (0, None));
    }

    #[test]
    fn like_rules() {
        let store = store_with_users(&["owner", "fan"]);
        let pid = store.add_new_paper("owner", "t", "d", "x", &[]).unwrap();

        assert_eq!(
            store.like_paper("owner", pid),
            Err(PaperError::SelfLike {
                username: "owner".into(),
                pid
            })
        );
        assert_eq!(store.like_paper("fan", pid), Ok(()));
        assert_eq!(
            store.like_paper("fan", pid),
            Err(PaperError::AlreadyLiked {
                username: "fan".into(),
                pid
            })
        );
        assert_eq!(store.like_paper("fan", pid + 100), Err(PaperError::PaperNotFound(pid + 100)));
        assert_eq!(store.get_likes(pid).unwrap(), 1);
    }

    #[test]
    fn like_by_unknown_user_fails() {
        let store = store_with_users(&["owner"]);
        let pid = store.add_new_paper("owner", "t", "d", "x", &[]).unwrap();
        assert_eq!(store.like_paper("ghost", pid).into_status(), (1, None));
        assert_eq!(store.get_likes(pid).unwrap(), 0);
    }

    #[test]
    fn unlike_requires_existing_like() {
        let store = store_with_users(&["owner", "fan"]);
        let pid = store.add_new_paper("owner", "t", "d", "x", &[]).unwrap();

        assert!(matches!(
            store.unlike_paper("fan", pid),
            Err(PaperError::LikeNotFound { .. })
        ));
        store.like_paper("fan", pid).unwrap();
        assert_eq!(store.unlike_paper("fan", pid).into_status(), (0, None));
        assert_eq!(store.unlike_paper("fan", pid).into_status(), (1, None));
        // Can like again after unliking
        assert!(store.like_paper("fan", pid).is_ok());
    }
}
