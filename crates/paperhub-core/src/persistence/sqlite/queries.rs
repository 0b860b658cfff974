use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{limit, query_records, row_to_record, SqlitePaperStore, RECORD_COLUMNS};
use crate::error::StoreError;
use crate::model::{PaperRecord, Pid};
use crate::recommend::{Cohort, CohortLike};
use crate::store::PaperQueries;

/// FTS5 phrase query matching `keyword` as whole token(s), or `None` when
/// the keyword holds no searchable characters.
fn phrase_query(keyword: &str) -> Option<String> {
    if !keyword.chars().any(char::is_alphanumeric) {
        return None;
    }
    Some(format!("\"{}\"", keyword.replace('"', "\"\"")))
}

impl SqlitePaperStore {
    /// Stage one: the user's liked papers and the users sharing any of them.
    fn load_cohort(conn: &Connection, uname: &str) -> Result<Cohort, StoreError> {
        let mut stmt = conn.prepare("SELECT pid FROM likes WHERE username = ?1")?;
        let liked = stmt
            .query_map(params![uname], |row| row.get::<_, Pid>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let mut stmt = conn.prepare(
            "SELECT DISTINCT l2.username
             FROM likes l1 JOIN likes l2 ON l2.pid = l1.pid
             WHERE l1.username = ?1 AND l2.username <> ?1",
        )?;
        let members = stmt
            .query_map(params![uname], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Cohort::new(uname, liked, members))
    }

    /// Stage two input: every like placed by a cohort member.
    ///
    /// The cohort is re-derived in SQL so the statement does not grow with it.
    fn load_cohort_likes(conn: &Connection, uname: &str) -> Result<Vec<CohortLike>, StoreError> {
        let mut stmt = conn.prepare(
            "SELECT l.pid, l.username, p.username
             FROM likes l JOIN papers p ON p.pid = l.pid
             WHERE l.username IN (
                 SELECT DISTINCT l2.username
                 FROM likes l1 JOIN likes l2 ON l2.pid = l1.pid
                 WHERE l1.username = ?1 AND l2.username <> ?1
             )",
        )?;
        let likes = stmt
            .query_map(params![uname], |row| {
                Ok(CohortLike {
                    pid: row.get(0)?,
                    username: row.get(1)?,
                    owner: row.get(2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(likes)
    }
}

impl PaperQueries for SqlitePaperStore {
    fn get_timeline(&self, uname: &str, count: usize) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM papers p
             WHERE p.username = ?1
             ORDER BY p.created DESC, p.pid ASC
             LIMIT ?2",
            RECORD_COLUMNS
        );
        query_records(&conn, &sql, params![uname, limit(count)])
    }

    fn get_timeline_all(&self, count: usize) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM papers p
             ORDER BY p.created DESC, p.pid ASC
             LIMIT ?1",
            RECORD_COLUMNS
        );
        query_records(&conn, &sql, params![limit(count)])
    }

    fn get_papers_by_tag(&self, tag: &str, count: usize) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM papers p JOIN tags t ON t.pid = p.pid
             WHERE t.tagname = ?1
             ORDER BY p.created DESC, p.pid ASC
             LIMIT ?2",
            RECORD_COLUMNS
        );
        query_records(&conn, &sql, params![tag, limit(count)])
    }

    fn get_papers_by_keyword(
        &self,
        keyword: &str,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let Some(phrase) = phrase_query(keyword) else {
            return Ok(Vec::new());
        };

        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM papers p
             WHERE p.pid IN (SELECT rowid FROM papers_fts WHERE papers_fts MATCH ?1)
             ORDER BY p.created DESC, p.pid ASC
             LIMIT ?2",
            RECORD_COLUMNS
        );
        query_records(&conn, &sql, params![phrase, limit(count)])
    }

    fn get_papers_by_liked(
        &self,
        uname: &str,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "SELECT {} FROM papers p JOIN likes l ON l.pid = p.pid
             WHERE l.username = ?1
             ORDER BY l.liked_at DESC, p.pid ASC
             LIMIT ?2",
            RECORD_COLUMNS
        );
        query_records(&conn, &sql, params![uname, limit(count)])
    }

    fn get_most_popular_papers(
        &self,
        begin_time: DateTime<Utc>,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        // Inner join drops papers without likes
        let sql = format!(
            "WITH like_counts AS (
                 SELECT pid, COUNT(*) AS n FROM likes GROUP BY pid
             )
             SELECT {} FROM papers p JOIN like_counts c ON c.pid = p.pid
             WHERE p.created > ?1
             ORDER BY c.n DESC, p.pid ASC
             LIMIT ?2",
            RECORD_COLUMNS
        );
        query_records(
            &conn,
            &sql,
            params![begin_time.timestamp_millis(), limit(count)],
        )
    }

    fn get_recommend_papers(
        &self,
        uname: &str,
        count: usize,
    ) -> Result<Vec<PaperRecord>, StoreError> {
        let conn = self.lock()?;
        // Both stages read the same snapshot
        let tx = conn.unchecked_transaction()?;

        let cohort = Self::load_cohort(&tx, uname)?;
        if cohort.is_empty() || count == 0 {
            return Ok(Vec::new());
        }

        let likes = Self::load_cohort_likes(&tx, uname)?;
        let ranked = cohort.rank(likes, count);

        let sql = format!("SELECT {} FROM papers p WHERE p.pid = ?1", RECORD_COLUMNS);
        let mut stmt = tx.prepare(&sql)?;
        let mut records = Vec::with_capacity(ranked.len());
        for scored in &ranked {
            if let Some(record) = stmt
                .query_row(params![scored.pid], row_to_record)
                .optional()?
            {
                records.push(record);
            }
        }
        drop(stmt);
        tx.commit()?;

        tracing::debug!(
            "Recommended {} paper(s) to {:?} from a cohort of {}",
            records.len(),
            uname,
            cohort.members().count()
        );
        Ok(records)
    }
}
