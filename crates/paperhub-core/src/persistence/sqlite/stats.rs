use rusqlite::params;

use super::{limit, query_count, SqlitePaperStore};
use crate::error::StoreError;
use crate::model::{Pid, TagCount, TagPairCount};
use crate::store::Statistics;

/// Read a `COUNT(*)` column into `u64`.
fn count_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<u64> {
    let n: i64 = row.get(idx)?;
    u64::try_from(n).map_err(|_| rusqlite::Error::IntegralValueOutOfRange(idx, n))
}

impl Statistics for SqlitePaperStore {
    fn get_likes(&self, pid: Pid) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        query_count(&conn, "SELECT COUNT(*) FROM likes WHERE pid = ?1", params![pid])
    }

    fn get_paper_tags(&self, pid: Pid) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt =
            conn.prepare("SELECT tagname FROM tags WHERE pid = ?1 ORDER BY tagname ASC")?;
        let tags = stmt
            .query_map(params![pid], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(tags)
    }

    fn get_most_active_users(&self, count: usize) -> Result<Vec<String>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT username, COUNT(*) AS n FROM papers
             GROUP BY username
             ORDER BY n DESC, username ASC
             LIMIT ?1",
        )?;
        let users = stmt
            .query_map(params![limit(count)], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;
        Ok(users)
    }

    fn get_most_popular_tags(&self, count: usize) -> Result<Vec<TagCount>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT tagname, COUNT(*) AS n FROM tags
             GROUP BY tagname
             ORDER BY n DESC, tagname ASC
             LIMIT ?1",
        )?;
        let tags = stmt
            .query_map(params![limit(count)], |row| {
                Ok(TagCount {
                    tagname: row.get(0)?,
                    count: count_column(row, 1)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(tags)
    }

    fn get_most_popular_tag_pairs(&self, count: usize) -> Result<Vec<TagPairCount>, StoreError> {
        let conn = self.lock()?;
        // `<` keeps one canonical orientation per unordered pair
        let mut stmt = conn.prepare(
            "SELECT t1.tagname, t2.tagname, COUNT(*) AS n
             FROM tags t1 JOIN tags t2 ON t2.pid = t1.pid AND t1.tagname < t2.tagname
             GROUP BY t1.tagname, t2.tagname
             ORDER BY n DESC, t1.tagname ASC, t2.tagname ASC
             LIMIT ?1",
        )?;
        let pairs = stmt
            .query_map(params![limit(count)], |row| {
                Ok(TagPairCount {
                    first: row.get(0)?,
                    second: row.get(1)?,
                    count: count_column(row, 2)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(pairs)
    }

    fn get_number_papers_user(&self, uname: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        query_count(
            &conn,
            "SELECT COUNT(*) FROM papers WHERE username = ?1",
            params![uname],
        )
    }

    fn get_number_liked_user(&self, uname: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        query_count(
            &conn,
            "SELECT COUNT(*) FROM likes WHERE username = ?1",
            params![uname],
        )
    }

    fn get_number_tags_user(&self, uname: &str) -> Result<u64, StoreError> {
        let conn = self.lock()?;
        query_count(
            &conn,
            "SELECT COUNT(DISTINCT t.tagname)
             FROM tags t JOIN papers p ON p.pid = t.pid
             WHERE p.username = ?1",
            params![uname],
        )
    }
}
