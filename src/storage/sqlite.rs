//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::state::SiteStatus;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{IndexEntryRecord, LemmaRecord, PageRecord, SiteRecord};
use crate::SumiError;
use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::path::Path;

const SITE_COLUMNS: &str = "id, url, name, status, status_time, last_error";
const PAGE_COLUMNS: &str = "id, site_id, path, code, content";
const LEMMA_COLUMNS: &str = "id, site_id, lemma, frequency";

/// SQLite storage backend
#[derive(Debug)]
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(SumiError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, SumiError> {
        let conn = Connection::open(path).map_err(StorageError::from)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
            PRAGMA mmap_size = 268435456;
        ",
        )
        .map_err(StorageError::from)?;

        initialize_schema(&conn).map_err(StorageError::from)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> Result<Self, SumiError> {
        let conn = Connection::open_in_memory().map_err(StorageError::from)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(StorageError::from)?;
        initialize_schema(&conn).map_err(StorageError::from)?;
        Ok(Self { conn })
    }

    /// Runs raw SQL against the connection
    #[cfg(test)]
    pub(crate) fn execute_sql(&self, sql: &str) -> rusqlite::Result<()> {
        self.conn.execute_batch(sql)
    }
}

fn now() -> String {
    Utc::now().to_rfc3339()
}

fn site_from_row(row: &Row<'_>) -> rusqlite::Result<SiteRecord> {
    Ok(SiteRecord {
        id: row.get(0)?,
        url: row.get(1)?,
        name: row.get(2)?,
        status: SiteStatus::from_db_string(&row.get::<_, String>(3)?)
            .unwrap_or(SiteStatus::Failed),
        status_time: row.get(4)?,
        last_error: row.get(5)?,
    })
}

fn page_from_row(row: &Row<'_>) -> rusqlite::Result<PageRecord> {
    Ok(PageRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        path: row.get(2)?,
        code: row.get(3)?,
        content: row.get(4)?,
    })
}

fn lemma_from_row(row: &Row<'_>) -> rusqlite::Result<LemmaRecord> {
    Ok(LemmaRecord {
        id: row.get(0)?,
        site_id: row.get(1)?,
        lemma: row.get(2)?,
        frequency: row.get(3)?,
    })
}

fn count(conn: &Connection, sql: &str, site_id: Option<i64>) -> StorageResult<u64> {
    let n: i64 = match site_id {
        Some(id) => conn.query_row(sql, params![id], |row| row.get(0))?,
        None => conn.query_row(sql, [], |row| row.get(0))?,
    };
    Ok(n as u64)
}

/// Deletes a lemma's postings and the lemma row
fn delete_lemma_rows(conn: &Connection, lemma_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM index_entries WHERE lemma_id = ?1",
        params![lemma_id],
    )?;
    conn.execute("DELETE FROM lemmas WHERE id = ?1", params![lemma_id])?;
    Ok(())
}

/// Removes a page's postings and gives back one page of frequency per lemma
fn unindex_page(conn: &Connection, page_id: i64) -> rusqlite::Result<()> {
    let lemma_ids: Vec<i64> = {
        let mut stmt = conn.prepare_cached("SELECT lemma_id FROM index_entries WHERE page_id = ?1")?;
        let rows = stmt.query_map(params![page_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>()?
    };

    conn.execute(
        "DELETE FROM index_entries WHERE page_id = ?1",
        params![page_id],
    )?;

    for lemma_id in lemma_ids {
        conn.execute(
            "UPDATE lemmas SET frequency = frequency - 1 WHERE id = ?1",
            params![lemma_id],
        )?;
        let frequency: Option<i64> = conn
            .query_row(
                "SELECT frequency FROM lemmas WHERE id = ?1",
                params![lemma_id],
                |row| row.get(0),
            )
            .optional()?;
        if matches!(frequency, Some(f) if f <= 0) {
            delete_lemma_rows(conn, lemma_id)?;
        }
    }

    Ok(())
}

fn delete_page_rows(conn: &Connection, page_id: i64) -> rusqlite::Result<()> {
    unindex_page(conn, page_id)?;
    conn.execute("DELETE FROM pages WHERE id = ?1", params![page_id])?;
    Ok(())
}

fn clear_site_rows(conn: &Connection, site_id: i64) -> rusqlite::Result<()> {
    conn.execute(
        "DELETE FROM index_entries WHERE page_id IN (SELECT id FROM pages WHERE site_id = ?1)",
        params![site_id],
    )?;
    conn.execute(
        "DELETE FROM index_entries WHERE lemma_id IN (SELECT id FROM lemmas WHERE site_id = ?1)",
        params![site_id],
    )?;
    conn.execute("DELETE FROM pages WHERE site_id = ?1", params![site_id])?;
    conn.execute("DELETE FROM lemmas WHERE site_id = ?1", params![site_id])?;
    Ok(())
}

impl Storage for SqliteStorage {
    // ===== Site Management =====

    fn insert_site(&mut self, url: &str, name: &str, status: SiteStatus) -> StorageResult<i64> {
        self.conn.execute(
            "INSERT INTO sites (url, name, status, status_time) VALUES (?1, ?2, ?3, ?4)",
            params![url, name, status.to_db_string(), now()],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_site(&self, site_id: i64) -> StorageResult<SiteRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM sites WHERE id = ?1", SITE_COLUMNS),
                params![site_id],
                site_from_row,
            )
            .optional()?
            .ok_or(StorageError::SiteNotFound(site_id))
    }

    fn get_site_by_url(&self, url: &str) -> StorageResult<Option<SiteRecord>> {
        Ok(self.find_sites_by_url(url)?.into_iter().next())
    }

    fn find_sites_by_url(&self, url: &str) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM sites WHERE url = ?1 ORDER BY id ASC",
            SITE_COLUMNS
        ))?;
        let sites = stmt
            .query_map(params![url], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn list_sites(&self) -> StorageResult<Vec<SiteRecord>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {} FROM sites ORDER BY id ASC", SITE_COLUMNS))?;
        let sites = stmt
            .query_map([], site_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sites)
    }

    fn update_site_status(
        &mut self,
        site_id: i64,
        status: SiteStatus,
        last_error: Option<&str>,
    ) -> StorageResult<()> {
        let changed = self.conn.execute(
            "UPDATE sites SET status = ?1, last_error = ?2, status_time = ?3 WHERE id = ?4",
            params![status.to_db_string(), last_error, now(), site_id],
        )?;
        if changed == 0 {
            return Err(StorageError::SiteNotFound(site_id));
        }
        Ok(())
    }

    fn touch_site(&mut self, site_id: i64) -> StorageResult<()> {
        self.conn.execute(
            "UPDATE sites SET status_time = ?1 WHERE id = ?2",
            params![now(), site_id],
        )?;
        Ok(())
    }

    fn fail_indexing_sites(&mut self, message: &str) -> StorageResult<u64> {
        let changed = self.conn.execute(
            "UPDATE sites SET status = ?1, last_error = ?2, status_time = ?3 WHERE status = ?4",
            params![
                SiteStatus::Failed.to_db_string(),
                message,
                now(),
                SiteStatus::Indexing.to_db_string()
            ],
        )?;
        Ok(changed as u64)
    }

    fn delete_site(&mut self, site_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        clear_site_rows(&tx, site_id)?;
        tx.execute("DELETE FROM sites WHERE id = ?1", params![site_id])?;
        tx.commit()?;
        Ok(())
    }

    // ===== Page Management =====

    fn get_page(&self, site_id: i64, path: &str) -> StorageResult<Option<PageRecord>> {
        let page = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM pages WHERE site_id = ?1 AND path = ?2",
                    PAGE_COLUMNS
                ),
                params![site_id, path],
                page_from_row,
            )
            .optional()?;
        Ok(page)
    }

    fn get_page_by_id(&self, page_id: i64) -> StorageResult<PageRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM pages WHERE id = ?1", PAGE_COLUMNS),
                params![page_id],
                page_from_row,
            )
            .optional()?
            .ok_or_else(|| StorageError::PageNotFound(format!("Page ID {}", page_id)))
    }

    fn count_pages(&self, site_id: i64) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM pages WHERE site_id = ?1",
            Some(site_id),
        )
    }

    fn count_all_pages(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM pages", None)
    }

    fn store_page(
        &mut self,
        site_id: i64,
        path: &str,
        code: u16,
        content: &str,
        lemmas: &HashMap<String, u32>,
    ) -> StorageResult<i64> {
        let tx = self.conn.transaction()?;

        let existing: Option<i64> = tx
            .query_row(
                "SELECT id FROM pages WHERE site_id = ?1 AND path = ?2",
                params![site_id, path],
                |row| row.get(0),
            )
            .optional()?;
        if let Some(page_id) = existing {
            delete_page_rows(&tx, page_id)?;
        }

        tx.execute(
            "INSERT INTO pages (site_id, path, code, content) VALUES (?1, ?2, ?3, ?4)",
            params![site_id, path, code, content],
        )?;
        let page_id = tx.last_insert_rowid();

        for (lemma, occurrences) in lemmas {
            tx.execute(
                "INSERT INTO lemmas (site_id, lemma, frequency) VALUES (?1, ?2, 1)
                 ON CONFLICT(site_id, lemma) DO UPDATE SET frequency = frequency + 1",
                params![site_id, lemma],
            )?;
            let lemma_id: i64 = tx.query_row(
                "SELECT id FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                params![site_id, lemma],
                |row| row.get(0),
            )?;
            tx.execute(
                "INSERT INTO index_entries (page_id, lemma_id, weight) VALUES (?1, ?2, ?3)",
                params![page_id, lemma_id, f64::from(*occurrences)],
            )?;
        }

        tx.commit()?;
        Ok(page_id)
    }

    fn remove_page(&mut self, page_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        delete_page_rows(&tx, page_id)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_site(&mut self, site_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        clear_site_rows(&tx, site_id)?;
        tx.commit()?;
        Ok(())
    }

    // ===== Lemma Management =====

    fn get_lemma(&self, site_id: i64, lemma: &str) -> StorageResult<Option<LemmaRecord>> {
        let record = self
            .conn
            .query_row(
                &format!(
                    "SELECT {} FROM lemmas WHERE site_id = ?1 AND lemma = ?2",
                    LEMMA_COLUMNS
                ),
                params![site_id, lemma],
                lemma_from_row,
            )
            .optional()?;
        Ok(record)
    }

    fn find_lemmas(&self, site_id: i64, lemmas: &[String]) -> StorageResult<Vec<LemmaRecord>> {
        let mut found = Vec::new();
        for lemma in lemmas {
            if let Some(record) = self.get_lemma(site_id, lemma)? {
                found.push(record);
            }
        }
        Ok(found)
    }

    fn lemmas_by_site(&self, site_id: i64) -> StorageResult<Vec<LemmaRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM lemmas WHERE site_id = ?1 ORDER BY lemma ASC",
            LEMMA_COLUMNS
        ))?;
        let lemmas = stmt
            .query_map(params![site_id], lemma_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(lemmas)
    }

    fn count_lemmas(&self, site_id: i64) -> StorageResult<u64> {
        count(
            &self.conn,
            "SELECT COUNT(DISTINCT lemma) FROM lemmas WHERE site_id = ?1",
            Some(site_id),
        )
    }

    fn count_all_lemmas(&self) -> StorageResult<u64> {
        count(&self.conn, "SELECT COUNT(*) FROM lemmas", None)
    }

    fn delete_lemma(&mut self, lemma_id: i64) -> StorageResult<()> {
        let tx = self.conn.transaction()?;
        delete_lemma_rows(&tx, lemma_id)?;
        tx.commit()?;
        Ok(())
    }

    // ===== Index Entries =====

    fn entries_for_page(&self, page_id: i64) -> StorageResult<Vec<IndexEntryRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, page_id, lemma_id, weight FROM index_entries WHERE page_id = ?1 ORDER BY id ASC",
        )?;
        let entries = stmt
            .query_map(params![page_id], |row| {
                Ok(IndexEntryRecord {
                    id: row.get(0)?,
                    page_id: row.get(1)?,
                    lemma_id: row.get(2)?,
                    weight: row.get(3)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    fn page_ids_for_lemma(&self, lemma_id: i64) -> StorageResult<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare_cached("SELECT page_id FROM index_entries WHERE lemma_id = ?1 ORDER BY page_id ASC")?;
        let ids = stmt
            .query_map(params![lemma_id], |row| row.get(0))?
            .collect::<Result<Vec<i64>, _>>()?;
        Ok(ids)
    }

    fn relevance_for_page(&self, page_id: i64, lemma_ids: &[i64]) -> StorageResult<f64> {
        if lemma_ids.is_empty() {
            return Ok(0.0);
        }

        let placeholders = vec!["?"; lemma_ids.len()].join(", ");
        let sql = format!(
            "SELECT COALESCE(SUM(weight), 0.0) FROM index_entries WHERE page_id = ? AND lemma_id IN ({})",
            placeholders
        );

        let mut values = Vec::with_capacity(lemma_ids.len() + 1);
        values.push(page_id);
        values.extend_from_slice(lemma_ids);

        let sum: f64 = self
            .conn
            .query_row(&sql, params_from_iter(values.iter()), |row| row.get(0))?;
        Ok(sum)
    }
}
