//! SQLite-backed store for draft catalog shells and their content blobs.
//!
//! Low-traffic store, single connection. Content saves are deliberately
//! delete-then-insert rather than update-in-place; a crash between the two
//! statements can transiently leave a shell without content, which reads
//! handle as "no content yet".

use super::models::{FileCatalog, FileCatalogContent};
use super::schema::DRAFT_VERSIONED_SCHEMAS;
use crate::text::locale_sort_by_key;
use anyhow::{Context, Result};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Clone)]
pub struct SqliteDraftStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDraftStore {
    pub fn open<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let mut conn = Connection::open_with_flags(
            db_path.as_ref(),
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open draft database")?;

        crate::sqlite_persistence::ensure_schema(&mut conn, DRAFT_VERSIONED_SCHEMAS, "draft db")?;
        conn.pragma_update(None, "journal_mode", "WAL")?;

        let draft_count: i64 = conn
            .query_row("SELECT COUNT(*) FROM file_databases", [], |r| r.get(0))
            .unwrap_or(0);
        info!("Opened draft store: {} drafts", draft_count);

        Ok(SqliteDraftStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create a shell with its initial content blob. Returns the new id.
    pub fn create_draft(
        &self,
        title: &str,
        song_count: usize,
        artist_count: usize,
        source: &str,
        saved_at: i64,
    ) -> Result<i64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO file_databases (title, song_count, artist_count) VALUES (?1, ?2, ?3)",
            params![title, song_count as i64, artist_count as i64],
        )?;
        let id = tx.last_insert_rowid();
        tx.execute(
            "INSERT INTO file_database_content (database_id, data, is_active, saved_at)
             VALUES (?1, ?2, 1, ?3)",
            params![id, source, saved_at],
        )?;
        tx.commit()?;
        Ok(id)
    }

    pub fn get_draft(&self, id: i64) -> Result<Option<FileCatalog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, song_count, artist_count FROM file_databases WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::parse_draft_row) {
            Ok(draft) => Ok(Some(draft)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn list_drafts(&self) -> Result<Vec<FileCatalog>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, song_count, artist_count FROM file_databases ORDER BY id",
        )?;
        let mut drafts = stmt
            .query_map([], Self::parse_draft_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut drafts, |d| &d.title);
        Ok(drafts)
    }

    pub fn update_counts(&self, id: i64, song_count: usize, artist_count: usize) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE file_databases SET song_count = ?1, artist_count = ?2 WHERE id = ?3",
            params![song_count as i64, artist_count as i64, id],
        )?;
        Ok(())
    }

    /// Replace the content blob: delete prior rows, then insert the new
    /// active one. Intentionally two autocommitted statements, not a
    /// transaction (see module docs).
    pub fn replace_content(&self, id: i64, data: &str, saved_at: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM file_database_content WHERE database_id = ?1",
            params![id],
        )?;
        conn.execute(
            "INSERT INTO file_database_content (database_id, data, is_active, saved_at)
             VALUES (?1, ?2, 1, ?3)",
            params![id, data, saved_at],
        )?;
        Ok(())
    }

    pub fn get_content(&self, id: i64) -> Result<Option<FileCatalogContent>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT database_id, data, is_active, saved_at FROM file_database_content
             WHERE database_id = ?1 AND is_active = 1 ORDER BY rowid LIMIT 1",
        )?;
        match stmt.query_row(params![id], |row| {
            Ok(FileCatalogContent {
                database_id: row.get(0)?,
                data: row.get(1)?,
                is_active: row.get::<_, i32>(2)? != 0,
                saved_at: row.get(3)?,
            })
        }) {
            Ok(content) => Ok(Some(content)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_draft(&self, id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "DELETE FROM file_database_content WHERE database_id = ?1",
            params![id],
        )?;
        conn.execute("DELETE FROM file_databases WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn parse_draft_row(row: &rusqlite::Row) -> rusqlite::Result<FileCatalog> {
        Ok(FileCatalog {
            id: row.get(0)?,
            title: row.get(1)?,
            song_count: row.get::<_, i64>(2)? as usize,
            artist_count: row.get::<_, i64>(3)? as usize,
        })
    }
}
