//! SQLite-backed songbook store.
//!
//! Single write connection behind a mutex plus a small round-robin read pool,
//! WAL journaling. Every write that touches more than one collection goes
//! through one rusqlite transaction on the write connection, so readers see
//! either the pre-ingest state or the fully committed catalog, never a slice
//! of one.

use super::models::*;
use super::schema::SONGBOOK_VERSIONED_SCHEMAS;
use crate::ingestion::CatalogRecords;
use crate::text::locale_sort_by_key;
use anyhow::{Context, Result};
use rusqlite::{params, params_from_iter, types::Value, Connection, Transaction};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info};

/// Bound on the recents collection; oldest entries beyond it are trimmed
/// after every upsert.
const MAX_RECENT_ENTRIES: usize = 100;

/// Tells an index scan whether to keep feeding candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanControl {
    Continue,
    Stop,
}

#[derive(Clone)]
pub struct SqliteCatalogStore {
    read_pool: Vec<Arc<Mutex<Connection>>>,
    write_conn: Arc<Mutex<Connection>>,
    read_index: Arc<AtomicUsize>,
}

const SONG_COLUMNS: &str = "id, artist_id, database_id, database_title, title, artist_name, \
                            source, title_words, text_words, is_active";
const ARTIST_COLUMNS: &str = "id, database_id, database_title, name, letter_id, name_words, is_active";

impl SqliteCatalogStore {
    /// Open (creating or validating the schema) the songbook database at
    /// `db_path`.
    pub fn open<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> Result<Self> {
        let db_path_ref = db_path.as_ref();

        let mut write_conn = Connection::open_with_flags(
            db_path_ref,
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI
                | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .context("Failed to open songbook database")?;

        crate::sqlite_persistence::ensure_schema(
            &mut write_conn,
            SONGBOOK_VERSIONED_SCHEMAS,
            "songbook db",
        )?;
        write_conn.pragma_update(None, "journal_mode", "WAL")?;

        let catalog_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM databases", [], |r| r.get(0))
            .unwrap_or(0);
        let song_count: i64 = write_conn
            .query_row("SELECT COUNT(*) FROM songs", [], |r| r.get(0))
            .unwrap_or(0);
        info!(
            "Opened songbook store: {} catalogs, {} songs",
            catalog_count, song_count
        );

        let mut read_pool = Vec::with_capacity(read_pool_size.max(1));
        for _ in 0..read_pool_size.max(1) {
            let read_conn = Connection::open_with_flags(
                db_path_ref,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_ONLY
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.pragma_update(None, "journal_mode", "WAL")?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
        })
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::SeqCst) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    // =========================================================================
    // Internal helpers
    // =========================================================================

    fn join_words(words: &[String]) -> String {
        words.join(" ")
    }

    fn split_words(joined: &str) -> Vec<String> {
        joined
            .split(' ')
            .filter(|w| !w.is_empty())
            .map(str::to_string)
            .collect()
    }

    fn parse_song_row(row: &rusqlite::Row) -> rusqlite::Result<Song> {
        Ok(Song {
            id: row.get(0)?,
            artist_id: row.get(1)?,
            database_id: row.get(2)?,
            database_title: row.get(3)?,
            title: row.get(4)?,
            artist_name: row.get(5)?,
            source: row.get(6)?,
            title_words: Self::split_words(&row.get::<_, String>(7)?),
            text_words: Self::split_words(&row.get::<_, String>(8)?),
            is_active: row.get::<_, i32>(9)? != 0,
        })
    }

    fn parse_artist_row(row: &rusqlite::Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            database_id: row.get(1)?,
            database_title: row.get(2)?,
            name: row.get(3)?,
            letter_id: row.get(4)?,
            name_words: Self::split_words(&row.get::<_, String>(5)?),
            is_active: row.get::<_, i32>(6)? != 0,
        })
    }

    fn parse_catalog_row(row: &rusqlite::Row) -> rusqlite::Result<Catalog> {
        Ok(Catalog {
            id: row.get(0)?,
            title: row.get(1)?,
            url: row.get(2)?,
            description: row.get(3)?,
            size: row.get(4)?,
            song_count: row.get::<_, i64>(5)? as usize,
            artist_count: row.get::<_, i64>(6)? as usize,
            is_active: row.get::<_, i32>(7)? != 0,
        })
    }

    /// Resolve a listing scope: an explicit catalog id bypasses the active
    /// filter, no id means the current active set.
    fn resolve_scope(&self, catalog_id: Option<&str>) -> Result<Vec<String>> {
        match catalog_id {
            Some(id) => Ok(vec![id.to_string()]),
            None => self.active_catalog_ids(),
        }
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(",")
    }

    // =========================================================================
    // Ingestion writes
    // =========================================================================

    fn insert_catalog_records(tx: &Transaction, records: &CatalogRecords) -> Result<()> {
        {
            let mut song_stmt = tx.prepare_cached(
                "INSERT INTO songs (id, artist_id, database_id, database_title, title,
                 artist_name, source, title_words, text_words, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            )?;
            let mut title_token_stmt = tx.prepare_cached(
                "INSERT INTO song_title_tokens (token, song_id, database_id) VALUES (?1, ?2, ?3)",
            )?;
            let mut text_token_stmt = tx.prepare_cached(
                "INSERT INTO song_text_tokens (token, song_id, database_id) VALUES (?1, ?2, ?3)",
            )?;
            for song in &records.songs {
                song_stmt.execute(params![
                    song.id,
                    song.artist_id,
                    song.database_id,
                    song.database_title,
                    song.title,
                    song.artist_name,
                    song.source,
                    Self::join_words(&song.title_words),
                    Self::join_words(&song.text_words),
                    song.is_active as i32,
                ])?;
                for token in &song.title_words {
                    title_token_stmt.execute(params![token, song.id, song.database_id])?;
                }
                for token in &song.text_words {
                    text_token_stmt.execute(params![token, song.id, song.database_id])?;
                }
            }
        }

        {
            let mut artist_stmt = tx.prepare_cached(
                "INSERT INTO artists (id, database_id, database_title, name, letter_id,
                 name_words, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            let mut name_token_stmt = tx.prepare_cached(
                "INSERT INTO artist_name_tokens (token, artist_id, database_id) VALUES (?1, ?2, ?3)",
            )?;
            for artist in &records.artists {
                artist_stmt.execute(params![
                    artist.id,
                    artist.database_id,
                    artist.database_title,
                    artist.name,
                    artist.letter_id,
                    Self::join_words(&artist.name_words),
                    artist.is_active as i32,
                ])?;
                for token in &artist.name_words {
                    name_token_stmt.execute(params![token, artist.id, artist.database_id])?;
                }
            }
        }

        let catalog = &records.catalog;
        tx.execute(
            "INSERT INTO databases (id, title, url, description, size, song_count,
             artist_count, is_active)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                catalog.id,
                catalog.title,
                catalog.url,
                catalog.description,
                catalog.size,
                catalog.song_count as i64,
                catalog.artist_count as i64,
                catalog.is_active as i32,
            ],
        )?;

        let mut letter_stmt = tx.prepare_cached(
            "INSERT INTO letters (id, letter, database_id, artist_count) VALUES (?1, ?2, ?3, ?4)",
        )?;
        for letter in &records.letters {
            letter_stmt.execute(params![
                letter.id,
                letter.letter,
                letter.database_id,
                letter.artist_count as i64,
            ])?;
        }

        Ok(())
    }

    fn delete_catalog_rows(tx: &Transaction, catalog_id: &str) -> Result<()> {
        tx.execute("DELETE FROM song_title_tokens WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM song_text_tokens WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM artist_name_tokens WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM songs WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM artists WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM letters WHERE database_id = ?1", params![catalog_id])?;
        tx.execute("DELETE FROM databases WHERE id = ?1", params![catalog_id])?;
        Ok(())
    }

    fn clear_all_catalog_rows(tx: &Transaction) -> Result<()> {
        for table in [
            "song_title_tokens",
            "song_text_tokens",
            "artist_name_tokens",
            "songs",
            "artists",
            "letters",
            "databases",
        ] {
            tx.execute(&format!("DELETE FROM {}", table), params![])?;
        }
        Ok(())
    }

    /// Insert a freshly built catalog, all collections in one transaction.
    pub fn ingest_catalog(&self, records: CatalogRecords) -> Result<()> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::insert_catalog_records(&tx, &records)?;
        tx.commit()?;
        info!(
            "Ingested catalog '{}': {} songs, {} artists",
            records.catalog.id, records.catalog.song_count, records.catalog.artist_count
        );
        Ok(())
    }

    /// Replace a catalog in place: cascade delete plus re-insert under one
    /// transaction, so readers never see the catalog half-gone.
    pub fn replace_catalog(&self, records: CatalogRecords) -> Result<()> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::delete_catalog_rows(&tx, &records.catalog.id)?;
        Self::insert_catalog_records(&tx, &records)?;
        tx.commit()?;
        info!("Replaced catalog '{}'", records.catalog.id);
        Ok(())
    }

    /// Cascade delete a catalog and everything it owns.
    pub fn drop_catalog(&self, catalog_id: &str) -> Result<()> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::delete_catalog_rows(&tx, catalog_id)?;
        tx.commit()?;
        info!("Dropped catalog '{}'", catalog_id);
        Ok(())
    }

    /// Clear every catalog-scoped collection and re-ingest the given batch in
    /// sequence. One transaction for the whole operation: a failure anywhere
    /// leaves the previous content untouched for every catalog.
    pub fn replace_all_catalogs(&self, batches: Vec<CatalogRecords>) -> Result<()> {
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        Self::clear_all_catalog_rows(&tx)?;
        for records in &batches {
            Self::insert_catalog_records(&tx, records)?;
        }
        tx.commit()?;
        info!("Rebuilt store with {} catalogs", batches.len());
        Ok(())
    }

    // =========================================================================
    // Catalog rows
    // =========================================================================

    pub fn list_catalogs(&self) -> Result<Vec<Catalog>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, url, description, size, song_count, artist_count, is_active
             FROM databases ORDER BY rowid",
        )?;
        let mut catalogs = stmt
            .query_map([], Self::parse_catalog_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut catalogs, |c| &c.title);
        Ok(catalogs)
    }

    pub fn get_catalog(&self, id: &str) -> Result<Option<Catalog>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, title, url, description, size, song_count, artist_count, is_active
             FROM databases WHERE id = ?1",
        )?;
        match stmt.query_row(params![id], Self::parse_catalog_row) {
            Ok(catalog) => Ok(Some(catalog)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Flip the catalog's active flag. Song/artist rows keep their
    /// ingestion-time snapshot; only this flag scopes reads.
    pub fn set_active(&self, catalog_id: &str, active: bool) -> Result<()> {
        let conn = self.write_conn.lock().unwrap();
        conn.execute(
            "UPDATE databases SET is_active = ?1 WHERE id = ?2",
            params![active as i32, catalog_id],
        )?;
        debug!("Catalog '{}' active flag set to {}", catalog_id, active);
        Ok(())
    }

    pub fn active_catalog_ids(&self) -> Result<Vec<String>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt =
            conn.prepare_cached("SELECT id FROM databases WHERE is_active = 1 ORDER BY rowid")?;
        let ids = stmt
            .query_map([], |r| r.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(ids)
    }

    /// Total songs across the active set, from the catalog rows' aggregate
    /// counts (no scan of the songs table).
    pub fn active_song_count(&self) -> Result<usize> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COALESCE(SUM(song_count), 0) FROM databases WHERE is_active = 1",
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    // =========================================================================
    // Listing
    // =========================================================================

    pub fn find_artists(&self, catalog_id: Option<&str>) -> Result<Vec<Artist>> {
        let scope = self.resolve_scope(catalog_id)?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM artists WHERE database_id IN ({}) ORDER BY rowid",
            ARTIST_COLUMNS,
            Self::placeholders(scope.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut artists = stmt
            .query_map(params_from_iter(scope.iter()), Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut artists, |a| &a.name);
        Ok(artists)
    }

    pub fn find_artists_by_letter(
        &self,
        letter: &str,
        catalog_id: Option<&str>,
    ) -> Result<Vec<Artist>> {
        let scope = self.resolve_scope(catalog_id)?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let letter_ids: Vec<String> = scope.iter().map(|db| format!("{}/{}", db, letter)).collect();
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM artists WHERE letter_id IN ({}) ORDER BY rowid",
            ARTIST_COLUMNS,
            Self::placeholders(letter_ids.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut artists = stmt
            .query_map(params_from_iter(letter_ids.iter()), Self::parse_artist_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut artists, |a| &a.name);
        Ok(artists)
    }

    /// Letters merged across the scope, artist counts summed per letter.
    pub fn find_grouped_letters(&self, catalog_id: Option<&str>) -> Result<Vec<GroupedLetter>> {
        let scope = self.resolve_scope(catalog_id)?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT letter, SUM(artist_count) FROM letters WHERE database_id IN ({})
             GROUP BY letter ORDER BY letter",
            Self::placeholders(scope.len())
        );
        let mut stmt = conn.prepare(&sql)?;
        let letters = stmt
            .query_map(params_from_iter(scope.iter()), |row| {
                Ok(GroupedLetter {
                    letter: row.get(0)?,
                    artist_count: row.get::<_, i64>(1)? as usize,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(letters)
    }

    pub fn find_songs_by_artist(&self, artist_id: &str) -> Result<Vec<Song>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM songs WHERE artist_id = ?1 ORDER BY rowid",
            SONG_COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut songs = stmt
            .query_map(params![artist_id], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut songs, |s| &s.title);
        Ok(songs)
    }

    pub fn find_songs_by_catalog(&self, catalog_id: &str) -> Result<Vec<Song>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM songs WHERE database_id = ?1 ORDER BY rowid",
            SONG_COLUMNS
        );
        let mut stmt = conn.prepare_cached(&sql)?;
        let mut songs = stmt
            .query_map(params![catalog_id], Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut songs, |s| &s.title);
        Ok(songs)
    }

    /// Page through songs in store order; the returned page is title-sorted.
    pub fn find_songs_by_range(
        &self,
        offset: usize,
        limit: usize,
        catalog_id: Option<&str>,
    ) -> Result<Vec<Song>> {
        let scope = self.resolve_scope(catalog_id)?;
        if scope.is_empty() {
            return Ok(Vec::new());
        }
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!(
            "SELECT {} FROM songs WHERE database_id IN ({}) ORDER BY rowid LIMIT ? OFFSET ?",
            SONG_COLUMNS,
            Self::placeholders(scope.len())
        );
        let mut values: Vec<Value> = scope.iter().map(|id| Value::from(id.clone())).collect();
        values.push(Value::from(limit as i64));
        values.push(Value::from(offset as i64));
        let mut stmt = conn.prepare(&sql)?;
        let mut songs = stmt
            .query_map(params_from_iter(values), Self::parse_song_row)?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);
        locale_sort_by_key(&mut songs, |s| &s.title);
        Ok(songs)
    }

    pub fn get_song(&self, id: &str) -> Result<Option<Song>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!("SELECT {} FROM songs WHERE id = ?1", SONG_COLUMNS);
        let mut stmt = conn.prepare_cached(&sql)?;
        match stmt.query_row(params![id], Self::parse_song_row) {
            Ok(song) => Ok(Some(song)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Batch get; misses are dropped, order of the input ids is preserved.
    pub fn get_songs(&self, ids: &[String]) -> Result<Vec<Song>> {
        let mut songs = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(song) = self.get_song(id)? {
                songs.push(song);
            }
        }
        Ok(songs)
    }

    pub fn get_artist(&self, id: &str) -> Result<Option<Artist>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let sql = format!("SELECT {} FROM artists WHERE id = ?1", ARTIST_COLUMNS);
        let mut stmt = conn.prepare_cached(&sql)?;
        match stmt.query_row(params![id], Self::parse_artist_row) {
            Ok(artist) => Ok(Some(artist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // =========================================================================
    // Search index scans
    // =========================================================================
    //
    // Each scan feeds candidates whose indexed token falls in
    // `[prefix, upper)` to the visitor, deduplicated, in insertion (rowid)
    // order, lazily: returning `ScanControl::Stop` ends the statement without
    // reading further rows.

    pub fn scan_artist_name_index<F>(
        &self,
        prefix: &str,
        upper: Option<&str>,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(Artist) -> ScanControl,
    {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let bounded = format!(
            "SELECT {} FROM artists WHERE id IN
             (SELECT artist_id FROM artist_name_tokens WHERE token >= ?1 AND token < ?2)
             ORDER BY rowid",
            ARTIST_COLUMNS
        );
        let open = format!(
            "SELECT {} FROM artists WHERE id IN
             (SELECT artist_id FROM artist_name_tokens WHERE token >= ?1)
             ORDER BY rowid",
            ARTIST_COLUMNS
        );
        let mut stmt = match upper {
            Some(_) => conn.prepare_cached(&bounded)?,
            None => conn.prepare_cached(&open)?,
        };
        let mut rows = match upper {
            Some(upper) => stmt.query(params![prefix, upper])?,
            None => stmt.query(params![prefix])?,
        };
        while let Some(row) = rows.next()? {
            if visit(Self::parse_artist_row(row)?) == ScanControl::Stop {
                break;
            }
        }
        Ok(())
    }

    pub fn scan_song_title_index<F>(
        &self,
        prefix: &str,
        upper: Option<&str>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(Song) -> ScanControl,
    {
        self.scan_song_index("song_title_tokens", prefix, upper, visit)
    }

    pub fn scan_song_text_index<F>(
        &self,
        prefix: &str,
        upper: Option<&str>,
        visit: F,
    ) -> Result<()>
    where
        F: FnMut(Song) -> ScanControl,
    {
        self.scan_song_index("song_text_tokens", prefix, upper, visit)
    }

    fn scan_song_index<F>(
        &self,
        token_table: &str,
        prefix: &str,
        upper: Option<&str>,
        mut visit: F,
    ) -> Result<()>
    where
        F: FnMut(Song) -> ScanControl,
    {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let bounded = format!(
            "SELECT {} FROM songs WHERE id IN
             (SELECT song_id FROM {} WHERE token >= ?1 AND token < ?2)
             ORDER BY rowid",
            SONG_COLUMNS, token_table
        );
        let open = format!(
            "SELECT {} FROM songs WHERE id IN
             (SELECT song_id FROM {} WHERE token >= ?1)
             ORDER BY rowid",
            SONG_COLUMNS, token_table
        );
        let mut stmt = match upper {
            Some(_) => conn.prepare_cached(&bounded)?,
            None => conn.prepare_cached(&open)?,
        };
        let mut rows = match upper {
            Some(upper) => stmt.query(params![prefix, upper])?,
            None => stmt.query(params![prefix])?,
        };
        while let Some(row) = rows.next()? {
            if visit(Self::parse_song_row(row)?) == ScanControl::Stop {
                break;
            }
        }
        Ok(())
    }

    // =========================================================================
    // Recents
    // =========================================================================

    pub fn record_recent_song(&self, song: &Song) -> Result<()> {
        let id = format!("song:{}", song.id);
        let payload = serde_json::to_string(&RecentEntity::Song(song.clone()))?;
        self.upsert_recent(&id, RecentKind::Song, &payload)
    }

    /// Keyed by name rather than id: the same artist appearing in several
    /// catalogs collapses into one recent entry.
    pub fn record_recent_artist(&self, artist: &Artist) -> Result<()> {
        let id = format!("artist:{}", artist.name);
        let payload = serde_json::to_string(&RecentEntity::Artist(artist.clone()))?;
        self.upsert_recent(&id, RecentKind::Artist, &payload)
    }

    fn upsert_recent(&self, id: &str, kind: RecentKind, payload: &str) -> Result<()> {
        let now = chrono::Utc::now().timestamp_millis();
        let mut conn = self.write_conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT INTO recents (id, kind, viewed_at, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
               kind = excluded.kind,
               viewed_at = excluded.viewed_at,
               payload = excluded.payload",
            params![id, kind.to_db_str(), now, payload],
        )?;
        let count: i64 = tx.query_row("SELECT COUNT(*) FROM recents", [], |r| r.get(0))?;
        if count as usize > MAX_RECENT_ENTRIES {
            tx.execute(
                "DELETE FROM recents WHERE rowid NOT IN
                 (SELECT rowid FROM recents ORDER BY viewed_at DESC, rowid DESC LIMIT ?1)",
                params![MAX_RECENT_ENTRIES as i64],
            )?;
        }
        tx.commit()?;
        Ok(())
    }

    /// All recent entries, most recent first.
    pub fn list_recents(&self) -> Result<Vec<RecentEntry>> {
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock().unwrap();
        let mut stmt = conn.prepare_cached(
            "SELECT id, kind, viewed_at, payload FROM recents
             ORDER BY viewed_at DESC, rowid DESC",
        )?;
        let entries = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, String>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        drop(stmt);
        drop(conn);

        let mut recents = Vec::with_capacity(entries.len());
        for (id, kind, viewed_at, payload) in entries {
            let entity: RecentEntity = serde_json::from_str(&payload)
                .with_context(|| format!("Corrupt recent entry payload for '{}'", id))?;
            recents.push(RecentEntry {
                id,
                kind: RecentKind::from_db_str(&kind),
                viewed_at,
                entity,
            });
        }
        Ok(recents)
    }
}
