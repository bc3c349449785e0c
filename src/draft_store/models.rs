//! Records for the draft (file-catalog) staging store.

use serde::{Deserialize, Serialize};

/// A locally edited catalog shell. Counts mirror the last parsed save so the
/// UI can display them without re-reading the content blob.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCatalog {
    pub id: i64,
    pub title: String,
    pub song_count: usize,
    pub artist_count: usize,
}

/// The raw source blob of a file catalog. At most one active blob exists per
/// shell; saves replace it wholesale (delete then insert, never in place).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCatalogContent {
    pub database_id: i64,
    pub data: String,
    pub is_active: bool,
    /// Unix milliseconds of the save.
    pub saved_at: i64,
}
