//! Draft catalog editing and promotion into the indexed store.
//!
//! Every song mutation reconstructs the catalog's whole source text from the
//! stored per-song fragments and goes back through parse-and-promote. Slower
//! than patching, but the indexed copy can never drift from the source text,
//! because there is exactly one path from source to index.

use super::models::{FileCatalog, FileCatalogContent};
use super::store::SqliteDraftStore;
use crate::catalog_store::{CatalogMeta, ParsedCatalog, SqliteCatalogStore};
use crate::ingestion::{build_catalog_records, CatalogParser, IngestionError, ParseError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info};

/// Separator between song fragments in catalog source text.
const SOURCE_SEPARATOR: &str = "\n---\n";

/// Source blob seeded into a newly created draft.
const SEED_SOURCE: &str = "@title=song1\n@artist=Some artist\n\n#1.\nText[Ami] to be [Fmaj]continued\n\n---\n\n@title=song2\n@artist=Some artist\n\n#1.\nText[Ami] to be [Fmaj]continued";

#[derive(Debug, Error)]
pub enum DraftError {
    #[error("draft catalog {0} does not exist")]
    DraftNotFound(i64),

    #[error("draft catalog {0} has no content")]
    ContentMissing(i64),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct DraftManager {
    drafts: Arc<SqliteDraftStore>,
    catalog: Arc<SqliteCatalogStore>,
    parser: Arc<dyn CatalogParser>,
}

impl DraftManager {
    pub fn new(
        drafts: Arc<SqliteDraftStore>,
        catalog: Arc<SqliteCatalogStore>,
        parser: Arc<dyn CatalogParser>,
    ) -> Self {
        Self {
            drafts,
            catalog,
            parser,
        }
    }

    /// Create a new draft seeded with a two-song example source.
    pub fn create_draft(&self, title: &str) -> Result<i64, DraftError> {
        let id = self
            .drafts
            .create_draft(title, 2, 1, SEED_SOURCE, now_millis())?;
        info!("Created draft catalog {} ('{}')", id, title);
        Ok(id)
    }

    /// Save new source text for a draft: reparse, refresh the shell counts,
    /// replace the content blob, and re-promote if this draft already has a
    /// promoted copy in the indexed store.
    pub fn save_draft(&self, id: i64, source: &str) -> Result<(), DraftError> {
        let shell = self.drafts.get_draft(id)?.ok_or(DraftError::DraftNotFound(id))?;

        // Parse before touching anything, so malformed source aborts with the
        // previous save intact.
        let parsed = self.parser.parse(source)?;

        self.drafts
            .update_counts(id, parsed.songs.len(), parsed.artists.len())?;
        self.drafts.replace_content(id, source, now_millis())?;

        if self.catalog.get_catalog(&id.to_string())?.is_some() {
            self.promote(&shell.title, id, &parsed)?;
        }
        Ok(())
    }

    /// Promote a draft into the indexed store under its numeric id, replacing
    /// any prior promoted copy.
    pub fn promote_draft(&self, id: i64) -> Result<(), DraftError> {
        let shell = self.drafts.get_draft(id)?.ok_or(DraftError::DraftNotFound(id))?;
        let content = self
            .drafts
            .get_content(id)?
            .ok_or(DraftError::ContentMissing(id))?;
        let parsed = self.parser.parse(&content.data)?;
        self.promote(&shell.title, id, &parsed)
    }

    fn promote(&self, title: &str, id: i64, parsed: &ParsedCatalog) -> Result<(), DraftError> {
        let meta = CatalogMeta {
            id: id.to_string(),
            title: title.to_string(),
            url: String::new(),
            description: String::new(),
            size: String::new(),
        };
        let records = build_catalog_records(&meta, parsed)?;
        self.catalog.replace_catalog(records)?;
        debug!("Promoted draft {} into the indexed store", id);
        Ok(())
    }

    /// Append new song fragments to a promoted draft. Drafts without a
    /// promoted copy are left untouched.
    pub fn append_songs(&self, id: i64, added_source: &str) -> Result<(), DraftError> {
        if self.catalog.get_catalog(&id.to_string())?.is_none() {
            return Ok(());
        }
        let new_source = match self.drafts.get_content(id)? {
            Some(content) if !content.data.is_empty() => {
                format!("{}{}{}", content.data, SOURCE_SEPARATOR, added_source)
            }
            _ => added_source.to_string(),
        };
        self.save_draft(id, &new_source)
    }

    /// Replace the given songs with a new fragment. The full source is
    /// rebuilt from the untouched songs' stored fragments plus the
    /// replacement, then saved and re-promoted.
    pub fn replace_songs(
        &self,
        id: i64,
        replaced_song_ids: &[String],
        new_source: &str,
    ) -> Result<(), DraftError> {
        if self.catalog.get_catalog(&id.to_string())?.is_none() {
            return Ok(());
        }
        let songs = self.catalog.find_songs_by_catalog(&id.to_string())?;
        let mut fragments: Vec<String> = songs
            .iter()
            .filter(|song| !replaced_song_ids.contains(&song.id))
            .map(|song| song.source.clone())
            .collect();
        fragments.push(new_source.to_string());
        self.save_draft(id, &fragments.join(SOURCE_SEPARATOR))
    }

    /// Remove the given songs, rebuilding the source from what remains.
    pub fn remove_songs(&self, id: i64, removed_song_ids: &[String]) -> Result<(), DraftError> {
        if self.catalog.get_catalog(&id.to_string())?.is_none() {
            return Ok(());
        }
        let songs = self.catalog.find_songs_by_catalog(&id.to_string())?;
        let fragments: Vec<String> = songs
            .iter()
            .filter(|song| !removed_song_ids.contains(&song.id))
            .map(|song| song.source.clone())
            .collect();
        self.save_draft(id, &fragments.join(SOURCE_SEPARATOR))
    }

    /// Delete the draft shell and content. A promoted copy in the indexed
    /// store is the caller's to drop separately.
    pub fn delete_draft(&self, id: i64) -> Result<(), DraftError> {
        self.drafts.delete_draft(id)?;
        info!("Deleted draft catalog {}", id);
        Ok(())
    }

    pub fn get_draft(&self, id: i64) -> Result<Option<FileCatalog>, DraftError> {
        Ok(self.drafts.get_draft(id)?)
    }

    pub fn list_drafts(&self) -> Result<Vec<FileCatalog>, DraftError> {
        Ok(self.drafts.list_drafts()?)
    }

    pub fn get_content(&self, id: i64) -> Result<Option<FileCatalogContent>, DraftError> {
        Ok(self.drafts.get_content(id)?)
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
