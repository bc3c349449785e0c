//! Record types for the indexed (cloud) songbook store.
//!
//! Songs and artists are stored denormalized: the owning catalog's id and
//! title are duplicated onto every row, because the store answers index
//! lookups only, never relational joins. The ingestion pipeline is the single
//! writer of these fields, which keeps the copies from drifting.

use serde::{Deserialize, Serialize};

// =============================================================================
// Catalog metadata
// =============================================================================

/// Descriptor of a remote catalog as listed by the directory the app syncs
/// from. This is the ingestion input; [`Catalog`] is what the store persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogMeta {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub size: String,
}

/// A stored catalog row, with aggregate counts and the active flag that
/// scopes default listing and search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub id: String,
    pub title: String,
    pub url: String,
    pub description: String,
    pub size: String,
    pub song_count: usize,
    pub artist_count: usize,
    pub is_active: bool,
}

impl Catalog {
    /// Recover the ingestion-time metadata from a stored row, for re-ingestion.
    pub fn meta(&self) -> CatalogMeta {
        CatalogMeta {
            id: self.id.clone(),
            title: self.title.clone(),
            url: self.url.clone(),
            description: self.description.clone(),
            size: self.size.clone(),
        }
    }
}

// =============================================================================
// Indexed records
// =============================================================================

/// A stored song. `id` and `artist_id` are composite:
/// `<catalogId>/<localSongId>` and `<catalogId>/<localArtistId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub id: String,
    pub artist_id: String,
    pub database_id: String,
    pub database_title: String,
    pub title: String,
    pub artist_name: String,
    /// Raw source fragment this song was parsed from. Draft edits rebuild the
    /// whole catalog source by concatenating these fragments.
    pub source: String,
    /// Deduplicated title token set, in first-occurrence order.
    pub title_words: Vec<String>,
    /// Body token set: first 20 raw tokens of the text, then deduplicated.
    pub text_words: Vec<String>,
    /// Snapshot of the catalog's active flag at ingestion time. Listing and
    /// search scope on the catalog row's live flag, not on this.
    pub is_active: bool,
}

/// A stored artist. `letter_id` is `<catalogId>/<letter>` and groups artists
/// under the alphabet index.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Artist {
    pub id: String,
    pub database_id: String,
    pub database_title: String,
    pub name: String,
    pub letter_id: String,
    pub name_words: Vec<String>,
    pub is_active: bool,
}

/// Per-catalog first-letter group with the artist count supplied by the
/// parser (not recomputed here).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Letter {
    pub id: String,
    pub letter: String,
    pub database_id: String,
    pub artist_count: usize,
}

/// A letter merged across the active catalog set, for the alphabet index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupedLetter {
    pub letter: String,
    pub artist_count: usize,
}

// =============================================================================
// Recents
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecentKind {
    Song,
    Artist,
}

impl RecentKind {
    pub fn to_db_str(self) -> &'static str {
        match self {
            RecentKind::Song => "song",
            RecentKind::Artist => "artist",
        }
    }

    pub fn from_db_str(s: &str) -> Self {
        match s {
            "artist" => RecentKind::Artist,
            _ => RecentKind::Song,
        }
    }
}

/// Denormalized snapshot embedded in a recent entry. It is a copy, not a
/// reference: the entry stays viewable after its source catalog is dropped.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum RecentEntity {
    Song(Song),
    Artist(Artist),
}

/// A most-recently-viewed entry, keyed `song:<id>` or `artist:<name>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecentEntry {
    pub id: String,
    pub kind: RecentKind,
    /// Unix milliseconds of the last view.
    pub viewed_at: i64,
    pub entity: RecentEntity,
}

// =============================================================================
// Parser output
// =============================================================================

/// Output of the external catalog parser, the ingestion pipeline's input.
/// Identifiers here are local to the catalog; ingestion makes them global.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsedCatalog {
    pub songs: Vec<ParsedSong>,
    pub artists: Vec<ParsedArtist>,
    pub letters: Vec<ParsedLetter>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedSong {
    pub id: String,
    pub artist_id: String,
    pub title: String,
    pub artist_name: String,
    /// Song body, chords included; feeds the body token index.
    pub text: String,
    /// Raw source fragment, kept verbatim for draft reconstruction.
    pub source: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedArtist {
    pub id: String,
    pub name: String,
    /// First-letter group this artist sorts under.
    pub letter: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParsedLetter {
    pub letter: String,
    pub artist_count: usize,
}
