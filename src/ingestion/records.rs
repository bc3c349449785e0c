//! Pure denormalization of a parsed catalog into storable records.
//!
//! Everything here is deterministic and side-effect free; the store commits
//! the result in one transaction. Composite ids are computed here and nowhere
//! else, which is what keeps the four collections referentially consistent.

use super::{IngestionError, ParseError};
use crate::catalog_store::{
    Artist, Catalog, CatalogMeta, Letter, ParsedCatalog, Song,
};
use crate::search::{dedup_tokens, tokenize};
use std::collections::HashSet;

/// Number of raw body tokens indexed per song. Bounds the body index size;
/// title tokens are always indexed in full.
const TEXT_TOKEN_LIMIT: usize = 20;

/// The denormalized record set for one catalog, ready for a transactional
/// insert.
#[derive(Debug, Clone)]
pub struct CatalogRecords {
    pub catalog: Catalog,
    pub songs: Vec<Song>,
    pub artists: Vec<Artist>,
    pub letters: Vec<Letter>,
}

/// Build the record set for `meta` from parser output.
///
/// Validates that every song references a parsed artist and every artist a
/// parsed letter group, so the invariant holds for the whole transaction
/// before any row is written. Duplicate ids in the source collapse to their
/// first occurrence.
pub fn build_catalog_records(
    meta: &CatalogMeta,
    parsed: &ParsedCatalog,
) -> Result<CatalogRecords, IngestionError> {
    let artist_ids: HashSet<&str> = parsed.artists.iter().map(|a| a.id.as_str()).collect();
    let letters_present: HashSet<&str> = parsed.letters.iter().map(|l| l.letter.as_str()).collect();

    for song in &parsed.songs {
        if !artist_ids.contains(song.artist_id.as_str()) {
            return Err(ParseError(format!(
                "song '{}' references unknown artist '{}'",
                song.id, song.artist_id
            ))
            .into());
        }
    }
    for artist in &parsed.artists {
        if !letters_present.contains(artist.letter.as_str()) {
            return Err(ParseError(format!(
                "artist '{}' references unknown letter group '{}'",
                artist.id, artist.letter
            ))
            .into());
        }
    }

    let songs = dedup_by_id(
        parsed
            .songs
            .iter()
            .map(|song| {
                let mut text_tokens = tokenize(&[song.text.as_str()]);
                text_tokens.truncate(TEXT_TOKEN_LIMIT);
                Song {
                    id: format!("{}/{}", meta.id, song.id),
                    artist_id: format!("{}/{}", meta.id, song.artist_id),
                    database_id: meta.id.clone(),
                    database_title: meta.title.clone(),
                    title: song.title.clone(),
                    artist_name: song.artist_name.clone(),
                    source: song.source.clone(),
                    title_words: dedup_tokens(tokenize(&[song.title.as_str()])),
                    text_words: dedup_tokens(text_tokens),
                    is_active: true,
                }
            })
            .collect(),
        |song: &Song| song.id.clone(),
    );

    let artists = dedup_by_id(
        parsed
            .artists
            .iter()
            .map(|artist| Artist {
                id: format!("{}/{}", meta.id, artist.id),
                database_id: meta.id.clone(),
                database_title: meta.title.clone(),
                name: artist.name.clone(),
                letter_id: format!("{}/{}", meta.id, artist.letter),
                name_words: dedup_tokens(tokenize(&[artist.name.as_str()])),
                is_active: true,
            })
            .collect(),
        |artist: &Artist| artist.id.clone(),
    );

    let letters = dedup_by_id(
        parsed
            .letters
            .iter()
            .map(|letter| Letter {
                id: format!("{}/{}", meta.id, letter.letter),
                letter: letter.letter.clone(),
                database_id: meta.id.clone(),
                artist_count: letter.artist_count,
            })
            .collect(),
        |letter: &Letter| letter.id.clone(),
    );

    // Counts reflect the parsed input, duplicates included, matching what the
    // catalog directory advertises.
    let catalog = Catalog {
        id: meta.id.clone(),
        title: meta.title.clone(),
        url: meta.url.clone(),
        description: meta.description.clone(),
        size: meta.size.clone(),
        song_count: parsed.songs.len(),
        artist_count: parsed.artists.len(),
        is_active: true,
    };

    Ok(CatalogRecords {
        catalog,
        songs,
        artists,
        letters,
    })
}

/// First occurrence wins, matching how the defensive dedup treated duplicate
/// source ids historically.
fn dedup_by_id<T, F>(items: Vec<T>, id_of: F) -> Vec<T>
where
    F: Fn(&T) -> String,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(id_of(item)))
        .collect()
}
