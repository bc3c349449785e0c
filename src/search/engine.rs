//! Cascading budgeted search over the token indices.
//!
//! Three ordered stages share one result budget: artist names, song titles,
//! song bodies. Each stage probes its index with the longest query token
//! (the longest prefix narrows the range scan most), then applies the full
//! AND rule: every query token must prefix-match some token of the candidate.
//! The cascade stops as soon as the budget fills, so a query that saturates
//! on artists never touches the song indices.

use super::tokenize::tokenize;
use crate::catalog_store::{Artist, ScanControl, Song, SqliteCatalogStore};
use crate::text::locale_sort_by_key;
use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;

/// Combined cap on artists + songs returned by one search call.
pub const SEARCH_RESULT_BUDGET: usize = 100;

/// Search results over the active catalog set.
///
/// `search_done` distinguishes "no query" (false, nothing was evaluated)
/// from "query evaluated" (true, even when nothing matched).
#[derive(Debug, Clone, Default)]
pub struct SearchOutcome {
    pub artists: Vec<Artist>,
    pub songs: Vec<Song>,
    pub search_done: bool,
}

pub struct SearchEngine {
    store: Arc<SqliteCatalogStore>,
}

impl SearchEngine {
    pub fn new(store: Arc<SqliteCatalogStore>) -> Self {
        Self { store }
    }

    pub fn search(&self, query: &str) -> Result<SearchOutcome> {
        let tokens = tokenize(&[query]);
        if tokens.is_empty() {
            return Ok(SearchOutcome::default());
        }

        let probe = longest_token(&tokens);
        let upper = prefix_upper_bound(probe);
        let active: HashSet<String> = self.store.active_catalog_ids()?.into_iter().collect();

        // Stage 1: artist names.
        let mut artists: Vec<Artist> = Vec::new();
        self.store
            .scan_artist_name_index(probe, upper.as_deref(), |artist| {
                if active.contains(&artist.database_id)
                    && all_tokens_match(&tokens, &[&artist.name_words])
                {
                    artists.push(artist);
                    if artists.len() >= SEARCH_RESULT_BUDGET {
                        return ScanControl::Stop;
                    }
                }
                ScanControl::Continue
            })?;

        if artists.len() >= SEARCH_RESULT_BUDGET {
            locale_sort_by_key(&mut artists, |a| &a.name);
            return Ok(SearchOutcome {
                artists,
                songs: Vec::new(),
                search_done: true,
            });
        }

        // Stage 2: song titles, with whatever budget stage 1 left.
        let mut title_songs: Vec<Song> = Vec::new();
        let remaining = SEARCH_RESULT_BUDGET - artists.len();
        self.store
            .scan_song_title_index(probe, upper.as_deref(), |song| {
                if active.contains(&song.database_id)
                    && all_tokens_match(&tokens, &[&song.title_words])
                {
                    title_songs.push(song);
                    if title_songs.len() >= remaining {
                        return ScanControl::Stop;
                    }
                }
                ScanControl::Continue
            })?;

        locale_sort_by_key(&mut artists, |a| &a.name);
        locale_sort_by_key(&mut title_songs, |s| &s.title);

        if artists.len() + title_songs.len() >= SEARCH_RESULT_BUDGET {
            return Ok(SearchOutcome {
                artists,
                songs: title_songs,
                search_done: true,
            });
        }

        // Stage 3: song bodies. A token may satisfy the AND rule through the
        // title set as well, and songs already found by title are skipped.
        let matched_ids: HashSet<String> = title_songs.iter().map(|s| s.id.clone()).collect();
        let mut text_songs: Vec<Song> = Vec::new();
        let remaining = SEARCH_RESULT_BUDGET - artists.len() - title_songs.len();
        self.store
            .scan_song_text_index(probe, upper.as_deref(), |song| {
                if active.contains(&song.database_id)
                    && !matched_ids.contains(&song.id)
                    && all_tokens_match(&tokens, &[&song.title_words, &song.text_words])
                {
                    text_songs.push(song);
                    if text_songs.len() >= remaining {
                        return ScanControl::Stop;
                    }
                }
                ScanControl::Continue
            })?;

        locale_sort_by_key(&mut text_songs, |s| &s.title);

        // Title hits stay ahead of body hits as two separately sorted blocks.
        let mut songs = title_songs;
        songs.extend(text_songs);

        Ok(SearchOutcome {
            artists,
            songs,
            search_done: true,
        })
    }
}

/// Every query token must prefix-match at least one stored token in one of
/// the candidate's tested token sets.
fn all_tokens_match(tokens: &[String], word_sets: &[&Vec<String>]) -> bool {
    tokens.iter().all(|token| {
        word_sets
            .iter()
            .any(|words| words.iter().any(|word| word.starts_with(token.as_str())))
    })
}

/// First token of maximal character length.
fn longest_token(tokens: &[String]) -> &str {
    let mut best = &tokens[0];
    for token in &tokens[1..] {
        if token.len() > best.len() {
            best = token;
        }
    }
    best
}

/// Exclusive upper bound of the index range holding tokens that start with
/// `prefix`. Tokens are pure `a-z`, so incrementing the last non-`z`
/// character (dropping trailing `z`s) is exact; an all-`z` prefix has no
/// upper bound.
fn prefix_upper_bound(prefix: &str) -> Option<String> {
    let mut bytes = prefix.as_bytes().to_vec();
    while let Some(&last) = bytes.last() {
        if last < b'z' {
            *bytes.last_mut().unwrap() = last + 1;
            return Some(String::from_utf8(bytes).unwrap());
        }
        bytes.pop();
    }
    None
}
