//! Minimal line-format catalog parser used by the tests.
//!
//! The real parser is a collaborator outside the store crate; this one
//! implements just enough of the same contract to exercise ingestion, search
//! and draft reconstruction. Format: song fragments separated by `---` lines,
//! each fragment carrying `@title=` / `@artist=` headers followed by the song
//! text. Ids are derived from titles and artist names, so re-parsing the same
//! source always yields the same ids.

use songbook_store::catalog_store::{ParsedArtist, ParsedCatalog, ParsedLetter, ParsedSong};
use songbook_store::ingestion::{CatalogParser, ParseError};
use songbook_store::text::remove_diacritics;
use std::collections::HashMap;

pub struct LineParser;

fn slug(text: &str) -> String {
    remove_diacritics(text)
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect()
}

fn first_letter(name: &str) -> String {
    remove_diacritics(name)
        .chars()
        .next()
        .map(|c| c.to_ascii_uppercase().to_string())
        .unwrap_or_else(|| "#".to_string())
}

impl CatalogParser for LineParser {
    fn parse(&self, source: &str) -> Result<ParsedCatalog, ParseError> {
        let mut fragments: Vec<String> = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        for line in source.lines() {
            if line.trim() == "---" {
                fragments.push(current.join("\n"));
                current = Vec::new();
            } else {
                current.push(line);
            }
        }
        fragments.push(current.join("\n"));

        let mut songs = Vec::new();
        let mut artists: Vec<ParsedArtist> = Vec::new();

        for raw in fragments {
            let fragment = raw.trim();
            if fragment.is_empty() {
                continue;
            }

            let mut title = None;
            let mut artist_name = None;
            let mut text_lines = Vec::new();
            for line in fragment.lines() {
                if let Some(value) = line.strip_prefix("@title=") {
                    title = Some(value.trim().to_string());
                } else if let Some(value) = line.strip_prefix("@artist=") {
                    artist_name = Some(value.trim().to_string());
                } else {
                    text_lines.push(line);
                }
            }

            let title =
                title.ok_or_else(|| ParseError("song fragment missing @title".to_string()))?;
            let artist_name = artist_name
                .ok_or_else(|| ParseError("song fragment missing @artist".to_string()))?;

            let artist_id = slug(&artist_name);
            if !artists.iter().any(|a| a.id == artist_id) {
                artists.push(ParsedArtist {
                    id: artist_id.clone(),
                    name: artist_name.clone(),
                    letter: first_letter(&artist_name),
                });
            }

            songs.push(ParsedSong {
                id: slug(&title),
                artist_id,
                title,
                artist_name,
                text: text_lines.join("\n").trim().to_string(),
                source: fragment.to_string(),
            });
        }

        let mut letter_counts: HashMap<String, usize> = HashMap::new();
        for artist in &artists {
            *letter_counts.entry(artist.letter.clone()).or_insert(0) += 1;
        }
        let mut letters: Vec<ParsedLetter> = letter_counts
            .into_iter()
            .map(|(letter, artist_count)| ParsedLetter {
                letter,
                artist_count,
            })
            .collect();
        letters.sort_by(|a, b| a.letter.cmp(&b.letter));

        Ok(ParsedCatalog {
            songs,
            artists,
            letters,
        })
    }
}
