//! SQLite schema for the indexed songbook store.
//!
//! One database file holds the four catalog-scoped collections (databases,
//! songs, artists, letters), the three token index tables behind search, and
//! the recents collection. Entity tables follow the integer-rowid plus
//! unique-text-id convention; token tables mirror what a multi-entry index
//! would be elsewhere: one row per (token, owner), indexed on the token for
//! prefix range scans and on the catalog id for cascade deletes.

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

/// Catalog rows, one per ingested database.
const DATABASES_TABLE: Table = Table {
    name: "databases",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("url", &SqlType::Text, non_null = true),
        sqlite_column!("description", &SqlType::Text, non_null = true),
        sqlite_column!("size", &SqlType::Text, non_null = true),
        sqlite_column!("song_count", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_count", &SqlType::Integer, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_databases_active", "is_active")],
};

/// Denormalized song rows. `title_words` / `text_words` carry the record's
/// token sets space-joined; the token tables below are the searchable index
/// over the same data.
const SONGS_TABLE: Table = Table {
    name: "songs",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_title", &SqlType::Text, non_null = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("artist_name", &SqlType::Text, non_null = true),
        sqlite_column!("source", &SqlType::Text, non_null = true),
        sqlite_column!("title_words", &SqlType::Text, non_null = true),
        sqlite_column!("text_words", &SqlType::Text, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_songs_artist", "artist_id"),
        ("idx_songs_database", "database_id"),
    ],
};

const ARTISTS_TABLE: Table = Table {
    name: "artists",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_title", &SqlType::Text, non_null = true),
        sqlite_column!("name", &SqlType::Text, non_null = true),
        sqlite_column!("letter_id", &SqlType::Text, non_null = true),
        sqlite_column!("name_words", &SqlType::Text, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true),
    ],
    indices: &[
        ("idx_artists_database", "database_id"),
        ("idx_artists_letter", "letter_id"),
    ],
};

/// Alphabet index rows, `id` = `<catalogId>/<letter>`. Artist counts come
/// from the parser so the letter list never scans the artists table.
const LETTERS_TABLE: Table = Table {
    name: "letters",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("letter", &SqlType::Text, non_null = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
        sqlite_column!("artist_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_letters_database", "database_id")],
};

const SONG_TITLE_TOKENS_TABLE: Table = Table {
    name: "song_title_tokens",
    columns: &[
        sqlite_column!("token", &SqlType::Text, non_null = true),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_song_title_tokens_token", "token"),
        ("idx_song_title_tokens_database", "database_id"),
    ],
};

const SONG_TEXT_TOKENS_TABLE: Table = Table {
    name: "song_text_tokens",
    columns: &[
        sqlite_column!("token", &SqlType::Text, non_null = true),
        sqlite_column!("song_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_song_text_tokens_token", "token"),
        ("idx_song_text_tokens_database", "database_id"),
    ],
};

const ARTIST_NAME_TOKENS_TABLE: Table = Table {
    name: "artist_name_tokens",
    columns: &[
        sqlite_column!("token", &SqlType::Text, non_null = true),
        sqlite_column!("artist_id", &SqlType::Text, non_null = true),
        sqlite_column!("database_id", &SqlType::Text, non_null = true),
    ],
    indices: &[
        ("idx_artist_name_tokens_token", "token"),
        ("idx_artist_name_tokens_database", "database_id"),
    ],
};

/// Most-recently-viewed entries. `payload` is the JSON snapshot of the song
/// or artist at view time.
const RECENTS_TABLE: Table = Table {
    name: "recents",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("id", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!("kind", &SqlType::Text, non_null = true),
        sqlite_column!("viewed_at", &SqlType::Integer, non_null = true),
        sqlite_column!("payload", &SqlType::Text, non_null = true),
    ],
    indices: &[("idx_recents_viewed_at", "viewed_at")],
};

pub const SONGBOOK_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        DATABASES_TABLE,
        SONGS_TABLE,
        ARTISTS_TABLE,
        LETTERS_TABLE,
        SONG_TITLE_TOKENS_TABLE,
        SONG_TEXT_TOKENS_TABLE,
        ARTIST_NAME_TOKENS_TABLE,
        RECENTS_TABLE,
    ],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::{params, Connection};

    #[test]
    fn schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &SONGBOOK_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn duplicate_song_id_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        SONGBOOK_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        let insert = "INSERT INTO songs (id, artist_id, database_id, database_title, title,
                      artist_name, source, title_words, text_words, is_active)
                      VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, 1)";
        conn.execute(
            insert,
            params!["db/1", "db/a", "db", "Db", "Song", "A", "src", "song", "text"],
        )
        .unwrap();
        let duplicate = conn.execute(
            insert,
            params!["db/1", "db/a", "db", "Db", "Song", "A", "src", "song", "text"],
        );
        assert!(duplicate.is_err());
    }

    #[test]
    fn token_tables_support_prefix_range_scans() {
        let conn = Connection::open_in_memory().unwrap();
        SONGBOOK_VERSIONED_SCHEMAS[0].create(&conn).unwrap();

        for (token, song) in [("love", "db/1"), ("lover", "db/2"), ("hate", "db/3")] {
            conn.execute(
                "INSERT INTO song_title_tokens (token, song_id, database_id) VALUES (?1, ?2, 'db')",
                params![token, song],
            )
            .unwrap();
        }

        let mut stmt = conn
            .prepare("SELECT song_id FROM song_title_tokens WHERE token >= ?1 AND token < ?2 ORDER BY song_id")
            .unwrap();
        let hits: Vec<String> = stmt
            .query_map(params!["love", "lovf"], |r| r.get(0))
            .unwrap()
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(hits, vec!["db/1", "db/2"]);
    }
}
