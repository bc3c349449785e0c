//! SQLite schema for the draft staging store (a separate database file from
//! the indexed store).

use crate::sqlite_column;
use crate::sqlite_persistence::{Column, SqlType, Table, VersionedSchema};

const FILE_DATABASES_TABLE: Table = Table {
    name: "file_databases",
    columns: &[
        sqlite_column!("id", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("title", &SqlType::Text, non_null = true),
        sqlite_column!("song_count", &SqlType::Integer, non_null = true),
        sqlite_column!("artist_count", &SqlType::Integer, non_null = true),
    ],
    indices: &[],
};

const FILE_DATABASE_CONTENT_TABLE: Table = Table {
    name: "file_database_content",
    columns: &[
        sqlite_column!("rowid", &SqlType::Integer, is_primary_key = true),
        sqlite_column!("database_id", &SqlType::Integer, non_null = true),
        sqlite_column!("data", &SqlType::Text, non_null = true),
        sqlite_column!("is_active", &SqlType::Integer, non_null = true),
        sqlite_column!("saved_at", &SqlType::Integer, non_null = true),
    ],
    indices: &[("idx_file_database_content_database", "database_id")],
};

pub const DRAFT_VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[FILE_DATABASES_TABLE, FILE_DATABASE_CONTENT_TABLE],
    migration: None,
}];

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    #[test]
    fn schema_creates_and_validates() {
        let conn = Connection::open_in_memory().unwrap();
        let schema = &DRAFT_VERSIONED_SCHEMAS[0];
        schema.create(&conn).unwrap();
        schema.validate(&conn).unwrap();
    }

    #[test]
    fn shell_ids_autoincrement() {
        let conn = Connection::open_in_memory().unwrap();
        DRAFT_VERSIONED_SCHEMAS[0].create(&conn).unwrap();
        conn.execute(
            "INSERT INTO file_databases (title, song_count, artist_count) VALUES ('first', 0, 0)",
            [],
        )
        .unwrap();
        let first = conn.last_insert_rowid();
        conn.execute(
            "INSERT INTO file_databases (title, song_count, artist_count) VALUES ('second', 0, 0)",
            [],
        )
        .unwrap();
        assert_eq!(conn.last_insert_rowid(), first + 1);
    }
}
