//! End-to-end tests for the cascading budgeted search.

mod common;

use common::{catalog_source, meta, TestStores};

fn setup_love_catalog(stores: &TestStores) {
    stores.ingest_source(
        &meta("db1", "Love Catalog"),
        &catalog_source(&[
            ("Love Song", "Cure", "whenever im alone with you"),
            ("Love Street", "Doors", "a song about lovers"),
            ("Hate Song", "Misfits", "some other words"),
            ("Ballad", "Love Songsmiths", "plain text here"),
        ]),
    );
}

// =============================================================================
// AND semantics + prefix matching
// =============================================================================

#[test]
fn test_and_semantics_across_fields() {
    let stores = TestStores::new();
    setup_love_catalog(&stores);

    let outcome = stores.search_engine().search("love song").unwrap();
    assert!(outcome.search_done);

    // "love" matches "love", "song" prefix-matches "songsmiths".
    let artist_names: Vec<&str> = outcome.artists.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(artist_names, vec!["Love Songsmiths"]);

    // "Love Song" matches by title; "Love Street" reaches stage 3 through
    // "lovers" in its body and satisfies "song" there too. "Hate Song"
    // misses "love" entirely.
    let song_titles: Vec<&str> = outcome.songs.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(song_titles, vec!["Love Song", "Love Street"]);
}

#[test]
fn test_prefix_match_is_anchored_at_token_start() {
    let stores = TestStores::new();
    setup_love_catalog(&stores);

    // "ove" is a substring of "love" but not a prefix.
    let outcome = stores.search_engine().search("ove").unwrap();
    assert!(outcome.search_done);
    assert!(outcome.artists.is_empty());
    assert!(outcome.songs.is_empty());
}

#[test]
fn test_all_tokens_required_for_artists() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "Artists"),
        &catalog_source(&[("Hurricane", "Bob Dylan", "they put him in a prison cell")]),
    );

    assert!(stores
        .search_engine()
        .search("bob marley")
        .unwrap()
        .artists
        .is_empty());
    assert_eq!(
        stores.search_engine().search("bob dyl").unwrap().artists.len(),
        1
    );
}

// =============================================================================
// searchDone flag
// =============================================================================

#[test]
fn test_no_match_query_is_done() {
    let stores = TestStores::new();
    setup_love_catalog(&stores);

    let outcome = stores.search_engine().search("zzqq").unwrap();
    assert!(outcome.search_done);
    assert!(outcome.artists.is_empty());
    assert!(outcome.songs.is_empty());
}

#[test]
fn test_tokenless_query_is_not_done() {
    let stores = TestStores::new();
    setup_love_catalog(&stores);

    for query in ["", "  ", "?!", "a 1"] {
        let outcome = stores.search_engine().search(query).unwrap();
        assert!(!outcome.search_done, "query {:?} should not evaluate", query);
        assert!(outcome.artists.is_empty());
        assert!(outcome.songs.is_empty());
    }
}

// =============================================================================
// Budget + cascade
// =============================================================================

#[test]
fn test_budget_caps_at_100_artists_and_skips_songs() {
    let stores = TestStores::new();
    let songs: Vec<(String, String, String)> = (0..150)
        .map(|i| {
            (
                format!("Tune {:03}", i),
                format!("Common Artist {:03}", i),
                "some words".to_string(),
            )
        })
        .collect();
    let refs: Vec<(&str, &str, &str)> = songs
        .iter()
        .map(|(t, a, x)| (t.as_str(), a.as_str(), x.as_str()))
        .collect();
    stores.ingest_source(&meta("db1", "Big"), &catalog_source(&refs));

    let outcome = stores.search_engine().search("common").unwrap();
    assert!(outcome.search_done);
    assert_eq!(outcome.artists.len(), 100);
    assert!(outcome.songs.is_empty());
}

#[test]
fn test_budget_cascades_from_artists_into_songs() {
    let stores = TestStores::new();
    // 30 artists and 90 songs all matching "folk": stage 1 takes 30 of the
    // budget, stage 2 fills the remaining 70 and stops the cascade.
    let songs: Vec<(String, String, String)> = (0..90)
        .map(|i| {
            (
                format!("Folk Tune {:02}", i),
                format!("Folk Ensemble {:02}", i % 30),
                "la la la".to_string(),
            )
        })
        .collect();
    let refs: Vec<(&str, &str, &str)> = songs
        .iter()
        .map(|(t, a, x)| (t.as_str(), a.as_str(), x.as_str()))
        .collect();
    stores.ingest_source(&meta("db1", "Folk"), &catalog_source(&refs));

    let outcome = stores.search_engine().search("folk").unwrap();
    assert!(outcome.search_done);
    assert_eq!(outcome.artists.len(), 30);
    assert_eq!(outcome.songs.len(), 70);
}

// =============================================================================
// Result ordering
// =============================================================================

#[test]
fn test_title_hits_sort_ahead_of_body_hits_as_two_blocks() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "Order"),
        &catalog_source(&[
            ("Banana Song", "One Band", "yellow fruit"),
            ("Apple Song", "Two Band", "red fruit"),
            ("Waltz", "Three Band", "a song in three four"),
            ("Anthem", "Four Band", "another song entirely"),
        ]),
    );

    let outcome = stores.search_engine().search("song").unwrap();
    let titles: Vec<&str> = outcome.songs.iter().map(|s| s.title.as_str()).collect();
    // Title matches first (sorted by title), then body matches (sorted by
    // title), never merged.
    assert_eq!(titles, vec!["Apple Song", "Banana Song", "Anthem", "Waltz"]);
}

#[test]
fn test_body_stage_does_not_duplicate_title_hits() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "Dup"),
        &catalog_source(&[("Song Song", "Band", "this song repeats the word song")]),
    );

    let outcome = stores.search_engine().search("song").unwrap();
    assert_eq!(outcome.songs.len(), 1);
}

#[test]
fn test_artists_are_locale_sorted() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "Sort"),
        &catalog_source(&[
            ("One", "Planet Zebra", "x"),
            ("Two", "Planet Apple", "y"),
            ("Three", "Planet Čaj", "z"),
        ]),
    );

    let outcome = stores.search_engine().search("planet").unwrap();
    let names: Vec<&str> = outcome.artists.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["Planet Apple", "Planet Čaj", "Planet Zebra"]);
}

// =============================================================================
// Active-set scoping
// =============================================================================

#[test]
fn test_search_only_covers_active_catalogs() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "First"),
        &catalog_source(&[("Shared Word Alpha", "Band One", "text")]),
    );
    stores.ingest_source(
        &meta("db2", "Second"),
        &catalog_source(&[("Shared Word Beta", "Band Two", "text")]),
    );

    let outcome = stores.search_engine().search("shared").unwrap();
    assert_eq!(outcome.songs.len(), 2);

    stores.catalog.set_active("db2", false).unwrap();
    let outcome = stores.search_engine().search("shared").unwrap();
    let titles: Vec<&str> = outcome.songs.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Shared Word Alpha"]);

    stores.catalog.set_active("db2", true).unwrap();
    assert_eq!(stores.search_engine().search("shared").unwrap().songs.len(), 2);
}

#[test]
fn test_diacritics_fold_in_both_directions() {
    let stores = TestStores::new();
    stores.ingest_source(
        &meta("db1", "Accents"),
        &catalog_source(&[("Café Bar", "Señor Blues", "una canción")]),
    );

    // Accented query, accented title: both tokenize to the same folded form.
    let outcome = stores.search_engine().search("cafe").unwrap();
    assert_eq!(outcome.songs.len(), 1);
    let outcome = stores.search_engine().search("Café").unwrap();
    assert_eq!(outcome.songs.len(), 1);
    let outcome = stores.search_engine().search("senor").unwrap();
    assert_eq!(outcome.artists.len(), 1);
}
