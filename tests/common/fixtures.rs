//! Store pairs, canned fetchers and source-text builders for the e2e tests.

use super::parser::LineParser;
use anyhow::{bail, Result};
use async_trait::async_trait;
use songbook_store::catalog_store::{CatalogMeta, SqliteCatalogStore};
use songbook_store::draft_store::{DraftManager, SqliteDraftStore};
use songbook_store::ingestion::{
    build_catalog_records, CatalogParser, IngestionManager, RemoteFetcher,
};
use songbook_store::search::SearchEngine;
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;

/// A songbook store and a draft store backed by one temp directory.
pub struct TestStores {
    // Held for its Drop; the directory outlives the stores.
    _dir: TempDir,
    pub catalog: Arc<SqliteCatalogStore>,
    pub drafts: Arc<SqliteDraftStore>,
}

impl TestStores {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let catalog =
            Arc::new(SqliteCatalogStore::open(dir.path().join("songbook.db"), 2).unwrap());
        let drafts = Arc::new(SqliteDraftStore::open(dir.path().join("drafts.db")).unwrap());
        TestStores {
            _dir: dir,
            catalog,
            drafts,
        }
    }

    pub fn parser() -> Arc<dyn CatalogParser> {
        Arc::new(LineParser)
    }

    pub fn search_engine(&self) -> SearchEngine {
        SearchEngine::new(self.catalog.clone())
    }

    pub fn draft_manager(&self) -> DraftManager {
        DraftManager::new(self.drafts.clone(), self.catalog.clone(), Self::parser())
    }

    pub fn ingestion_manager(&self, fetcher: Arc<dyn RemoteFetcher>) -> IngestionManager {
        IngestionManager::new(self.catalog.clone(), Self::parser(), fetcher)
    }

    /// Parse `source` with the test parser and ingest it under `meta`,
    /// bypassing the fetcher.
    pub fn ingest_source(&self, meta: &CatalogMeta, source: &str) {
        let parsed = LineParser.parse(source).unwrap();
        let records = build_catalog_records(meta, &parsed).unwrap();
        self.catalog.ingest_catalog(records).unwrap();
    }
}

pub fn meta(id: &str, title: &str) -> CatalogMeta {
    CatalogMeta {
        id: id.to_string(),
        title: title.to_string(),
        url: format!("https://songs.example/{}.txt", id),
        description: format!("{} test catalog", title),
        size: "tiny".to_string(),
    }
}

/// One song fragment in the test line format.
pub fn song_fragment(title: &str, artist: &str, text: &str) -> String {
    format!("@title={}\n@artist={}\n\n{}", title, artist, text)
}

/// A whole catalog source from (title, artist, text) triples.
pub fn catalog_source(songs: &[(&str, &str, &str)]) -> String {
    songs
        .iter()
        .map(|(title, artist, text)| song_fragment(title, artist, text))
        .collect::<Vec<_>>()
        .join("\n---\n")
}

/// Fetcher serving canned responses by URL.
pub struct StaticFetcher {
    responses: HashMap<String, String>,
}

impl StaticFetcher {
    pub fn new(responses: &[(&str, &str)]) -> Self {
        StaticFetcher {
            responses: responses
                .iter()
                .map(|(url, body)| (url.to_string(), body.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl RemoteFetcher for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        match self.responses.get(url) {
            Some(body) => Ok(body.clone()),
            None => bail!("no canned response for {}", url),
        }
    }
}

/// Fetcher that always fails, for network-failure paths.
pub struct FailingFetcher;

#[async_trait]
impl RemoteFetcher for FailingFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        bail!("simulated network failure fetching {}", url)
    }
}
