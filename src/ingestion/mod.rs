//! Catalog ingestion: parsed source -> denormalized, indexed records.
//!
//! The parser and the fetcher are collaborators behind traits; the pipeline
//! itself only turns their output into records and commits them through the
//! store's transaction primitive.

mod manager;
mod records;

pub use manager::{IngestionError, IngestionManager};
pub use records::{build_catalog_records, CatalogRecords};

use crate::catalog_store::ParsedCatalog;
use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

/// Malformed catalog source text. Raised by the parser seam; ingestion
/// aborts before anything is written.
#[derive(Debug, Error)]
#[error("invalid catalog source: {0}")]
pub struct ParseError(pub String);

/// Parses raw catalog source text into song/artist/letter records.
/// Implemented outside this crate (the songbook text format parser).
pub trait CatalogParser: Send + Sync {
    fn parse(&self, source: &str) -> Result<ParsedCatalog, ParseError>;
}

/// Fetches remote catalog source text, used by reingest-all.
#[async_trait]
pub trait RemoteFetcher: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Plain HTTP text retrieval via reqwest.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RemoteFetcher for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}
