//! Orchestrates catalog installs, drops and the full re-ingestion sweep.

use super::records::build_catalog_records;
use super::{CatalogParser, ParseError, RemoteFetcher};
use crate::catalog_store::{CatalogMeta, ParsedCatalog, SqliteCatalogStore};
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("failed to fetch catalog from {url}: {cause}")]
    Fetch { url: String, cause: anyhow::Error },

    #[error(transparent)]
    Store(#[from] anyhow::Error),
}

pub struct IngestionManager {
    store: Arc<SqliteCatalogStore>,
    parser: Arc<dyn CatalogParser>,
    fetcher: Arc<dyn RemoteFetcher>,
}

impl IngestionManager {
    pub fn new(
        store: Arc<SqliteCatalogStore>,
        parser: Arc<dyn CatalogParser>,
        fetcher: Arc<dyn RemoteFetcher>,
    ) -> Self {
        Self {
            store,
            parser,
            fetcher,
        }
    }

    /// Fetch, parse and ingest a remote catalog in one transaction.
    pub async fn install_catalog(&self, meta: CatalogMeta) -> Result<(), IngestionError> {
        info!("Installing catalog '{}' from {}", meta.id, meta.url);
        let source = self.fetch(&meta.url).await?;
        let parsed = self.parser.parse(&source)?;
        self.ingest_parsed(&meta, &parsed)
    }

    /// Ingest an already-parsed catalog (used for locally sourced catalogs).
    pub fn ingest_parsed(
        &self,
        meta: &CatalogMeta,
        parsed: &ParsedCatalog,
    ) -> Result<(), IngestionError> {
        let records = build_catalog_records(meta, parsed)?;
        self.store.ingest_catalog(records)?;
        Ok(())
    }

    pub fn drop_catalog(&self, catalog_id: &str) -> Result<(), IngestionError> {
        self.store.drop_catalog(catalog_id)?;
        Ok(())
    }

    /// Re-fetch and re-ingest every installed catalog.
    ///
    /// Strictly all-or-nothing: every catalog is fetched, parsed and built
    /// into records before the single replacing transaction opens. A fetch or
    /// parse failure anywhere aborts the whole sweep with the store
    /// untouched, so no catalog is ever stale relative to the others.
    pub async fn reingest_all(&self) -> Result<(), IngestionError> {
        let catalogs = self.store.list_catalogs()?;
        info!("Re-ingesting {} catalogs", catalogs.len());

        let mut batches = Vec::with_capacity(catalogs.len());
        for catalog in &catalogs {
            let meta = catalog.meta();
            let source = match self.fetch(&meta.url).await {
                Ok(source) => source,
                Err(e) => {
                    warn!("Aborting re-ingestion, catalog '{}' failed: {}", meta.id, e);
                    return Err(e);
                }
            };
            let parsed = self.parser.parse(&source)?;
            let mut records = build_catalog_records(&meta, &parsed)?;
            // A re-ingested catalog keeps its current active flag rather than
            // resetting to active.
            records.catalog.is_active = catalog.is_active;
            for song in &mut records.songs {
                song.is_active = catalog.is_active;
            }
            for artist in &mut records.artists {
                artist.is_active = catalog.is_active;
            }
            batches.push(records);
        }

        self.store.replace_all_catalogs(batches)?;
        Ok(())
    }

    async fn fetch(&self, url: &str) -> Result<String, IngestionError> {
        self.fetcher
            .fetch_text(url)
            .await
            .map_err(|cause| IngestionError::Fetch {
                url: url.to_string(),
                cause,
            })
    }
}
