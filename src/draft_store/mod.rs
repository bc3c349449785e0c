mod manager;
mod models;
mod schema;
mod store;

pub use manager::{DraftError, DraftManager};
pub use models::{FileCatalog, FileCatalogContent};
pub use schema::DRAFT_VERSIONED_SCHEMAS;
pub use store::SqliteDraftStore;
