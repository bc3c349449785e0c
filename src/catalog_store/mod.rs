mod models;
mod schema;
mod store;

pub use models::*;
pub use schema::SONGBOOK_VERSIONED_SCHEMAS;
pub use store::{ScanControl, SqliteCatalogStore};
