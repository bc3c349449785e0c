//! File-based configuration for embedding hosts and the CLI.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Optional settings loaded from a TOML file. Everything has a sensible
/// default so the file itself is optional.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    /// Directory holding the two store files.
    pub db_dir: Option<String>,
    pub logging_level: Option<String>,
    /// Read pool size for the songbook store.
    pub read_pool_size: Option<usize>,
}

/// Filename of the indexed (cloud) store inside `db_dir`.
pub const SONGBOOK_DB_FILE: &str = "songbook.db";
/// Filename of the draft staging store inside `db_dir`.
pub const DRAFTS_DB_FILE: &str = "drafts.db";

pub const DEFAULT_READ_POOL_SIZE: usize = 2;

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    pub fn songbook_db_path(&self, fallback_dir: &Path) -> PathBuf {
        self.db_dir(fallback_dir).join(SONGBOOK_DB_FILE)
    }

    pub fn drafts_db_path(&self, fallback_dir: &Path) -> PathBuf {
        self.db_dir(fallback_dir).join(DRAFTS_DB_FILE)
    }

    fn db_dir(&self, fallback_dir: &Path) -> PathBuf {
        self.db_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| fallback_dir.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_partial_config() {
        let config: FileConfig = toml::from_str("db_dir = \"/var/lib/songbook\"").unwrap();
        assert_eq!(config.db_dir.as_deref(), Some("/var/lib/songbook"));
        assert!(config.logging_level.is_none());
        assert!(config.read_pool_size.is_none());
    }

    #[test]
    fn db_paths_fall_back_to_given_dir() {
        let config = FileConfig::default();
        let path = config.songbook_db_path(Path::new("/tmp/data"));
        assert_eq!(path, PathBuf::from("/tmp/data/songbook.db"));
    }
}
