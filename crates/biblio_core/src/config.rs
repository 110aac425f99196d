//! Catalog runtime configuration.
//!
//! # Responsibility
//! - Describe where the catalog database lives and how the core behaves
//!   around it (live-query keep-alive, hierarchy depth guard, audit actor).
//!
//! # Invariants
//! - `Default` is a usable in-memory configuration.
//! - Missing fields in serialized config fall back to defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_LIVE_KEEP_ALIVE_MS: u64 = 5_000;
const DEFAULT_MAX_CATEGORY_DEPTH: usize = 256;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Settings used to open a catalog store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// Database file path. `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    /// Grace period before an unobserved live query is torn down.
    pub live_keep_alive_ms: u64,
    /// Upper bound on parent-chain walks before data is treated as corrupt.
    pub max_category_depth: usize,
    /// Actor identifier stamped on every audit entry.
    pub actor: Option<String>,
    /// SQLite busy timeout.
    pub busy_timeout_ms: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            live_keep_alive_ms: DEFAULT_LIVE_KEEP_ALIVE_MS,
            max_category_depth: DEFAULT_MAX_CATEGORY_DEPTH,
            actor: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl CatalogConfig {
    /// File-backed configuration with defaults for everything else.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    pub fn with_live_keep_alive(mut self, keep_alive: Duration) -> Self {
        self.live_keep_alive_ms = u64::try_from(keep_alive.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_max_category_depth(mut self, depth: usize) -> Self {
        self.max_category_depth = depth;
        self
    }

    pub fn with_actor(mut self, actor: impl Into<String>) -> Self {
        self.actor = Some(actor.into());
        self
    }

    pub fn live_keep_alive(&self) -> Duration {
        Duration::from_millis(self.live_keep_alive_ms)
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::CatalogConfig;
    use std::time::Duration;

    #[test]
    fn default_is_in_memory_with_five_second_keep_alive() {
        let config = CatalogConfig::default();
        assert!(config.db_path.is_none());
        assert_eq!(config.live_keep_alive(), Duration::from_secs(5));
        assert_eq!(config.max_category_depth, 256);
    }

    #[test]
    fn partial_json_falls_back_to_defaults() {
        let config: CatalogConfig =
            serde_json::from_str(r#"{"actor":"librarian","live_keep_alive_ms":250}"#).unwrap();
        assert_eq!(config.actor.as_deref(), Some("librarian"));
        assert_eq!(config.live_keep_alive(), Duration::from_millis(250));
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
    }
}
