//! Engine configuration that downstream crates can serialize/deserialize.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Sort a source's rows in memory when it rejects an ordering push-down.
    /// When off, such a source fails the operation as unsupported.
    pub sort_fallback: bool,

    /// Hard cap on rows buffered by the sort fallback.
    pub sort_buffer_rows: usize,

    /// Apply a filtering a source rejected to its rows as they stream.
    pub filter_fallback: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sort_fallback: false,
            sort_buffer_rows: 1_000_000,
            filter_fallback: true,
        }
    }
}

impl EngineConfig {
    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `VTLSET_SORT_FALLBACK`: `true`/`false`
    /// - `VTLSET_SORT_BUFFER_ROWS`: row cap for the sort fallback
    /// - `VTLSET_FILTER_FALLBACK`: `true`/`false`
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("VTLSET_SORT_FALLBACK") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.sort_fallback = v;
            }
        }

        if let Ok(s) = std::env::var("VTLSET_SORT_BUFFER_ROWS") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.sort_buffer_rows = v;
            }
        }

        if let Ok(s) = std::env::var("VTLSET_FILTER_FALLBACK") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.filter_fallback = v;
            }
        }

        cfg
    }

    pub fn with_sort_fallback(mut self, enabled: bool) -> Self {
        self.sort_fallback = enabled;
        self
    }

    pub fn with_sort_buffer_rows(mut self, rows: usize) -> Self {
        self.sort_buffer_rows = rows;
        self
    }

    pub fn with_filter_fallback(mut self, enabled: bool) -> Self {
        self.filter_fallback = enabled;
        self
    }
}
