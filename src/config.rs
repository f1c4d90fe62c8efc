//! Review configuration
//!
//! An explicit configuration value handed to the session constructor. The
//! original design kept these tunables in process-global mutable maps behind
//! a mutex; here each session carries its own immutable copy.

use serde::Deserialize;
use std::collections::HashMap;

/// Tunables consumed at the advisor/synthesizer boundary.
///
/// Neither threshold changes core algorithmic behavior: `max_preimage_rows`
/// is a policy hook callers may consult (the synthesizer logs a warning but
/// keeps the rollback), and `osc_min_table_size` only gates the
/// pt-online-schema-change advisory helper.
#[derive(Debug, Clone, Deserialize)]
pub struct ReviewConfig {
    /// Row count above which a captured DML pre-image is considered too
    /// expensive to keep.
    pub max_preimage_rows: u64,

    /// Table size in bytes above which an ALTER should be routed through
    /// pt-online-schema-change instead of running directly.
    pub osc_min_table_size: u64,

    /// Sharding column per table, keyed by resolved `schema.table`. Writes
    /// that omit the configured column are flagged by the sharded-write rule.
    #[serde(default)]
    pub sharding_columns: HashMap<String, String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            max_preimage_rows: 10_000,
            osc_min_table_size: 16 * 1024 * 1024,
            sharding_columns: HashMap::new(),
        }
    }
}

impl ReviewConfig {
    /// Whether a captured pre-image of `rows` rows exceeds the configured
    /// rollback budget. Callers decide what to do with oversized scripts;
    /// the synthesizer itself never drops them.
    pub fn exceeds_preimage_budget(&self, rows: u64) -> bool {
        rows > self.max_preimage_rows
    }

    /// Sharding column configured for the resolved table, if any.
    pub fn sharding_column(&self, schema: &str, table: &str) -> Option<&str> {
        self.sharding_columns
            .get(&format!("{}.{}", schema, table))
            .map(String::as_str)
    }
}
