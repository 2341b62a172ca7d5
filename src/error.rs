//! Error taxonomy for the simulation pipeline.
//!
//! Configuration problems fail fast before any scenario executes; data
//! problems abort only the calling operation; insufficient empirical data is
//! recoverable (caller falls back to defaults); per-replication failures are
//! isolated and only escalate to `Fatal` past the configured threshold.

use thiserror::Error;

/// All failure modes of the simulator.
#[derive(Debug, Clone, Error)]
pub enum SimError {
    /// Invalid configuration value, detected eagerly at validation time.
    #[error("configuration error: {field} — {message}")]
    Configuration { field: String, message: String },

    /// Malformed or missing fields in empirical input records.
    #[error("data format error: {0}")]
    DataFormat(String),

    /// Too few valid empirical readings for reliable calibration.
    /// Recoverable: callers are expected to fall back to defaults.
    #[error("insufficient data: {got} valid readings, {needed} required")]
    InsufficientData { needed: usize, got: usize },

    /// Numerical failure inside one Monte Carlo replication. The replication
    /// is excluded from aggregation; siblings are unaffected.
    #[error("replication {replication} failed: {message}")]
    ScenarioExecution { replication: usize, message: String },

    /// Unrecoverable condition aborting the whole run.
    #[error("fatal: {0}")]
    Fatal(String),
}

impl SimError {
    /// Shorthand for a field-scoped configuration error.
    pub fn config(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }
}
