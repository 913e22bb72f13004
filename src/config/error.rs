use serde::Deserialize;
use serde::Serialize;

/// Error variants related to configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum ConfigError {
    #[error("retry backoff bounds are reversed: min({min}) > max({max})")]
    BackoffReversed { min: u64, max: u64 },

    #[error("snapshot_max_attempts must be at least 1")]
    NoTransferAttempts,
}
