use std::time::Duration;

use clap::Parser;
use rand::thread_rng;
use rand::Rng;
use serde::Deserialize;
use serde::Serialize;

use crate::config::ConfigError;

/// The runtime configuration of the lifecycle workers.
///
/// When the `Config` is initialized from the command line, any listed
/// argument may be provided as `--snapshot-max-attempts=16` etc.
#[derive(Clone, Debug, PartialEq, Eq, Parser, Serialize, Deserialize)]
#[clap(about = "Replicated-state lifecycle manager configuration")]
pub struct Config {
    /// Max snapshot transfer attempts within one generation before a
    /// follower reports itself degraded.
    #[clap(long, default_value = "8")]
    pub snapshot_max_attempts: u64,

    /// Lower bound of the randomized retry backoff, in milliseconds.
    ///
    /// Failed lifecycle steps (log ingest, recovery, snapshot transfer,
    /// entry application) are retried after a backoff drawn uniformly from
    /// `[retry_backoff_min, retry_backoff_max]`.
    #[clap(long, default_value = "50")]
    pub retry_backoff_min: u64,

    /// Upper bound of the randomized retry backoff, in milliseconds.
    #[clap(long, default_value = "1000")]
    pub retry_backoff_max: u64,
}

impl Default for Config {
    fn default() -> Self {
        <Self as Parser>::parse_from(Vec::<&'static str>::new())
    }
}

impl Config {
    /// Generate a new random backoff within the configured bounds.
    pub fn new_rand_backoff(&self) -> Duration {
        let mut rng = thread_rng();
        let millis = rng.gen_range(self.retry_backoff_min..=self.retry_backoff_max);
        Duration::from_millis(millis)
    }

    /// Build a `Config` instance from a series of command-line arguments.
    ///
    /// The first element in `args` must be the application name.
    pub fn build(args: &[&str]) -> Result<Config, ConfigError> {
        let config = <Self as Parser>::parse_from(args);
        config.validate()
    }

    /// Validate the state of this config.
    pub fn validate(self) -> Result<Config, ConfigError> {
        if self.retry_backoff_min > self.retry_backoff_max {
            return Err(ConfigError::BackoffReversed {
                min: self.retry_backoff_min,
                max: self.retry_backoff_max,
            });
        }

        if self.snapshot_max_attempts == 0 {
            return Err(ConfigError::NoTransferAttempts);
        }

        Ok(self)
    }
}
