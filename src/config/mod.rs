//! Lifecycle manager runtime configuration.

mod config;
mod error;

#[cfg(test)]
mod config_test;

pub use config::Config;
pub use error::ConfigError;
