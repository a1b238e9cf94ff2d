//! Declarative pool configuration.
//!
//! A [`PoolConfig`] can be built in code (builder-style) or parsed from a
//! TOML table such as:
//!
//! ```toml
//! capacity = 8
//! poll_interval_ms = 25
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::PoolError;

/// Settings used to construct a [`crate::Pool`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolConfig {
    /// Maximum number of processes the pool accepts over its lifetime.
    /// `None` means unbounded.
    pub capacity: Option<u64>,
    /// Interval between liveness scans in `join`, in milliseconds.
    pub poll_interval_ms: u64,
}

impl PoolConfig {
    /// Poll interval used when none is configured.
    pub const DEFAULT_POLL_INTERVAL_MS: u64 = 10;

    /// Create an unbounded config with the default poll interval.
    pub fn new() -> Self {
        Self {
            capacity: None,
            poll_interval_ms: Self::DEFAULT_POLL_INTERVAL_MS,
        }
    }

    /// Set the lifetime capacity.
    pub fn capacity(mut self, capacity: u64) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Remove any capacity limit.
    pub fn unbounded(mut self) -> Self {
        self.capacity = None;
        self
    }

    /// Set the poll interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// The poll interval as a [`Duration`].
    pub fn poll_interval_duration(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Parse and validate a config from TOML.
    pub fn from_toml_str(input: &str) -> Result<Self, PoolError> {
        let config: Self =
            toml::from_str(input).map_err(|e| PoolError::Config(e.message().to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the config for values the pool cannot honour.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.poll_interval_ms == 0 {
            return Err(PoolError::Config(
                "poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(capacity) = self.capacity {
            if i64::try_from(capacity).is_err() {
                return Err(PoolError::Config(format!(
                    "capacity {capacity} is larger than {}",
                    i64::MAX
                )));
            }
        }
        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self::new()
    }
}
