//! # Batch Kernel Configuration
//!
//! Runtime settings for the kernel: shutdown grace period, worker pool bounds and
//! event publishing. Values come from built-in defaults, an optional
//! `batch-kernel.{toml,yaml}` file and `BATCH_KERNEL__*` environment overrides.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use batch_kernel::config::ConfigManager;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let manager = ConfigManager::load()?;
//! let grace = manager.config().shutdown_grace_period();
//! println!("shutdown grace period: {grace:?}");
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod loader;

use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

/// Root kernel configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct KernelConfig {
    /// Environment name (development, test, production)
    pub environment: String,

    /// How long shutdown waits for registered work units to drain
    pub shutdown_grace_period_ms: u64,

    /// How often shutdown re-checks the registry while waiting
    pub shutdown_poll_interval_ms: u64,

    /// Upper bound on concurrently running top-level jobs; 0 means unbounded.
    /// Partitions and split-flows are never bounded by this value.
    pub max_concurrent_jobs: usize,

    /// Capacity of the broadcast channel behind the default event publisher
    pub event_channel_capacity: usize,

    /// Whether the kernel publishes execution/instance events at all
    pub publish_events: bool,

    /// Identity of this server, recorded on every execution it starts
    pub server_id: String,

    /// Base REST URL of this server, recorded on every execution it starts
    pub rest_url: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            shutdown_grace_period_ms: 2000,
            shutdown_poll_interval_ms: 100,
            max_concurrent_jobs: 0,
            event_channel_capacity: 1000,
            publish_events: true,
            server_id: "localhost".to_string(),
            rest_url: String::new(),
        }
    }
}

impl KernelConfig {
    pub fn shutdown_grace_period(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_period_ms)
    }

    pub fn shutdown_poll_interval(&self) -> Duration {
        Duration::from_millis(self.shutdown_poll_interval_ms)
    }

    /// `None` when top-level job dispatch is unbounded
    pub fn job_concurrency_limit(&self) -> Option<usize> {
        (self.max_concurrent_jobs > 0).then_some(self.max_concurrent_jobs)
    }

    /// Validate configuration values
    pub fn validate(&self) -> ConfigResult<()> {
        if self.shutdown_poll_interval_ms == 0 {
            return Err(ConfigurationError::invalid_value(
                "shutdown_poll_interval_ms",
                "0",
                "poll interval must be greater than zero",
            ));
        }

        if self.shutdown_poll_interval_ms > self.shutdown_grace_period_ms
            && self.shutdown_grace_period_ms > 0
        {
            return Err(ConfigurationError::invalid_value(
                "shutdown_poll_interval_ms",
                self.shutdown_poll_interval_ms.to_string(),
                format!(
                    "poll interval must not exceed the grace period ({}ms)",
                    self.shutdown_grace_period_ms
                ),
            ));
        }

        if self.server_id.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "server_id",
                "",
                "server id must not be empty",
            ));
        }

        if self.event_channel_capacity == 0 {
            return Err(ConfigurationError::invalid_value(
                "event_channel_capacity",
                "0",
                "broadcast channel capacity must be greater than zero",
            ));
        }

        Ok(())
    }
}
