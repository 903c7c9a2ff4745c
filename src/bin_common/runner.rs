//! Binary runner utilities
//!
//! Provides a standardized way to run binaries with
//! banners, a status interval, and graceful shutdown.

use std::time::Duration;
use tracing::info;

/// Configuration for running a binary application
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name of the binary (for logging)
    pub name: String,
    /// Interval between status lines in seconds
    pub status_interval_secs: u64,
}

impl RunConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            status_interval_secs: 300, // 5 minutes default
        }
    }

    pub fn with_status_interval(mut self, secs: u64) -> Self {
        self.status_interval_secs = secs;
        self
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_secs(self.status_interval_secs.max(1))
    }
}

/// Trait for binary applications
pub trait BinaryRunner {
    /// Run the application main loop
    async fn run(&mut self) -> anyhow::Result<()>;

    /// Get the run configuration
    fn config(&self) -> &RunConfig;

    /// Summary printed in the shutdown banner
    fn stats(&self) -> Option<String> {
        None
    }

    fn print_banner(&self) {
        let config = self.config();
        info!("========================================");
        info!("Starting {}", config.name);
        info!("Press Ctrl+C or send EOF to stop");
        info!("========================================");
    }

    fn print_shutdown(&self, stats: Option<&str>) {
        let config = self.config();
        info!("========================================");
        info!("{} stopped gracefully", config.name);
        if let Some(stats) = stats {
            info!("{}", stats);
        }
        info!("========================================");
    }

    /// Execute the binary with banners around the main loop
    async fn execute(&mut self) -> anyhow::Result<()> {
        self.print_banner();
        let result = self.run().await;
        let stats = self.stats();
        self.print_shutdown(stats.as_deref());
        result
    }
}
