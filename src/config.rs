//! Configuration management
//!
//! Handles loading and validating pool configuration from TOML files.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::pool::{Descriptor, Profile};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub pool: PoolConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub workload: WorkloadConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Memory pool configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Emit a per-class summary when the pool is dropped
    #[serde(default = "default_true")]
    pub log_statistics: bool,
    /// Size classes, in any order
    #[serde(rename = "class")]
    pub classes: Vec<Descriptor>,
}

impl PoolConfig {
    /// Descriptor table for [`BlockPool::new`](crate::pool::BlockPool::new)
    pub fn profile(&self) -> Profile {
        self.classes.clone()
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format: "json" or "pretty"
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Synthetic workload configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkloadConfig {
    /// Number of worker threads (0 = auto)
    #[serde(default)]
    pub workers: usize,
    /// Allocations per worker
    #[serde(default = "default_iterations")]
    pub iterations: usize,
    /// Request sizes, cycled through by each worker
    #[serde(default = "default_sizes")]
    pub sizes: Vec<usize>,
    /// Blocks each worker keeps outstanding before releasing the oldest
    #[serde(default = "default_hold")]
    pub hold: usize,
}

impl WorkloadConfig {
    /// Get effective worker count (auto-detect if 0)
    pub fn effective_workers(&self) -> usize {
        if self.workers == 0 {
            num_cpus::get()
        } else {
            self.workers
        }
    }
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            iterations: default_iterations(),
            sizes: default_sizes(),
            hold: default_hold(),
        }
    }
}

/// Metrics configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsConfig {
    /// Publish pool statistics through the metrics facade
    #[serde(default)]
    pub enabled: bool,
}

// Default value functions
fn default_true() -> bool { true }
fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "pretty".to_string() }
fn default_iterations() -> usize { 10_000 }
fn default_sizes() -> Vec<usize> { vec![64, 256, 1500] }
fn default_hold() -> usize { 8 }

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        Self::parse(&contents)
    }

    /// Parse and validate configuration text
    pub fn parse(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)
            .with_context(|| "Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    fn validate(&self) -> Result<()> {
        if self.pool.classes.is_empty() {
            anyhow::bail!("pool must define at least one class");
        }
        if let Some(class) = self.pool.classes.iter().find(|c| c.size == 0) {
            anyhow::bail!("class size must be > 0 (minimum {})", class.minimum);
        }
        if self.workload.sizes.iter().any(|size| *size == 0) {
            anyhow::bail!("workload sizes must be > 0");
        }
        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            anyhow::bail!("logging.format must be \"json\" or \"pretty\"");
        }
        Ok(())
    }
}
