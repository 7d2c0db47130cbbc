//! BlockPool - Entry Point
//!
//! Builds a pool from a TOML profile, drives it with a synthetic workload
//! and prints the resulting statistics as JSON, followed by the Prometheus
//! rendering when metrics are enabled.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use blockpool::{BlockPool, Config, Statistics, VERSION};
use blockpool::workload::{self, WorkloadReport};

#[derive(Serialize)]
struct Report<'a> {
    workload: &'a WorkloadReport,
    classes: &'a [Statistics],
}

fn main() -> Result<()> {
    // Parse command line arguments
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("blockpool.toml"));

    // Load configuration
    let config = Config::load(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Initialize tracing/logging
    blockpool::util::init_tracing(&config.logging)?;

    info!(
        version = VERSION,
        config_path = ?config_path,
        classes = config.pool.classes.len(),
        "Starting BlockPool"
    );

    let prometheus = if config.metrics.enabled {
        Some(blockpool::metrics::init_metrics()?)
    } else {
        None
    };

    let pool = BlockPool::new(config.pool.profile(), None, config.pool.log_statistics);

    let report = workload::run(&pool, &config.workload)?;
    let classes = pool.statistics();

    let json = serde_json::to_string_pretty(&Report {
        workload: &report,
        classes: &classes,
    })
    .context("Failed to encode statistics")?;
    println!("{json}");

    if let Some(handle) = prometheus {
        blockpool::metrics::publish(&classes);
        print!("{}", handle.render());
    }

    // Dropping the last handle releases every pooled block
    drop(pool);

    info!("BlockPool stopped");
    Ok(())
}
