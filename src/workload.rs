//! Synthetic packet-buffer workload
//!
//! Each worker cycles through the configured request sizes, keeps up to
//! `hold` buffers outstanding, stamps every payload, and releases the
//! oldest buffer once the window is full.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{anyhow, Result};
use serde::Serialize;
use tracing::{debug, info};

use crate::config::WorkloadConfig;
use crate::pool::BlockPool;

/// Outcome of one workload run
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkloadReport {
    pub workers: usize,
    /// Requests served by the pool
    pub served: u64,
    /// Requests the pool returned nothing for
    pub unserved: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

fn serialize_millis<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u128(d.as_millis())
}

/// Drive `pool` from `config.effective_workers()` threads
pub fn run(pool: &Arc<BlockPool>, config: &WorkloadConfig) -> Result<WorkloadReport> {
    let workers = config.effective_workers();
    let started = Instant::now();

    info!(
        workers,
        iterations = config.iterations,
        sizes = ?config.sizes,
        hold = config.hold,
        "Starting workload"
    );

    let totals = crossbeam::thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|worker| {
                let pool = Arc::clone(pool);
                scope.spawn(move |_| run_worker(worker, &pool, config))
            })
            .collect();

        handles
            .into_iter()
            .map(|handle| handle.join())
            .collect::<Vec<_>>()
    })
    .map_err(|_| anyhow!("workload scope panicked"))?;

    let mut report = WorkloadReport {
        workers,
        ..WorkloadReport::default()
    };
    for totals in totals {
        let (served, unserved) = totals.map_err(|_| anyhow!("workload worker panicked"))?;
        report.served += served;
        report.unserved += unserved;
    }
    report.elapsed = started.elapsed();

    info!(
        served = report.served,
        unserved = report.unserved,
        elapsed_ms = report.elapsed.as_millis() as u64,
        "Workload finished"
    );
    Ok(report)
}

fn run_worker(worker: usize, pool: &Arc<BlockPool>, config: &WorkloadConfig) -> (u64, u64) {
    let mut window = VecDeque::with_capacity(config.hold.max(1));
    let mut served = 0;
    let mut unserved = 0;

    if config.sizes.is_empty() {
        return (0, 0);
    }

    for i in 0..config.iterations {
        let size = config.sizes[(worker + i) % config.sizes.len()];

        match pool.acquire(size) {
            Some(mut buf) => {
                buf.fill(worker as u8);
                served += 1;
                window.push_back(buf);
                if window.len() > config.hold {
                    window.pop_front();
                }
            }
            None => {
                unserved += 1;
                // Make room and carry on
                window.pop_front();
            }
        }
    }

    debug!(worker, served, unserved, "Worker finished");
    (served, unserved)
}
