//! Prometheus metrics exporter
//!
//! Renders pool statistics in the Prometheus text format. No HTTP listener
//! is started; the binary prints the rendered snapshot.

use ::metrics::{counter, describe_counter, describe_gauge, gauge};
use anyhow::Result;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::sync::Once;

use crate::pool::Statistics;

static DESCRIBE: Once = Once::new();

/// Install the Prometheus recorder as the global recorder
pub fn init_metrics() -> Result<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    describe();
    Ok(handle)
}

/// Register metric descriptions (idempotent)
pub fn describe() {
    DESCRIBE.call_once(|| {
        describe_counter!("blockpool_allocations_total", "Blocks handed to callers");
        describe_counter!("blockpool_deallocations_total", "Blocks returned by callers");
        describe_counter!("blockpool_corruptions_total", "Returned blocks that failed marker validation");
        describe_counter!("blockpool_unfulfilled_total", "Allocation attempts a class could not serve");
        describe_gauge!("blockpool_outstanding", "Blocks currently held by callers");
        describe_gauge!("blockpool_max_outstanding", "High-water mark of outstanding blocks");
    });
}

/// Publish one snapshot, labelled by class size
pub fn publish(snapshot: &[Statistics]) {
    for stats in snapshot {
        let size = stats.size.to_string();

        counter!("blockpool_allocations_total", "size" => size.clone()).absolute(stats.allocations);
        counter!("blockpool_deallocations_total", "size" => size.clone()).absolute(stats.deallocations);
        counter!("blockpool_corruptions_total", "size" => size.clone()).absolute(stats.corruption_count);
        counter!("blockpool_unfulfilled_total", "size" => size.clone()).absolute(stats.unfulfilled);
        gauge!("blockpool_outstanding", "size" => size.clone()).set(stats.outstanding as f64);
        gauge!("blockpool_max_outstanding", "size" => size).set(stats.max_outstanding as f64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_publish_reaches_recorder() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        let stats = Statistics {
            size: 64,
            allocations: 3,
            deallocations: 2,
            corruption_count: 1,
            outstanding: 1,
            max_outstanding: 2,
            unfulfilled: 4,
        };
        ::metrics::with_local_recorder(&recorder, || publish(&[stats, Statistics::new(256)]));

        let rendered = handle.render();
        assert!(rendered.contains("blockpool_allocations_total{size=\"64\"} 3"));
        assert!(rendered.contains("blockpool_deallocations_total{size=\"64\"} 2"));
        assert!(rendered.contains("blockpool_corruptions_total{size=\"64\"} 1"));
        assert!(rendered.contains("blockpool_unfulfilled_total{size=\"64\"} 4"));
        assert!(rendered.contains("blockpool_outstanding{size=\"64\"} 1"));
        assert!(rendered.contains("blockpool_max_outstanding{size=\"64\"} 2"));
        assert!(rendered.contains("blockpool_allocations_total{size=\"256\"} 0"));
    }

    #[test]
    fn test_publish_without_recorder() {
        // No recorder installed: every update is a no-op
        publish(&[Statistics::new(64)]);
        publish(&[]);
    }
}
