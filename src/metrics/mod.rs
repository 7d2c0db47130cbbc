//! Metrics and observability
//!
//! Pool statistics published through the `metrics` facade and rendered by
//! the Prometheus exporter. Without an installed recorder every call is a
//! no-op.

mod exporter;

pub use exporter::{describe, init_metrics, publish};
