//! Observability: extraction and cache telemetry behind a sink boundary.
//!
//! Extraction, cache and generation code never touch the counters directly;
//! every event flows through `sink::record`.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport, TypeCounters};
pub use sink::{
    FailureKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, with_metrics_sink,
};
