//! Observability: runtime counters and the sink they flow through.
//!
//! Workspace and session code never touch the counters directly; they emit
//! a `MetricsEvent` and the active sink decides what to do with it.

pub mod metrics;
pub mod sink;

// re-exports
pub use metrics::{EntityCounters, EntitySummary, EventOps, EventReport, EventState};
pub use sink::{
    MetricsEvent, MetricsSink, metrics_report, metrics_reset_all, record, with_metrics_sink,
};
