//! Metrics pipeline
//!
//! This module provides:
//! - The statistics snapshot data model
//! - Liveness and writability probes
//! - Critical and full snapshot assembly
//! - Include/exclude filtering of metric names
//! - Unit normalization and mapping to backend metrics

pub mod filter;
pub mod mapper;
pub mod probe;
pub mod snapshot;
pub mod stats;

pub use filter::{filter_stats, MetricFilter};
pub use mapper::{
    dimensions_for, normalize, snapshot_to_metrics, to_metric, BackendUnit, Dimension,
    MappedMetric,
};
pub use probe::{check_online, check_writable, ProbeResult};
pub use snapshot::{
    assemble_critical, assemble_full, get_critical_stats, get_full_stats, CHECK_ONLINE_METRIC,
    NODE_WRITABLE_METRIC,
};
pub use stats::{
    finite_only, snapshot_metric_count, Measurement, MetricGroup, MetricMap, MetricType, NodeStats,
    StatsSnapshot, Unit,
};
