//! qdb-cloudwatch-exporter library
//!
//! Probes a QuasarDB cluster, collects its statistics and publishes them as
//! batched metrics to a CloudWatch-style backend.

pub mod cluster;
pub mod config;
pub mod exporter;
pub mod metrics;
pub mod publish;
pub mod utils;

pub use exporter::{ExportSummary, Exporter};
