//! Unit normalization and mapping to backend metrics
//!
//! Every (name, measurement) pair of a snapshot becomes at most one
//! `MappedMetric` in the backend's unit vocabulary, tagged with the node
//! (and user) it came from.

use serde::Serialize;
use tracing::debug;

use super::stats::{Measurement, MetricGroup, StatsSnapshot, Unit};
use crate::utils::MappingError;

/// Metric name prefix that is never exported
pub const SUPPRESSED_PREFIX: &str = "cpu.";

/// Unit vocabulary of the metrics backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BackendUnit {
    None,
    Count,
    Bytes,
    Microseconds,
    Milliseconds,
    Seconds,
}

impl From<Unit> for BackendUnit {
    fn from(unit: Unit) -> Self {
        match unit {
            Unit::None | Unit::Epoch => BackendUnit::None,
            Unit::Count => BackendUnit::Count,
            Unit::Bytes => BackendUnit::Bytes,
            Unit::Microseconds => BackendUnit::Microseconds,
            Unit::Milliseconds => BackendUnit::Milliseconds,
            Unit::Seconds => BackendUnit::Seconds,
            _ => BackendUnit::None,
        }
    }
}

/// Name/value pair attached to a metric
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

impl Dimension {
    pub fn new(name: &str, value: impl ToString) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// Metric ready to be submitted to the backend
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MappedMetric {
    #[serde(rename = "MetricName")]
    pub name: String,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Unit")]
    pub unit: BackendUnit,
    #[serde(rename = "Dimensions")]
    pub dimensions: Vec<Dimension>,
}

/// Coerce units the backend has no vocabulary for
pub fn normalize(measurement: &Measurement) -> Measurement {
    match measurement.unit {
        Unit::Nanoseconds => Measurement {
            value: measurement.value / 1000.0,
            unit: Unit::Microseconds,
            ..*measurement
        },
        _ => *measurement,
    }
}

/// Map one measurement
///
/// Returns `Ok(None)` for metrics that are never exported and an error for
/// malformed measurements.
pub fn to_metric(
    name: &str,
    measurement: &Measurement,
) -> Result<Option<MappedMetric>, MappingError> {
    if name.starts_with(SUPPRESSED_PREFIX) {
        // CPU usage is collected by the host metrics already
        return Ok(None);
    }

    let normalized = normalize(measurement);
    if !normalized.value.is_finite() {
        return Err(MappingError::NonFinite {
            name: name.to_string(),
            value: normalized.value,
        });
    }

    Ok(Some(MappedMetric {
        name: name.to_string(),
        value: normalized.value,
        unit: BackendUnit::from(normalized.unit),
        dimensions: Vec::new(),
    }))
}

/// Dimensions identifying where a metric group came from
pub fn dimensions_for(group: MetricGroup<'_>, node_id: &str) -> Vec<Dimension> {
    match group {
        MetricGroup::ByUid(user_id) => vec![
            Dimension::new("UserId", user_id),
            Dimension::new("NodeId", node_id),
        ],
        MetricGroup::Cumulative => vec![Dimension::new("NodeId", node_id)],
    }
}

/// Flatten a snapshot into backend metrics
///
/// For each node, per-user metrics come first, then the node's cumulative
/// metrics. Malformed measurements are dropped one by one.
pub fn snapshot_to_metrics(snapshot: &StatsSnapshot) -> Vec<MappedMetric> {
    let mut metrics = Vec::new();

    for (node_id, node) in snapshot {
        for (group, group_metrics) in node.groups() {
            let dimensions = dimensions_for(group, node_id);

            for (name, measurement) in group_metrics {
                match to_metric(name, measurement) {
                    Ok(Some(mut metric)) => {
                        metric.dimensions = dimensions.clone();
                        metrics.push(metric);
                    }
                    Ok(None) => {}
                    Err(e) => debug!("Dropping metric {} of node {}: {}", name, node_id, e),
                }
            }
        }
    }

    metrics
}
