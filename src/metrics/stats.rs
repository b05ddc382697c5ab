//! Statistics snapshot data model
//!
//! A snapshot maps each node identifier to its `NodeStats`: one cumulative
//! metric map plus one metric map per user id. Every metric value is a
//! `Measurement` carrying the unit the cluster reported it in.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::debug;

/// Metric name -> measurement
pub type MetricMap = BTreeMap<String, Measurement>;

/// Node identifier -> node statistics
pub type StatsSnapshot = BTreeMap<String, NodeStats>;

/// Kind of statistic reported by the cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricType {
    #[default]
    Gauge,
    Accumulator,
    Label,
}

/// Unit a measurement was reported in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Unit {
    #[default]
    None,
    Count,
    Bytes,
    Epoch,
    Nanoseconds,
    Microseconds,
    Milliseconds,
    Seconds,
    /// Any unit name this exporter does not know about
    Unknown,
}

impl Unit {
    pub fn as_str(&self) -> &'static str {
        match self {
            Unit::None => "NONE",
            Unit::Count => "COUNT",
            Unit::Bytes => "BYTES",
            Unit::Epoch => "EPOCH",
            Unit::Nanoseconds => "NANOSECONDS",
            Unit::Microseconds => "MICROSECONDS",
            Unit::Milliseconds => "MILLISECONDS",
            Unit::Seconds => "SECONDS",
            Unit::Unknown => "UNKNOWN",
        }
    }

    /// Parse a unit name, case-insensitively
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "NONE" => Unit::None,
            "COUNT" => Unit::Count,
            "BYTES" => Unit::Bytes,
            "EPOCH" => Unit::Epoch,
            "NANOSECONDS" => Unit::Nanoseconds,
            "MICROSECONDS" => Unit::Microseconds,
            "MILLISECONDS" => Unit::Milliseconds,
            "SECONDS" => Unit::Seconds,
            _ => Unit::Unknown,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Unit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Unit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        Ok(Unit::from_name(&name))
    }
}

/// A single statistic value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub value: f64,
    #[serde(rename = "type", default)]
    pub metric_type: MetricType,
    #[serde(default)]
    pub unit: Unit,
}

impl Measurement {
    pub fn new(value: f64, metric_type: MetricType, unit: Unit) -> Self {
        Self {
            value,
            metric_type,
            unit,
        }
    }

    /// Unitless gauge, as produced by the probes
    pub fn gauge(value: f64) -> Self {
        Self::new(value, MetricType::Gauge, Unit::None)
    }

    /// Build a measurement from a bare number, inferring the unit from the
    /// metric name the way flat statistics dumps encode it.
    ///
    /// Returns `None` for names without a `.`-separated suffix.
    pub fn infer(name: &str, value: f64) -> Option<Self> {
        if name == "license.memory" {
            return Some(Self::new(value, MetricType::Gauge, Unit::Bytes));
        }

        let (_, suffix) = name.rsplit_once('.')?;
        let (value, unit) = match suffix {
            "total_ns" => (value, Unit::Nanoseconds),
            "duration_us" | "time_us" => (value, Unit::Microseconds),
            "remaining_days" => (value * 86_400.0, Unit::Seconds),
            s if s.starts_with("bytes") || s.ends_with("bytes") => (value, Unit::Bytes),
            s if s.ends_with("count") => (value, Unit::Count),
            _ => (value, Unit::None),
        };

        Some(Self::new(value, MetricType::Gauge, unit))
    }
}

/// Grouping of metrics inside one node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricGroup<'a> {
    /// Node-wide totals
    Cumulative,
    /// Metrics attributed to one user id
    ByUid(&'a str),
}

/// Statistics of a single node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeStats {
    #[serde(default, deserialize_with = "deserialize_metric_map")]
    pub cumulative: MetricMap,
    #[serde(default, deserialize_with = "deserialize_uid_maps")]
    pub by_uid: BTreeMap<String, MetricMap>,
}

impl NodeStats {
    /// Create node statistics with only cumulative metrics
    pub fn with_cumulative(cumulative: MetricMap) -> Self {
        Self {
            cumulative,
            by_uid: BTreeMap::new(),
        }
    }

    /// Iterate over every metric group, per-user groups first
    pub fn groups(&self) -> impl Iterator<Item = (MetricGroup<'_>, &MetricMap)> {
        self.by_uid
            .iter()
            .map(|(uid, metrics)| (MetricGroup::ByUid(uid.as_str()), metrics))
            .chain(std::iter::once((MetricGroup::Cumulative, &self.cumulative)))
    }

    /// Build new node statistics by transforming every group
    pub fn map_groups<F>(&self, mut f: F) -> NodeStats
    where
        F: FnMut(MetricGroup<'_>, &MetricMap) -> MetricMap,
    {
        NodeStats {
            cumulative: f(MetricGroup::Cumulative, &self.cumulative),
            by_uid: self
                .by_uid
                .iter()
                .map(|(uid, metrics)| (uid.clone(), f(MetricGroup::ByUid(uid), metrics)))
                .collect(),
        }
    }

    /// Total number of metrics across all groups
    pub fn metric_count(&self) -> usize {
        self.groups().map(|(_, metrics)| metrics.len()).sum()
    }

    /// Iterate over every metric name across all groups
    pub fn metric_names(&self) -> impl Iterator<Item = &str> {
        self.groups()
            .flat_map(|(_, metrics)| metrics.keys().map(String::as_str))
    }
}

/// Total number of metrics in a snapshot
pub fn snapshot_metric_count(snapshot: &StatsSnapshot) -> usize {
    snapshot.values().map(NodeStats::metric_count).sum()
}

/// Copy of a snapshot without NaN or infinite measurements
///
/// JSON has no encoding for those values, so this is what gets dumped.
pub fn finite_only(snapshot: &StatsSnapshot) -> StatsSnapshot {
    snapshot
        .iter()
        .map(|(node_id, node)| {
            let node = node.map_groups(|_, metrics| {
                metrics
                    .iter()
                    .filter(|(_, m)| m.value.is_finite())
                    .map(|(name, m)| (name.clone(), *m))
                    .collect()
            });
            (node_id.clone(), node)
        })
        .collect()
}

/// Either a full measurement record or a bare number from a flat dump
#[derive(Deserialize)]
#[serde(untagged)]
enum RawMeasurement {
    Full(Measurement),
    Bare(f64),
}

fn into_metric_map(raw: BTreeMap<String, RawMeasurement>) -> MetricMap {
    raw.into_iter()
        .filter_map(|(name, m)| {
            let measurement = match m {
                RawMeasurement::Full(m) => m,
                RawMeasurement::Bare(v) => match Measurement::infer(&name, v) {
                    Some(m) => m,
                    None => {
                        debug!("Dropping metric {}: no unit suffix", name);
                        return None;
                    }
                },
            };
            Some((name, measurement))
        })
        .collect()
}

fn deserialize_metric_map<'de, D>(deserializer: D) -> Result<MetricMap, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RawMeasurement>::deserialize(deserializer)?;
    Ok(into_metric_map(raw))
}

fn deserialize_uid_maps<'de, D>(deserializer: D) -> Result<BTreeMap<String, MetricMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, BTreeMap<String, RawMeasurement>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(uid, metrics)| (uid, into_metric_map(metrics)))
        .collect())
}
