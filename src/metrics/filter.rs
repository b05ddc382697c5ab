//! Include/exclude filtering of metric names
//!
//! Patterns are regular expressions searched anywhere in the metric name
//! (unanchored). When both lists are given, include is applied first, then
//! exclude. Filtering never mutates its input; it builds a new snapshot with
//! the same nodes and users and only the surviving metrics.

use regex::RegexSet;

use super::stats::{MetricMap, NodeStats, StatsSnapshot};

/// Compiled include/exclude pattern sets
#[derive(Debug, Clone, Default)]
pub struct MetricFilter {
    include: Option<RegexSet>,
    exclude: Option<RegexSet>,
}

impl MetricFilter {
    /// Filter that keeps everything
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep only metrics matching at least one of `patterns`
    ///
    /// An empty pattern list leaves the include side unrestricted.
    pub fn include<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, regex::Error> {
        self.include = compile(patterns)?;
        Ok(self)
    }

    /// Drop metrics matching any of `patterns`
    pub fn exclude<S: AsRef<str>>(mut self, patterns: &[S]) -> Result<Self, regex::Error> {
        self.exclude = compile(patterns)?;
        Ok(self)
    }

    /// Check if this filter keeps every metric
    pub fn is_identity(&self) -> bool {
        self.include.is_none() && self.exclude.is_none()
    }

    /// Check if a metric name survives the filter
    pub fn keeps(&self, name: &str) -> bool {
        let included = self
            .include
            .as_ref()
            .map_or(true, |set| set.is_match(name));
        let excluded = self
            .exclude
            .as_ref()
            .map_or(false, |set| set.is_match(name));
        included && !excluded
    }

    fn filter_metrics(&self, metrics: &MetricMap) -> MetricMap {
        metrics
            .iter()
            .filter(|(name, _)| self.keeps(name))
            .map(|(name, m)| (name.clone(), *m))
            .collect()
    }

    /// Filter one node's metrics, every group alike
    pub fn apply_node(&self, node: &NodeStats) -> NodeStats {
        node.map_groups(|_, metrics| self.filter_metrics(metrics))
    }

    /// Filter a whole snapshot
    pub fn apply(&self, snapshot: &StatsSnapshot) -> StatsSnapshot {
        if self.is_identity() {
            return snapshot.clone();
        }

        snapshot
            .iter()
            .map(|(node_id, node)| (node_id.clone(), self.apply_node(node)))
            .collect()
    }
}

fn compile<S: AsRef<str>>(patterns: &[S]) -> Result<Option<RegexSet>, regex::Error> {
    if patterns.is_empty() {
        return Ok(None);
    }
    RegexSet::new(patterns.iter().map(|p| p.as_ref())).map(Some)
}

/// Filter a snapshot with ad-hoc pattern lists
pub fn filter_stats(
    snapshot: &StatsSnapshot,
    include: Option<&[&str]>,
    exclude: Option<&[&str]>,
) -> Result<StatsSnapshot, regex::Error> {
    let mut filter = MetricFilter::new();
    if let Some(patterns) = include {
        filter = filter.include(patterns)?;
    }
    if let Some(patterns) = exclude {
        filter = filter.exclude(patterns)?;
    }
    Ok(filter.apply(snapshot))
}
