//! Statistics snapshot assembly
//!
//! Two snapshots are produced per run:
//! - the critical snapshot, built from the liveness and writability probes
//! - the full snapshot, the cluster's own statistics returned verbatim
//!
//! The critical one is cheap and alarm-relevant, so it is fetched and
//! published before the full one.

use tracing::info;

use super::probe::{check_online, check_writable, ProbeResult};
use super::stats::{Measurement, MetricMap, NodeStats, StatsSnapshot};
use crate::cluster::{open_cluster, Cluster, ClusterConnector, Endpoint};
use crate::config::ClusterConfig;
use crate::utils::Result;

/// Metric name of the liveness probe result
pub const CHECK_ONLINE_METRIC: &str = "check.online";

/// Metric name of the writability probe result
pub const NODE_WRITABLE_METRIC: &str = "node.writable";

/// Build the critical snapshot from probe results
///
/// Every endpoint gets exactly `check.online` and `node.writable`; an
/// endpoint missing from a probe result reports 0.
pub fn assemble_critical(
    online: &ProbeResult,
    writable: &ProbeResult,
    endpoints: &[Endpoint],
) -> StatsSnapshot {
    endpoints
        .iter()
        .map(|endpoint| {
            let cumulative = MetricMap::from([
                (
                    CHECK_ONLINE_METRIC.to_string(),
                    Measurement::gauge(f64::from(online.get(endpoint))),
                ),
                (
                    NODE_WRITABLE_METRIC.to_string(),
                    Measurement::gauge(f64::from(writable.get(endpoint))),
                ),
            ]);
            (endpoint.to_string(), NodeStats::with_cumulative(cumulative))
        })
        .collect()
}

/// Full statistics of every node, as reported by the cluster
pub fn assemble_full(cluster: &dyn Cluster) -> Result<StatsSnapshot> {
    Ok(cluster.fetch_all_stats()?)
}

/// Connect, run both probes and build the critical snapshot
pub fn get_critical_stats(
    connector: &dyn ClusterConnector,
    config: &ClusterConfig,
) -> Result<StatsSnapshot> {
    let session = open_cluster(connector, config)?;
    let endpoints = session.endpoints()?;

    let online = check_online(&*session, &endpoints);
    let writable = check_writable(&*session, &endpoints);

    let passed = endpoints
        .iter()
        .filter(|e| online.passed(e) && writable.passed(e))
        .count();
    info!(
        "Probed {} nodes of {}: {} online and writable",
        endpoints.len(),
        session.uri(),
        passed
    );

    Ok(assemble_critical(&online, &writable, &endpoints))
}

/// Connect and fetch the full statistics snapshot
pub fn get_full_stats(
    connector: &dyn ClusterConnector,
    config: &ClusterConfig,
) -> Result<StatsSnapshot> {
    let session = open_cluster(connector, config)?;
    let snapshot = assemble_full(&*session)?;
    info!(
        "Fetched statistics of {} nodes from {}",
        snapshot.len(),
        session.uri()
    );
    Ok(snapshot)
}
