//! Export run
//!
//! One run publishes the critical snapshot first, then the full one. Each
//! stage opens its own connection, filters, optionally narrows to a single
//! node, maps and publishes.

use tracing::{info, warn};

use crate::cluster::ClusterConnector;
use crate::config::{BackendKind, ExporterConfig};
use crate::metrics::{get_critical_stats, get_full_stats, snapshot_to_metrics, StatsSnapshot};
use crate::publish::{publish, JsonLinesBackend, LogBackend, MetricsBackend};
use crate::utils::Result;

/// Metrics published by one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub critical_metrics: usize,
    pub full_metrics: usize,
}

impl ExportSummary {
    pub fn total(&self) -> usize {
        self.critical_metrics + self.full_metrics
    }
}

/// Create the backend selected by configuration
pub fn create_backend(kind: &BackendKind) -> Box<dyn MetricsBackend> {
    match kind {
        BackendKind::Log => Box::new(LogBackend),
        BackendKind::JsonLines(path) => Box::new(JsonLinesBackend::new(path)),
    }
}

/// Keep only `node_id`'s entry when a node id is configured
pub fn select_node(mut snapshot: StatsSnapshot, node_id: Option<&str>) -> StatsSnapshot {
    let Some(node_id) = node_id else {
        return snapshot;
    };

    match snapshot.remove_entry(node_id) {
        Some(entry) => StatsSnapshot::from([entry]),
        None => {
            warn!(
                "Node {} not found among {} nodes, nothing to export",
                node_id,
                snapshot.len()
            );
            StatsSnapshot::new()
        }
    }
}

/// Runs export stages against one cluster and one backend
pub struct Exporter<'a> {
    connector: &'a dyn ClusterConnector,
    backend: &'a dyn MetricsBackend,
    config: ExporterConfig,
}

impl<'a> Exporter<'a> {
    pub fn new(
        connector: &'a dyn ClusterConnector,
        backend: &'a dyn MetricsBackend,
        config: ExporterConfig,
    ) -> Self {
        Self {
            connector,
            backend,
            config,
        }
    }

    /// Export the critical snapshot, then the full snapshot
    pub fn run(&self) -> Result<ExportSummary> {
        let critical = get_critical_stats(self.connector, &self.config.cluster)?;
        let critical_metrics = self.export_stage("critical", &critical)?;

        let full = get_full_stats(self.connector, &self.config.cluster)?;
        let full_metrics = self.export_stage("full", &full)?;

        Ok(ExportSummary {
            critical_metrics,
            full_metrics,
        })
    }

    fn export_stage(&self, stage: &str, snapshot: &StatsSnapshot) -> Result<usize> {
        let filtered = self.config.filter.apply(snapshot);
        let selected = select_node(filtered, self.config.node_id.as_deref());
        let metrics = snapshot_to_metrics(&selected);

        let pushed = publish(&metrics, &self.config.namespace, self.backend)?;
        info!(
            "Exported {} {} metrics of {} nodes to {}",
            pushed,
            stage,
            selected.len(),
            self.config.namespace
        );
        Ok(pushed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{MemoryCluster, MemoryConnector, NodeMode, UriConnector};
    use crate::config::ClusterConfig;
    use crate::metrics::{
        Measurement, MetricFilter, MetricMap, MetricType, NodeStats, Unit, CHECK_ONLINE_METRIC,
        NODE_WRITABLE_METRIC,
    };
    use crate::publish::InMemoryBackend;
    use crate::utils::ExporterError;
    use std::io::Write;

    fn node_stats() -> NodeStats {
        let mut node = NodeStats::with_cumulative(MetricMap::from([
            ("cpu.user".to_string(), Measurement::new(3.0, MetricType::Accumulator, Unit::None)),
            (
                "memory.resident_bytes".to_string(),
                Measurement::new(4096.0, MetricType::Gauge, Unit::Bytes),
            ),
            (
                "requests.total_ns".to_string(),
                Measurement::new(9000.0, MetricType::Accumulator, Unit::Nanoseconds),
            ),
        ]));
        node.by_uid.insert(
            "3".to_string(),
            MetricMap::from([(
                "requests.total_count".to_string(),
                Measurement::new(12.0, MetricType::Accumulator, Unit::Count),
            )]),
        );
        node
    }

    fn cluster() -> MemoryCluster {
        MemoryCluster::new()
            .with_node("a:1")
            .with_node_mode("b:1", NodeMode::Offline)
            .with_stats("a:1", node_stats())
            .with_stats("b:1", node_stats())
    }

    fn config() -> ExporterConfig {
        ExporterConfig {
            cluster: ClusterConfig::new("mem://"),
            namespace: "QuasarDB".to_string(),
            filter: MetricFilter::new(),
            node_id: None,
            backend: BackendKind::Log,
        }
    }

    #[test]
    fn test_run_publishes_critical_then_full() {
        let cluster = cluster();
        let connector = MemoryConnector::new(cluster.clone());
        let backend = InMemoryBackend::new();

        let summary = Exporter::new(&connector, &backend, config()).run().unwrap();

        // 2 probe metrics per node; 3 exported metrics per node (cpu dropped)
        assert_eq!(summary.critical_metrics, 4);
        assert_eq!(summary.full_metrics, 6);
        assert_eq!(summary.total(), 10);

        let metrics = backend.metrics();
        assert_eq!(metrics[0].name, CHECK_ONLINE_METRIC);
        assert_eq!(metrics[0].value, 1.0);
        assert_eq!(metrics[2].name, CHECK_ONLINE_METRIC);
        assert_eq!(metrics[2].value, 0.0);
        assert!(metrics.iter().all(|m| !m.name.starts_with("cpu.")));
        // One connection per stage, both closed
        assert_eq!(cluster.close_count(), 2);
    }

    #[test]
    fn test_node_selection() {
        let connector = MemoryConnector::new(cluster());
        let backend = InMemoryBackend::new();
        let config = ExporterConfig {
            node_id: Some("b:1".to_string()),
            ..config()
        };

        let summary = Exporter::new(&connector, &backend, config).run().unwrap();

        assert_eq!(summary.critical_metrics, 2);
        assert_eq!(summary.full_metrics, 3);
        for metric in backend.metrics() {
            let node = metric.dimensions.iter().find(|d| d.name == "NodeId").unwrap();
            assert_eq!(node.value, "b:1");
        }
    }

    #[test]
    fn test_unknown_node_publishes_nothing() {
        let connector = MemoryConnector::new(cluster());
        let backend = InMemoryBackend::new();
        let config = ExporterConfig {
            node_id: Some("c:1".to_string()),
            ..config()
        };

        let summary = Exporter::new(&connector, &backend, config).run().unwrap();

        assert_eq!(summary, ExportSummary::default());
        assert!(backend.batches().is_empty());
    }

    #[test]
    fn test_filter_applies_to_both_stages() {
        let connector = MemoryConnector::new(cluster());
        let backend = InMemoryBackend::new();
        let config = ExporterConfig {
            filter: MetricFilter::new().include(&["^memory\\.", "^check\\."]).unwrap(),
            ..config()
        };

        let summary = Exporter::new(&connector, &backend, config).run().unwrap();

        assert_eq!(summary.critical_metrics, 2);
        assert_eq!(summary.full_metrics, 2);
    }

    #[test]
    fn test_publish_failure_propagates() {
        let connector = MemoryConnector::new(cluster());
        let backend = InMemoryBackend::failing_after(0);

        let result = Exporter::new(&connector, &backend, config()).run();

        assert!(matches!(result, Err(ExporterError::Publish(_))));
    }

    #[test]
    fn test_connection_failure_propagates() {
        let cluster = cluster().with_stats_error("timeout");
        let connector = MemoryConnector::new(cluster);
        let backend = InMemoryBackend::new();

        let result = Exporter::new(&connector, &backend, config()).run();

        assert!(matches!(result, Err(ExporterError::Cluster(_))));
        // Critical stage was published before the full fetch failed
        assert_eq!(backend.metrics().len(), 4);
    }

    #[test]
    fn test_statistics_dump_reports_nodes_unhealthy() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"10.0.0.9:2836": {{"cumulative": {{"memory.resident_bytes": 10}}}}}}"#
        )
        .unwrap();
        let connector = UriConnector::new();
        let backend = InMemoryBackend::new();
        let config = ExporterConfig {
            cluster: ClusterConfig::new(&format!("file://{}", file.path().display())),
            ..config()
        };

        let summary = Exporter::new(&connector, &backend, config).run().unwrap();

        assert_eq!(summary.critical_metrics, 2);
        assert_eq!(summary.full_metrics, 1);
        let metrics = backend.metrics();
        assert_eq!(metrics[0].name, CHECK_ONLINE_METRIC);
        assert_eq!(metrics[0].value, 0.0);
        assert_eq!(metrics[1].name, NODE_WRITABLE_METRIC);
        assert_eq!(metrics[1].value, 0.0);
        assert_eq!(metrics[2].name, "memory.resident_bytes");
        assert_eq!(metrics[2].value, 10.0);
    }

    #[test]
    fn test_select_node_without_id_is_identity() {
        let snapshot = StatsSnapshot::from([("a:1".to_string(), node_stats())]);
        assert_eq!(select_node(snapshot.clone(), None), snapshot);
    }

    #[test]
    fn test_create_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.jsonl");
        let backend = create_backend(&BackendKind::JsonLines(path.clone()));
        let metrics = snapshot_to_metrics(&StatsSnapshot::from([("a:1".to_string(), node_stats())]));

        publish(&metrics, "QuasarDB", backend.as_ref()).unwrap();

        assert_eq!(std::fs::read_to_string(path).unwrap().lines().count(), 3);
    }
}
