//! In-memory cluster
//!
//! Holds a statistics snapshot and a per-node integer store. Nodes can be put
//! in a failure mode (see `NodeMode`) to reproduce failing clusters.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::Mutex;

use super::connection::{Cluster, ClusterConnector, NodeHandle};
use super::endpoint::Endpoint;
use crate::config::Credentials;
use crate::metrics::{NodeStats, StatsSnapshot};
use crate::utils::{ClusterError, ConnectionError};

/// Integer that every live node exposes
pub const STARTUP_EPOCH_ALIAS: &str = "$qdb.statistics.startup_epoch";

/// Failure mode of an in-memory node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NodeMode {
    #[default]
    Healthy,
    /// Every operation fails with a transport error
    Offline,
    /// Reads succeed, writes and deletes are denied
    ReadOnly,
    /// Writes store a different value than requested
    Corrupting,
    /// Writes are stored, then reported as failed
    FailAfterWrite,
}

#[derive(Debug, Default)]
struct MemoryNode {
    mode: NodeMode,
    integers: HashMap<String, i64>,
}

#[derive(Debug, Default)]
struct ClusterState {
    nodes: BTreeMap<Endpoint, MemoryNode>,
    stats: StatsSnapshot,
    stats_error: Option<String>,
}

/// Shared in-memory cluster; clones see the same state
#[derive(Debug, Clone, Default)]
pub struct MemoryCluster {
    state: Arc<Mutex<ClusterState>>,
    closed: Arc<AtomicUsize>,
}

impl MemoryCluster {
    /// Create an empty cluster
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cluster whose nodes are the snapshot's node identifiers
    ///
    /// A recorded snapshot says nothing about the nodes' current health:
    /// they hold no startup epoch and refuse writes, so both probes report
    /// them as failed.
    pub fn from_snapshot(snapshot: StatsSnapshot) -> Self {
        let cluster = Self::new();
        {
            let mut state = cluster.state.lock();
            for node_id in snapshot.keys() {
                let node = MemoryNode {
                    mode: NodeMode::ReadOnly,
                    integers: HashMap::new(),
                };
                state.nodes.insert(Endpoint::new(node_id.as_str()), node);
            }
            state.stats = snapshot;
        }
        cluster
    }

    /// Add a healthy node
    pub fn with_node(self, endpoint: &str) -> Self {
        self.add_node(endpoint);
        self
    }

    /// Add a node in the given mode
    pub fn with_node_mode(self, endpoint: &str, mode: NodeMode) -> Self {
        self.add_node(endpoint);
        self.set_mode(endpoint, mode);
        self
    }

    /// Set the statistics reported for a node
    pub fn with_stats(self, endpoint: &str, stats: NodeStats) -> Self {
        self.state.lock().stats.insert(endpoint.to_string(), stats);
        self
    }

    /// Make the bulk statistics fetch fail
    pub fn with_stats_error(self, message: &str) -> Self {
        self.state.lock().stats_error = Some(message.to_string());
        self
    }

    pub fn add_node(&self, endpoint: &str) {
        let mut node = MemoryNode::default();
        node.integers
            .insert(STARTUP_EPOCH_ALIAS.to_string(), now_epoch());
        self.state.lock().nodes.insert(Endpoint::new(endpoint), node);
    }

    pub fn set_mode(&self, endpoint: &str, mode: NodeMode) {
        if let Some(node) = self.state.lock().nodes.get_mut(&Endpoint::new(endpoint)) {
            node.mode = mode;
        }
    }

    /// Inspect an integer entry, bypassing node failure modes
    pub fn integer(&self, endpoint: &str, alias: &str) -> Option<i64> {
        self.state
            .lock()
            .nodes
            .get(&Endpoint::new(endpoint))
            .and_then(|n| n.integers.get(alias).copied())
    }

    /// Number of integer entries stored on a node
    pub fn integer_count(&self, endpoint: &str) -> usize {
        self.state
            .lock()
            .nodes
            .get(&Endpoint::new(endpoint))
            .map(|n| n.integers.len())
            .unwrap_or(0)
    }

    /// How many times a connection to this cluster was closed
    pub fn close_count(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

impl Cluster for MemoryCluster {
    fn endpoints(&self) -> Result<Vec<Endpoint>, ClusterError> {
        Ok(self.state.lock().nodes.keys().cloned().collect())
    }

    fn node(&self, endpoint: &Endpoint) -> Result<Box<dyn NodeHandle + '_>, ClusterError> {
        if !self.state.lock().nodes.contains_key(endpoint) {
            return Err(ClusterError::Transport {
                endpoint: endpoint.to_string(),
                message: "unknown node".to_string(),
            });
        }
        Ok(Box::new(MemoryNodeHandle {
            cluster: self,
            endpoint: endpoint.clone(),
        }))
    }

    fn fetch_all_stats(&self) -> Result<StatsSnapshot, ClusterError> {
        let state = self.state.lock();
        if let Some(ref message) = state.stats_error {
            return Err(ClusterError::Stats(message.clone()));
        }
        Ok(state.stats.clone())
    }

    fn close(&mut self) {
        self.closed.fetch_add(1, Ordering::SeqCst);
    }
}

struct MemoryNodeHandle<'a> {
    cluster: &'a MemoryCluster,
    endpoint: Endpoint,
}

impl MemoryNodeHandle<'_> {
    fn with_node<T>(
        &self,
        f: impl FnOnce(&mut MemoryNode) -> Result<T, ClusterError>,
    ) -> Result<T, ClusterError> {
        let mut state = self.cluster.state.lock();
        let node = state
            .nodes
            .get_mut(&self.endpoint)
            .ok_or_else(|| self.transport("node left the cluster"))?;
        if node.mode == NodeMode::Offline {
            return Err(self.transport("connection refused"));
        }
        f(node)
    }

    fn transport(&self, message: &str) -> ClusterError {
        ClusterError::Transport {
            endpoint: self.endpoint.to_string(),
            message: message.to_string(),
        }
    }

    fn denied(&self) -> ClusterError {
        ClusterError::PermissionDenied {
            endpoint: self.endpoint.to_string(),
            message: "node is read-only".to_string(),
        }
    }
}

impl NodeHandle for MemoryNodeHandle<'_> {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn integer_get(&self, alias: &str) -> Result<i64, ClusterError> {
        self.with_node(|node| {
            node.integers
                .get(alias)
                .copied()
                .ok_or_else(|| ClusterError::AliasNotFound(alias.to_string()))
        })
    }

    fn integer_put(&self, alias: &str, value: i64) -> Result<(), ClusterError> {
        self.with_node(|node| match node.mode {
            NodeMode::ReadOnly => Err(self.denied()),
            NodeMode::Corrupting => {
                node.integers.insert(alias.to_string(), value.wrapping_add(1));
                Ok(())
            }
            NodeMode::FailAfterWrite => {
                node.integers.insert(alias.to_string(), value);
                Err(self.transport("connection reset after write"))
            }
            _ => {
                node.integers.insert(alias.to_string(), value);
                Ok(())
            }
        })
    }

    fn integer_remove(&self, alias: &str) -> Result<(), ClusterError> {
        self.with_node(|node| {
            if !node.integers.contains_key(alias) {
                return Err(ClusterError::AliasNotFound(alias.to_string()));
            }
            if node.mode == NodeMode::ReadOnly {
                return Err(self.denied());
            }
            node.integers.remove(alias);
            Ok(())
        })
    }
}

/// Connector that always hands out the same in-memory cluster
pub struct MemoryConnector {
    cluster: MemoryCluster,
}

impl MemoryConnector {
    pub fn new(cluster: MemoryCluster) -> Self {
        Self { cluster }
    }
}

impl ClusterConnector for MemoryConnector {
    fn connect(
        &self,
        _uri: &str,
        _credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Cluster>, ConnectionError> {
        Ok(Box::new(self.cluster.clone()))
    }
}

fn now_epoch() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::connection::NodeHandleExt;
    use crate::metrics::{Measurement, MetricMap};

    #[test]
    fn test_startup_epoch_present() {
        let cluster = MemoryCluster::new().with_node("a:1");
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        assert!(node.integer_value(STARTUP_EPOCH_ALIAS).get().unwrap() > 0);
    }

    #[test]
    fn test_offline_node() {
        let cluster = MemoryCluster::new().with_node_mode("a:1", NodeMode::Offline);
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        let err = node.integer_value(STARTUP_EPOCH_ALIAS).get().unwrap_err();
        assert!(matches!(err, ClusterError::Transport { .. }));
    }

    #[test]
    fn test_read_only_node() {
        let cluster = MemoryCluster::new().with_node_mode("a:1", NodeMode::ReadOnly);
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        let err = node.integer_value("k").put(1).unwrap_err();
        assert!(matches!(err, ClusterError::PermissionDenied { .. }));
        assert!(node.integer_value("k").remove().unwrap_err().is_alias_not_found());
    }

    #[test]
    fn test_corrupting_node() {
        let cluster = MemoryCluster::new().with_node_mode("a:1", NodeMode::Corrupting);
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        node.integer_value("k").put(i64::MAX).unwrap();
        assert_eq!(cluster.integer("a:1", "k"), Some(i64::MIN));
    }

    #[test]
    fn test_fail_after_write_node() {
        let cluster = MemoryCluster::new().with_node_mode("a:1", NodeMode::FailAfterWrite);
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        let err = node.integer_value("k").put(7).unwrap_err();
        assert!(matches!(err, ClusterError::Transport { .. }));
        assert_eq!(cluster.integer("a:1", "k"), Some(7));
        node.integer_value("k").remove().unwrap();
        assert_eq!(cluster.integer("a:1", "k"), None);
    }

    #[test]
    fn test_unknown_node() {
        let cluster = MemoryCluster::new();
        assert!(cluster.node(&Endpoint::new("nope:1")).is_err());
    }

    #[test]
    fn test_from_snapshot() {
        let mut snapshot = StatsSnapshot::new();
        snapshot.insert(
            "a:1".to_string(),
            NodeStats::with_cumulative(MetricMap::from([(
                "startup_epoch".to_string(),
                Measurement::gauge(1_600_000_000.0),
            )])),
        );
        snapshot.insert("b:1".to_string(), NodeStats::default());

        let cluster = MemoryCluster::from_snapshot(snapshot.clone());
        assert_eq!(
            cluster.endpoints().unwrap(),
            vec![Endpoint::new("a:1"), Endpoint::new("b:1")]
        );
        assert_eq!(cluster.fetch_all_stats().unwrap(), snapshot);

        // No liveness evidence, even when the dump recorded a startup epoch
        assert_eq!(cluster.integer_count("a:1"), 0);
        let node = cluster.node(&Endpoint::new("a:1")).unwrap();
        assert!(node.integer_value(STARTUP_EPOCH_ALIAS).get().unwrap_err().is_alias_not_found());
        assert!(matches!(
            node.integer_value("k").put(1).unwrap_err(),
            ClusterError::PermissionDenied { .. }
        ));
    }

    #[test]
    fn test_stats_error() {
        let cluster = MemoryCluster::new().with_stats_error("timeout");
        assert_eq!(
            cluster.fetch_all_stats().unwrap_err(),
            ClusterError::Stats("timeout".to_string())
        );
    }
}
