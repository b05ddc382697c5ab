//! Cluster connection traits
//!
//! These traits abstract the database client: endpoint enumeration, per-node
//! integer entries and the bulk statistics fetch. Probes and aggregation are
//! written against them so any client (or an in-memory cluster) can back a run.

use std::ops::Deref;

use tracing::debug;

use super::endpoint::Endpoint;
use crate::config::{ClusterConfig, Credentials};
use crate::metrics::StatsSnapshot;
use crate::utils::{ClusterError, ConnectionError, ExporterError};

/// Operations on a single cluster node
pub trait NodeHandle {
    /// Endpoint this handle talks to
    fn endpoint(&self) -> &Endpoint;

    /// Read the integer stored under `alias`
    fn integer_get(&self, alias: &str) -> Result<i64, ClusterError>;

    /// Store `value` under `alias`, creating or replacing it
    fn integer_put(&self, alias: &str, value: i64) -> Result<(), ClusterError>;

    /// Delete the integer stored under `alias`
    fn integer_remove(&self, alias: &str) -> Result<(), ClusterError>;
}

/// Handle on one named integer of one node
pub struct IntegerValue<'a, N: NodeHandle + ?Sized> {
    node: &'a N,
    alias: &'a str,
}

impl<'a, N: NodeHandle + ?Sized> IntegerValue<'a, N> {
    pub fn get(&self) -> Result<i64, ClusterError> {
        self.node.integer_get(self.alias)
    }

    pub fn put(&self, value: i64) -> Result<(), ClusterError> {
        self.node.integer_put(self.alias, value)
    }

    pub fn remove(&self) -> Result<(), ClusterError> {
        self.node.integer_remove(self.alias)
    }
}

/// Extension trait with entry-style access
pub trait NodeHandleExt: NodeHandle {
    /// Get a handle on the integer stored under `alias`
    fn integer_value<'a>(&'a self, alias: &'a str) -> IntegerValue<'a, Self> {
        IntegerValue { node: self, alias }
    }
}

// Blanket implementation: any NodeHandle (sized or not) gets NodeHandleExt
impl<T: NodeHandle + ?Sized> NodeHandleExt for T {}

/// A live connection to a cluster
pub trait Cluster {
    /// Enumerate the endpoints of every node currently in the cluster
    fn endpoints(&self) -> Result<Vec<Endpoint>, ClusterError>;

    /// Get a handle on a single node
    fn node(&self, endpoint: &Endpoint) -> Result<Box<dyn NodeHandle + '_>, ClusterError>;

    /// Fetch statistics of every node
    fn fetch_all_stats(&self) -> Result<StatsSnapshot, ClusterError>;

    /// Release the connection
    fn close(&mut self) {}
}

/// Opens cluster connections
pub trait ClusterConnector {
    fn connect(
        &self,
        uri: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Cluster>, ConnectionError>;
}

/// Connection scoped to one fetch operation
///
/// The underlying connection is closed when the session is dropped, on
/// every exit path.
pub struct ClusterSession {
    inner: Box<dyn Cluster>,
    uri: String,
}

impl ClusterSession {
    pub fn new(inner: Box<dyn Cluster>, uri: &str) -> Self {
        Self {
            inner,
            uri: uri.to_string(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl Deref for ClusterSession {
    type Target = dyn Cluster;

    fn deref(&self) -> &Self::Target {
        self.inner.as_ref()
    }
}

impl Drop for ClusterSession {
    fn drop(&mut self) {
        debug!("Closing connection to {}", self.uri);
        self.inner.close();
    }
}

/// Open a connection described by `config`, loading credentials first
pub fn open_cluster(
    connector: &dyn ClusterConnector,
    config: &ClusterConfig,
) -> Result<ClusterSession, ExporterError> {
    let credentials = config.load_credentials()?;
    debug!(
        "Connecting to {} ({})",
        config.uri,
        if credentials.is_some() {
            "secured"
        } else {
            "insecure"
        }
    );
    let cluster = connector.connect(&config.uri, credentials.as_ref())?;
    Ok(ClusterSession::new(cluster, &config.uri))
}
