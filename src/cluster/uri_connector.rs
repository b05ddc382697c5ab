//! URI-dispatching connector
//!
//! Supported schemes:
//! - `file://<path>`: serve a statistics dump (JSON) through an in-memory cluster
//!   whose nodes fail both probes
//! - `qdb://` / `qdbs://`: native cluster protocol, which needs a client library
//!   this build does not link; rejected with `UnsupportedScheme`

use std::fs;
use std::path::PathBuf;

use tracing::{debug, info};

use super::connection::{Cluster, ClusterConnector};
use super::memory::MemoryCluster;
use crate::config::Credentials;
use crate::metrics::StatsSnapshot;
use crate::utils::ConnectionError;

/// Connector selecting the cluster implementation from the URI scheme
#[derive(Debug, Clone, Copy, Default)]
pub struct UriConnector;

impl UriConnector {
    pub fn new() -> Self {
        Self
    }

    fn open_snapshot_file(&self, path: PathBuf) -> Result<MemoryCluster, ConnectionError> {
        let content = fs::read_to_string(&path).map_err(|e| ConnectionError::Snapshot {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        let snapshot: StatsSnapshot =
            serde_json::from_str(&content).map_err(|e| ConnectionError::Snapshot {
                path: path.clone(),
                reason: e.to_string(),
            })?;
        info!(
            "Loaded statistics dump {} ({} nodes)",
            path.display(),
            snapshot.len()
        );
        Ok(MemoryCluster::from_snapshot(snapshot))
    }
}

impl ClusterConnector for UriConnector {
    fn connect(
        &self,
        uri: &str,
        credentials: Option<&Credentials>,
    ) -> Result<Box<dyn Cluster>, ConnectionError> {
        let (scheme, rest) = uri
            .split_once("://")
            .ok_or_else(|| ConnectionError::InvalidUri(uri.to_string()))?;

        match scheme {
            "file" => {
                if rest.is_empty() {
                    return Err(ConnectionError::InvalidUri(uri.to_string()));
                }
                if let Some(creds) = credentials {
                    debug!(
                        "Ignoring credentials of user {} for statistics dump",
                        creds.user_name
                    );
                }
                Ok(Box::new(self.open_snapshot_file(PathBuf::from(rest))?))
            }
            "qdb" | "qdbs" => Err(ConnectionError::UnsupportedScheme {
                scheme: scheme.to_string(),
                reason: "no native cluster client is linked into this build".to_string(),
            }),
            other => Err(ConnectionError::UnsupportedScheme {
                scheme: other.to_string(),
                reason: "expected file:// or qdb://".to_string(),
            }),
        }
    }
}
