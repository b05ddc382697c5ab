//! Liveness and writability probes
//!
//! Both probes visit every endpoint independently and never fail: any error
//! turns into a 0 for that endpoint and a log line.

use std::collections::BTreeMap;

use tracing::{debug, error, warn};

use crate::cluster::{Cluster, Endpoint, NodeHandle, NodeHandleExt, STARTUP_EPOCH_ALIAS};
use crate::utils::ClusterError;

/// Alias prefix of the entries written by the writability probe
pub const WRITABLE_PROBE_PREFIX: &str = "qdb_cloudwatch.check_writable.";

/// Per-endpoint probe outcome: 1 = passed, 0 = failed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResult {
    results: BTreeMap<Endpoint, u8>,
}

impl ProbeResult {
    /// Result with every endpoint marked as failed
    pub fn pessimistic(endpoints: &[Endpoint]) -> Self {
        Self {
            results: endpoints.iter().map(|e| (e.clone(), 0)).collect(),
        }
    }

    pub fn mark_passed(&mut self, endpoint: &Endpoint) {
        self.results.insert(endpoint.clone(), 1);
    }

    /// Outcome for an endpoint; 0 when the endpoint was never probed
    pub fn get(&self, endpoint: &Endpoint) -> u8 {
        self.results.get(endpoint).copied().unwrap_or(0)
    }

    pub fn passed(&self, endpoint: &Endpoint) -> bool {
        self.get(endpoint) == 1
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Endpoint, u8)> {
        self.results.iter().map(|(e, v)| (e, *v))
    }
}

/// Check every endpoint can serve a read of the always-present startup epoch
pub fn check_online(cluster: &dyn Cluster, endpoints: &[Endpoint]) -> ProbeResult {
    let mut result = ProbeResult::pessimistic(endpoints);

    for endpoint in endpoints {
        let outcome = cluster
            .node(endpoint)
            .and_then(|node| node.integer_value(STARTUP_EPOCH_ALIAS).get());

        match outcome {
            Ok(epoch) => {
                debug!("Node {} is online (startup epoch {})", endpoint, epoch);
                result.mark_passed(endpoint);
            }
            Err(e) => error!("Node {} is not online: {}", endpoint, e),
        }
    }

    result
}

/// Check every endpoint accepts a write, serves it back and lets it be removed
///
/// Each endpoint gets its own random alias and random value. The alias is
/// removed whatever the outcome of the write and read-back.
pub fn check_writable(cluster: &dyn Cluster, endpoints: &[Endpoint]) -> ProbeResult {
    let mut result = ProbeResult::pessimistic(endpoints);

    for endpoint in endpoints {
        let node = match cluster.node(endpoint) {
            Ok(node) => node,
            Err(e) => {
                error!("Node {} is not writable: {}", endpoint, e);
                continue;
            }
        };

        let value = fastrand::i64(..);
        let outcome = {
            let entry = ProbeEntry::new(node.as_ref(), probe_alias());
            entry.write_and_verify(value)
        };

        match outcome {
            Ok(true) => {
                debug!("Node {} is writable", endpoint);
                result.mark_passed(endpoint);
            }
            Ok(false) => error!(
                "Node {} is not writable: read back a different value than written",
                endpoint
            ),
            Err(e) => error!("Node {} is not writable: {}", endpoint, e),
        }
    }

    result
}

/// Random alias, unique per probe
fn probe_alias() -> String {
    format!(
        "{}{:016x}{:016x}",
        WRITABLE_PROBE_PREFIX,
        fastrand::u64(..),
        fastrand::u64(..)
    )
}

/// Probe entry that is removed from its node when dropped
struct ProbeEntry<'a> {
    node: &'a dyn NodeHandle,
    alias: String,
}

impl<'a> ProbeEntry<'a> {
    fn new(node: &'a dyn NodeHandle, alias: String) -> Self {
        Self { node, alias }
    }

    fn write_and_verify(&self, value: i64) -> Result<bool, ClusterError> {
        let entry = self.node.integer_value(&self.alias);
        entry.put(value)?;
        Ok(entry.get()? == value)
    }
}

impl Drop for ProbeEntry<'_> {
    fn drop(&mut self) {
        match self.node.integer_value(&self.alias).remove() {
            Ok(()) => {}
            Err(e) if e.is_alias_not_found() => {}
            Err(e) => warn!(
                "Failed to remove probe entry {} from {} (non-fatal): {}",
                self.alias,
                self.node.endpoint(),
                e
            ),
        }
    }
}
