//! Cluster endpoint representation

use std::fmt;

use serde::{Deserialize, Serialize};

/// One cluster node address, as enumerated by the cluster
///
/// The identifier is opaque; `host()`/`port()` are best-effort views of the
/// usual `host:port` shape.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Endpoint identifier
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Host part, if the identifier has a `host:port` shape
    pub fn host(&self) -> Option<&str> {
        parse_endpoint_address(&self.0).map(|(host, _)| host)
    }

    /// Port part, if the identifier has a `host:port` shape
    pub fn port(&self) -> Option<u16> {
        parse_endpoint_address(&self.0).map(|(_, port)| port)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Endpoint {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Split `host:port`, also accepting an optional `qdb://` prefix and
/// bracketed IPv6 hosts
fn parse_endpoint_address(addr: &str) -> Option<(&str, u16)> {
    let addr = addr.strip_prefix("qdb://").unwrap_or(addr);
    let (host, port) = addr.rsplit_once(':')?;
    let port: u16 = port.parse().ok()?;
    let host = host
        .strip_prefix('[')
        .and_then(|h| h.strip_suffix(']'))
        .unwrap_or(host);
    if host.is_empty() {
        return None;
    }
    Some((host, port))
}
