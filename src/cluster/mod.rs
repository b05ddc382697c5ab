//! Cluster access
//!
//! This module provides:
//! - Connection traits for the database client (`Cluster`, `NodeHandle`)
//! - Scoped connection sessions
//! - An in-memory cluster used for statistics dumps and tests
//! - A connector dispatching on the cluster URI scheme

pub mod connection;
pub mod endpoint;
pub mod memory;
pub mod uri_connector;

pub use connection::{
    open_cluster, Cluster, ClusterConnector, ClusterSession, IntegerValue, NodeHandle,
    NodeHandleExt,
};
pub use endpoint::Endpoint;
pub use memory::{MemoryCluster, MemoryConnector, NodeMode, STARTUP_EPOCH_ALIAS};
pub use uri_connector::UriConnector;
