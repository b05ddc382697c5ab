//! Configuration module

pub mod cli;
pub mod cluster_config;
pub mod credentials;
pub mod exporter_config;

pub use cli::{CliArgs, DEFAULT_NAMESPACE};
pub use cluster_config::{ClusterConfig, DEFAULT_CLUSTER_URI};
pub use credentials::Credentials;
pub use exporter_config::{BackendKind, ExporterConfig};
