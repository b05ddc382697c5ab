//! Error types for qdb-cloudwatch-exporter

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum ExporterError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Credentials error: {0}")]
    Credentials(#[from] CredentialsError),

    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Cluster error: {0}")]
    Cluster(#[from] ClusterError),

    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),
}

/// Errors raised while opening a cluster connection
#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("Invalid cluster uri: {0}")]
    InvalidUri(String),

    #[error("Unsupported cluster uri scheme '{scheme}': {reason}")]
    UnsupportedScheme { scheme: String, reason: String },

    #[error("Failed to load statistics snapshot {path}: {reason}")]
    Snapshot { path: PathBuf, reason: String },
}

/// Per-operation cluster errors
///
/// `AliasNotFound` is kept distinct so callers can treat a missing entry as
/// an expected outcome instead of a failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    #[error("Alias not found: {0}")]
    AliasNotFound(String),

    #[error("Transport error on {endpoint}: {message}")]
    Transport { endpoint: String, message: String },

    #[error("Permission denied on {endpoint}: {message}")]
    PermissionDenied { endpoint: String, message: String },

    #[error("Failed to fetch statistics: {0}")]
    Stats(String),
}

impl ClusterError {
    /// Check if this is the "alias not found" outcome
    pub fn is_alias_not_found(&self) -> bool {
        matches!(self, ClusterError::AliasNotFound(_))
    }
}

/// Credential file errors
#[derive(Error, Debug)]
pub enum CredentialsError {
    #[error("Failed to read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },

    #[error("Failed to parse user security file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Metrics backend errors
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Backend rejected batch for namespace {namespace}: {message}")]
    Rejected { namespace: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to serialize metrics: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Malformed measurement encountered while mapping
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MappingError {
    #[error("Metric {name} has non-finite value {value}")]
    NonFinite { name: String, value: f64 },
}

pub type Result<T> = std::result::Result<T, ExporterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_alias_not_found_is_distinguished() {
        assert!(ClusterError::AliasNotFound("k".to_string()).is_alias_not_found());
        assert!(!ClusterError::Transport {
            endpoint: "127.0.0.1:2836".to_string(),
            message: "reset".to_string(),
        }
        .is_alias_not_found());
    }

    #[test]
    fn test_error_conversion() {
        let err: ExporterError = ClusterError::Stats("boom".to_string()).into();
        assert!(matches!(err, ExporterError::Cluster(_)));
        assert_eq!(err.to_string(), "Cluster error: Failed to fetch statistics: boom");
    }
}
