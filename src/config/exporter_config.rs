//! Resolved exporter configuration
//!
//! Built from CLI arguments once, then handed to the exporter as is.

use std::path::PathBuf;

use super::cli::CliArgs;
use super::cluster_config::ClusterConfig;
use crate::metrics::MetricFilter;
use crate::utils::ExporterError;

/// Where published metrics go
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum BackendKind {
    /// Log every metric at info level
    #[default]
    Log,
    /// Append JSON lines to a file
    JsonLines(PathBuf),
}

/// Complete exporter configuration
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub cluster: ClusterConfig,
    pub namespace: String,
    pub filter: MetricFilter,
    pub node_id: Option<String>,
    pub backend: BackendKind,
}

impl ExporterConfig {
    /// Create configuration from CLI arguments
    pub fn from_cli(args: &CliArgs) -> Result<Self, ExporterError> {
        args.validate().map_err(ExporterError::Config)?;

        let mut cluster = ClusterConfig::new(&args.cluster);
        if let (Some(public_key), Some(user_security)) =
            (&args.cluster_public_key, &args.user_security_file)
        {
            cluster = cluster.with_security(public_key, user_security);
        }

        let filter = MetricFilter::new()
            .include(&args.filter_include)
            .and_then(|f| f.exclude(&args.filter_exclude))
            .map_err(|e| ExporterError::Config(format!("Invalid filter pattern: {}", e)))?;

        let backend = match args.output {
            Some(ref path) => BackendKind::JsonLines(path.clone()),
            None => BackendKind::Log,
        };

        Ok(Self {
            cluster,
            namespace: args.namespace.clone(),
            filter,
            node_id: args.node_id.clone(),
            backend,
        })
    }
}
