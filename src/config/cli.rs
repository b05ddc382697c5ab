//! Command-line argument parsing
//!
//! Arguments are grouped by category: cluster connection, export target,
//! metric selection and output.

use clap::Parser;
use std::path::PathBuf;

use super::cluster_config::DEFAULT_CLUSTER_URI;

/// Default metrics namespace
pub const DEFAULT_NAMESPACE: &str = "QuasarDB";

/// Export QuasarDB cluster statistics to a metrics backend
#[derive(Parser, Debug, Clone)]
#[command(name = "qdb-cloudwatch")]
#[command(version, about, long_about = None)]
pub struct CliArgs {
    // ===== Connection Options =====
    /// Cluster URI (`qdb://host:port`, or `file://path` for a statistics dump)
    #[arg(long = "cluster", default_value = DEFAULT_CLUSTER_URI)]
    pub cluster: String,

    /// Cluster public key file (requires --user-security-file)
    #[arg(long = "cluster-public-key")]
    pub cluster_public_key: Option<PathBuf>,

    /// User security file with `username` and `secret_key`
    #[arg(long = "user-security-file")]
    pub user_security_file: Option<PathBuf>,

    // ===== Export Options =====
    /// Only export metrics of this node
    #[arg(long = "node-id")]
    pub node_id: Option<String>,

    /// Metrics namespace
    #[arg(long = "namespace", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,

    // ===== Metric Selection =====
    /// Only export metrics matching one of these patterns (comma separated)
    #[arg(long = "filter-include", value_delimiter = ',')]
    pub filter_include: Vec<String>,

    /// Never export metrics matching one of these patterns (comma separated)
    #[arg(long = "filter-exclude", value_delimiter = ',')]
    pub filter_exclude: Vec<String>,

    // ===== Output Options =====
    /// Append metrics as JSON lines to this file instead of logging them
    #[arg(short = 'o', long = "output")]
    pub output: Option<PathBuf>,

    /// Quiet mode (errors only)
    #[arg(short = 'q', long = "quiet", conflicts_with = "verbose")]
    pub quiet: bool,

    /// Verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

impl CliArgs {
    /// Parse CLI arguments from command line
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate argument combinations
    pub fn validate(&self) -> Result<(), String> {
        // Key pair goes together
        if self.cluster_public_key.is_some() != self.user_security_file.is_some() {
            return Err(
                "--cluster-public-key and --user-security-file must both be specified".to_string(),
            );
        }

        if self.namespace.trim().is_empty() {
            return Err("--namespace must not be empty".to_string());
        }

        if let Some(ref node_id) = self.node_id {
            if node_id.is_empty() {
                return Err("--node-id must not be empty".to_string());
            }
        }

        if self
            .filter_include
            .iter()
            .chain(&self.filter_exclude)
            .any(|p| p.is_empty())
        {
            return Err("Filter patterns must not be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::parse_from(std::iter::once("qdb-cloudwatch").chain(args.iter().copied()))
    }

    #[test]
    fn test_defaults() {
        let args = parse(&[]);
        assert_eq!(args.cluster, "qdb://127.0.0.1:2836");
        assert_eq!(args.namespace, "QuasarDB");
        assert!(args.cluster_public_key.is_none());
        assert!(args.node_id.is_none());
        assert!(args.filter_include.is_empty());
        assert!(args.output.is_none());
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_comma_separated_filters() {
        let args = parse(&[
            "--filter-include",
            "memory.,network.",
            "--filter-exclude",
            "cpu.",
        ]);
        assert_eq!(args.filter_include, vec!["memory.", "network."]);
        assert_eq!(args.filter_exclude, vec!["cpu."]);
    }

    #[test]
    fn test_lone_key_flag_rejected() {
        let args = parse(&["--cluster-public-key", "/tmp/cluster.key"]);
        assert!(args.validate().is_err());

        let args = parse(&["--user-security-file", "/tmp/user.json"]);
        assert!(args.validate().is_err());

        let args = parse(&[
            "--cluster-public-key",
            "/tmp/cluster.key",
            "--user-security-file",
            "/tmp/user.json",
        ]);
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_empty_values_rejected() {
        assert!(parse(&["--namespace", " "]).validate().is_err());
        assert!(parse(&["--node-id", ""]).validate().is_err());
        assert!(parse(&["--filter-include", "memory.,"]).validate().is_err());
    }

    #[test]
    fn test_verbose_conflicts_with_quiet() {
        let result = CliArgs::try_parse_from(["qdb-cloudwatch", "-v", "-q"]);
        assert!(result.is_err());
    }
}
