//! Print a statistics snapshot as JSON
//!
//! Usage: dump-stats [--cluster <uri>] [--critical] [--filter-include <p,..>] [--filter-exclude <p,..>]
//!
//! The output of a full dump can be fed back with `--cluster file://<path>`.
//! Non-finite measurements are left out of the dump.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use qdb_cloudwatch_exporter::cluster::UriConnector;
use qdb_cloudwatch_exporter::config::{ClusterConfig, DEFAULT_CLUSTER_URI};
use qdb_cloudwatch_exporter::metrics::{
    finite_only, get_critical_stats, get_full_stats, snapshot_metric_count, MetricFilter,
};

#[derive(Parser, Debug)]
#[command(name = "dump-stats", about = "Print a cluster statistics snapshot as JSON")]
struct Args {
    /// Cluster URI
    #[arg(long = "cluster", default_value = DEFAULT_CLUSTER_URI)]
    cluster: String,

    /// Cluster public key file
    #[arg(long = "cluster-public-key", requires = "user_security_file")]
    cluster_public_key: Option<PathBuf>,

    /// User security file
    #[arg(long = "user-security-file", requires = "cluster_public_key")]
    user_security_file: Option<PathBuf>,

    /// Dump the probe snapshot instead of the full statistics
    #[arg(long = "critical")]
    critical: bool,

    #[arg(long = "filter-include", value_delimiter = ',')]
    filter_include: Vec<String>,

    #[arg(long = "filter-exclude", value_delimiter = ',')]
    filter_exclude: Vec<String>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ClusterConfig::new(&args.cluster);
    if let (Some(public_key), Some(user_security)) =
        (&args.cluster_public_key, &args.user_security_file)
    {
        config = config.with_security(public_key, user_security);
    }

    let filter = MetricFilter::new()
        .include(&args.filter_include)?
        .exclude(&args.filter_exclude)?;

    let connector = UriConnector::new();
    let snapshot = if args.critical {
        get_critical_stats(&connector, &config)?
    } else {
        get_full_stats(&connector, &config)?
    };
    // NaN would be written as null, which cannot be read back
    let snapshot = finite_only(&filter.apply(&snapshot));

    println!("{}", serde_json::to_string_pretty(&snapshot)?);
    eprintln!(
        "{} nodes, {} metrics",
        snapshot.len(),
        snapshot_metric_count(&snapshot)
    );

    Ok(())
}
