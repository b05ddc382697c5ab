//! qdb-cloudwatch - export QuasarDB cluster statistics
//!
//! Publishes the critical snapshot (liveness and writability probes) and then
//! the full statistics snapshot of every node.

use anyhow::Result;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use qdb_cloudwatch_exporter::cluster::UriConnector;
use qdb_cloudwatch_exporter::config::{CliArgs, ExporterConfig};
use qdb_cloudwatch_exporter::exporter::{create_backend, Exporter};

fn setup_logging(verbose: bool, quiet: bool) {
    let level = if quiet {
        Level::ERROR
    } else if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

fn run() -> Result<()> {
    // Parse CLI arguments
    let args = CliArgs::parse_args();

    // Setup logging
    setup_logging(args.verbose, args.quiet);

    // Build configuration
    let config = ExporterConfig::from_cli(&args)?;

    info!(
        "Exporting {} to namespace {}",
        config.cluster.uri, config.namespace
    );

    let connector = UriConnector::new();
    let backend = create_backend(&config.backend);
    let exporter = Exporter::new(&connector, backend.as_ref(), config);

    let summary = exporter.run()?;
    info!(
        "Export complete: {} critical and {} full metrics",
        summary.critical_metrics, summary.full_metrics
    );

    Ok(())
}

fn main() {
    if let Err(e) = run() {
        error!("Error: {:#}", e);
        std::process::exit(1);
    }
}
