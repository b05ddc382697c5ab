//! Batch publisher

use tracing::{debug, info};

use super::backend::MetricsBackend;
use crate::metrics::MappedMetric;
use crate::utils::PublishError;

/// Largest batch the backend accepts in one request
pub const MAX_METRICS_PER_REQUEST: usize = 20;

/// Push metrics in consecutive batches, preserving order
///
/// The first rejected batch aborts the rest. Returns the number of metrics
/// pushed.
pub fn publish(
    metrics: &[MappedMetric],
    namespace: &str,
    backend: &dyn MetricsBackend,
) -> Result<usize, PublishError> {
    for (i, batch) in metrics.chunks(MAX_METRICS_PER_REQUEST).enumerate() {
        debug!("Submitting batch {} ({} metrics) to {}", i, batch.len(), namespace);
        backend.submit_batch(namespace, batch)?;
    }

    info!("Pushed {} metrics", metrics.len());
    Ok(metrics.len())
}
