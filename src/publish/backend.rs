//! Metrics backends
//!
//! A backend accepts one batch of mapped metrics under a namespace. The
//! batching itself lives in the publisher.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::info;

use crate::metrics::MappedMetric;
use crate::utils::PublishError;

/// Destination of published metrics
pub trait MetricsBackend {
    /// Submit one batch of metrics
    fn submit_batch(&self, namespace: &str, metrics: &[MappedMetric]) -> Result<(), PublishError>;
}

/// Backend that writes every metric to the log
#[derive(Debug, Default)]
pub struct LogBackend;

impl MetricsBackend for LogBackend {
    fn submit_batch(&self, namespace: &str, metrics: &[MappedMetric]) -> Result<(), PublishError> {
        for metric in metrics {
            let dimensions = metric
                .dimensions
                .iter()
                .map(|d| format!("{}={}", d.name, d.value))
                .collect::<Vec<_>>()
                .join(",");
            info!(
                "{}/{} {} {:?} [{}]",
                namespace, metric.name, metric.value, metric.unit, dimensions
            );
        }
        Ok(())
    }
}

#[derive(Serialize)]
struct JsonLine<'a> {
    #[serde(rename = "Namespace")]
    namespace: &'a str,
    #[serde(flatten)]
    metric: &'a MappedMetric,
}

/// Backend appending one JSON object per metric to a file
#[derive(Debug, Clone)]
pub struct JsonLinesBackend {
    path: PathBuf,
}

impl JsonLinesBackend {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MetricsBackend for JsonLinesBackend {
    fn submit_batch(&self, namespace: &str, metrics: &[MappedMetric]) -> Result<(), PublishError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut buf = Vec::new();
        for metric in metrics {
            serde_json::to_writer(&mut buf, &JsonLine { namespace, metric })?;
            buf.push(b'\n');
        }

        // One write per batch so a batch never lands half-written
        let mut file = fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        file.write_all(&buf)?;
        Ok(())
    }
}

/// One recorded submission
#[derive(Debug, Clone, PartialEq)]
pub struct SubmittedBatch {
    pub namespace: String,
    pub metrics: Vec<MappedMetric>,
}

/// Backend that keeps every batch in memory
///
/// Can be told to reject the batch after a given number of accepted ones.
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    batches: Mutex<Vec<SubmittedBatch>>,
    fail_after: Option<usize>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept `accepted` batches, reject every later one
    pub fn failing_after(accepted: usize) -> Self {
        Self {
            batches: Mutex::new(Vec::new()),
            fail_after: Some(accepted),
        }
    }

    pub fn batches(&self) -> Vec<SubmittedBatch> {
        self.batches.lock().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().iter().map(|b| b.metrics.len()).collect()
    }

    /// Every accepted metric in submission order
    pub fn metrics(&self) -> Vec<MappedMetric> {
        self.batches
            .lock()
            .iter()
            .flat_map(|b| b.metrics.iter().cloned())
            .collect()
    }
}

impl MetricsBackend for InMemoryBackend {
    fn submit_batch(&self, namespace: &str, metrics: &[MappedMetric]) -> Result<(), PublishError> {
        let mut batches = self.batches.lock();
        if self.fail_after.is_some_and(|limit| batches.len() >= limit) {
            return Err(PublishError::Rejected {
                namespace: namespace.to_string(),
                message: "backend unavailable".to_string(),
            });
        }
        batches.push(SubmittedBatch {
            namespace: namespace.to_string(),
            metrics: metrics.to_vec(),
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{BackendUnit, Dimension};

    fn metric(name: &str) -> MappedMetric {
        MappedMetric {
            name: name.to_string(),
            value: 1.0,
            unit: BackendUnit::Count,
            dimensions: vec![Dimension::new("NodeId", "a:1")],
        }
    }

    #[test]
    fn test_log_backend_accepts_everything() {
        assert!(LogBackend.submit_batch("QuasarDB", &[metric("a"), metric("b")]).is_ok());
        assert!(LogBackend.submit_batch("QuasarDB", &[]).is_ok());
    }

    #[test]
    fn test_json_lines_backend() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("metrics.jsonl");
        let backend = JsonLinesBackend::new(&path);

        backend.submit_batch("QuasarDB", &[metric("a"), metric("b")]).unwrap();
        backend.submit_batch("QuasarDB", &[metric("c")]).unwrap();

        let content = fs::read_to_string(backend.path()).unwrap();
        let lines: Vec<serde_json::Value> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["Namespace"], "QuasarDB");
        assert_eq!(lines[0]["MetricName"], "a");
        assert_eq!(lines[0]["Unit"], "Count");
        assert_eq!(lines[0]["Dimensions"][0]["Name"], "NodeId");
        assert_eq!(lines[2]["MetricName"], "c");
    }

    #[test]
    fn test_in_memory_backend_failure() {
        let backend = InMemoryBackend::failing_after(1);
        backend.submit_batch("ns", &[metric("a")]).unwrap();

        let err = backend.submit_batch("ns", &[metric("b")]).unwrap_err();
        assert!(matches!(err, PublishError::Rejected { .. }));
        assert_eq!(backend.batch_sizes(), vec![1]);
        assert_eq!(backend.batches()[0].namespace, "ns");
    }
}
