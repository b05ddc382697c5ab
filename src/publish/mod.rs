//! Publishing of mapped metrics

pub mod backend;
pub mod publisher;

pub use backend::{InMemoryBackend, JsonLinesBackend, LogBackend, MetricsBackend, SubmittedBatch};
pub use publisher::{publish, MAX_METRICS_PER_REQUEST};
