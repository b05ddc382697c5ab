//! Utility modules

pub mod error;

pub use error::{
    ClusterError, ConnectionError, CredentialsError, ExporterError, MappingError, PublishError,
    Result,
};
