//! Cluster connection configuration

use std::path::PathBuf;

use super::credentials::Credentials;
use crate::utils::CredentialsError;

pub const DEFAULT_CLUSTER_URI: &str = "qdb://127.0.0.1:2836";

/// Everything needed to open a cluster connection
#[derive(Debug, Clone)]
pub struct ClusterConfig {
    pub uri: String,
    pub public_key_path: Option<PathBuf>,
    pub user_security_file_path: Option<PathBuf>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self::new(DEFAULT_CLUSTER_URI)
    }
}

impl ClusterConfig {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            public_key_path: None,
            user_security_file_path: None,
        }
    }

    pub fn with_security(
        mut self,
        public_key_path: impl Into<PathBuf>,
        user_security_file_path: impl Into<PathBuf>,
    ) -> Self {
        self.public_key_path = Some(public_key_path.into());
        self.user_security_file_path = Some(user_security_file_path.into());
        self
    }

    /// Check if both key files are configured
    pub fn is_secured(&self) -> bool {
        self.public_key_path.is_some() && self.user_security_file_path.is_some()
    }

    /// Load credentials when both key files are configured
    pub fn load_credentials(&self) -> Result<Option<Credentials>, CredentialsError> {
        match (&self.public_key_path, &self.user_security_file_path) {
            (Some(public_key), Some(user_security)) => {
                Credentials::load(public_key, user_security).map(Some)
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_cluster_config() {
        let config = ClusterConfig::default();
        assert_eq!(config.uri, "qdb://127.0.0.1:2836");
        assert!(!config.is_secured());
        assert!(config.load_credentials().unwrap().is_none());
    }

    #[test]
    fn test_secured_cluster_config() {
        let config = ClusterConfig::new("qdb://127.0.0.1:2838")
            .with_security("cluster_public.key", "user_private.key");
        assert!(config.is_secured());
        assert!(config.load_credentials().is_err());
    }
}
