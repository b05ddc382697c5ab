//! Cluster credentials loaded from key files

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::utils::CredentialsError;

/// Contents of a user security file
#[derive(Debug, Clone, Deserialize)]
struct UserSecurityFile {
    username: String,
    secret_key: String,
}

/// Credentials for a secured cluster
#[derive(Clone)]
pub struct Credentials {
    pub user_name: String,
    pub user_private_key: String,
    pub cluster_public_key: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user_name", &self.user_name)
            .field("user_private_key", &"<redacted>")
            .field("cluster_public_key", &self.cluster_public_key)
            .finish()
    }
}

impl Credentials {
    /// Load credentials from a cluster public key file and a user security
    /// file (JSON with `username` and `secret_key`)
    pub fn load(
        cluster_public_key_path: &Path,
        user_security_file_path: &Path,
    ) -> Result<Self, CredentialsError> {
        let (user_name, user_private_key) = parse_user_security_file(user_security_file_path)?;
        let cluster_public_key = slurp(cluster_public_key_path)?.trim_end().to_string();

        Ok(Self {
            user_name,
            user_private_key,
            cluster_public_key,
        })
    }
}

fn slurp(path: &Path) -> Result<String, CredentialsError> {
    fs::read_to_string(path).map_err(|source| CredentialsError::Read {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_user_security_file(path: &Path) -> Result<(String, String), CredentialsError> {
    let content = slurp(path)?;
    let parsed: UserSecurityFile =
        serde_json::from_str(&content).map_err(|source| CredentialsError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
    Ok((parsed.username, parsed.secret_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_credentials() {
        let public_key = write_file("PZMBhqk43w+HNr9lLGe+RYq+qWZPrksFWMF1k1UG/vwc=\n");
        let user = write_file(r#"{"username": "qdb-api-python", "secret_key": "SeCrEt"}"#);

        let creds = Credentials::load(public_key.path(), user.path()).unwrap();
        assert_eq!(creds.user_name, "qdb-api-python");
        assert_eq!(creds.user_private_key, "SeCrEt");
        assert_eq!(
            creds.cluster_public_key,
            "PZMBhqk43w+HNr9lLGe+RYq+qWZPrksFWMF1k1UG/vwc="
        );
        assert!(!format!("{:?}", creds).contains("SeCrEt"));
    }

    #[test]
    fn test_user_security_file_missing_field() {
        let public_key = write_file("key");
        let user = write_file(r#"{"username": "alice"}"#);

        let err = Credentials::load(public_key.path(), user.path()).unwrap_err();
        assert!(matches!(err, CredentialsError::Parse { .. }));
    }

    #[test]
    fn test_missing_public_key_file() {
        let user = write_file(r#"{"username": "alice", "secret_key": "s"}"#);

        let err = Credentials::load(Path::new("/nonexistent/cluster.key"), user.path()).unwrap_err();
        assert!(matches!(err, CredentialsError::Read { .. }));
    }
}
