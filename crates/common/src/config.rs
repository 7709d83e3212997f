use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::platform;

/// Errors raised while loading the configuration file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub files: FileConfig,
    pub workspace: WorkspaceConfig,
    pub endpoints: EndpointConfig,
}

/// Local files read and written by the tools
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// OAuth client secret downloaded from the Cloud console
    pub client_secret: PathBuf,
    /// Cached OAuth token, rewritten after every refresh or consent
    pub token: PathBuf,
    /// Service-account key files, tried in order
    pub service_accounts: Vec<PathBuf>,
    /// Group definitions
    pub groups_csv: PathBuf,
    /// Marker written once the diagnostic succeeds
    pub auth_marker: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceConfig {
    /// Customer key passed to list calls
    pub customer: String,
    /// Admin user impersonated by service accounts with domain-wide delegation
    pub delegated_admin: Option<String>,
    /// Turn every provisioned group into a collaborative inbox
    pub collaborative_inbox: bool,
    /// gcloud executable used by the last-resort login
    pub gcloud_bin: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    pub directory: String,
    pub groups_settings: String,
    pub metadata_server: String,
}

impl Default for FileConfig {
    fn default() -> Self {
        let mut service_accounts = vec![
            PathBuf::from("service-account.json"),
            PathBuf::from("credentials.json"),
        ];
        if let Some(gcloud) = platform::gcloud_config_dir() {
            service_accounts.push(gcloud.join("service-account.json"));
        }

        Self {
            client_secret: PathBuf::from("credentials.json"),
            token: PathBuf::from("token.json"),
            service_accounts,
            groups_csv: PathBuf::from("groups/entity_groups.csv"),
            auth_marker: PathBuf::from("auth_working.json"),
        }
    }
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            customer: "my_customer".to_string(),
            delegated_admin: None,
            collaborative_inbox: false,
            gcloud_bin: platform::gcloud_binary().to_string(),
        }
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            directory: "https://admin.googleapis.com/admin/directory/v1".to_string(),
            groups_settings: "https://www.googleapis.com/groups/v1/groups".to_string(),
            metadata_server: "http://metadata.google.internal".to_string(),
        }
    }
}

impl Config {
    /// Reads a TOML config file; missing keys fall back to defaults
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads the configuration from an explicit path, the working directory,
    /// or the platform config directory, in that order.
    ///
    /// An explicit path must exist. The implicit locations are optional and
    /// defaults are used when neither is present.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            debug!("Loading config from {:?}", path);
            return Self::from_file(path);
        }

        let candidates = [Some(PathBuf::from(platform::CONFIG_FILE_NAME)), platform::get_config_path()];
        for path in candidates.into_iter().flatten() {
            if path.exists() {
                debug!("Loading config from {:?}", path);
                return Self::from_file(&path);
            }
        }

        debug!("No config file found, using defaults");
        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_script_layout() {
        let config = Config::default();
        assert_eq!(config.files.token, PathBuf::from("token.json"));
        assert_eq!(config.files.groups_csv, PathBuf::from("groups/entity_groups.csv"));
        assert_eq!(config.files.service_accounts[0], PathBuf::from("service-account.json"));
        assert_eq!(config.files.service_accounts[1], PathBuf::from("credentials.json"));
        assert_eq!(config.workspace.customer, "my_customer");
        assert!(!config.workspace.collaborative_inbox);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[workspace]\ndelegated_admin = \"admin@example.com\"\ncollaborative_inbox = true\n\n[files]\ngroups_csv = \"other.csv\""
        )
        .unwrap();

        let config = Config::load(Some(file.path())).unwrap();
        assert_eq!(config.workspace.delegated_admin.as_deref(), Some("admin@example.com"));
        assert!(config.workspace.collaborative_inbox);
        assert_eq!(config.workspace.customer, "my_customer");
        assert_eq!(config.files.groups_csv, PathBuf::from("other.csv"));
        assert_eq!(config.files.token, PathBuf::from("token.json"));
    }

    #[test]
    fn test_explicit_missing_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let err = Config::load(Some(&dir.path().join("absent.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[workspace\ncustomer = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
