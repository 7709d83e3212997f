//! Application Default Credentials
//!
//! Resolution order:
//! 1. the file named by `GOOGLE_APPLICATION_CREDENTIALS`
//! 2. gcloud's well-known `application_default_credentials.json`
//! 3. the GCE metadata server
//!
//! Files may hold either an `authorized_user` or a `service_account`.

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::{ADC_ENV_VAR, METADATA_TIMEOUT_SECS, METADATA_TOKEN_PATH};
use crate::service_account::{ServiceAccountGrant, ServiceAccountKey};
use crate::storage::AuthorizedUserFile;
use crate::tokens::{Credential, Renewal, TokenResponse};

/// Token source backed by the GCE metadata server
#[derive(Debug, Clone)]
pub struct MetadataSource {
    base_url: String,
    scopes: Vec<String>,
}

impl MetadataSource {
    pub fn new(base_url: impl Into<String>, scopes: &[&str]) -> Self {
        Self {
            base_url: base_url.into(),
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub(crate) async fn request_token(&self) -> Result<TokenResponse> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
            .build()?;

        let url = format!("{}{}", self.base_url.trim_end_matches('/'), METADATA_TOKEN_PATH);
        let response = client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .query(&[("scopes", self.scopes.join(","))])
            .send()
            .await
            .map_err(|e| anyhow!("Metadata server unreachable: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow!("Metadata server returned {}", response.status()));
        }

        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct CredentialFileKind {
    #[serde(rename = "type")]
    kind: String,
}

/// Resolves Application Default Credentials for a set of scopes
pub struct AdcResolver {
    env_file: Option<PathBuf>,
    well_known_file: Option<PathBuf>,
    metadata: Option<MetadataSource>,
    scopes: Vec<&'static str>,
    subject: Option<String>,
}

impl AdcResolver {
    /// Resolver reading the standard environment locations
    pub fn from_env(
        metadata_url: &str,
        scopes: &[&'static str],
        subject: Option<String>,
    ) -> Self {
        Self {
            env_file: std::env::var_os(ADC_ENV_VAR).map(PathBuf::from),
            well_known_file: common::platform::adc_well_known_file(),
            metadata: Some(MetadataSource::new(metadata_url, scopes)),
            scopes: scopes.to_vec(),
            subject,
        }
    }

    pub fn with_sources(
        env_file: Option<PathBuf>,
        well_known_file: Option<PathBuf>,
        metadata: Option<MetadataSource>,
        scopes: &[&'static str],
    ) -> Self {
        Self {
            env_file,
            well_known_file,
            metadata,
            scopes: scopes.to_vec(),
            subject: None,
        }
    }

    /// Finds the first available source and returns a fresh credential
    pub async fn resolve(&self) -> Result<Credential> {
        if let Some(path) = &self.env_file {
            debug!("{} points at {}", ADC_ENV_VAR, path.display());
            if !path.exists() {
                return Err(anyhow!(
                    "{} is set to {} but the file does not exist",
                    ADC_ENV_VAR,
                    path.display()
                ));
            }
            return self.load_file(path).await;
        }

        if let Some(path) = self.well_known_file.as_deref().filter(|p| p.exists()) {
            debug!("Using gcloud application default credentials at {}", path.display());
            return self.load_file(path).await;
        }

        if let Some(metadata) = &self.metadata {
            debug!("Probing the metadata server");
            let response = metadata.request_token().await?;
            info!("Obtained token from the metadata server");
            let mut credential = Credential {
                access_token: String::new(),
                refresh_token: None,
                expires_at: None,
                scopes: metadata.scopes.clone(),
                renewal: Renewal::Metadata(metadata.clone()),
            };
            credential.apply(response);
            return Ok(credential);
        }

        Err(anyhow!(
            "Could not find default credentials. Set {} or run `gcloud auth application-default login`.",
            ADC_ENV_VAR
        ))
    }

    async fn load_file(&self, path: &Path) -> Result<Credential> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read credentials file {}", path.display()))?;
        let kind: CredentialFileKind = serde_json::from_str(&content)
            .with_context(|| format!("Invalid credentials file {}", path.display()))?;

        match kind.kind.as_str() {
            "authorized_user" => {
                let file: AuthorizedUserFile = serde_json::from_str(&content)?;
                let mut credential = file.into_credential();
                // gcloud bakes the scopes into the refresh token itself
                credential.renew().await?;
                info!("Obtained token for authorized user from {}", path.display());
                Ok(credential)
            }
            "service_account" => {
                let key = ServiceAccountKey::from_json(&content)?;
                ServiceAccountGrant::new(key, &self.scopes, self.subject.clone())
                    .fetch_credential()
                    .await
            }
            other => Err(anyhow!(
                "Unsupported credential type \"{}\" in {}",
                other,
                path.display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service_account::tests::key_json;
    use tempfile::TempDir;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn token_server(access_token: &str) -> MockServer {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": access_token,
                "expires_in": 3599
            })))
            .mount(&server)
            .await;
        server
    }

    #[tokio::test]
    async fn test_env_file_with_authorized_user() {
        let server = token_server("adc-user-access").await;
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("adc.json");
        std::fs::write(
            &file,
            serde_json::json!({
                "type": "authorized_user",
                "client_id": "id",
                "client_secret": "secret",
                "refresh_token": "refresh",
                "token_uri": format!("{}/token", server.uri())
            })
            .to_string(),
        )
        .unwrap();

        let resolver = AdcResolver::with_sources(Some(file), None, None, &["scope"]);
        let credential = resolver.resolve().await.unwrap();

        assert_eq!(credential.access_token, "adc-user-access");
        assert!(credential.is_valid());
    }

    #[tokio::test]
    async fn test_env_file_wins_over_well_known_file() {
        let server = token_server("from-env").await;
        let dir = TempDir::new().unwrap();
        let env_file = dir.path().join("sa.json");
        std::fs::write(&env_file, key_json(&format!("{}/token", server.uri()))).unwrap();
        let well_known = dir.path().join("application_default_credentials.json");
        std::fs::write(&well_known, "{\"type\": \"bogus\"}").unwrap();

        let resolver = AdcResolver::with_sources(Some(env_file), Some(well_known), None, &["scope"]);
        let credential = resolver.resolve().await.unwrap();

        assert_eq!(credential.access_token, "from-env");
    }

    #[tokio::test]
    async fn test_missing_env_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let resolver =
            AdcResolver::with_sources(Some(dir.path().join("absent.json")), None, None, &["scope"]);
        let err = resolver.resolve().await.unwrap_err();
        assert!(err.to_string().contains(ADC_ENV_VAR));
    }

    #[tokio::test]
    async fn test_falls_through_to_metadata_server() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(METADATA_TOKEN_PATH))
            .and(header("Metadata-Flavor", "Google"))
            .and(query_param("scopes", "a,b"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gce-access",
                "expires_in": 3599,
                "token_type": "Bearer"
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let resolver = AdcResolver::with_sources(
            None,
            Some(dir.path().join("application_default_credentials.json")),
            Some(MetadataSource::new(server.uri(), &["a", "b"])),
            &["a", "b"],
        );
        let credential = resolver.resolve().await.unwrap();

        assert_eq!(credential.access_token, "gce-access");
        assert!(credential.can_renew());
    }

    #[tokio::test]
    async fn test_nothing_available() {
        let resolver = AdcResolver::with_sources(None, None, None, &["scope"]);
        let err = resolver.resolve().await.unwrap_err();
        assert!(err.to_string().contains("Could not find default credentials"));
    }
}
