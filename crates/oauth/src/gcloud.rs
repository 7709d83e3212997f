//! Last-resort login through the gcloud CLI
//!
//! Runs `gcloud auth application-default login --scopes=...` in the
//! foreground (gcloud opens the browser itself) and then resolves ADC again,
//! which now finds the freshly written well-known file.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tracing::info;

use crate::adc::AdcResolver;
use crate::chain::CredentialProvider;
use crate::tokens::Credential;

pub struct GcloudLogin {
    binary: String,
    scopes: Vec<&'static str>,
    resolver: AdcResolver,
}

impl GcloudLogin {
    pub fn new(binary: impl Into<String>, scopes: &[&'static str], resolver: AdcResolver) -> Self {
        Self {
            binary: binary.into(),
            scopes: scopes.to_vec(),
            resolver,
        }
    }

    fn login_args(&self) -> Vec<String> {
        vec![
            "auth".to_string(),
            "application-default".to_string(),
            "login".to_string(),
            format!("--scopes={}", self.scopes.join(",")),
        ]
    }

    async fn run_login(&self) -> Result<()> {
        info!("Running {} auth application-default login", self.binary);

        let status = tokio::process::Command::new(&self.binary)
            .args(self.login_args())
            .status()
            .await
            .map_err(|e| anyhow!("Failed to run {}: {}. Is the Cloud SDK installed?", self.binary, e))?;

        if !status.success() {
            return Err(anyhow!("{} login exited with {}", self.binary, status));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialProvider for GcloudLogin {
    fn name(&self) -> String {
        "gcloud application-default login".to_string()
    }

    async fn fetch(&self) -> Result<Credential> {
        self.run_login().await?;
        self.resolver.resolve().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::Path;
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Writes an executable that records its arguments and exits with `code`
    fn fake_gcloud(dir: &Path, code: i32) -> String {
        let script = dir.join("gcloud");
        let args_file = dir.join("args.txt");
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" > {}\nexit {}\n", args_file.display(), code),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    #[tokio::test]
    async fn test_login_then_resolves_adc() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "gcloud-access",
                "expires_in": 3599
            })))
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let adc_file = dir.path().join("application_default_credentials.json");
        std::fs::write(
            &adc_file,
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

        let login = GcloudLogin::new(
            fake_gcloud(dir.path(), 0),
            &["scope-a", "scope-b"],
            AdcResolver::with_sources(None, Some(adc_file), None, &["scope-a", "scope-b"]),
        );
        let credential = login.fetch().await.unwrap();

        assert_eq!(credential.access_token, "gcloud-access");
        let args = std::fs::read_to_string(dir.path().join("args.txt")).unwrap();
        assert_eq!(args.trim(), "auth application-default login --scopes=scope-a,scope-b");
    }

    #[tokio::test]
    async fn test_failed_login_is_an_error() {
        let dir = TempDir::new().unwrap();
        let login = GcloudLogin::new(
            fake_gcloud(dir.path(), 1),
            &["scope"],
            AdcResolver::with_sources(None, None, None, &["scope"]),
        );

        let err = login.fetch().await.unwrap_err();
        assert!(err.to_string().contains("exited with"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let login = GcloudLogin::new(
            "/nonexistent/gcloud",
            &["scope"],
            AdcResolver::with_sources(None, None, None, &["scope"]),
        );

        let err = login.fetch().await.unwrap_err();
        assert!(err.to_string().contains("Cloud SDK"));
    }
}
