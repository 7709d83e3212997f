//! On-disk token cache
//!
//! The cache is a single JSON file (`token.json` by default) in the
//! `authorized_user` layout used by Google's client libraries, so the same
//! reader also understands ADC files written by gcloud:
//!
//! ```json
//! {"token": "...", "refresh_token": "...", "token_uri": "...",
//!  "client_id": "...", "client_secret": "...", "scopes": [...],
//!  "expiry": "2026-01-01T00:00:00Z"}
//! ```

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::client_secret::OAuthClient;
use crate::constants::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};
use crate::tokens::{Credential, Renewal};

/// Serialized user credential
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthorizedUserFile {
    /// `authorized_user` in ADC files, absent in token caches
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    /// Last access token; ADC files do not carry one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    #[serde(default)]
    pub refresh_token: Option<String>,

    #[serde(default)]
    pub token_uri: Option<String>,

    pub client_id: String,

    pub client_secret: String,

    #[serde(default)]
    pub scopes: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl AuthorizedUserFile {
    /// Converts the file into a credential that renews through the refresh
    /// token grant
    pub fn into_credential(self) -> Credential {
        let client = OAuthClient {
            client_id: self.client_id,
            client_secret: self.client_secret,
            auth_uri: GOOGLE_AUTH_URL.to_string(),
            token_uri: self.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
        };

        Credential {
            access_token: self.token.unwrap_or_default(),
            refresh_token: self.refresh_token,
            // A token without a recorded expiry cannot be trusted
            expires_at: self.expiry.or_else(|| Some(Utc::now())),
            scopes: self.scopes,
            renewal: Renewal::RefreshToken(client),
        }
    }

    /// Builds the cache representation of a user credential
    pub fn from_credential(credential: &Credential) -> Result<Self> {
        let Renewal::RefreshToken(client) = &credential.renewal else {
            return Err(anyhow!("Only user credentials can be written to the token cache"));
        };

        Ok(Self {
            kind: None,
            token: Some(credential.access_token.clone()),
            refresh_token: credential.refresh_token.clone(),
            token_uri: Some(client.token_uri.clone()),
            client_id: client.client_id.clone(),
            client_secret: client.client_secret.clone(),
            scopes: credential.scopes.clone(),
            expiry: credential.expires_at,
        })
    }
}

/// Handles persistent storage of the cached OAuth token
pub struct TokenStorage {
    /// Path to the token JSON file
    path: PathBuf,
}

impl TokenStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the token file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the cached credential, `None` when no cache exists yet
    pub fn load(&self) -> Result<Option<Credential>> {
        if !self.path.exists() {
            debug!("No token cache at {}", self.path.display());
            return Ok(None);
        }

        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read token file {}", self.path.display()))?;
        let file: AuthorizedUserFile = serde_json::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse token file {}: {}", self.path.display(), e))?;

        debug!("Loaded cached token from {}", self.path.display());
        Ok(Some(file.into_credential()))
    }

    /// Writes the credential to the token file, replacing any previous one
    pub fn save(&self, credential: &Credential) -> Result<()> {
        let file = AuthorizedUserFile::from_credential(credential)?;
        let content = serde_json::to_string_pretty(&file)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, content)
            .with_context(|| format!("Failed to write token file {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }

        debug!("Saved token to {}", self.path.display());
        Ok(())
    }
}
