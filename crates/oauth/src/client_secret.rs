//! OAuth client secret file (`credentials.json`) as downloaded from the
//! Cloud console

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::constants::{GOOGLE_AUTH_URL, GOOGLE_TOKEN_URL};

/// The OAuth client identity used for consent and refresh
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthClient {
    pub client_id: String,
    pub client_secret: String,
    pub auth_uri: String,
    pub token_uri: String,
}

/// The console wraps the client under the application type
#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<ClientSecretEntry>,
    web: Option<ClientSecretEntry>,
}

#[derive(Deserialize)]
struct ClientSecretEntry {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    auth_uri: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl OAuthClient {
    /// Reads an `installed` or `web` client secret file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read client secret file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid client secret file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(content)?;
        let entry = file
            .installed
            .or(file.web)
            .ok_or_else(|| anyhow!("Expected an \"installed\" or \"web\" client entry"))?;

        Ok(Self {
            client_id: entry.client_id,
            client_secret: entry.client_secret,
            auth_uri: entry.auth_uri.unwrap_or_else(|| GOOGLE_AUTH_URL.to_string()),
            token_uri: entry.token_uri.unwrap_or_else(|| GOOGLE_TOKEN_URL.to_string()),
        })
    }
}
