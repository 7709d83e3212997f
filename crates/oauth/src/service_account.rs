//! Service-account credentials (JWT bearer grant)
//!
//! A key file is turned into a signed RS256 assertion which Google's token
//! endpoint trades for an access token. With domain-wide delegation the
//! assertion names an admin user in `sub` and the token acts as that user.

use anyhow::{anyhow, Context, Result};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

use crate::constants::{ASSERTION_LIFETIME_SECS, GOOGLE_TOKEN_URL, JWT_BEARER_GRANT};
use crate::tokens::{post_token_request, Credential, Renewal, TokenResponse};

/// JSON key file downloaded for a service account
#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub project_id: Option<String>,
    #[serde(default)]
    pub private_key_id: Option<String>,
    pub private_key: String,
    pub client_email: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_token_uri() -> String {
    GOOGLE_TOKEN_URL.to_string()
}

impl ServiceAccountKey {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read service account file {}", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("Invalid service account file {}", path.display()))
    }

    pub fn from_json(content: &str) -> Result<Self> {
        let key: Self = serde_json::from_str(content)?;
        if key.kind != "service_account" {
            return Err(anyhow!("Expected type \"service_account\", found \"{}\"", key.kind));
        }
        Ok(key)
    }
}

/// Claims of the assertion sent to the token endpoint
#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: i64,
    exp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    sub: Option<String>,
}

/// Everything needed to mint access tokens for a service account
#[derive(Clone)]
pub struct ServiceAccountGrant {
    key: ServiceAccountKey,
    scopes: Vec<String>,
    subject: Option<String>,
}

impl ServiceAccountGrant {
    pub fn new(key: ServiceAccountKey, scopes: &[&str], subject: Option<String>) -> Self {
        Self {
            key,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            subject,
        }
    }

    /// Signs a fresh assertion for the configured scopes
    fn assertion(&self) -> Result<String> {
        let now = chrono::Utc::now().timestamp();
        let claims = AssertionClaims {
            iss: self.key.client_email.clone(),
            scope: self.scopes.join(" "),
            aud: self.key.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
            sub: self.subject.clone(),
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key.private_key_id.clone();

        let key = EncodingKey::from_rsa_pem(self.key.private_key.as_bytes())
            .map_err(|e| anyhow!("Invalid service account private key: {}", e))?;

        encode(&header, &claims, &key).map_err(|e| anyhow!("Failed to sign assertion: {}", e))
    }

    pub(crate) async fn request_token(&self) -> Result<TokenResponse> {
        let assertion = self.assertion()?;
        debug!("Requesting token for service account {}", self.key.client_email);

        post_token_request(
            &self.key.token_uri,
            &[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)],
        )
        .await
    }

    /// Exchanges an assertion for a credential that re-signs on renewal
    pub async fn fetch_credential(self) -> Result<Credential> {
        let response = self.request_token().await?;

        info!(
            "Obtained service account token for {}{}",
            self.key.client_email,
            self.subject
                .as_deref()
                .map(|s| format!(" acting as {}", s))
                .unwrap_or_default()
        );

        let mut credential = Credential {
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
            scopes: self.scopes.clone(),
            renewal: Renewal::ServiceAccount(self),
        };
        credential.apply(response);
        Ok(credential)
    }
}
