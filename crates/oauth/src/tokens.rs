//! Credential type, token endpoint calls and renewal logic

use anyhow::{anyhow, bail, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::fmt;
use tracing::debug;

use crate::adc::MetadataSource;
use crate::client_secret::OAuthClient;
use crate::service_account::ServiceAccountGrant;

/// How an expired access token can be replaced without user interaction
#[derive(Clone)]
pub enum Renewal {
    /// Nothing to renew with; an expired credential must be re-acquired
    None,
    /// OAuth refresh-token grant against the client's token endpoint
    RefreshToken(OAuthClient),
    /// Sign a fresh JWT assertion with the service-account key
    ServiceAccount(ServiceAccountGrant),
    /// Ask the GCE metadata server again
    Metadata(MetadataSource),
}

impl Renewal {
    fn kind(&self) -> &'static str {
        match self {
            Renewal::None => "none",
            Renewal::RefreshToken(_) => "refresh_token",
            Renewal::ServiceAccount(_) => "service_account",
            Renewal::Metadata(_) => "metadata",
        }
    }
}

/// An access token plus whatever is needed to renew it
#[derive(Clone)]
pub struct Credential {
    /// OAuth access token (short-lived, ~1 hour)
    pub access_token: String,

    /// OAuth refresh token, present for user credentials
    pub refresh_token: Option<String>,

    /// When the access token expires; `None` when the issuer did not say
    pub expires_at: Option<DateTime<Utc>>,

    /// Scopes the token was requested for
    pub scopes: Vec<String>,

    pub renewal: Renewal,
}

impl Credential {
    /// Checks if the access token has expired (with 5 minute buffer)
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires_at) => Utc::now() + chrono::Duration::minutes(5) >= expires_at,
            None => false,
        }
    }

    /// A credential is usable as-is when it carries an unexpired token
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_empty() && !self.is_expired()
    }

    /// Whether `renew` has a chance of succeeding
    pub fn can_renew(&self) -> bool {
        match &self.renewal {
            Renewal::None => false,
            Renewal::RefreshToken(_) => self.refresh_token.is_some(),
            Renewal::ServiceAccount(_) | Renewal::Metadata(_) => true,
        }
    }

    /// Replaces the access token using the renewal material
    pub async fn renew(&mut self) -> Result<()> {
        debug!("Renewing credential via {}", self.renewal.kind());

        let response = match &self.renewal {
            Renewal::None => bail!("Credential has no renewal material; re-authentication required"),
            Renewal::RefreshToken(client) => {
                let refresh_token = self
                    .refresh_token
                    .as_deref()
                    .ok_or_else(|| anyhow!("Credential has no refresh token; re-authentication required"))?;
                refresh_access_token(client, refresh_token).await?
            }
            Renewal::ServiceAccount(grant) => grant.request_token().await?,
            Renewal::Metadata(source) => source.request_token().await?,
        };

        self.apply(response);
        Ok(())
    }

    /// Returns a fresh access token, renewing first when expired
    pub async fn access_token(&mut self) -> Result<&str> {
        if self.is_expired() {
            self.renew().await?;
        }
        Ok(&self.access_token)
    }

    pub(crate) fn apply(&mut self, response: TokenResponse) {
        self.expires_at = response.expires_at();
        self.access_token = response.access_token;
        // Keep the original refresh token unless the server rotated it
        if let Some(rotated) = response.refresh_token {
            self.refresh_token = Some(rotated);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .field("renewal", &self.renewal.kind())
            .finish()
    }
}

/// Response from Google's token endpoint
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .map(|secs| Utc::now() + chrono::Duration::seconds(secs))
    }
}

/// Error response from Google's token endpoint
#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    error: String,
    error_description: Option<String>,
}

/// Posts a form to a token endpoint and decodes the token response
pub(crate) async fn post_token_request(
    token_uri: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse> {
    let client = reqwest::Client::new();

    let response = client.post(token_uri).form(form).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let error_text = response.text().await?;

        // Try to parse as error response
        if let Ok(error_resp) = serde_json::from_str::<TokenErrorResponse>(&error_text) {
            if error_resp.error == "invalid_grant" {
                return Err(anyhow!(
                    "Token revoked or expired ({}). Delete the token file and re-authenticate.",
                    error_resp.error_description.unwrap_or_default()
                ));
            }
            return Err(anyhow!(
                "Token request failed: {} - {}",
                error_resp.error,
                error_resp.error_description.unwrap_or_default()
            ));
        }

        return Err(anyhow!("Token request failed ({}): {}", status, error_text));
    }

    Ok(response.json().await?)
}

/// Refreshes an access token using a refresh token
///
/// # Arguments
/// * `client` - OAuth client the refresh token was issued to
/// * `refresh_token` - The refresh token to use
pub(crate) async fn refresh_access_token(
    client: &OAuthClient,
    refresh_token: &str,
) -> Result<TokenResponse> {
    post_token_request(
        &client.token_uri,
        &[
            ("client_id", client.client_id.as_str()),
            ("client_secret", client.client_secret.as_str()),
            ("refresh_token", refresh_token),
            ("grant_type", "refresh_token"),
        ],
    )
    .await
}
