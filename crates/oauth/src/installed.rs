//! Cached-token authentication for an operator at a terminal
//!
//! Order of preference:
//! 1. the cached token, as-is when still valid
//! 2. the cached token after a refresh-token grant
//! 3. interactive consent in the browser
//!
//! Whenever a new token is obtained it is written back to the cache.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::chain::CredentialProvider;
use crate::client_secret::OAuthClient;
use crate::flow::OAuthFlow;
use crate::storage::TokenStorage;
use crate::tokens::Credential;

/// Source of a brand new user credential
#[async_trait]
pub trait ConsentFlow: Send + Sync {
    async fn obtain(&self) -> Result<Credential>;
}

/// Consent in the default browser using the client secret file
pub struct BrowserConsent {
    client_secret: PathBuf,
    scopes: Vec<&'static str>,
}

impl BrowserConsent {
    pub fn new(client_secret: impl Into<PathBuf>, scopes: &[&'static str]) -> Self {
        Self {
            client_secret: client_secret.into(),
            scopes: scopes.to_vec(),
        }
    }
}

#[async_trait]
impl ConsentFlow for BrowserConsent {
    async fn obtain(&self) -> Result<Credential> {
        // Only needed when there is no usable cached token
        let client = OAuthClient::from_file(&self.client_secret)?;
        OAuthFlow::new(client, &self.scopes).run().await
    }
}

pub struct InstalledAppAuthenticator {
    storage: TokenStorage,
    consent: Box<dyn ConsentFlow>,
}

impl InstalledAppAuthenticator {
    pub fn new(storage: TokenStorage, consent: impl ConsentFlow + 'static) -> Self {
        Self {
            storage,
            consent: Box::new(consent),
        }
    }

    /// Returns a valid user credential, prompting only when the cache cannot
    /// be used or renewed
    pub async fn authenticate(&self) -> Result<Credential> {
        let cached = match self.storage.load() {
            Ok(cached) => cached,
            Err(e) => {
                warn!("Ignoring unreadable token cache: {:#}", e);
                None
            }
        };

        if let Some(mut credential) = cached {
            if credential.is_valid() {
                info!("Using cached token from {}", self.storage.path().display());
                return Ok(credential);
            }

            if credential.can_renew() {
                match credential.renew().await {
                    Ok(()) => {
                        info!("Refreshed cached token");
                        self.persist(&credential);
                        return Ok(credential);
                    }
                    Err(e) => warn!("Token refresh failed, falling back to consent: {:#}", e),
                }
            } else {
                info!("Cached token expired and has no refresh token");
            }
        }

        let credential = self.consent.obtain().await?;
        self.persist(&credential);
        Ok(credential)
    }

    /// A cache write failure costs a future prompt, not this run
    fn persist(&self, credential: &Credential) {
        if let Err(e) = self.storage.save(credential) {
            warn!("Failed to write token cache {}: {:#}", self.storage.path().display(), e);
        }
    }
}

#[async_trait]
impl CredentialProvider for InstalledAppAuthenticator {
    fn name(&self) -> String {
        format!("OAuth token cache {}", self.storage.path().display())
    }

    async fn fetch(&self) -> Result<Credential> {
        self.authenticate().await
    }
}
