//! Ordered credential fallback chain
//!
//! Each source implements [`CredentialProvider`]. The chain asks them in
//! order and stops at the first credential that also passes the optional
//! probe. A failed attempt is logged and never retried.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use tracing::{debug, info, warn};

use common::Config;

use crate::adc::AdcResolver;
use crate::constants::DIAGNOSTIC_SCOPES;
use crate::gcloud::GcloudLogin;
use crate::service_account::{ServiceAccountGrant, ServiceAccountKey};
use crate::tokens::Credential;

/// One way of obtaining a credential
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Human-readable label used in logs and reports
    fn name(&self) -> String;

    /// Providers that cannot apply (a key file that does not exist) are
    /// skipped without counting as an attempt
    fn is_available(&self) -> bool {
        true
    }

    async fn fetch(&self) -> Result<Credential>;
}

/// Verifies that a freshly obtained credential actually works
#[async_trait]
pub trait CredentialProbe: Send + Sync {
    async fn probe(&self, credential: &Credential) -> Result<()>;
}

/// Outcome of one provider attempt
#[derive(Debug)]
pub struct Attempt {
    pub provider: String,
    /// `None` when the attempt produced the resolved credential
    pub error: Option<String>,
}

/// The credential the chain settled on
#[derive(Debug)]
pub struct Resolved {
    pub provider: String,
    pub credential: Credential,
}

#[derive(Debug, Default)]
pub struct ChainReport {
    pub attempts: Vec<Attempt>,
    pub resolved: Option<Resolved>,
}

#[derive(Default)]
pub struct CredentialChain {
    providers: Vec<Box<dyn CredentialProvider>>,
}

impl CredentialChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider; providers run in insertion order
    pub fn with(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.providers.push(Box::new(provider));
        self
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Tries every provider in order until one yields a credential that
    /// passes `probe`
    pub async fn resolve(&self, probe: Option<&dyn CredentialProbe>) -> ChainReport {
        let mut report = ChainReport::default();

        for (step, provider) in self.providers.iter().enumerate() {
            let name = provider.name();
            if !provider.is_available() {
                debug!("Skipping {}: not available", name);
                continue;
            }

            info!("[{}/{}] Trying {}", step + 1, self.providers.len(), name);
            let outcome = match provider.fetch().await {
                Ok(credential) => match probe {
                    Some(probe) => probe.probe(&credential).await.map(|_| credential),
                    None => Ok(credential),
                },
                Err(e) => Err(e),
            };

            match outcome {
                Ok(credential) => {
                    info!("{} working", name);
                    report.attempts.push(Attempt {
                        provider: name.clone(),
                        error: None,
                    });
                    report.resolved = Some(Resolved {
                        provider: name,
                        credential,
                    });
                    return report;
                }
                Err(e) => {
                    warn!("{} failed: {:#}", name, e);
                    report.attempts.push(Attempt {
                        provider: name,
                        error: Some(format!("{:#}", e)),
                    });
                }
            }
        }

        warn!("All {} credential sources failed", report.attempts.len());
        report
    }
}

/// Application Default Credentials as a chain step
pub struct AdcProvider {
    resolver: AdcResolver,
}

impl AdcProvider {
    pub fn new(resolver: AdcResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl CredentialProvider for AdcProvider {
    fn name(&self) -> String {
        "Application Default Credentials".to_string()
    }

    async fn fetch(&self) -> Result<Credential> {
        self.resolver.resolve().await
    }
}

/// A service-account key file at a fixed path
pub struct ServiceAccountFileProvider {
    path: PathBuf,
    scopes: Vec<&'static str>,
    subject: Option<String>,
}

impl ServiceAccountFileProvider {
    pub fn new(path: impl Into<PathBuf>, scopes: &[&'static str], subject: Option<String>) -> Self {
        Self {
            path: path.into(),
            scopes: scopes.to_vec(),
            subject,
        }
    }
}

#[async_trait]
impl CredentialProvider for ServiceAccountFileProvider {
    fn name(&self) -> String {
        format!("service account {}", self.path.display())
    }

    fn is_available(&self) -> bool {
        self.path.exists()
    }

    async fn fetch(&self) -> Result<Credential> {
        let key = ServiceAccountKey::from_file(&self.path)?;
        ServiceAccountGrant::new(key, &self.scopes, self.subject.clone())
            .fetch_credential()
            .await
    }
}

/// The diagnostic chain: ADC, each service-account key path, then gcloud
pub fn diagnostic_chain(config: &Config) -> CredentialChain {
    let scopes = DIAGNOSTIC_SCOPES;
    let subject = config.workspace.delegated_admin.clone();
    let adc = || AdcResolver::from_env(&config.endpoints.metadata_server, scopes, subject.clone());

    let mut chain = CredentialChain::new().with(AdcProvider::new(adc()));
    for path in &config.files.service_accounts {
        chain = chain.with(ServiceAccountFileProvider::new(path, scopes, subject.clone()));
    }
    chain.with(GcloudLogin::new(&config.workspace.gcloud_bin, scopes, adc()))
}
