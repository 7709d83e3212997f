//! Google credentials for the Admin SDK
//!
//! This crate obtains access tokens for the Workspace admin tools: a cached
//! OAuth token with installed-app consent as fallback, and a chain of
//! Application Default Credentials, service-account key files and the gcloud
//! CLI for non-interactive use.

pub mod adc;
pub mod chain;
pub mod client_secret;
pub mod constants;
pub mod flow;
pub mod gcloud;
pub mod installed;
pub mod service_account;
pub mod storage;
pub mod tokens;

pub use chain::{diagnostic_chain, ChainReport, CredentialChain, CredentialProbe, CredentialProvider};
pub use client_secret::OAuthClient;
pub use flow::OAuthFlow;
pub use installed::{BrowserConsent, ConsentFlow, InstalledAppAuthenticator};
pub use storage::TokenStorage;
pub use tokens::{Credential, Renewal};
