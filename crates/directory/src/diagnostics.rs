//! Workspace access test

use anyhow::Result;
use async_trait::async_trait;
use tracing::info;

use common::Config;
use oauth::{Credential, CredentialProbe};

use crate::api::DirectoryApi;
use crate::client::DirectoryClient;
use crate::error::DirectoryError;
use crate::models::Domain;

/// How many users and groups the access test lists
pub const SAMPLE_SIZE: u32 = 10;

#[derive(Debug)]
pub struct AccessReport {
    pub domains: Vec<Domain>,
    /// Users returned by a listing capped at [`SAMPLE_SIZE`]
    pub user_count: usize,
    /// Groups returned by a listing capped at [`SAMPLE_SIZE`]
    pub group_count: usize,
}

/// Lists domains, then a sample of users and groups
///
/// The first failing call aborts the test.
pub async fn test_workspace_access(api: &dyn DirectoryApi) -> Result<AccessReport, DirectoryError> {
    let domains = api.list_domains().await?;
    for domain in &domains {
        info!("Domain {} (verified: {})", domain.domain_name, domain.verified);
    }

    let user_count = api.list_users(SAMPLE_SIZE).await?.len();
    let group_count = api.list_groups(SAMPLE_SIZE).await?.len();
    info!("Found {} users and {} groups", user_count, group_count);

    Ok(AccessReport {
        domains,
        user_count,
        group_count,
    })
}

/// Accepts a credential only if it can list the customer's domains
pub struct DirectoryProbe {
    config: Config,
}

impl DirectoryProbe {
    pub fn new(config: Config) -> Self {
        Self { config }
    }
}

#[async_trait]
impl CredentialProbe for DirectoryProbe {
    async fn probe(&self, credential: &Credential) -> Result<()> {
        let client = DirectoryClient::from_config(credential.clone(), &self.config);
        client.list_domains().await?;
        Ok(())
    }
}
