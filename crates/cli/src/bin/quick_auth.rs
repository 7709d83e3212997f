//! quick-auth: find a working credential and test Workspace access
//!
//! Tries Application Default Credentials, each service-account key file and
//! finally `gcloud auth application-default login`. The first credential that
//! can list the customer's domains is used for the access test.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

use directory::DirectoryProbe;
use oauth::{diagnostic_chain, CredentialProbe};
use workspace_admin::{console, diagnose};

#[derive(Parser, Debug)]
#[command(name = "quick-auth", version, about = "Google Workspace quick authentication test")]
struct Args {
    /// Config file (defaults to ./workspace-admin.toml, then the platform config dir)
    #[arg(long, env = "WORKSPACE_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Service-account key file tried before the configured ones
    #[arg(long, env = "WORKSPACE_ADMIN_SERVICE_ACCOUNT")]
    service_account: Option<PathBuf>,

    /// Admin user impersonated by service accounts with domain-wide delegation
    #[arg(long, env = "WORKSPACE_ADMIN_DELEGATED_ADMIN")]
    delegated_admin: Option<String>,

    /// Where to write the success marker
    #[arg(long, env = "WORKSPACE_ADMIN_MARKER")]
    marker: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    workspace_admin::init_logging();
    let args = Args::parse();

    let mut config = workspace_admin::load_config(args.config.as_deref())?;
    if let Some(path) = args.service_account {
        config.files.service_accounts.insert(0, path);
    }
    if let Some(subject) = args.delegated_admin {
        config.workspace.delegated_admin = Some(subject);
    }
    if let Some(path) = args.marker {
        config.files.auth_marker = path;
    }

    println!("{}", console::banner("🚀 Google Workspace Quick Authentication Test"));

    // Outcomes are printed; the exit status only reflects unexpected errors
    let probe = DirectoryProbe::new(config.clone());
    diagnose::run(&config, &diagnostic_chain(&config), Some(&probe as &dyn CredentialProbe)).await?;
    Ok(())
}
