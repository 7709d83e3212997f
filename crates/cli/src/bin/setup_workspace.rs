//! setup-workspace: create the groups listed in a CSV file and add their owners

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;

use directory::{DirectoryClient, GroupProvisioner, ProvisionOptions};
use oauth::constants::PROVISIONING_SCOPES;
use oauth::{BrowserConsent, InstalledAppAuthenticator, TokenStorage};
use workspace_admin::console;

#[derive(Parser, Debug)]
#[command(name = "setup-workspace", version, about = "Provision Google Workspace groups from CSV")]
struct Args {
    /// Config file (defaults to ./workspace-admin.toml, then the platform config dir)
    #[arg(long, env = "WORKSPACE_ADMIN_CONFIG")]
    config: Option<PathBuf>,

    /// Group definitions
    #[arg(long, env = "WORKSPACE_ADMIN_GROUPS_CSV")]
    csv: Option<PathBuf>,

    /// OAuth token cache
    #[arg(long, env = "WORKSPACE_ADMIN_TOKEN")]
    token: Option<PathBuf>,

    /// OAuth client secret
    #[arg(long, env = "WORKSPACE_ADMIN_CLIENT_SECRET")]
    credentials: Option<PathBuf>,

    /// Make every created group a collaborative inbox
    #[arg(long)]
    collaborative_inbox: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    workspace_admin::init_logging();
    let args = Args::parse();

    let mut config = workspace_admin::load_config(args.config.as_deref())?;
    if let Some(path) = args.csv {
        config.files.groups_csv = path;
    }
    if let Some(path) = args.token {
        config.files.token = path;
    }
    if let Some(path) = args.credentials {
        config.files.client_secret = path;
    }
    let options = ProvisionOptions {
        collaborative_inbox: args.collaborative_inbox || config.workspace.collaborative_inbox,
    };

    println!("{}", console::banner("Google Workspace Setup"));

    let authenticator = InstalledAppAuthenticator::new(
        TokenStorage::new(&config.files.token),
        BrowserConsent::new(&config.files.client_secret, PROVISIONING_SCOPES),
    );
    let credential = match authenticator.authenticate().await {
        Ok(credential) => credential,
        Err(e) => {
            println!("\n✗ Could not authenticate");
            println!("\nManual steps needed:");
            println!("{}", console::numbered(console::MANUAL_STEPS));
            return Err(e.context("Authentication failed"));
        }
    };
    let client = DirectoryClient::from_config(credential, &config);

    println!("\nCreating groups...");
    let report = GroupProvisioner::new(&client, options)
        .provision_file(&config.files.groups_csv)
        .await
        .context("Group provisioning aborted")?;
    print!("{}", console::provision_report(&report));

    println!("\n✓ Setup complete!");
    println!("\nNext steps:");
    println!("{}", console::numbered(console::NEXT_STEPS));
    Ok(())
}
