//! The `quick-auth` run: credential chain, access test, marker

use anyhow::Result;

use common::Config;
use directory::{test_workspace_access, DirectoryClient};
use oauth::{CredentialChain, CredentialProbe};

use crate::console;
use crate::marker::AuthMarker;

/// How a diagnostic run ended
#[derive(Debug, PartialEq)]
pub enum Verdict {
    /// A credential worked and the access test passed
    Authenticated { provider: String },
    /// Every credential source failed
    NoCredential,
    /// A credential was found but the access test failed
    InsufficientPermissions,
}

/// Runs the chain and the access test, printing the report as it goes
///
/// Failures are reported through the returned [`Verdict`]; only a marker
/// that cannot be written is an error.
pub async fn run(
    config: &Config,
    chain: &CredentialChain,
    probe: Option<&dyn CredentialProbe>,
) -> Result<Verdict> {
    println!("\n🔐 Attempting Google Workspace authentication...");
    let report = chain.resolve(probe).await;
    print!("{}", console::chain_report(&report));

    let Some(resolved) = report.resolved else {
        println!("\n✗ Could not authenticate");
        println!("\nManual steps needed:");
        println!("{}", console::numbered(console::MANUAL_STEPS));
        return Ok(Verdict::NoCredential);
    };

    println!("\n🧪 Testing Google Workspace access...");
    let client = DirectoryClient::from_config(resolved.credential, config);
    match test_workspace_access(&client).await {
        Ok(access) => {
            print!("{}", console::access_report(&access));
            AuthMarker::authenticated().write(&config.files.auth_marker)?;
            println!("\n✨ Authentication successful! ({})", resolved.provider);
            println!("You can now run: setup-workspace");
            Ok(Verdict::Authenticated {
                provider: resolved.provider,
            })
        }
        Err(e) => {
            println!("✗ Workspace access test failed: {}", e);
            println!("\n✗ Authentication failed - insufficient permissions");
            Ok(Verdict::InsufficientPermissions)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use oauth::{Credential, CredentialProvider, Renewal};
    use tempfile::TempDir;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct Fixed(Option<&'static str>);

    #[async_trait]
    impl CredentialProvider for Fixed {
        fn name(&self) -> String {
            "fixed".to_string()
        }

        async fn fetch(&self) -> Result<Credential> {
            match self.0 {
                Some(token) => Ok(Credential {
                    access_token: token.into(),
                    refresh_token: None,
                    expires_at: None,
                    scopes: vec![],
                    renewal: Renewal::None,
                }),
                None => Err(anyhow!("no credentials found")),
            }
        }
    }

    fn config(dir: &TempDir, server: &MockServer) -> Config {
        let mut config = Config::default();
        config.files.auth_marker = dir.path().join("auth_working.json");
        config.endpoints.directory = format!("{}/admin/directory/v1", server.uri());
        config
    }

    async fn mount_json(server: &MockServer, route: &str, status: u16, body: serde_json::Value) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_json(body))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        let config = config(&dir, &server);
        let chain = CredentialChain::new().with(Fixed(None));

        let verdict = run(&config, &chain, None).await.unwrap();

        assert_eq!(verdict, Verdict::NoCredential);
        assert!(!config.files.auth_marker.exists());
    }

    #[tokio::test]
    async fn test_failed_access_test_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/admin/directory/v1/customer/my_customer/domains",
            403,
            serde_json::json!({"error": {"code": 403, "message": "Not Authorized to access this resource/api"}}),
        )
        .await;
        let config = config(&dir, &server);
        let chain = CredentialChain::new().with(Fixed(Some("token")));

        let verdict = run(&config, &chain, None).await.unwrap();

        assert_eq!(verdict, Verdict::InsufficientPermissions);
        assert!(!config.files.auth_marker.exists());
    }

    #[tokio::test]
    async fn test_success_writes_marker() {
        let dir = TempDir::new().unwrap();
        let server = MockServer::start().await;
        mount_json(
            &server,
            "/admin/directory/v1/customer/my_customer/domains",
            200,
            serde_json::json!({"domains": [{"domainName": "aribia.llc", "verified": true}]}),
        )
        .await;
        mount_json(&server, "/admin/directory/v1/users", 200, serde_json::json!({"users": []})).await;
        mount_json(&server, "/admin/directory/v1/groups", 200, serde_json::json!({})).await;
        let config = config(&dir, &server);
        let chain = CredentialChain::new().with(Fixed(Some("token")));

        let verdict = run(&config, &chain, None).await.unwrap();

        assert_eq!(
            verdict,
            Verdict::Authenticated {
                provider: "fixed".to_string()
            }
        );
        assert!(config.files.auth_marker.exists());
    }
}
