//! OAuth 2.0 installed-app flow with PKCE
//!
//! Implements the consent flow for a desktop operator:
//! 1. Create the state and PKCE verifier
//! 2. Bind a loopback callback server on an ephemeral port
//! 3. Open the browser for user authorization
//! 4. Wait for the redirect and exchange the code for tokens

use anyhow::{anyhow, Result};
use axum::{
    extract::Query,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::Rng;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{oneshot, Mutex};
use tracing::{error, info, warn};

use crate::client_secret::OAuthClient;
use crate::constants::{CALLBACK_PATH, CALLBACK_TIMEOUT_SECS};
use crate::tokens::{post_token_request, Credential, Renewal};

/// 32 random bytes, base64url without padding
fn random_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge for a PKCE verifier
fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// A loopback listener and the redirect URI that reaches it
pub struct CallbackListener {
    listener: TcpListener,
    redirect_uri: String,
}

impl CallbackListener {
    /// Binds 127.0.0.1 on a port chosen by the OS
    pub async fn bind() -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow!("Failed to bind OAuth callback listener: {}", e))?;
        let port = listener.local_addr()?.port();

        Ok(Self {
            listener,
            redirect_uri: format!("http://127.0.0.1:{}{}", port, CALLBACK_PATH),
        })
    }

    pub fn redirect_uri(&self) -> &str {
        &self.redirect_uri
    }
}

/// Manages one run of the installed-app authorization flow
pub struct OAuthFlow {
    client: OAuthClient,
    scopes: Vec<String>,
    state: String,
    code_verifier: String,
    code_challenge: String,
    callback_timeout: Duration,
}

impl OAuthFlow {
    /// Fresh state and PKCE verifier for every flow
    pub fn new(client: OAuthClient, scopes: &[&str]) -> Self {
        let code_verifier = random_token();
        Self {
            client,
            scopes: scopes.iter().map(|s| s.to_string()).collect(),
            state: random_token(),
            code_challenge: code_challenge(&code_verifier),
            code_verifier,
            callback_timeout: Duration::from_secs(CALLBACK_TIMEOUT_SECS),
        }
    }

    /// How long to wait for the redirect (5 minutes unless overridden)
    pub fn with_callback_timeout(mut self, timeout: Duration) -> Self {
        self.callback_timeout = timeout;
        self
    }

    /// Consent page URL; `access_type=offline` and `prompt=consent` make
    /// Google issue a refresh token
    pub fn authorization_url(&self, redirect_uri: &str) -> String {
        let scopes = self.scopes.join(" ");
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope={}&state={}&code_challenge={}&code_challenge_method=S256&access_type=offline&prompt=consent",
            self.client.auth_uri,
            urlencoding::encode(&self.client.client_id),
            urlencoding::encode(redirect_uri),
            urlencoding::encode(&scopes),
            &self.state,
            &self.code_challenge,
        )
    }

    /// Runs the whole consent flow and returns the resulting credential
    pub async fn run(&self) -> Result<Credential> {
        let listener = CallbackListener::bind().await?;
        let redirect_uri = listener.redirect_uri().to_string();
        let url = self.authorization_url(&redirect_uri);

        println!("Please visit this URL to authorize this application:\n{}\n", url);
        if let Err(e) = open::that(&url) {
            warn!("Could not open a browser automatically: {}", e);
        }

        let code = self.wait_for_callback(listener).await?;
        self.exchange_code(&code, &redirect_uri).await
    }

    /// Serves the callback listener until Google redirects back and returns
    /// the authorization code
    pub async fn wait_for_callback(&self, listener: CallbackListener) -> Result<String> {
        let expected_state = self.state.clone();
        let (tx, rx) = oneshot::channel::<Result<String>>();
        let tx = Arc::new(Mutex::new(Some(tx)));

        let app = Router::new().route(
            CALLBACK_PATH,
            get({
                let tx = tx.clone();
                let expected_state = expected_state.clone();
                move |Query(params): Query<CallbackParams>| {
                    let tx = tx.clone();
                    let expected_state = expected_state.clone();
                    async move {
                        // Prefetches and reloads carry no state; keep waiting
                        if params.state.is_none() {
                            return (StatusCode::BAD_REQUEST, Html(WAITING_HTML)).into_response();
                        }
                        let outcome = params.into_outcome(&expected_state);
                        let page = if outcome.is_ok() { SUCCESS_HTML } else { ERROR_HTML };
                        if let Some(tx) = tx.lock().await.take() {
                            let _ = tx.send(outcome);
                        }
                        Html(page).into_response()
                    }
                }
            }),
        );

        info!("OAuth callback server listening on {}", listener.redirect_uri);

        let server_handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener.listener, app).await {
                error!("OAuth callback server error: {}", e);
            }
        });

        let result = tokio::time::timeout(self.callback_timeout, rx).await;

        server_handle.abort();

        result
            .map_err(|_| {
                anyhow!(
                    "OAuth timeout - no callback received within {} seconds",
                    self.callback_timeout.as_secs()
                )
            })?
            .map_err(|_| anyhow!("OAuth callback channel closed unexpectedly"))?
    }

    /// Redeems the code at the token endpoint, proving possession of the
    /// PKCE verifier
    pub async fn exchange_code(&self, code: &str, redirect_uri: &str) -> Result<Credential> {
        info!("Exchanging authorization code for tokens");

        let response = post_token_request(
            &self.client.token_uri,
            &[
                ("client_id", self.client.client_id.as_str()),
                ("client_secret", self.client.client_secret.as_str()),
                ("code", code),
                ("code_verifier", &self.code_verifier),
                ("grant_type", "authorization_code"),
                ("redirect_uri", redirect_uri),
            ],
        )
        .await?;

        if response.refresh_token.is_none() {
            warn!("Token response carried no refresh token; the next expiry will need consent again");
        }

        let mut credential = Credential {
            access_token: String::new(),
            refresh_token: None,
            expires_at: None,
            scopes: self.scopes.clone(),
            renewal: Renewal::RefreshToken(self.client.clone()),
        };
        credential.apply(response);

        info!("Authorization code exchanged successfully");
        Ok(credential)
    }
}

/// Redirect query string
#[derive(serde::Deserialize)]
struct CallbackParams {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

impl CallbackParams {
    fn into_outcome(self, expected_state: &str) -> Result<String> {
        if self.state.as_deref() != Some(expected_state) {
            warn!("OAuth callback received with invalid state");
            return Err(anyhow!("Invalid OAuth state - possible CSRF attack"));
        }

        if let Some(error) = self.error {
            error!("OAuth error: {}", error);
            return Err(anyhow!("OAuth error: {}", error));
        }

        info!("OAuth callback received successfully");
        self.code
            .ok_or_else(|| anyhow!("No authorization code in callback"))
    }
}

const SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Workspace Admin - Authorized</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 80px;">
    <h1>Authorization complete</h1>
    <p>You can close this window and return to the terminal.</p>
</body>
</html>"#;

const WAITING_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Workspace Admin - Waiting</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 80px;">
    <h1>Waiting for authorization</h1>
    <p>Finish signing in from the link printed in the terminal.</p>
</body>
</html>"#;

const ERROR_HTML: &str = r#"<!DOCTYPE html>
<html>
<head><title>Workspace Admin - Authorization Failed</title></head>
<body style="font-family: sans-serif; text-align: center; padding-top: 80px;">
    <h1>Authorization failed</h1>
    <p>Check the terminal for details and run the tool again.</p>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::tests::test_client;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_pkce_challenge_is_sha256_of_verifier() {
        // RFC 7636 appendix B
        assert_eq!(
            code_challenge("dBjftJeZ4CVP-1mB92f2JksWZ9QeuNAfi7Ub2Wf6a5c"),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
        assert_ne!(random_token(), random_token());
    }

    #[test]
    fn test_authorization_url() {
        let flow = OAuthFlow::new(test_client("http://unused"), &["scope-a", "scope-b"]);
        let url = flow.authorization_url("http://127.0.0.1:4000/");

        assert!(url.starts_with(crate::constants::GOOGLE_AUTH_URL));
        assert!(url.contains("client_id=client-id"));
        assert!(url.contains("redirect_uri=http%3A%2F%2F127.0.0.1%3A4000%2F"));
        assert!(url.contains("scope=scope-a%20scope-b"));
        assert!(url.contains(&format!("state={}", flow.state)));
        assert!(url.contains("code_challenge_method=S256"));
        assert!(url.contains("access_type=offline"));
    }

    #[tokio::test]
    async fn test_callback_returns_code() {
        let flow = OAuthFlow::new(test_client("http://unused"), &["scope"]);
        let listener = CallbackListener::bind().await.unwrap();
        let callback = format!(
            "{}?state={}&code=auth-code&scope=scope",
            listener.redirect_uri(),
            flow.state
        );

        let browser = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            reqwest::get(&callback).await.unwrap().status()
        });

        let code = flow.wait_for_callback(listener).await.unwrap();
        assert_eq!(code, "auth-code");
        assert!(browser.await.unwrap().is_success());
    }

    #[tokio::test]
    async fn test_callback_rejects_wrong_state() {
        let flow = OAuthFlow::new(test_client("http://unused"), &["scope"]);
        let listener = CallbackListener::bind().await.unwrap();
        let callback = format!("{}?state=forged&code=auth-code", listener.redirect_uri());

        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            let _ = reqwest::get(&callback).await;
        });

        let err = flow.wait_for_callback(listener).await.unwrap_err();
        assert!(err.to_string().contains("Invalid OAuth state"));
    }

    #[tokio::test]
    async fn test_request_without_state_keeps_waiting() {
        let flow = OAuthFlow::new(test_client("http://unused"), &["scope"]);
        let listener = CallbackListener::bind().await.unwrap();
        let bare = listener.redirect_uri().to_string();
        let callback = format!("{}?state={}&code=auth-code", bare, flow.state);

        let browser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            let prefetch = reqwest::get(&bare).await.unwrap().status();
            let redirect = reqwest::get(&callback).await.unwrap().status();
            (prefetch, redirect)
        });

        let code = flow.wait_for_callback(listener).await.unwrap();
        assert_eq!(code, "auth-code");

        let (prefetch, redirect) = browser.await.unwrap();
        assert_eq!(prefetch, reqwest::StatusCode::BAD_REQUEST);
        assert!(redirect.is_success());
    }

    #[tokio::test]
    async fn test_callback_timeout() {
        let flow = OAuthFlow::new(test_client("http://unused"), &["scope"])
            .with_callback_timeout(Duration::from_millis(100));
        let listener = CallbackListener::bind().await.unwrap();

        let err = flow.wait_for_callback(listener).await.unwrap_err();
        assert!(err.to_string().contains("OAuth timeout"));
    }

    #[test]
    fn test_callback_error_parameter() {
        let params = CallbackParams {
            code: None,
            state: Some("s".into()),
            error: Some("access_denied".into()),
        };
        let err = params.into_outcome("s").unwrap_err();
        assert!(err.to_string().contains("access_denied"));
    }

    #[tokio::test]
    async fn test_exchange_code_sends_verifier() {
        let server = MockServer::start().await;
        let flow = OAuthFlow::new(test_client(&format!("{}/token", server.uri())), &["scope"]);

        Mock::given(method("POST"))
            .and(path("/token"))
            .and(body_string_contains("grant_type=authorization_code"))
            .and(body_string_contains("code=auth-code"))
            .and(body_string_contains(format!("code_verifier={}", flow.code_verifier)))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "access_token": "user-access",
                "refresh_token": "user-refresh",
                "expires_in": 3599,
                "scope": "scope",
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let credential = flow
            .exchange_code("auth-code", "http://127.0.0.1:4000/")
            .await
            .unwrap();

        assert_eq!(credential.access_token, "user-access");
        assert_eq!(credential.refresh_token.as_deref(), Some("user-refresh"));
        assert!(credential.is_valid());
    }
}
