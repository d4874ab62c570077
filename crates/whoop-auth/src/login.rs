//! Browser-based login flow
//!
//! Orchestrates one login attempt end to end: generate PKCE material, bind
//! the callback listener, open the authorization URL in the user's browser,
//! wait for the redirect, exchange the code, and persist the token record.
//! The PKCE material lives only for the duration of the attempt, and the
//! listener is torn down on every exit path.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::constants::{AUTHORIZE_ENDPOINT, CALLBACK_TIMEOUT, TOKEN_ENDPOINT};
use crate::credentials::{ClientConfig, CredentialStore, TokenRecord};
use crate::error::Result;
use crate::listener::CallbackServer;
use crate::pkce::{PkceMaterial, build_authorization_url};
use crate::token;

/// OAuth endpoints used by the login flow.
///
/// Kept separate from `ClientConfig` so tests can point the flow at local
/// mock endpoints; production code uses `Endpoints::default()`.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub authorize_url: String,
    pub token_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            authorize_url: AUTHORIZE_ENDPOINT.to_string(),
            token_url: TOKEN_ENDPOINT.to_string(),
        }
    }
}

/// Run the browser login flow with the default callback timeout.
///
/// `open_browser` receives the fully-built authorization URL; production
/// callers hand it to the `open` crate, tests inject a closure that
/// simulates the redirect. A failure to open the browser is not fatal;
/// the caller is expected to have printed the URL for manual use.
pub async fn login<F>(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    config: &ClientConfig,
    store: &dyn CredentialStore,
    open_browser: F,
) -> Result<TokenRecord>
where
    F: FnOnce(&str) -> std::io::Result<()>,
{
    login_with_timeout(http, endpoints, config, store, open_browser, CALLBACK_TIMEOUT).await
}

/// `login` with an explicit bound on the callback wait.
pub async fn login_with_timeout<F>(
    http: &reqwest::Client,
    endpoints: &Endpoints,
    config: &ClientConfig,
    store: &dyn CredentialStore,
    open_browser: F,
    timeout: Duration,
) -> Result<TokenRecord>
where
    F: FnOnce(&str) -> std::io::Result<()>,
{
    config.validate()?;
    let material = PkceMaterial::generate();

    // Bind before opening the browser so the redirect cannot race the bind
    let server = CallbackServer::bind(&config.redirect_uri, &material.state).await?;
    let auth_url = build_authorization_url(&endpoints.authorize_url, config, &material)?;

    debug!("opening authorization URL in browser");
    if let Err(e) = open_browser(&auth_url) {
        warn!(error = %e, "failed to open browser, authorization URL must be visited manually");
    }

    let code = server.wait(timeout).await?;
    debug!("authorization code received, exchanging");

    let record =
        token::exchange_code(http, &endpoints.token_url, config, &code, &material.verifier).await?;
    store.save_token(&record)?;
    info!("login complete, token stored");
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryCredentialStore;
    use axum::Router;
    use axum::http::StatusCode;
    use axum::routing::post;
    use std::net::TcpListener as StdTcpListener;
    use url::Url;

    async fn start_token_endpoint(body: serde_json::Value) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = Router::new().route(
            "/oauth/token",
            post(move || {
                let body = body.clone();
                async move { (StatusCode::OK, axum::Json(body)) }
            }),
        );
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}/oauth/token")
    }

    /// Reserve a port for the redirect URI by binding and dropping an
    /// ephemeral listener.
    fn free_port() -> u16 {
        let listener = StdTcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    /// Simulated browser: pull `state` out of the authorization URL and hit
    /// the redirect URI the way the vendor would.
    fn fake_browser(code: &'static str) -> impl FnOnce(&str) -> std::io::Result<()> {
        move |auth_url: &str| {
            let url = Url::parse(auth_url).unwrap();
            let state = url
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.to_string())
                .unwrap();
            let redirect_uri = url
                .query_pairs()
                .find(|(k, _)| k == "redirect_uri")
                .map(|(_, v)| v.to_string())
                .unwrap();
            tokio::spawn(async move {
                let _ = reqwest::get(format!("{redirect_uri}?code={code}&state={state}")).await;
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn login_flow_end_to_end() {
        let token_url = start_token_endpoint(serde_json::json!({
            "access_token": "A",
            "refresh_token": "R",
            "expires_in": 3600
        }))
        .await;

        let endpoints = Endpoints {
            authorize_url: "https://auth.example.com/authorize".into(),
            token_url,
        };
        let mut config = ClientConfig::new("cid");
        config.redirect_uri = format!("http://127.0.0.1:{}/callback", free_port());
        config.scopes = vec!["read:profile".into()];
        let store = MemoryCredentialStore::new();

        let record = login_with_timeout(
            &reqwest::Client::new(),
            &endpoints,
            &config,
            &store,
            fake_browser("test-code"),
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(record.access_token, "A");
        assert_eq!(record.refresh_token.as_deref(), Some("R"));

        // The credential store saw exactly one write, and it kept the record
        assert_eq!(store.token_writes(), 1);
        let stored = store.load_token().unwrap().unwrap();
        assert_eq!(stored.access_token, "A");
        assert_eq!(stored.refresh_token.as_deref(), Some("R"));
    }

    #[tokio::test]
    async fn login_rejects_invalid_config_before_binding() {
        let store = MemoryCredentialStore::new();
        let result = login_with_timeout(
            &reqwest::Client::new(),
            &Endpoints::default(),
            &ClientConfig::new(""),
            &store,
            |_| Ok(()),
            Duration::from_millis(100),
        )
        .await;

        assert!(matches!(result, Err(crate::Error::Config(_))));
        assert_eq!(store.token_writes(), 0);
    }

    #[tokio::test]
    async fn login_times_out_when_browser_never_redirects() {
        let endpoints = Endpoints {
            authorize_url: "https://auth.example.com/authorize".into(),
            token_url: "http://127.0.0.1:1/oauth/token".into(),
        };
        let mut config = ClientConfig::new("cid");
        config.redirect_uri = format!("http://127.0.0.1:{}/callback", free_port());
        let store = MemoryCredentialStore::new();

        let result = login_with_timeout(
            &reqwest::Client::new(),
            &endpoints,
            &config,
            &store,
            |_| Ok(()),
            Duration::from_millis(150),
        )
        .await;

        assert!(matches!(result, Err(crate::Error::Timeout)));
        assert_eq!(store.token_writes(), 0);
    }
}
