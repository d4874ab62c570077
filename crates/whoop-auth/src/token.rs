//! OAuth token exchange and refresh
//!
//! Handles the two token endpoint interactions:
//! 1. Authorization code exchange (initial login flow completion)
//! 2. Token refresh (request-time, triggered by a 401)
//!
//! Both operations POST form-encoded bodies to the token endpoint with
//! different grant types. The token endpoint lives on WHOOP's OAuth host,
//! not the data API base. Neither operation retries internally; failures
//! propagate to the caller, and the whole login attempt is safe to rerun.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::debug;

use crate::credentials::{ClientConfig, CredentialStore, TokenRecord};
use crate::error::{Error, Result};

/// Response from the token endpoint for both exchange and refresh.
///
/// `expires_in` is a delta in seconds from the response time; it is
/// converted to an absolute unix-seconds timestamp at storage time.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl TokenResponse {
    /// Map the wire response into a stored record.
    ///
    /// WHOOP does not always rotate refresh tokens, so a response that
    /// omits one falls back to `prior_refresh`.
    fn into_record(self, prior_refresh: Option<String>) -> TokenRecord {
        TokenRecord {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(prior_refresh),
            expires_at: self.expires_in.map(|delta| now_unix_secs() + delta),
            token_type: self.token_type,
            scope: self.scope,
        }
    }
}

fn now_unix_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Exchange an authorization code for tokens (initial login flow).
///
/// The PKCE verifier proves we are the party that initiated the flow;
/// the client secret is appended only when one is configured.
pub async fn exchange_code(
    http: &reqwest::Client,
    token_url: &str,
    config: &ClientConfig,
    code: &str,
    verifier: &str,
) -> Result<TokenRecord> {
    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("code_verifier", verifier),
    ];
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    let response = http
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token exchange request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange {
            status: status.as_u16(),
            body,
        });
    }

    let parsed = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Parse(format!("invalid token response: {e}")))?;
    debug!("authorization code exchanged");
    Ok(parsed.into_record(None))
}

/// Refresh an access token using the stored refresh token.
///
/// Fails fast with `NoRefreshToken` when the current record has none;
/// that tells the caller to log in again rather than retry. On success
/// the new record is persisted through the store before it is returned.
pub async fn refresh(
    http: &reqwest::Client,
    token_url: &str,
    config: &ClientConfig,
    current: &TokenRecord,
    store: &dyn CredentialStore,
) -> Result<TokenRecord> {
    let refresh_token = current
        .refresh_token
        .as_deref()
        .ok_or(Error::NoRefreshToken)?;

    let mut form: Vec<(&str, &str)> = vec![
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
        ("client_id", config.client_id.as_str()),
    ];
    if let Some(secret) = &config.client_secret {
        form.push(("client_secret", secret.expose()));
    }

    let response = http
        .post(token_url)
        .form(&form)
        .send()
        .await
        .map_err(|e| Error::Http(format!("token refresh request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| String::from("<no body>"));
        return Err(Error::TokenExchange {
            status: status.as_u16(),
            body,
        });
    }

    let parsed = response
        .json::<TokenResponse>()
        .await
        .map_err(|e| Error::Parse(format!("invalid refresh response: {e}")))?;

    let record = parsed.into_record(current.refresh_token.clone());
    store.save_token(&record)?;
    debug!("refreshed token persisted");
    Ok(record)
}
