//! Authenticated request dispatcher
//!
//! Builds data API URLs, attaches the stored bearer token, and applies the
//! refresh-once policy: a 401 with a refresh token present triggers exactly
//! one refresh and exactly one retry. The retry is never retried; a second
//! 401 is a final API error. This bound is deliberate: it prevents an
//! infinite refresh loop against an endpoint that always rejects.

use std::sync::Arc;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use whoop_auth::credentials::{ClientConfig, CredentialStore};
use whoop_auth::{API_BASE_URL, TOKEN_ENDPOINT};

use crate::error::{Error, Result};
use crate::models::{Collection, CycleRecord, RecoveryRecord, SleepRecord, UserProfile};

/// Client for the bearer-authenticated data API.
///
/// The token record is read from the credential store per request, so a
/// refresh performed by one call is visible to the next.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token_url: String,
    store: Arc<dyn CredentialStore>,
}

impl ApiClient {
    /// Client against the production WHOOP endpoints.
    pub fn new(http: reqwest::Client, store: Arc<dyn CredentialStore>) -> Self {
        Self::with_endpoints(http, API_BASE_URL, TOKEN_ENDPOINT, store)
    }

    /// Client against explicit endpoints (tests point this at mocks).
    pub fn with_endpoints(
        http: reqwest::Client,
        base_url: impl Into<String>,
        token_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            token_url: token_url.into(),
            store,
        }
    }

    pub async fn profile(&self, config: &ClientConfig) -> Result<UserProfile> {
        self.get(config, "/user/profile/basic", &[]).await
    }

    pub async fn sleep(
        &self,
        config: &ClientConfig,
        limit: Option<u32>,
    ) -> Result<Collection<SleepRecord>> {
        self.get(
            config,
            "/activity/sleep",
            &[("limit", limit.map(|l| l.to_string()))],
        )
        .await
    }

    pub async fn recovery(
        &self,
        config: &ClientConfig,
        limit: Option<u32>,
    ) -> Result<Collection<RecoveryRecord>> {
        self.get(
            config,
            "/recovery",
            &[("limit", limit.map(|l| l.to_string()))],
        )
        .await
    }

    pub async fn cycles(
        &self,
        config: &ClientConfig,
        limit: Option<u32>,
    ) -> Result<Collection<CycleRecord>> {
        self.get(config, "/cycle", &[("limit", limit.map(|l| l.to_string()))])
            .await
    }

    /// Issue one authenticated GET and parse the JSON response.
    ///
    /// Query parameters with a `None` value are omitted from the URL.
    pub async fn get<T: DeserializeOwned>(
        &self,
        config: &ClientConfig,
        path: &str,
        query: &[(&str, Option<String>)],
    ) -> Result<T> {
        let url = self.build_url(path, query)?;
        let token = self.store.load_token()?.ok_or(Error::NotLoggedIn)?;

        let mut response = self.send(&url, &token.access_token).await?;

        if response.status() == StatusCode::UNAUTHORIZED && token.refresh_token.is_some() {
            debug!(path, "access token rejected, refreshing once");
            let refreshed = whoop_auth::token::refresh(
                &self.http,
                &self.token_url,
                config,
                &token,
                self.store.as_ref(),
            )
            .await?;
            // One retry with the new token; a second 401 falls through below
            response = self.send(&url, &refreshed.access_token).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| String::from("<no body>"));
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| Error::Http(format!("invalid response body: {e}")))
    }

    fn build_url(&self, path: &str, query: &[(&str, Option<String>)]) -> Result<Url> {
        let mut url = Url::parse(&format!("{}{path}", self.base_url.trim_end_matches('/')))
            .map_err(|e| Error::Http(format!("invalid request URL: {e}")))?;
        let params: Vec<(&str, &str)> = query
            .iter()
            .filter_map(|(key, value)| value.as_deref().map(|v| (*key, v)))
            .collect();
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    async fn send(&self, url: &Url, access_token: &str) -> Result<reqwest::Response> {
        self.http
            .get(url.clone())
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| Error::Http(format!("API request failed: {e}")))
    }
}
