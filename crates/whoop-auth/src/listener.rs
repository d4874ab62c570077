//! Transient local callback listener for the authorization redirect
//!
//! Binds the host/port of the configured redirect URI, captures exactly one
//! redirect on the redirect path, and resolves it through a
//! single-fulfillment oneshot channel. Requests to any other path answer
//! 404 and leave the listener running; browsers probe for favicons on the
//! same port. The server is torn down on every exit path (resolution,
//! validation failure, timeout) so repeated login attempts never leak the
//! port.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, oneshot};
use tracing::{debug, warn};
use url::Url;

use crate::error::{Error, Result};

/// Outcome of one authorization redirect, delivered through the oneshot.
type AuthorizationResult = Result<String>;

#[derive(Clone)]
struct CallbackState {
    expected_state: String,
    tx: Arc<Mutex<Option<oneshot::Sender<AuthorizationResult>>>>,
}

/// A bound, running callback listener for one login attempt.
///
/// `bind` and `wait` are split so the caller can open the authorization
/// URL strictly after the port is taken; the browser redirect must not
/// race the bind.
pub struct CallbackServer {
    local_addr: SocketAddr,
    rx: oneshot::Receiver<AuthorizationResult>,
    shutdown_tx: oneshot::Sender<()>,
    handle: tokio::task::JoinHandle<()>,
}

impl CallbackServer {
    /// Bind the host, port, and path taken from the redirect URI.
    ///
    /// A bind failure (typically the port is already in use) fails the
    /// login attempt immediately, before any request is processed.
    pub async fn bind(redirect_uri: &str, expected_state: &str) -> Result<Self> {
        let redirect = Url::parse(redirect_uri)
            .map_err(|e| Error::Config(format!("invalid redirect URI: {e}")))?;
        let host = redirect
            .host_str()
            .ok_or_else(|| Error::Config("redirect URI has no host".into()))?
            .to_string();
        let port = redirect.port_or_known_default().unwrap_or(80);
        let path = redirect.path().to_string();

        let (tx, rx) = oneshot::channel();
        let state = CallbackState {
            expected_state: expected_state.to_string(),
            tx: Arc::new(Mutex::new(Some(tx))),
        };

        let app = Router::new()
            .route(&path, get(callback_handler))
            .fallback(fallback_handler)
            .with_state(state);

        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| Error::Bind(format!("{host}:{port}: {e}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::Bind(format!("{host}:{port}: {e}")))?;
        debug!(addr = %local_addr, path = %path, "callback listener bound");

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(e) = serve.await {
                warn!(error = %e, "callback listener error");
            }
        });

        Ok(Self {
            local_addr,
            rx,
            shutdown_tx,
            handle,
        })
    }

    /// The address actually bound (useful when the redirect URI names port 0).
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the authorization redirect, bounded by `timeout`.
    ///
    /// Consumes the server; the listener is shut down before this returns
    /// on every path: code received, validation failure, or timeout.
    pub async fn wait(self, timeout: Duration) -> Result<String> {
        let outcome = match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(Error::Bind("callback listener stopped unexpectedly".into())),
            Err(_) => Err(Error::Timeout),
        };

        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
        debug!("callback listener stopped");
        outcome
    }
}

async fn callback_handler(
    State(state): State<CallbackState>,
    Query(params): Query<HashMap<String, String>>,
) -> impl IntoResponse {
    let (status, message, outcome) = match params.get("state") {
        Some(s) if *s == state.expected_state => {
            match params.get("code").filter(|c| !c.is_empty()) {
                Some(code) => (
                    StatusCode::OK,
                    "WHOOP login complete. You can close this tab and return to the terminal.",
                    Ok(code.clone()),
                ),
                None => (
                    StatusCode::BAD_REQUEST,
                    "Missing authorization code",
                    Err(Error::MissingCode),
                ),
            }
        }
        _ => (
            StatusCode::BAD_REQUEST,
            "State mismatch",
            Err(Error::StateMismatch),
        ),
    };

    if let Some(tx) = state.tx.lock().await.take() {
        let _ = tx.send(outcome);
    }
    (status, message)
}

/// Requests off the redirect path (favicon probes and other browser noise)
/// must not consume the pending result.
async fn fallback_handler() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, "Not found")
}
