//! Error types for OAuth authentication operations

/// Errors from OAuth authentication operations.
///
/// Every variant is terminal to the operation that raised it; nothing in
/// this crate retries on its own. `NoRefreshToken` is kept distinct from
/// `TokenExchange` so callers can tell the user to log in again instead
/// of merely trying again.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid client configuration: {0}")]
    Config(String),

    #[error("failed to bind callback listener: {0}")]
    Bind(String),

    #[error("authorization state mismatch")]
    StateMismatch,

    #[error("authorization redirect carried no code")]
    MissingCode,

    #[error("timed out waiting for authorization")]
    Timeout,

    #[error("token endpoint returned {status}: {body}")]
    TokenExchange { status: u16, body: String },

    #[error("no refresh token available, log in again")]
    NoRefreshToken,

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("credential store error: {0}")]
    Store(String),

    #[error("credential parse error: {0}")]
    Parse(String),
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
