//! Error types for data API operations

/// Errors from data API operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not logged in, run login first")]
    NotLoggedIn,

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Auth failures during the 401-triggered refresh keep their own shape
    /// so `NoRefreshToken` stays distinguishable from "try again" errors.
    #[error(transparent)]
    Auth(#[from] whoop_auth::Error),
}

/// Result alias for API operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_display_carries_status_and_body() {
        let err = Error::Api {
            status: 429,
            body: "rate limited".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("429"), "got: {msg}");
        assert!(msg.contains("rate limited"), "got: {msg}");
    }

    #[test]
    fn auth_errors_pass_through_transparently() {
        let err = Error::from(whoop_auth::Error::NoRefreshToken);
        assert!(
            err.to_string().contains("log in again"),
            "got: {}",
            err
        );
    }
}
