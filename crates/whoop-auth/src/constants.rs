//! WHOOP OAuth and API constants
//!
//! The OAuth endpoints are WHOOP's hosted authorization server, which is
//! distinct from the data API base. None of these values are secrets;
//! the client id and tokens are managed by the credential store.

use std::time::Duration;

/// Authorization endpoint opened in the user's browser
pub const AUTHORIZE_ENDPOINT: &str = "https://api.prod.whoop.com/oauth/oauth2/auth";

/// Token endpoint for code exchange and token refresh
pub const TOKEN_ENDPOINT: &str = "https://api.prod.whoop.com/oauth/oauth2/token";

/// Base URL of the bearer-authenticated data API
pub const API_BASE_URL: &str = "https://api.prod.whoop.com/developer/v2";

/// Default redirect URI; must match the URI registered for the WHOOP app
pub const DEFAULT_REDIRECT_URI: &str = "http://127.0.0.1:8787/callback";

/// Default scopes requested during login
pub const DEFAULT_SCOPES: &[&str] = &[
    "read:profile",
    "read:sleep",
    "read:recovery",
    "read:cycles",
];

/// How long the callback listener waits for the browser redirect before
/// the login attempt fails. The browser step depends on a human, so the
/// bound is generous.
pub const CALLBACK_TIMEOUT: Duration = Duration::from_secs(120);
