//! WHOOP OAuth authentication library
//!
//! Provides PKCE flow generation, the transient local callback listener,
//! token exchange/refresh, and credential file storage for the terminal
//! client. This crate is a standalone library with no dependency on the
//! CLI binary; it can be tested and used independently.
//!
//! Login flow:
//! 1. `pkce::PkceMaterial::generate()` produces state/verifier/challenge
//! 2. `listener::CallbackServer::bind()` takes the redirect port
//! 3. The authorization URL from `pkce::build_authorization_url()` opens
//!    in the user's browser
//! 4. The listener resolves with the authorization code
//! 5. `token::exchange_code()` swaps the code for tokens
//! 6. The record is persisted via `credentials::CredentialStore::save_token()`
//!
//! Subsequent refreshes go through `token::refresh()`, which persists the
//! updated record before returning it.

pub mod constants;
pub mod credentials;
pub mod error;
pub mod listener;
pub mod login;
pub mod pkce;
pub mod token;

pub use constants::*;
pub use credentials::{
    ClientConfig, CredentialStore, FileCredentialStore, MemoryCredentialStore, TokenRecord,
};
pub use error::{Error, Result};
pub use listener::CallbackServer;
pub use login::{Endpoints, login, login_with_timeout};
pub use pkce::{PkceMaterial, build_authorization_url};
pub use token::{exchange_code, refresh};
