//! PKCE (Proof Key for Code Exchange) implementation per RFC 7636
//!
//! Generates the state, code verifier, and S256 challenge used during one
//! login attempt. The verifier stays in memory and is sent during token
//! exchange; the challenge is included in the authorization URL so the
//! authorization server can verify the exchange request came from the same
//! party that initiated the flow. Material is never reused across attempts.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngExt;
use sha2::{Digest, Sha256};
use url::Url;

use crate::credentials::ClientConfig;
use crate::error::{Error, Result};

/// Ephemeral PKCE material, scoped to a single login attempt.
///
/// Dropped when the attempt completes or fails; never persisted.
#[derive(Debug)]
pub struct PkceMaterial {
    /// Opaque CSRF token echoed back by the authorization server
    pub state: String,
    /// Random secret proven at token-exchange time
    pub verifier: String,
    /// `BASE64URL(SHA256(verifier))`, sent in the authorization URL
    pub challenge: String,
}

impl PkceMaterial {
    /// Generate fresh material from the CSPRNG.
    ///
    /// `state` encodes 24 random bytes and `verifier` 32, both as URL-safe
    /// base64 without padding. RFC 7636 requires a 43-128 character
    /// verifier; 32 bytes encode to exactly 43 characters.
    pub fn generate() -> Self {
        let state = random_urlsafe::<24>();
        let verifier = random_urlsafe::<32>();
        let challenge = compute_challenge(&verifier);
        Self {
            state,
            verifier,
            challenge,
        }
    }
}

fn random_urlsafe<const N: usize>() -> String {
    let mut bytes = [0u8; N];
    rand::rng().fill(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Compute the S256 code challenge from a verifier.
pub fn compute_challenge(verifier: &str) -> String {
    let hash = Sha256::digest(verifier.as_bytes());
    URL_SAFE_NO_PAD.encode(hash)
}

/// Build the full authorization URL with all required OAuth parameters.
///
/// The scope list is space-joined, as OAuth requires. The URL must only be
/// opened after the callback listener is bound, so the redirect cannot
/// race the bind.
pub fn build_authorization_url(
    authorize_url: &str,
    config: &ClientConfig,
    material: &PkceMaterial,
) -> Result<String> {
    let mut url = Url::parse(authorize_url)
        .map_err(|e| Error::Config(format!("invalid authorization endpoint: {e}")))?;
    url.query_pairs_mut()
        .append_pair("response_type", "code")
        .append_pair("client_id", &config.client_id)
        .append_pair("redirect_uri", &config.redirect_uri)
        .append_pair("scope", &config.scopes.join(" "))
        .append_pair("state", &material.state)
        .append_pair("code_challenge", &material.challenge)
        .append_pair("code_challenge_method", "S256");
    Ok(url.into())
}
