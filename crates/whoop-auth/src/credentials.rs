//! Credential storage for the client configuration and OAuth token record
//!
//! Two files live in the data directory: `config.toml` (client settings)
//! and `token.json` (the single token record; this is a single-user tool,
//! so there is exactly one). All writes use atomic temp-file + rename to
//! prevent corruption on crash, and files are written 0600 since they
//! contain OAuth material.
//!
//! The store is abstracted behind the `CredentialStore` trait so the flow
//! logic can be tested against `MemoryCredentialStore` without touching a
//! filesystem.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use common::Secret;
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::constants::{DEFAULT_REDIRECT_URI, DEFAULT_SCOPES};
use crate::error::{Error, Result};

/// Environment variable overriding the stored client secret.
pub const CLIENT_SECRET_ENV: &str = "WHOOP_CLIENT_SECRET";

fn default_redirect_uri() -> String {
    DEFAULT_REDIRECT_URI.to_string()
}

fn default_scopes() -> Vec<String> {
    DEFAULT_SCOPES.iter().map(|s| (*s).to_string()).collect()
}

/// OAuth client configuration, immutable for the duration of a session.
///
/// Reconfiguration replaces the persisted value wholesale. The client
/// secret is optional; WHOOP PKCE clients work without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub client_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<Secret<String>>,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

impl ClientConfig {
    /// Config with the default redirect URI and scope set.
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
        }
    }

    /// Validate the invariants every auth action depends on.
    pub fn validate(&self) -> Result<()> {
        if self.client_id.trim().is_empty() {
            return Err(Error::Config("client_id must not be empty".into()));
        }
        let redirect = Url::parse(&self.redirect_uri)
            .map_err(|e| Error::Config(format!("invalid redirect_uri: {e}")))?;
        if redirect.host_str().is_none() {
            return Err(Error::Config(
                "redirect_uri must be an absolute URL with a host".into(),
            ));
        }
        Ok(())
    }
}

/// A stored OAuth token record.
///
/// `expires_at` is a unix timestamp in seconds, computed at storage time
/// from the token endpoint's `expires_in` delta. It is advisory only:
/// expiry is detected via 401 responses, never checked proactively.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRecord {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Store for the client configuration and the single token record.
///
/// Operations are synchronous and failable; absence is signalled with
/// `Ok(None)` rather than an error. Implementations must replace records
/// wholesale, never partially.
pub trait CredentialStore: Send + Sync {
    fn load_config(&self) -> Result<Option<ClientConfig>>;
    fn save_config(&self, config: &ClientConfig) -> Result<()>;
    fn load_token(&self) -> Result<Option<TokenRecord>>;
    fn save_token(&self, token: &TokenRecord) -> Result<()>;
    fn clear_token(&self) -> Result<()>;
}

/// File-backed credential store rooted at a data directory.
pub struct FileCredentialStore {
    dir: PathBuf,
}

impl FileCredentialStore {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.join("config.toml")
    }

    pub fn token_path(&self) -> PathBuf {
        self.dir.join("token.json")
    }

    /// Create the data directory (0700) if it does not exist yet.
    fn ensure_dir(&self) -> Result<()> {
        if self.dir.exists() {
            return Ok(());
        }
        fs::create_dir_all(&self.dir)
            .map_err(|e| Error::Store(format!("creating {}: {e}", self.dir.display())))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| Error::Store(format!("setting data dir permissions: {e}")))?;
        }
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn load_config(&self) -> Result<Option<ClientConfig>> {
        let path = self.config_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;
        let mut config: ClientConfig = toml::from_str(&contents)
            .map_err(|e| Error::Parse(format!("parsing {}: {e}", path.display())))?;
        config.validate()?;

        // Env var takes precedence over the stored secret
        if let Ok(secret) = std::env::var(CLIENT_SECRET_ENV) {
            let secret = secret.trim().to_owned();
            if !secret.is_empty() {
                config.client_secret = Some(Secret::new(secret));
            }
        }

        Ok(Some(config))
    }

    fn save_config(&self, config: &ClientConfig) -> Result<()> {
        config.validate()?;
        self.ensure_dir()?;
        let rendered = toml::to_string_pretty(config)
            .map_err(|e| Error::Parse(format!("serializing config: {e}")))?;
        write_atomic(&self.config_path(), rendered.as_bytes())?;
        debug!(path = %self.config_path().display(), "persisted client config");
        Ok(())
    }

    fn load_token(&self) -> Result<Option<TokenRecord>> {
        let path = self.token_path();
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path)
            .map_err(|e| Error::Store(format!("reading {}: {e}", path.display())))?;
        let token: TokenRecord = serde_json::from_str(&contents)
            .map_err(|e| Error::Parse(format!("parsing {}: {e}", path.display())))?;
        Ok(Some(token))
    }

    fn save_token(&self, token: &TokenRecord) -> Result<()> {
        self.ensure_dir()?;
        let json = serde_json::to_string_pretty(token)
            .map_err(|e| Error::Parse(format!("serializing token: {e}")))?;
        write_atomic(&self.token_path(), json.as_bytes())?;
        debug!(path = %self.token_path().display(), "persisted token record");
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        let path = self.token_path();
        if path.exists() {
            fs::remove_file(&path)
                .map_err(|e| Error::Store(format!("removing {}: {e}", path.display())))?;
            debug!(path = %path.display(), "cleared token record");
        }
        Ok(())
    }
}

/// Write a credential file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target. This prevents corruption if the process crashes mid-write.
/// Sets file permissions to 0600 (owner read/write only) since the file
/// contains OAuth material.
fn write_atomic(path: &Path, data: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| Error::Store("credential path has no parent directory".into()))?;

    let tmp_path = dir.join(format!(".credentials.tmp.{}", std::process::id()));

    fs::write(&tmp_path, data)
        .map_err(|e| Error::Store(format!("writing temp credential file: {e}")))?;

    // Set 0600 permissions (unix only)
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))
            .map_err(|e| Error::Store(format!("setting credential file permissions: {e}")))?;
    }

    fs::rename(&tmp_path, path)
        .map_err(|e| Error::Store(format!("renaming temp credential file: {e}")))?;

    Ok(())
}

/// In-memory credential store for tests.
///
/// Counts token writes so tests can assert the flow persisted exactly once.
#[derive(Default)]
pub struct MemoryCredentialStore {
    config: Mutex<Option<ClientConfig>>,
    token: Mutex<Option<TokenRecord>>,
    token_writes: AtomicUsize,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ClientConfig) -> Self {
        Self {
            config: Mutex::new(Some(config)),
            ..Self::default()
        }
    }

    pub fn with_token(token: TokenRecord) -> Self {
        Self {
            token: Mutex::new(Some(token)),
            ..Self::default()
        }
    }

    /// Number of `save_token` calls so far.
    pub fn token_writes(&self) -> usize {
        self.token_writes.load(Ordering::Relaxed)
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load_config(&self) -> Result<Option<ClientConfig>> {
        Ok(self
            .config
            .lock()
            .map_err(|_| Error::Store("poisoned lock".into()))?
            .clone())
    }

    fn save_config(&self, config: &ClientConfig) -> Result<()> {
        config.validate()?;
        *self
            .config
            .lock()
            .map_err(|_| Error::Store("poisoned lock".into()))? = Some(config.clone());
        Ok(())
    }

    fn load_token(&self) -> Result<Option<TokenRecord>> {
        Ok(self
            .token
            .lock()
            .map_err(|_| Error::Store("poisoned lock".into()))?
            .clone())
    }

    fn save_token(&self, token: &TokenRecord) -> Result<()> {
        *self
            .token
            .lock()
            .map_err(|_| Error::Store("poisoned lock".into()))? = Some(token.clone());
        self.token_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn clear_token(&self) -> Result<()> {
        *self
            .token
            .lock()
            .map_err(|_| Error::Store("poisoned lock".into()))? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Mutex to serialize tests that mutate environment variables, preventing
    /// data races when tests run in parallel.
    static ENV_MUTEX: Mutex<()> = Mutex::new(());

    /// SAFETY: Callers must hold ENV_MUTEX to prevent concurrent env mutation.
    unsafe fn set_env(key: &str, val: &str) {
        unsafe { std::env::set_var(key, val) };
    }

    unsafe fn remove_env(key: &str) {
        unsafe { std::env::remove_var(key) };
    }

    fn test_token(suffix: &str) -> TokenRecord {
        TokenRecord {
            access_token: format!("at_{suffix}"),
            refresh_token: Some(format!("rt_{suffix}")),
            expires_at: Some(1_735_500_000),
            token_type: Some("bearer".into()),
            scope: Some("read:profile".into()),
        }
    }

    #[test]
    fn config_roundtrip_save_load() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(CLIENT_SECRET_ENV) };

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("data"));

        assert!(store.load_config().unwrap().is_none());

        let mut config = ClientConfig::new("cid-1");
        config.client_secret = Some(Secret::new("cs-1".into()));
        store.save_config(&config).unwrap();

        let loaded = store.load_config().unwrap().unwrap();
        assert_eq!(loaded.client_id, "cid-1");
        assert_eq!(loaded.client_secret.unwrap().expose(), "cs-1");
        assert_eq!(loaded.redirect_uri, DEFAULT_REDIRECT_URI);
        assert_eq!(loaded.scopes.len(), 4);
    }

    #[test]
    fn reconfigure_overwrites_wholesale() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(CLIENT_SECRET_ENV) };

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());

        let mut first = ClientConfig::new("cid-old");
        first.client_secret = Some(Secret::new("cs-old".into()));
        store.save_config(&first).unwrap();

        // New config with no secret must not inherit the old one
        store.save_config(&ClientConfig::new("cid-new")).unwrap();

        let loaded = store.load_config().unwrap().unwrap();
        assert_eq!(loaded.client_id, "cid-new");
        assert!(loaded.client_secret.is_none());
    }

    #[test]
    fn empty_client_id_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());

        let result = store.save_config(&ClientConfig::new("  "));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn invalid_redirect_uri_is_rejected() {
        let mut config = ClientConfig::new("cid");
        config.redirect_uri = "not-a-url".into();
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn env_secret_overrides_stored_secret() {
        let _lock = ENV_MUTEX.lock().unwrap();

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());

        let mut config = ClientConfig::new("cid");
        config.client_secret = Some(Secret::new("cs-from-file".into()));
        store.save_config(&config).unwrap();

        unsafe { set_env(CLIENT_SECRET_ENV, "cs-from-env") };
        let loaded = store.load_config().unwrap().unwrap();
        assert_eq!(loaded.client_secret.unwrap().expose(), "cs-from-env");
        unsafe { remove_env(CLIENT_SECRET_ENV) };
    }

    #[test]
    fn token_roundtrip_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("data"));

        assert!(store.load_token().unwrap().is_none());

        store.save_token(&test_token("1")).unwrap();
        let loaded = store.load_token().unwrap().unwrap();
        assert_eq!(loaded.access_token, "at_1");
        assert_eq!(loaded.refresh_token.as_deref(), Some("rt_1"));

        store.clear_token().unwrap();
        assert!(store.load_token().unwrap().is_none());

        // Clearing an absent token is not an error
        store.clear_token().unwrap();
    }

    #[test]
    fn token_overwrite_replaces_whole_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().to_path_buf());

        store.save_token(&test_token("old")).unwrap();
        store
            .save_token(&TokenRecord {
                access_token: "at_new".into(),
                refresh_token: None,
                expires_at: None,
                token_type: None,
                scope: None,
            })
            .unwrap();

        let loaded = store.load_token().unwrap().unwrap();
        assert_eq!(loaded.access_token, "at_new");
        assert!(
            loaded.refresh_token.is_none(),
            "old refresh token must not survive a wholesale overwrite"
        );
    }

    #[cfg(unix)]
    #[test]
    fn credential_files_are_0600() {
        use std::os::unix::fs::PermissionsExt;

        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(CLIENT_SECRET_ENV) };

        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("data"));
        store.save_config(&ClientConfig::new("cid")).unwrap();
        store.save_token(&test_token("1")).unwrap();

        for path in [store.config_path(), store.token_path()] {
            let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
            assert_eq!(mode, 0o600, "{} must be 0600, got {mode:o}", path.display());
        }

        let dir_mode = fs::metadata(dir.path().join("data"))
            .unwrap()
            .permissions()
            .mode()
            & 0o777;
        assert_eq!(dir_mode, 0o700, "data dir must be 0700, got {dir_mode:o}");
    }

    #[test]
    fn memory_store_counts_token_writes() {
        let store = MemoryCredentialStore::new();
        assert_eq!(store.token_writes(), 0);

        store.save_token(&test_token("1")).unwrap();
        store.save_token(&test_token("2")).unwrap();
        assert_eq!(store.token_writes(), 2);
        assert_eq!(store.load_token().unwrap().unwrap().access_token, "at_2");

        store.clear_token().unwrap();
        assert!(store.load_token().unwrap().is_none());
    }

    #[test]
    fn token_record_omits_absent_fields_in_json() {
        let record = TokenRecord {
            access_token: "at".into(),
            refresh_token: None,
            expires_at: None,
            token_type: None,
            scope: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert_eq!(json, r#"{"access_token":"at"}"#);

        let parsed: TokenRecord = serde_json::from_str(&json).unwrap();
        assert!(parsed.refresh_token.is_none());
    }
}
