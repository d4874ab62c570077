//! Data directory resolution
//!
//! Precedence: `--data-dir` flag > `WHOOP_CLI_HOME` env var > `~/.whoop-cli`.
//! The directory holds `config.toml` and `token.json`; the credential store
//! creates it on first write.

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Environment variable overriding the default data directory.
pub const DATA_DIR_ENV: &str = "WHOOP_CLI_HOME";

pub fn resolve_data_dir(cli_dir: Option<PathBuf>) -> Result<PathBuf> {
    if let Some(dir) = cli_dir {
        return Ok(dir);
    }
    if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = dirs::home_dir().context("could not determine home directory")?;
    Ok(home.join(".whoop-cli"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

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

    #[test]
    fn cli_flag_wins_over_env() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env(DATA_DIR_ENV, "/env/should-lose") };

        let dir = resolve_data_dir(Some(PathBuf::from("/cli/wins"))).unwrap();
        assert_eq!(dir, PathBuf::from("/cli/wins"));

        unsafe { remove_env(DATA_DIR_ENV) };
    }

    #[test]
    fn env_wins_over_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env(DATA_DIR_ENV, "/from/env") };

        let dir = resolve_data_dir(None).unwrap();
        assert_eq!(dir, PathBuf::from("/from/env"));

        unsafe { remove_env(DATA_DIR_ENV) };
    }

    #[test]
    fn default_is_dot_whoop_cli_in_home() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { remove_env(DATA_DIR_ENV) };

        let dir = resolve_data_dir(None).unwrap();
        assert!(
            dir.ends_with(".whoop-cli"),
            "expected ~/.whoop-cli, got {}",
            dir.display()
        );
    }

    #[test]
    fn blank_env_falls_through_to_default() {
        let _lock = ENV_MUTEX.lock().unwrap();
        unsafe { set_env(DATA_DIR_ENV, "  ") };

        let dir = resolve_data_dir(None).unwrap();
        assert!(dir.ends_with(".whoop-cli"), "got {}", dir.display());

        unsafe { remove_env(DATA_DIR_ENV) };
    }
}
