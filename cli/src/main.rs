//! WHOOP terminal client
//!
//! Subcommand CLI over the auth and data-API crates: `configure` writes the
//! OAuth client settings, `login` runs the browser PKCE flow, the data
//! commands fetch and render metrics, `logout` clears the stored token.

mod display;
mod settings;

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use common::Secret;
use whoop_api::ApiClient;
use whoop_auth::credentials::{ClientConfig, CredentialStore, FileCredentialStore};
use whoop_auth::login::Endpoints;

#[derive(Parser)]
#[command(name = "whoop", version, about = "WHOOP terminal client")]
struct Cli {
    /// Directory holding config.toml and token.json
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Log in via the browser and store the token locally
    Login,
    /// Show the account profile
    Profile,
    /// Show recent sleep performance
    Sleep {
        #[arg(long, default_value_t = 14)]
        limit: u32,
    },
    /// Show recent recovery scores
    Recovery {
        #[arg(long, default_value_t = 14)]
        limit: u32,
    },
    /// Show recent strain (cycle) data
    Strain {
        #[arg(long, default_value_t = 14)]
        limit: u32,
    },
    /// Create or replace the OAuth client configuration
    Configure,
    /// Remove the locally stored token
    Logout,
}

#[tokio::main]
async fn main() -> Result<()> {
    // LOG_LEVEL / RUST_LOG control verbosity; default keeps normal CLI
    // output clean and sends diagnostics to stderr
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let data_dir = settings::resolve_data_dir(cli.data_dir)?;
    tracing::debug!(dir = %data_dir.display(), "using data directory");
    let store = Arc::new(FileCredentialStore::new(data_dir));

    match cli.command {
        Command::Configure => configure(store.as_ref()),
        Command::Login => login(store.as_ref()).await,
        Command::Profile => {
            let config = load_config(store.as_ref())?;
            let client = ApiClient::new(reqwest::Client::new(), store.clone());
            let profile = client.profile(&config).await?;
            display::print_profile(&profile);
            Ok(())
        }
        Command::Sleep { limit } => {
            let config = load_config(store.as_ref())?;
            let client = ApiClient::new(reqwest::Client::new(), store.clone());
            let data = client.sleep(&config, Some(limit)).await?;
            display::print_sleep(&data.records);
            Ok(())
        }
        Command::Recovery { limit } => {
            let config = load_config(store.as_ref())?;
            let client = ApiClient::new(reqwest::Client::new(), store.clone());
            let data = client.recovery(&config, Some(limit)).await?;
            display::print_recovery(&data.records);
            Ok(())
        }
        Command::Strain { limit } => {
            let config = load_config(store.as_ref())?;
            let client = ApiClient::new(reqwest::Client::new(), store.clone());
            let data = client.cycles(&config, Some(limit)).await?;
            display::print_strain(&data.records);
            Ok(())
        }
        Command::Logout => {
            store.clear_token()?;
            println!("Local token removed.");
            Ok(())
        }
    }
}

fn load_config(store: &dyn CredentialStore) -> Result<ClientConfig> {
    store
        .load_config()?
        .context("no configuration found, run `whoop configure` first")
}

async fn login(store: &dyn CredentialStore) -> Result<()> {
    let config = load_config(store)?;
    println!("Opening browser for WHOOP login...");

    let record = whoop_auth::login(
        &reqwest::Client::new(),
        &Endpoints::default(),
        &config,
        store,
        |url| {
            println!("If the browser does not open, visit:\n  {url}");
            open::that(url)
        },
    )
    .await?;

    println!("Login successful. Token stored locally.");
    if record.refresh_token.is_none() {
        println!("Note: no refresh token was issued; log in again once the session expires.");
    }
    Ok(())
}

fn configure(store: &dyn CredentialStore) -> Result<()> {
    let client_id = prompt("WHOOP OAuth client id (from developer.whoop.com): ")?;
    let client_secret = prompt("Client secret (leave empty for PKCE-only clients): ")?;
    let redirect_uri = prompt(&format!(
        "Redirect URI [{}]: ",
        whoop_auth::DEFAULT_REDIRECT_URI
    ))?;

    let mut config = ClientConfig::new(client_id.trim());
    let secret = client_secret.trim();
    if !secret.is_empty() {
        config.client_secret = Some(Secret::new(secret.to_string()));
    }
    let redirect = redirect_uri.trim();
    if !redirect.is_empty() {
        config.redirect_uri = redirect.to_string();
    }

    store.save_config(&config)?;
    println!("Configuration saved.");
    Ok(())
}

fn prompt(message: &str) -> Result<String> {
    print!("{message}");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin()
        .read_line(&mut line)
        .context("failed to read input")?;
    Ok(line)
}
