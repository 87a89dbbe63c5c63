//! Roster CLI - Terminal console for users and addresses.
//!
//! # Usage
//!
//! ```bash
//! # List users, second page of ten
//! roster users list --page 2
//!
//! # Create an address, then a user living there
//! roster addresses create --region Крым --city Ялта --street Ленина --house 5
//! roster users create --first-name Иван --address-id 7
//!
//! # Addresses not linked to any user
//! roster addresses unassigned
//!
//! # Interactive session sharing one cache
//! roster console
//! ```
//!
//! # Environment Variables
//!
//! - `ROSTER_API_BASE_URL` - Backend base URL (default: `http://localhost:8080/`)
//! - `ROSTER_CACHE_CAPACITY`, `ROSTER_CACHE_IDLE_SECS` - Query cache tuning
//! - `RUST_LOG` - Log filter (default: `warn`)

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::Parser;
use roster_client::{ClientConfig, RosterClient};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;

use commands::{CommandError, Commands};

#[derive(Parser)]
#[command(name = "roster")]
#[command(author, version, about = "Roster users and addresses console")]
struct Cli {
    /// Backend base URL
    #[arg(long, env = "ROSTER_API_BASE_URL", global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        tracing::debug!(error = ?e, "Command failed");
        output::failure(&e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CommandError> {
    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = ClientConfig::new(base_url)?.base_url;
    }

    let client = RosterClient::new(&config);
    tracing::debug!(base_url = %client.base_url(), "Client ready");

    commands::dispatch(&client, cli.command).await
}
