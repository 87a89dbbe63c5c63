//! CLI command definitions and dispatch.

pub mod addresses;
pub mod console;
pub mod users;

use clap::{Args, Subcommand};
use roster_client::{ClientError, ConfigError, RosterClient};
use thiserror::Error;

/// Errors that can end a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The backend rejected the operation or could not be reached.
    #[error("{0}")]
    Client(#[from] ClientError),

    /// Interactive prompt failed (e.g. no terminal).
    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    /// Operator declined a confirmation.
    #[error("Cancelled")]
    Cancelled,

    /// Nothing to choose from.
    #[error("{0}")]
    NothingToPick(&'static str),
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage users
    Users {
        #[command(subcommand)]
        action: users::UsersCommand,
    },
    /// Manage addresses
    Addresses {
        #[command(subcommand)]
        action: addresses::AddressesCommand,
    },
    /// Interactive session sharing one cache across commands
    Console,
}

/// Paging and filtering for list commands.
#[derive(Args, Debug, Clone)]
pub struct ListArgs {
    /// Page number (1-based)
    #[arg(long, default_value_t = 1)]
    pub page: usize,

    /// Rows per page
    #[arg(long, default_value_t = roster_client::view::DEFAULT_PAGE_SIZE)]
    pub page_size: usize,

    /// Case-insensitive substring filter
    #[arg(long, short)]
    pub filter: Option<String>,
}

/// Run one command against a client.
pub async fn dispatch(client: &RosterClient, command: Commands) -> Result<(), CommandError> {
    match command {
        Commands::Users { action } => users::run(client, action).await,
        Commands::Addresses { action } => addresses::run(client, action).await,
        Commands::Console => console::run(client).await,
    }
}

/// Ask before a destructive operation unless `assume_yes` is set.
pub async fn confirm(prompt: String, assume_yes: bool) -> Result<(), CommandError> {
    if assume_yes {
        return Ok(());
    }

    let confirmed = tokio::task::spawn_blocking(move || {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
    })
    .await
    .map_err(|_| CommandError::Cancelled)??;

    if confirmed {
        Ok(())
    } else {
        Err(CommandError::Cancelled)
    }
}
