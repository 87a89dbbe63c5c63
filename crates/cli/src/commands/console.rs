//! Interactive session.
//!
//! Every command typed here runs against the same [`RosterClient`], so list
//! reads are served from one cache and writes invalidate it for the rest of
//! the session. The users list and the unassigned addresses list are kept
//! subscribed in the background and report when a write makes them refetch.

use clap::{Parser, Subcommand};
use roster_client::{ClientError, RosterClient};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::{CommandError, addresses, users};
use crate::output;

#[derive(Parser, Debug)]
#[command(name = "roster", no_binary_name = true, disable_version_flag = true)]
struct SessionLine {
    #[command(subcommand)]
    command: SessionCommand,
}

#[derive(Subcommand, Debug)]
enum SessionCommand {
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
    /// End the session
    #[command(alias = "quit")]
    Exit,
}

pub async fn run(client: &RosterClient) -> Result<(), CommandError> {
    output::notice("Type `help` for commands, `exit` to leave.");
    let watchers = spawn_watchers(client);

    let result = session(client).await;

    for watcher in watchers {
        watcher.abort();
    }
    result
}

async fn session(client: &RosterClient) -> Result<(), CommandError> {
    loop {
        let line = tokio::task::spawn_blocking(|| {
            dialoguer::Input::<String>::new()
                .with_prompt("roster")
                .allow_empty(true)
                .interact_text()
        })
        .await
        .map_err(|_| CommandError::Cancelled)??;

        let args = match split_args(&line) {
            Ok(args) if args.is_empty() => continue,
            Ok(args) => args,
            Err(message) => {
                output::notice(message);
                continue;
            }
        };

        let parsed = match SessionLine::try_parse_from(&args) {
            Ok(parsed) => parsed,
            Err(e) => {
                // Help and usage errors are both rendered by clap.
                output::print(&e.render().to_string());
                continue;
            }
        };

        let outcome = match parsed.command {
            SessionCommand::Users { action } => users::run(client, action).await,
            SessionCommand::Addresses { action } => addresses::run(client, action).await,
            SessionCommand::Exit => return Ok(()),
        };

        // A failed command does not end the session.
        if let Err(e) = outcome {
            debug!(error = ?e, "Session command failed");
            output::failure(&e);
        }
    }
}

/// Keep the two lists the forms depend on subscribed for the whole session.
fn spawn_watchers(client: &RosterClient) -> Vec<JoinHandle<()>> {
    let mut users = client.watch_users();
    let users_task = tokio::spawn(async move {
        if let Err(e) = users.current().await {
            warn!(error = %e, "Initial users fetch failed");
        }
        loop {
            match users.changed().await {
                Ok(list) => output::notice(&format!("Users list refreshed ({} users)", list.len())),
                Err(ClientError::Closed) => break,
                Err(e) => warn!(error = %e, "Users refetch failed"),
            }
        }
    });

    let mut unassigned = client.watch_unassigned_addresses();
    let unassigned_task = tokio::spawn(async move {
        if let Err(e) = unassigned.current().await {
            warn!(error = %e, "Initial unassigned addresses fetch failed");
        }
        loop {
            match unassigned.changed().await {
                Ok(list) => output::notice(&format!(
                    "Unassigned addresses refreshed ({} available)",
                    list.len()
                )),
                Err(ClientError::Closed) => break,
                Err(e) => warn!(error = %e, "Unassigned addresses refetch failed"),
            }
        }
    });

    vec![users_task, unassigned_task]
}

/// Split a command line into arguments. Single or double quotes group words.
fn split_args(line: &str) -> Result<Vec<String>, &'static str> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for c in line.chars() {
        match quote {
            Some(q) if c == q => quote = None,
            Some(_) => current.push(c),
            None if c == '"' || c == '\'' => {
                quote = Some(c);
                in_word = true;
            }
            None if c.is_whitespace() => {
                if in_word {
                    args.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(c);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err("Unterminated quote");
    }
    if in_word {
        args.push(current);
    }
    Ok(args)
}
