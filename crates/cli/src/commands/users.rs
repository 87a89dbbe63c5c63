//! `roster users ...`

use clap::{Args, Subcommand};
use roster_client::RosterClient;
use roster_client::view::{address_options, filter_users, paginate};
use roster_core::{Address, AddressId, UserForm, UserId};

use super::{CommandError, ListArgs, confirm};
use crate::output;

#[derive(Subcommand, Debug)]
pub enum UsersCommand {
    /// List users
    List(ListArgs),
    /// Show one user
    Get {
        id: UserId,
    },
    /// Create a user
    Create {
        #[command(flatten)]
        fields: UserFields,

        /// Choose the address from the unassigned list interactively
        #[arg(long, conflicts_with = "address_id")]
        pick_address: bool,
    },
    /// Update a user; omitted fields keep their value, empty values clear them
    Update {
        id: UserId,

        #[command(flatten)]
        fields: UserFields,

        /// Unlink the current address
        #[arg(long, conflicts_with_all = ["address_id", "pick_address"])]
        no_address: bool,

        /// Choose among the current and the unassigned addresses interactively
        #[arg(long, conflicts_with = "address_id")]
        pick_address: bool,
    },
    /// Delete a user; its address becomes unassigned
    Delete {
        id: UserId,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// User form fields as flags.
#[derive(Args, Debug, Clone, Default)]
pub struct UserFields {
    #[arg(long)]
    pub first_name: Option<String>,
    #[arg(long)]
    pub last_name: Option<String>,
    #[arg(long)]
    pub middle_name: Option<String>,
    /// Digits only
    #[arg(long)]
    pub phone: Option<String>,
    #[arg(long)]
    pub email: Option<String>,
    /// YYYY-MM-DD or DD.MM.YYYY
    #[arg(long)]
    pub birth_date: Option<String>,
    /// Address to link; must be unassigned
    #[arg(long)]
    pub address_id: Option<AddressId>,
}

impl UserFields {
    /// Overlay the given flags on a form.
    fn apply(self, form: &mut UserForm) {
        let Self {
            first_name,
            last_name,
            middle_name,
            phone,
            email,
            birth_date,
            address_id,
        } = self;

        if first_name.is_some() {
            form.first_name = first_name;
        }
        if last_name.is_some() {
            form.last_name = last_name;
        }
        if middle_name.is_some() {
            form.middle_name = middle_name;
        }
        if phone.is_some() {
            form.phone = phone;
        }
        if email.is_some() {
            form.email = email;
        }
        if birth_date.is_some() {
            form.birth_date = birth_date;
        }
        if address_id.is_some() {
            form.address_id = address_id;
        }
    }
}

pub async fn run(client: &RosterClient, command: UsersCommand) -> Result<(), CommandError> {
    match command {
        UsersCommand::List(args) => {
            let users = client.list_users().await?;
            let users = filter_users(&users, args.filter.as_deref().unwrap_or_default());
            output::print(&output::users_table(&paginate(&users, args.page, args.page_size)));
        }
        UsersCommand::Get { id } => {
            let user = client.get_user(id).await?;
            output::print(&output::user_details(&user));
        }
        UsersCommand::Create {
            fields,
            pick_address,
        } => {
            let mut form = UserForm::default();
            fields.apply(&mut form);
            // Validate before the picker so a bad form never prompts.
            form.validate().map_err(roster_client::ClientError::from)?;
            if pick_address {
                form.address_id = Some(pick_address_for(client, None).await?);
            }
            let user = client.submit_new_user(&form).await?;
            output::success(&format!("User {} created: {}", user.id, user.full_name()));
        }
        UsersCommand::Update {
            id,
            fields,
            no_address,
            pick_address,
        } => {
            let current = client.get_user(id).await?;
            let mut form = UserForm::from(current.as_ref());
            fields.apply(&mut form);
            if no_address {
                form.address_id = None;
            }
            if pick_address {
                form.validate().map_err(roster_client::ClientError::from)?;
                let picked = pick_address_for(client, current.address.as_ref()).await?;
                form.address_id = Some(picked);
            }
            let user = client.submit_user_update(id, &form).await?;
            output::success(&format!("User {} updated", user.id));
        }
        UsersCommand::Delete { id, yes } => {
            let user = client.get_user(id).await?;
            confirm(format!("Delete user {} ({})?", id, user.full_name()), yes).await?;
            client.delete_user(id).await?;
            output::success(&format!("User {id} deleted"));
        }
    }
    Ok(())
}

/// Let the operator choose one of the unassigned addresses. A user being
/// edited may also keep the address it already has, listed first.
async fn pick_address_for(
    client: &RosterClient,
    current: Option<&Address>,
) -> Result<AddressId, CommandError> {
    let unassigned = client.list_unassigned_addresses().await?;
    let candidates: Vec<Address> = current
        .into_iter()
        .cloned()
        .chain(unassigned.iter().cloned())
        .collect();
    let options = address_options(&candidates, None);
    if options.is_empty() {
        return Err(CommandError::NothingToPick("No unassigned addresses"));
    }

    let labels: Vec<String> = options.iter().map(|o| o.label.clone()).collect();
    let chosen = tokio::task::spawn_blocking(move || {
        dialoguer::Select::new()
            .with_prompt("Address")
            .items(&labels)
            .default(0)
            .interact()
    })
    .await
    .map_err(|_| CommandError::Cancelled)??;

    options
        .get(chosen)
        .map(|o| o.id)
        .ok_or(CommandError::Cancelled)
}
