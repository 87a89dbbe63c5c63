//! `roster addresses ...`

use clap::{Args, Subcommand};
use roster_client::RosterClient;
use roster_client::view::{address_options, filter_addresses, paginate};
use roster_core::{AddressForm, AddressId};

use super::{CommandError, ListArgs, confirm};
use crate::output;

#[derive(Subcommand, Debug)]
pub enum AddressesCommand {
    /// List addresses
    List(ListArgs),
    /// Addresses not linked to any user
    Unassigned {
        /// Case-insensitive search over "region city street house apartment"
        #[arg(long, short)]
        search: Option<String>,
    },
    /// Show one address
    Get {
        id: AddressId,
    },
    /// Create an address
    Create {
        #[command(flatten)]
        fields: AddressFields,
    },
    /// Update an address; omitted fields keep their value
    Update {
        id: AddressId,

        #[command(flatten)]
        fields: AddressFields,
    },
    /// Delete an address
    Delete {
        id: AddressId,

        /// Skip the confirmation prompt
        #[arg(long, short)]
        yes: bool,
    },
}

/// Address form fields as flags.
#[derive(Args, Debug, Clone, Default)]
pub struct AddressFields {
    #[arg(long)]
    pub region: Option<String>,
    #[arg(long)]
    pub city: Option<String>,
    #[arg(long)]
    pub street: Option<String>,
    /// Digits only
    #[arg(long)]
    pub house: Option<String>,
    /// Digits only; empty clears it
    #[arg(long)]
    pub apartment: Option<String>,
}

impl AddressFields {
    fn apply(self, form: &mut AddressForm) {
        let Self {
            region,
            city,
            street,
            house,
            apartment,
        } = self;

        if region.is_some() {
            form.region = region;
        }
        if city.is_some() {
            form.city = city;
        }
        if street.is_some() {
            form.street = street;
        }
        if house.is_some() {
            form.house = house;
        }
        if apartment.is_some() {
            form.apartment = apartment;
        }
    }
}

pub async fn run(client: &RosterClient, command: AddressesCommand) -> Result<(), CommandError> {
    match command {
        AddressesCommand::List(args) => {
            let addresses = client.list_addresses().await?;
            let addresses =
                filter_addresses(&addresses, args.filter.as_deref().unwrap_or_default());
            output::print(&output::addresses_table(&paginate(
                &addresses,
                args.page,
                args.page_size,
            )));
        }
        AddressesCommand::Unassigned { search } => {
            let unassigned = client.list_unassigned_addresses().await?;
            output::print(&output::address_options(&address_options(
                &unassigned,
                search.as_deref(),
            )));
        }
        AddressesCommand::Get { id } => {
            let address = client.get_address(id).await?;
            output::print(&output::address_details(&address));
        }
        AddressesCommand::Create { fields } => {
            let mut form = AddressForm::default();
            fields.apply(&mut form);
            let address = client.submit_new_address(&form).await?;
            output::success(&format!("Address {} created: {}", address.id, address.label()));
        }
        AddressesCommand::Update { id, fields } => {
            let current = client.get_address(id).await?;
            let mut form = AddressForm::from(current.as_ref());
            fields.apply(&mut form);
            let address = client.submit_address_update(id, &form).await?;
            output::success(&format!("Address {} updated", address.id));
        }
        AddressesCommand::Delete { id, yes } => {
            let address = client.get_address(id).await?;
            confirm(format!("Delete address {} ({})?", id, address.label()), yes).await?;
            client.delete_address(id).await?;
            output::success(&format!("Address {id} deleted"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overlays_given_fields() {
        let mut form = AddressForm {
            region: Some("Крым".to_string()),
            city: Some("Ялта".to_string()),
            street: Some("Ленина".to_string()),
            house: Some("5".to_string()),
            apartment: Some("12".to_string()),
        };

        AddressFields {
            house: Some("7".to_string()),
            apartment: Some(String::new()),
            ..AddressFields::default()
        }
        .apply(&mut form);

        let input = form.validate().map_err(|e| e.to_string());
        assert_eq!(
            input.map(|i| (i.city, i.house, i.apartment)),
            Ok(("Ялта".to_string(), "7".to_string(), None))
        );
    }
}
