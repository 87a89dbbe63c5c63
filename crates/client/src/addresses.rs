//! Address endpoints.
//!
//! | Operation | Request | Provides | Invalidates |
//! |---|---|---|---|
//! | [`list_addresses`](RosterClient::list_addresses) | `GET addresses` | `Addresses`, `Addresses#id` per row | |
//! | [`list_unassigned_addresses`](RosterClient::list_unassigned_addresses) | `GET addresses/without-users` | same, own cache key | |
//! | [`get_address`](RosterClient::get_address) | `GET addresses/{id}` | `Addresses#id` | |
//! | [`create_address`](RosterClient::create_address) | `POST addresses` | | `Addresses` |
//! | [`update_address`](RosterClient::update_address) | `PUT addresses/{id}` | | `Addresses#id` |
//! | [`delete_address`](RosterClient::delete_address) | `DELETE addresses/{id}` | | `Addresses` |

use std::sync::Arc;

use roster_core::{Address, AddressForm, AddressId, AddressInput};
use tracing::{info, instrument};

use crate::cache::{CacheValue, QueryKey};
use crate::client::{Request, RosterClient, decode_record};
use crate::error::ClientError;
use crate::invalidation::Mutation;
use crate::subscription::QuerySubscription;

impl RosterClient {
    /// List every address.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_addresses(&self) -> Result<Arc<[Address]>, ClientError> {
        self.read_addresses(QueryKey::Addresses).await
    }

    /// List addresses not linked to any user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_unassigned_addresses(&self) -> Result<Arc<[Address]>, ClientError> {
        self.read_addresses(QueryKey::UnassignedAddresses).await
    }

    async fn read_addresses(&self, key: QueryKey) -> Result<Arc<[Address]>, ClientError> {
        let path = key.request().path;
        let entry = self.read(key).await?;
        entry
            .value
            .into_addresses()
            .ok_or(ClientError::EmptyBody(path))
    }

    /// Get one address.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` with 404 if the address does not exist,
    /// or any other request error.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn get_address(&self, id: AddressId) -> Result<Arc<Address>, ClientError> {
        let entry = self.read(QueryKey::Address(id)).await?;
        entry
            .value
            .into_address()
            .ok_or_else(|| ClientError::EmptyBody(format!("addresses/{id}")))
    }

    /// Create an address from validated input.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend does not
    /// return the created record.
    #[instrument(skip(self, input))]
    pub async fn create_address(&self, input: &AddressInput) -> Result<Address, ClientError> {
        let request = Request::post("addresses", input)?;
        let body = self.commit(Mutation::CreateAddress, &request).await?;
        let address: Address = decode_record(&request.path, &body)?;
        info!(address_id = %address.id, "Address created");
        Ok(address)
    }

    /// Validate a form and create the address. Nothing is sent if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for rejected fields, otherwise the
    /// errors of [`create_address`](Self::create_address).
    pub async fn submit_new_address(&self, form: &AddressForm) -> Result<Address, ClientError> {
        let input = form.validate()?;
        self.create_address(&input).await
    }

    /// Replace an address's fields. The id is taken from the path and never changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, or
    /// `ClientError::IdMismatch` if the backend answers with another record.
    #[instrument(skip(self, input), fields(address_id = %id))]
    pub async fn update_address(
        &self,
        id: AddressId,
        input: &AddressInput,
    ) -> Result<Address, ClientError> {
        let request = Request::put(format!("addresses/{id}"), input)?;
        let body = self.commit(Mutation::UpdateAddress(id), &request).await?;
        let address: Address = decode_record(&request.path, &body)?;
        if address.id != id {
            return Err(ClientError::IdMismatch {
                requested: id.as_i64(),
                returned: address.id.as_i64(),
            });
        }
        info!("Address updated");
        Ok(address)
    }

    /// Validate a form and update the address. Nothing is sent if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for rejected fields, otherwise the
    /// errors of [`update_address`](Self::update_address).
    pub async fn submit_address_update(
        &self,
        id: AddressId,
        form: &AddressForm,
    ) -> Result<Address, ClientError> {
        let input = form.validate()?;
        self.update_address(id, &input).await
    }

    /// Delete an address. Whatever body the backend answers with is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(address_id = %id))]
    pub async fn delete_address(&self, id: AddressId) -> Result<(), ClientError> {
        self.commit(
            Mutation::DeleteAddress(id),
            &Request::delete(format!("addresses/{id}")),
        )
        .await?;
        info!("Address deleted");
        Ok(())
    }

    /// Subscribe to the address list.
    #[must_use]
    pub fn watch_addresses(&self) -> QuerySubscription<Arc<[Address]>> {
        self.watch(QueryKey::Addresses, CacheValue::into_addresses)
    }

    /// Subscribe to the unassigned address list.
    #[must_use]
    pub fn watch_unassigned_addresses(&self) -> QuerySubscription<Arc<[Address]>> {
        self.watch(QueryKey::UnassignedAddresses, CacheValue::into_addresses)
    }
}
