//! User endpoints.
//!
//! | Operation | Request | Provides | Invalidates |
//! |---|---|---|---|
//! | [`list_users`](RosterClient::list_users) | `GET users` | `Users`, `Users#id` per row | |
//! | [`get_user`](RosterClient::get_user) | `GET users/{id}` | `Users#id` | |
//! | [`create_user`](RosterClient::create_user) | `POST users` | | `Users`, `Addresses` |
//! | [`update_user`](RosterClient::update_user) | `PUT users/{id}` | | `Users#id`, `Addresses` |
//! | [`delete_user`](RosterClient::delete_user) | `DELETE users/{id}` | | `Users`, `Addresses` |

use std::sync::Arc;

use roster_core::{User, UserForm, UserId, UserInput};
use tracing::{info, instrument};

use crate::cache::{CacheValue, QueryKey};
use crate::client::{Request, RosterClient, decode_record};
use crate::error::ClientError;
use crate::invalidation::Mutation;
use crate::subscription::QuerySubscription;

impl RosterClient {
    /// List every user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self) -> Result<Arc<[User]>, ClientError> {
        let entry = self.read(QueryKey::Users).await?;
        entry
            .value
            .into_users()
            .ok_or_else(|| ClientError::EmptyBody("users".to_string()))
    }

    /// Get one user.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Status` with 404 if the user does not exist, or
    /// any other request error.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn get_user(&self, id: UserId) -> Result<Arc<User>, ClientError> {
        let entry = self.read(QueryKey::User(id)).await?;
        entry
            .value
            .into_user()
            .ok_or_else(|| ClientError::EmptyBody(format!("users/{id}")))
    }

    /// Create a user from validated input.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the backend does not
    /// return the created record.
    #[instrument(skip(self, input))]
    pub async fn create_user(&self, input: &UserInput) -> Result<User, ClientError> {
        let request = Request::post("users", input)?;
        let body = self.commit(Mutation::CreateUser, &request).await?;
        let user: User = decode_record(&request.path, &body)?;
        info!(user_id = %user.id, "User created");
        Ok(user)
    }

    /// Validate a form and create the user. Nothing is sent if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for rejected fields, otherwise the
    /// errors of [`create_user`](Self::create_user).
    pub async fn submit_new_user(&self, form: &UserForm) -> Result<User, ClientError> {
        let input = form.validate()?;
        self.create_user(&input).await
    }

    /// Replace a user's fields. The id is taken from the path and never changes.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails, or
    /// `ClientError::IdMismatch` if the backend answers with another record.
    #[instrument(skip(self, input), fields(user_id = %id))]
    pub async fn update_user(&self, id: UserId, input: &UserInput) -> Result<User, ClientError> {
        let request = Request::put(format!("users/{id}"), input)?;
        let body = self.commit(Mutation::UpdateUser(id), &request).await?;
        let user: User = decode_record(&request.path, &body)?;
        if user.id != id {
            return Err(ClientError::IdMismatch {
                requested: id.as_i64(),
                returned: user.id.as_i64(),
            });
        }
        info!("User updated");
        Ok(user)
    }

    /// Validate a form and update the user. Nothing is sent if validation fails.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for rejected fields, otherwise the
    /// errors of [`update_user`](Self::update_user).
    pub async fn submit_user_update(
        &self,
        id: UserId,
        form: &UserForm,
    ) -> Result<User, ClientError> {
        let input = form.validate()?;
        self.update_user(id, &input).await
    }

    /// Delete a user. Its address, if any, becomes unassigned. Whatever body
    /// the backend answers with is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self), fields(user_id = %id))]
    pub async fn delete_user(&self, id: UserId) -> Result<(), ClientError> {
        self.commit(Mutation::DeleteUser(id), &Request::delete(format!("users/{id}")))
            .await?;
        info!("User deleted");
        Ok(())
    }

    /// Subscribe to the user list.
    #[must_use]
    pub fn watch_users(&self) -> QuerySubscription<Arc<[User]>> {
        self.watch(QueryKey::Users, CacheValue::into_users)
    }

    /// Subscribe to one user.
    #[must_use]
    pub fn watch_user(&self, id: UserId) -> QuerySubscription<Arc<User>> {
        self.watch(QueryKey::User(id), CacheValue::into_user)
    }
}
