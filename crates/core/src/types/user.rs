//! User records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::address::Address;
use super::email::Email;
use super::id::{AddressId, UserId};

/// A user as returned by the backend, with its linked address embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Server-assigned id.
    pub id: UserId,
    pub first_name: String,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    /// Phone number (digits only).
    pub phone: Option<String>,
    pub email: Option<Email>,
    /// Exchanged as `YYYY-MM-DD`.
    pub birth_date: Option<NaiveDate>,
    /// One-to-one link; an address belongs to at most one user.
    pub address: Option<Address>,
}

impl User {
    /// Id of the linked address, if any.
    #[must_use]
    pub fn address_id(&self) -> Option<AddressId> {
        self.address.as_ref().map(|address| address.id)
    }

    /// `last first middle`, skipping missing parts.
    #[must_use]
    pub fn full_name(&self) -> String {
        [
            self.last_name.as_deref(),
            Some(self.first_name.as_str()),
            self.middle_name.as_deref(),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Write body carrying the current field values.
    #[must_use]
    pub fn to_input(&self) -> UserInput {
        UserInput {
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            middle_name: self.middle_name.clone(),
            phone: self.phone.clone(),
            email: self.email.clone(),
            birth_date: self.birth_date,
            address_id: self.address_id(),
        }
    }
}

/// Body of a create or update request.
///
/// The backend links the address by id; the id of the user itself travels in
/// the request path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserInput {
    pub first_name: String,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<Email>,
    pub birth_date: Option<NaiveDate>,
    pub address_id: Option<AddressId>,
}

impl UserInput {
    /// Whether a stored user carries exactly these field values.
    #[must_use]
    pub fn matches(&self, user: &User) -> bool {
        *self == user.to_input()
    }
}
