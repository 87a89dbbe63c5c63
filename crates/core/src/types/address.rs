//! Address records.

use serde::{Deserialize, Serialize};

use super::id::AddressId;

/// An address as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    /// Server-assigned id.
    pub id: AddressId,
    pub region: String,
    pub city: String,
    pub street: String,
    /// House number (digits only).
    pub house: String,
    /// Apartment number (digits only).
    pub apartment: Option<String>,
}

impl Address {
    /// One-line label used by address pickers: `region city street house apartment`.
    #[must_use]
    pub fn label(&self) -> String {
        let mut parts = vec![
            self.region.as_str(),
            self.city.as_str(),
            self.street.as_str(),
            self.house.as_str(),
        ];
        if let Some(apartment) = self.apartment.as_deref() {
            parts.push(apartment);
        }
        parts.join(" ")
    }

    /// Short form shown in the users table: `city, street`.
    #[must_use]
    pub fn short(&self) -> String {
        format!("{}, {}", self.city, self.street)
    }

    /// Write body carrying the current field values.
    #[must_use]
    pub fn to_input(&self) -> AddressInput {
        AddressInput {
            region: self.region.clone(),
            city: self.city.clone(),
            street: self.street.clone(),
            house: self.house.clone(),
            apartment: self.apartment.clone(),
        }
    }
}

/// Body of a create or update request. The id travels in the path, never here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressInput {
    pub region: String,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: Option<String>,
}

impl AddressInput {
    /// Whether a stored address carries exactly these field values.
    #[must_use]
    pub fn matches(&self, address: &Address) -> bool {
        *self == address.to_input()
    }
}
