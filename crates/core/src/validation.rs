//! Form validation for user and address writes.
//!
//! Forms hold raw text as typed by an operator. [`UserForm::validate`] and
//! [`AddressForm::validate`] check every field, collect all failures, and
//! only then produce the request body. A form that fails validation never
//! reaches the network.
//!
//! Values are trimmed and empty strings become `None` (sent as `null`)
//! before any rule runs.

use std::fmt;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::types::{Address, AddressId, AddressInput, Email, User, UserInput};

/// Unicode letters and spaces only.
static LETTERS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[\p{L}\s]+$").expect("Invalid regex"));

/// ASCII digits only.
static DIGITS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]+$").expect("Invalid regex"));

/// Accepted birth date formats: wire format first, then the display format.
const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y"];

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    /// Wire name of the field (e.g. `firstName`).
    pub field: &'static str,
    /// Operator-facing explanation.
    pub message: String,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Every field that blocked a submission.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", format_field_errors(&self.errors))]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// The rejected fields, in form order.
    #[must_use]
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Whether the given field was rejected.
    #[must_use]
    pub fn has(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Collects field failures while a form is checked.
#[derive(Default)]
struct Checker {
    errors: Vec<FieldError>,
}

impl Checker {
    fn fail(&mut self, field: &'static str, message: &str) {
        self.errors.push(FieldError {
            field,
            message: message.to_string(),
        });
    }

    fn required(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        if value.is_none() {
            self.fail(field, "is required");
        }
        value
    }

    fn letters(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        if let Some(v) = value.as_deref()
            && !LETTERS_RE.is_match(v)
        {
            self.fail(field, "may contain only letters and spaces");
        }
        value
    }

    fn digits(&mut self, field: &'static str, value: Option<String>) -> Option<String> {
        if let Some(v) = value.as_deref()
            && !DIGITS_RE.is_match(v)
        {
            self.fail(field, "may contain only digits");
        }
        value
    }

    fn email(&mut self, field: &'static str, value: Option<String>) -> Option<Email> {
        let value = value?;
        match Email::parse(&value) {
            Ok(email) => Some(email),
            Err(e) => {
                self.fail(field, &e.to_string());
                None
            }
        }
    }

    fn date(&mut self, field: &'static str, value: Option<String>) -> Option<NaiveDate> {
        let value = value?;
        let parsed = DATE_FORMATS
            .iter()
            .find_map(|format| NaiveDate::parse_from_str(&value, format).ok());
        if parsed.is_none() {
            self.fail(field, "must be a date in YYYY-MM-DD format");
        }
        parsed
    }

    fn finish<T>(self, value: T) -> Result<T, ValidationErrors> {
        if self.errors.is_empty() {
            Ok(value)
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

/// Trim and map empty input to `None`.
#[must_use]
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

// =============================================================================
// Users
// =============================================================================

/// Raw user form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserForm {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    /// `YYYY-MM-DD` or `DD.MM.YYYY`.
    pub birth_date: Option<String>,
    /// Picked from the unassigned addresses list.
    pub address_id: Option<AddressId>,
}

impl UserForm {
    /// Check every field and build the request body.
    ///
    /// # Errors
    ///
    /// Returns every rejected field when `firstName` is missing or any field
    /// breaks its rule.
    pub fn validate(&self) -> Result<UserInput, ValidationErrors> {
        let mut check = Checker::default();

        let first_name = check.required("firstName", normalize(self.first_name.as_deref()));
        let first_name = check.letters("firstName", first_name);
        let last_name = check.letters("lastName", normalize(self.last_name.as_deref()));
        let middle_name = check.letters("middleName", normalize(self.middle_name.as_deref()));
        let phone = check.digits("phone", normalize(self.phone.as_deref()));
        let email = check.email("email", normalize(self.email.as_deref()));
        let birth_date = check.date("birthDate", normalize(self.birth_date.as_deref()));

        check.finish(UserInput {
            first_name: first_name.unwrap_or_default(),
            last_name,
            middle_name,
            phone,
            email,
            birth_date,
            address_id: self.address_id,
        })
    }
}

impl From<&User> for UserForm {
    fn from(user: &User) -> Self {
        Self {
            first_name: Some(user.first_name.clone()),
            last_name: user.last_name.clone(),
            middle_name: user.middle_name.clone(),
            phone: user.phone.clone(),
            email: user.email.as_ref().map(ToString::to_string),
            birth_date: user.birth_date.map(|d| d.format("%Y-%m-%d").to_string()),
            address_id: user.address_id(),
        }
    }
}

// =============================================================================
// Addresses
// =============================================================================

/// Raw address form input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressForm {
    pub region: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<String>,
    pub apartment: Option<String>,
}

impl AddressForm {
    /// Check every field and build the request body.
    ///
    /// # Errors
    ///
    /// Returns every rejected field when a required field is missing or any
    /// field breaks its rule.
    pub fn validate(&self) -> Result<AddressInput, ValidationErrors> {
        let mut check = Checker::default();

        let region = check.required("region", normalize(self.region.as_deref()));
        let region = check.letters("region", region);
        let city = check.required("city", normalize(self.city.as_deref()));
        let city = check.letters("city", city);
        let street = check.required("street", normalize(self.street.as_deref()));
        let street = check.letters("street", street);
        let house = check.required("house", normalize(self.house.as_deref()));
        let house = check.digits("house", house);
        let apartment = check.digits("apartment", normalize(self.apartment.as_deref()));

        check.finish(AddressInput {
            region: region.unwrap_or_default(),
            city: city.unwrap_or_default(),
            street: street.unwrap_or_default(),
            house: house.unwrap_or_default(),
            apartment,
        })
    }
}

impl From<&Address> for AddressForm {
    fn from(address: &Address) -> Self {
        Self {
            region: Some(address.region.clone()),
            city: Some(address.city.clone()),
            street: Some(address.street.clone()),
            house: Some(address.house.clone()),
            apartment: address.apartment.clone(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn address_form(house: &str) -> AddressForm {
        AddressForm {
            region: Some("Крым".to_string()),
            city: Some("Ялта".to_string()),
            street: Some("Ленина".to_string()),
            house: Some(house.to_string()),
            apartment: None,
        }
    }

    #[test]
    fn test_house_must_be_digits() {
        let err = address_form("12a").validate().unwrap_err();
        assert!(err.has("house"));
        assert_eq!(err.errors().len(), 1);

        let input = address_form("12").validate().unwrap();
        assert_eq!(input.house, "12");
    }

    #[test]
    fn test_address_required_fields_are_all_reported() {
        let err = AddressForm::default().validate().unwrap_err();
        for field in ["region", "city", "street", "house"] {
            assert!(err.has(field), "{field} should be required");
        }
        assert!(!err.has("apartment"));
    }

    #[test]
    fn test_letters_accept_latin_cyrillic_and_spaces() {
        let mut form = address_form("5");
        form.street = Some("Old Market Square".to_string());
        form.city = Some("Санкт Петербург".to_string());
        assert!(form.validate().is_ok());

        form.street = Some("Lenina-5".to_string());
        assert!(form.validate().unwrap_err().has("street"));
    }

    #[test]
    fn test_empty_strings_become_null() {
        let mut form = address_form("5");
        form.apartment = Some("   ".to_string());
        assert_eq!(form.validate().unwrap().apartment, None);
    }

    #[test]
    fn test_user_first_name_required() {
        let form = UserForm {
            first_name: Some(String::new()),
            ..UserForm::default()
        };
        let err = form.validate().unwrap_err();
        assert!(err.has("firstName"));
        assert_eq!(err.to_string(), "firstName: is required");
    }

    #[test]
    fn test_user_field_rules() {
        let form = UserForm {
            first_name: Some("Иван".to_string()),
            last_name: Some("Petrov2".to_string()),
            phone: Some("+7 900".to_string()),
            email: Some("not-an-email".to_string()),
            birth_date: Some("17/05/1990".to_string()),
            ..UserForm::default()
        };
        let err = form.validate().unwrap_err();
        assert!(err.has("lastName"));
        assert!(err.has("phone"));
        assert!(err.has("email"));
        assert!(err.has("birthDate"));
        assert!(!err.has("firstName"));
    }

    #[test]
    fn test_user_valid_form_builds_input() {
        let form = UserForm {
            first_name: Some(" Иван ".to_string()),
            middle_name: Some(String::new()),
            phone: Some("79001234567".to_string()),
            email: Some("ivan@example.com".to_string()),
            birth_date: Some("17.05.1990".to_string()),
            address_id: Some(AddressId::new(7)),
            ..UserForm::default()
        };
        let input = form.validate().unwrap();
        assert_eq!(input.first_name, "Иван");
        assert_eq!(input.middle_name, None);
        assert_eq!(input.birth_date, NaiveDate::from_ymd_opt(1990, 5, 17));
        assert_eq!(input.address_id, Some(AddressId::new(7)));
    }

    #[test]
    fn test_prefilled_form_round_trips_user() {
        let user = User {
            id: crate::UserId::new(4),
            first_name: "Anna".to_string(),
            last_name: Some("Smith".to_string()),
            middle_name: None,
            phone: None,
            email: Some(Email::parse("anna@example.com").unwrap()),
            birth_date: NaiveDate::from_ymd_opt(2000, 2, 29),
            address: None,
        };
        let input = UserForm::from(&user).validate().unwrap();
        assert!(input.matches(&user));
    }
}
