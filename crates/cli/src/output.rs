//! Terminal rendering.
//!
//! Renderers return strings so they can be checked without a terminal;
//! `print`, `success`, `notice` and `failure` do the writing.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use roster_client::ClientError;
use roster_client::view::{
    AddressOption, AddressRow, Page, UserRow, address_rows, user_rows,
};
use roster_core::{Address, User};
use tabled::{builder::Builder, settings::Style};

use crate::commands::CommandError;

pub fn print(text: &str) {
    println!("{text}");
}

pub fn success(message: &str) {
    println!("✓ {message}");
}

/// Out-of-band message, e.g. a background refetch in the console.
pub fn notice(message: &str) {
    eprintln!("» {message}");
}

pub fn failure(error: &CommandError) {
    eprintln!("Error: {error}");

    if let CommandError::Client(ClientError::Validation(errors)) = error {
        for field in errors.errors() {
            eprintln!("  - {field}");
        }
    }
}

fn table<const N: usize>(headers: [&str; N], rows: impl IntoIterator<Item = [String; N]>) -> String {
    let mut builder = Builder::default();
    builder.push_record(headers);
    for row in rows {
        builder.push_record(row);
    }
    builder.build().with(Style::rounded()).to_string()
}

fn footer<T>(page: &Page<T>, noun: &str) -> String {
    if page.total_items == 0 {
        return format!("No {noun} found");
    }
    format!(
        "Page {} of {} ({} {noun})",
        page.number,
        page.total_pages.max(1),
        page.total_items
    )
}

#[must_use]
pub fn users_table(page: &Page<User>) -> String {
    if page.items.is_empty() {
        return footer(page, "users");
    }
    let rows = user_rows(page).into_iter().map(|row| row.cells());
    format!("{}\n{}", table(UserRow::HEADERS, rows), footer(page, "users"))
}

#[must_use]
pub fn addresses_table(page: &Page<Address>) -> String {
    if page.items.is_empty() {
        return footer(page, "addresses");
    }
    let rows = address_rows(page).into_iter().map(|row| row.cells());
    format!(
        "{}\n{}",
        table(AddressRow::HEADERS, rows),
        footer(page, "addresses")
    )
}

#[must_use]
pub fn address_options(options: &[AddressOption]) -> String {
    if options.is_empty() {
        return "No unassigned addresses".to_string();
    }
    let rows = options
        .iter()
        .map(|option| [option.id.to_string(), option.label.clone()]);
    table(["ID", "Address"], rows)
}

/// Field/value table for one user.
#[must_use]
pub fn user_details(user: &User) -> String {
    let row = UserRow::new(1, user);
    let address = user
        .address
        .as_ref()
        .map_or_else(|| row.address.clone(), |a| format!("{} (#{})", a.label(), a.id));
    let rows = [
        ["ID".to_string(), row.id],
        ["First name".to_string(), row.first_name],
        ["Last name".to_string(), row.last_name],
        ["Middle name".to_string(), row.middle_name],
        ["Phone".to_string(), row.phone],
        ["Email".to_string(), row.email],
        ["Birth date".to_string(), row.birth_date],
        ["Address".to_string(), address],
    ];
    table(["Field", "Value"], rows)
}

/// Field/value table for one address.
#[must_use]
pub fn address_details(address: &Address) -> String {
    let row = AddressRow::new(1, address);
    let rows = [
        ["ID".to_string(), row.id],
        ["Region".to_string(), row.region],
        ["City".to_string(), row.city],
        ["Street".to_string(), row.street],
        ["House".to_string(), row.house],
        ["Apartment".to_string(), row.apartment],
    ];
    table(["Field", "Value"], rows)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use roster_client::view::paginate;
    use roster_core::{AddressId, UserId};

    use super::*;

    fn yalta() -> Address {
        Address {
            id: AddressId::new(7),
            region: "Крым".to_string(),
            city: "Ялта".to_string(),
            street: "Ленина".to_string(),
            house: "5".to_string(),
            apartment: None,
        }
    }

    fn ivan() -> User {
        User {
            id: UserId::new(3),
            first_name: "Иван".to_string(),
            last_name: None,
            middle_name: None,
            phone: Some("79001234567".to_string()),
            email: None,
            birth_date: NaiveDate::from_ymd_opt(1990, 5, 17),
            address: Some(yalta()),
        }
    }

    #[test]
    fn test_users_table_contains_rows_and_footer() {
        let users = vec![ivan()];
        let out = users_table(&paginate(&users, 1, 10));
        assert!(out.contains("First name"));
        assert!(out.contains("Иван"));
        assert!(out.contains("17.05.1990"));
        assert!(out.contains("Ялта, Ленина"));
        assert!(out.ends_with("Page 1 of 1 (1 users)"));
    }

    #[test]
    fn test_empty_page_renders_message_only() {
        let out = addresses_table(&paginate::<Address>(&[], 1, 10));
        assert_eq!(out, "No addresses found");
    }

    #[test]
    fn test_user_details_shows_linked_address() {
        let out = user_details(&ivan());
        assert!(out.contains("Крым Ялта Ленина 5 (#7)"));
        assert!(out.contains("Middle name"));
    }

    #[test]
    fn test_address_details_dash_for_missing_apartment() {
        let out = address_details(&yalta());
        assert!(out.contains("Apartment"));
        assert!(out.contains('-'));
    }

    #[test]
    fn test_address_options_lists_labels() {
        let options = roster_client::view::address_options(&[yalta()], None);
        let out = address_options(&options);
        assert!(out.contains("Крым Ялта Ленина 5"));
        assert_eq!(address_options(&[]), "No unassigned addresses");
    }
}
