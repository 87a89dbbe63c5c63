//! List view projections.
//!
//! Tables are derived from cache snapshots on every render; nothing here
//! keeps its own copy of server data.

use roster_core::{Address, AddressId, User};

/// Rows per page unless the caller asks otherwise.
pub const DEFAULT_PAGE_SIZE: usize = 10;

/// Placeholder for missing values.
const EMPTY: &str = "-";

/// One page of a client-side sliced list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// 1-based page number that was requested.
    pub number: usize,
    pub size: usize,
    pub total_items: usize,
    pub total_pages: usize,
}

/// Slice `items` into pages of `size` and return page `number` (1-based).
///
/// Page 0 is treated as page 1; pages past the end are empty. A size of 0
/// falls back to [`DEFAULT_PAGE_SIZE`].
#[must_use]
pub fn paginate<T: Clone>(items: &[T], number: usize, size: usize) -> Page<T> {
    let size = if size == 0 { DEFAULT_PAGE_SIZE } else { size };
    let number = number.max(1);
    let total_items = items.len();

    Page {
        items: items
            .iter()
            .skip((number - 1).saturating_mul(size))
            .take(size)
            .cloned()
            .collect(),
        number,
        size,
        total_items,
        total_pages: total_items.div_ceil(size),
    }
}

fn or_dash(value: Option<&str>) -> String {
    value.unwrap_or(EMPTY).to_string()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(needle)
}

// =============================================================================
// Users
// =============================================================================

/// A user rendered for the users table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRow {
    /// 1-based position in the (filtered) list.
    pub index: usize,
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: String,
    pub phone: String,
    pub email: String,
    /// `DD.MM.YYYY`.
    pub birth_date: String,
    /// `city, street`.
    pub address: String,
}

impl UserRow {
    /// Column headers, in row order.
    pub const HEADERS: [&'static str; 9] = [
        "№",
        "ID",
        "First name",
        "Last name",
        "Middle name",
        "Phone",
        "Email",
        "Birth date",
        "Address",
    ];

    #[must_use]
    pub fn new(index: usize, user: &User) -> Self {
        Self {
            index,
            id: user.id.to_string(),
            first_name: user.first_name.clone(),
            last_name: or_dash(user.last_name.as_deref()),
            middle_name: or_dash(user.middle_name.as_deref()),
            phone: or_dash(user.phone.as_deref()),
            email: user
                .email
                .as_ref()
                .map_or_else(|| EMPTY.to_string(), ToString::to_string),
            birth_date: user
                .birth_date
                .map_or_else(|| EMPTY.to_string(), |d| d.format("%d.%m.%Y").to_string()),
            address: user
                .address
                .as_ref()
                .map_or_else(|| EMPTY.to_string(), Address::short),
        }
    }

    /// Cells in header order.
    #[must_use]
    pub fn cells(&self) -> [String; 9] {
        [
            self.index.to_string(),
            self.id.clone(),
            self.first_name.clone(),
            self.last_name.clone(),
            self.middle_name.clone(),
            self.phone.clone(),
            self.email.clone(),
            self.birth_date.clone(),
            self.address.clone(),
        ]
    }
}

/// Users whose first, last or middle name contains `query` (case-insensitive).
/// An empty query keeps everything.
#[must_use]
pub fn filter_users(users: &[User], query: &str) -> Vec<User> {
    let needle = query.trim().to_lowercase();
    users
        .iter()
        .filter(|user| {
            needle.is_empty()
                || contains_ci(&user.first_name, &needle)
                || user
                    .last_name
                    .as_deref()
                    .is_some_and(|n| contains_ci(n, &needle))
                || user
                    .middle_name
                    .as_deref()
                    .is_some_and(|n| contains_ci(n, &needle))
        })
        .cloned()
        .collect()
}

/// Rows for one page of users. Indexes count from the start of the list.
#[must_use]
pub fn user_rows(page: &Page<User>) -> Vec<UserRow> {
    let offset = page.number.saturating_sub(1) * page.size;
    page.items
        .iter()
        .enumerate()
        .map(|(i, user)| UserRow::new(offset + i + 1, user))
        .collect()
}

// =============================================================================
// Addresses
// =============================================================================

/// An address rendered for the addresses table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressRow {
    pub index: usize,
    pub id: String,
    pub region: String,
    pub city: String,
    pub street: String,
    pub house: String,
    pub apartment: String,
}

impl AddressRow {
    /// Column headers, in row order.
    pub const HEADERS: [&'static str; 7] =
        ["№", "ID", "Region", "City", "Street", "House", "Apartment"];

    #[must_use]
    pub fn new(index: usize, address: &Address) -> Self {
        Self {
            index,
            id: address.id.to_string(),
            region: address.region.clone(),
            city: address.city.clone(),
            street: address.street.clone(),
            house: address.house.clone(),
            apartment: or_dash(address.apartment.as_deref()),
        }
    }

    /// Cells in header order.
    #[must_use]
    pub fn cells(&self) -> [String; 7] {
        [
            self.index.to_string(),
            self.id.clone(),
            self.region.clone(),
            self.city.clone(),
            self.street.clone(),
            self.house.clone(),
            self.apartment.clone(),
        ]
    }
}

/// Addresses whose region, city or street contains `query` (case-insensitive).
#[must_use]
pub fn filter_addresses(addresses: &[Address], query: &str) -> Vec<Address> {
    let needle = query.trim().to_lowercase();
    addresses
        .iter()
        .filter(|a| {
            needle.is_empty()
                || contains_ci(&a.region, &needle)
                || contains_ci(&a.city, &needle)
                || contains_ci(&a.street, &needle)
        })
        .cloned()
        .collect()
}

/// Rows for one page of addresses.
#[must_use]
pub fn address_rows(page: &Page<Address>) -> Vec<AddressRow> {
    let offset = page.number.saturating_sub(1) * page.size;
    page.items
        .iter()
        .enumerate()
        .map(|(i, address)| AddressRow::new(offset + i + 1, address))
        .collect()
}

/// An entry in the address picker of the user forms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressOption {
    pub id: AddressId,
    pub label: String,
}

/// Picker options built from the unassigned list, optionally narrowed by a
/// case-insensitive search over the label.
#[must_use]
pub fn address_options(unassigned: &[Address], search: Option<&str>) -> Vec<AddressOption> {
    let needle = search.map(|s| s.trim().to_lowercase()).unwrap_or_default();
    unassigned
        .iter()
        .map(|a| AddressOption {
            id: a.id,
            label: a.label(),
        })
        .filter(|option| needle.is_empty() || contains_ci(&option.label, &needle))
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use roster_core::UserId;

    use super::*;

    fn address(id: i64, city: &str, street: &str) -> Address {
        Address {
            id: AddressId::new(id),
            region: "Крым".to_string(),
            city: city.to_string(),
            street: street.to_string(),
            house: "5".to_string(),
            apartment: None,
        }
    }

    fn user(id: i64, first: &str, last: Option<&str>) -> User {
        User {
            id: UserId::new(id),
            first_name: first.to_string(),
            last_name: last.map(str::to_string),
            middle_name: None,
            phone: None,
            email: None,
            birth_date: None,
            address: None,
        }
    }

    #[test]
    fn test_paginate_slices_and_counts() {
        let items: Vec<u32> = (1..=23).collect();

        let first = paginate(&items, 1, 10);
        assert_eq!(first.items, (1..=10).collect::<Vec<_>>());
        assert_eq!(first.total_pages, 3);

        let last = paginate(&items, 3, 10);
        assert_eq!(last.items, vec![21, 22, 23]);

        let past_end = paginate(&items, 4, 10);
        assert!(past_end.items.is_empty());
        assert_eq!(past_end.total_items, 23);
    }

    #[test]
    fn test_paginate_clamps_zero_values() {
        let items: Vec<u32> = (1..=12).collect();
        let page = paginate(&items, 0, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, DEFAULT_PAGE_SIZE);
        assert_eq!(page.items.len(), 10);
    }

    #[test]
    fn test_paginate_empty_list() {
        let page = paginate::<u32>(&[], 1, 10);
        assert!(page.items.is_empty());
        assert_eq!(page.total_pages, 0);
    }

    #[test]
    fn test_user_row_formats_missing_values_and_dates() {
        let mut u = user(3, "Иван", None);
        u.birth_date = NaiveDate::from_ymd_opt(1990, 5, 17);
        u.address = Some(address(7, "Ялта", "Ленина"));

        let row = UserRow::new(1, &u);
        assert_eq!(row.last_name, "-");
        assert_eq!(row.email, "-");
        assert_eq!(row.birth_date, "17.05.1990");
        assert_eq!(row.address, "Ялта, Ленина");
    }

    #[test]
    fn test_user_rows_index_across_pages() {
        let users: Vec<User> = (1..=12).map(|i| user(i, "Anna", None)).collect();
        let rows = user_rows(&paginate(&users, 2, 10));
        assert_eq!(rows.len(), 2);
        assert_eq!(rows.first().map(|r| r.index), Some(11));
    }

    #[test]
    fn test_filter_users_case_insensitive() {
        let users = vec![
            user(1, "Иван", Some("Петров")),
            user(2, "Anna", Some("Smith")),
        ];
        let found = filter_users(&users, "петр");
        assert_eq!(found.len(), 1);
        assert_eq!(found.first().map(|u| u.id), Some(UserId::new(1)));

        assert_eq!(filter_users(&users, "  ").len(), 2);
        assert_eq!(filter_users(&users, "SMI").len(), 1);
    }

    #[test]
    fn test_filter_addresses() {
        let addresses = vec![address(1, "Ялта", "Ленина"), address(2, "Алушта", "Морская")];
        assert_eq!(filter_addresses(&addresses, "морск").len(), 1);
        assert_eq!(filter_addresses(&addresses, "крым").len(), 2);
    }

    #[test]
    fn test_address_options_search_labels() {
        let unassigned = vec![address(1, "Ялта", "Ленина"), address(2, "Алушта", "Морская")];
        let options = address_options(&unassigned, Some("ялта"));
        assert_eq!(
            options,
            vec![AddressOption {
                id: AddressId::new(1),
                label: "Крым Ялта Ленина 5".to_string(),
            }]
        );
        assert_eq!(address_options(&unassigned, None).len(), 2);
    }
}
