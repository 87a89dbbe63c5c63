//! Query cache types and the invalidation ledger.
//!
//! Entries are stored in a `moka` cache keyed by [`QueryKey`]. Each entry
//! remembers the tags its response provides and the ledger generation at
//! which its request was sent. Invalidating a tag records the generation
//! at which it happened; an entry is stale once any tag it provides was
//! invalidated after its request went out. Stale entries are refetched on
//! the next read.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use roster_core::{Address, AddressId, User, UserId};

use crate::client::Request;
use crate::tags::{Tag, TagKind};

/// Identity of a cached read.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum QueryKey {
    Users,
    User(UserId),
    Addresses,
    UnassignedAddresses,
    Address(AddressId),
}

impl QueryKey {
    /// The GET request backing this query.
    #[must_use]
    pub fn request(&self) -> Request {
        match self {
            Self::Users => Request::get("users"),
            Self::User(id) => Request::get(format!("users/{id}")),
            Self::Addresses => Request::get("addresses"),
            Self::UnassignedAddresses => Request::get("addresses/without-users"),
            Self::Address(id) => Request::get(format!("addresses/{id}")),
        }
    }

    /// Tags this query provides before any response is known.
    #[must_use]
    pub fn base_tags(&self) -> Vec<Tag> {
        match self {
            Self::Users => vec![Tag::all(TagKind::Users)],
            Self::User(id) => vec![Tag::user(*id)],
            Self::Addresses | Self::UnassignedAddresses => vec![Tag::all(TagKind::Addresses)],
            Self::Address(id) => vec![Tag::address(*id)],
        }
    }

    /// Tags provided once the response is known: lists add one tag per row so
    /// that a per-record invalidation reaches every list containing it.
    ///
    /// Users embed their address, so user reads also provide the tag of each
    /// embedded address: editing or deleting it reaches them too.
    #[must_use]
    pub fn provides(&self, value: &CacheValue) -> Vec<Tag> {
        let mut tags = self.base_tags();
        match value {
            CacheValue::Users(users) => {
                tags.extend(users.iter().map(|u| Tag::user(u.id)));
                tags.extend(users.iter().filter_map(User::address_id).map(Tag::address));
            }
            CacheValue::User(user) => tags.extend(user.address_id().map(Tag::address)),
            CacheValue::Addresses(addresses) => {
                tags.extend(addresses.iter().map(|a| Tag::address(a.id)));
            }
            CacheValue::Address(_) => {}
        }
        tags
    }
}

/// Cached response values. Shared, never mutated after insertion.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Users(Arc<[User]>),
    User(Arc<User>),
    Addresses(Arc<[Address]>),
    Address(Arc<Address>),
}

impl CacheValue {
    #[must_use]
    pub fn into_users(self) -> Option<Arc<[User]>> {
        match self {
            Self::Users(users) => Some(users),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_user(self) -> Option<Arc<User>> {
        match self {
            Self::User(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_addresses(self) -> Option<Arc<[Address]>> {
        match self {
            Self::Addresses(addresses) => Some(addresses),
            _ => None,
        }
    }

    #[must_use]
    pub fn into_address(self) -> Option<Arc<Address>> {
        match self {
            Self::Address(address) => Some(address),
            _ => None,
        }
    }
}

/// A cached response with the bookkeeping needed to judge staleness.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub value: CacheValue,
    pub tags: Arc<[Tag]>,
    /// Ledger generation observed when the request was sent.
    pub fetched_at: u64,
}

/// Records when each tag was last invalidated.
#[derive(Debug, Default)]
pub struct TagLedger {
    generation: AtomicU64,
    invalidated_at: Mutex<HashMap<Tag, u64>>,
}

impl TagLedger {
    /// Generation to stamp on a request that is about to be sent.
    pub fn current(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Mark tags invalidated as of a new generation.
    ///
    /// A base tag supersedes every older per-record mark of its kind, so those
    /// are dropped and the ledger stays bounded by the records touched since.
    pub fn invalidate(&self, tags: &[Tag]) -> u64 {
        let mut invalidated_at = self
            .invalidated_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        for tag in tags.iter().filter(|t| t.id.is_none()) {
            invalidated_at.retain(|marked, _| marked.kind != tag.kind || marked.id.is_none());
        }
        for tag in tags {
            invalidated_at.insert(*tag, generation);
        }
        generation
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.invalidated_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Forget every tag and bump the generation so all entries go stale.
    pub fn invalidate_all(&self) {
        let mut invalidated_at = self
            .invalidated_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        invalidated_at.clear();
        invalidated_at.insert(Tag::all(TagKind::Users), generation);
        invalidated_at.insert(Tag::all(TagKind::Addresses), generation);
    }

    /// Whether any tag the entry provides was invalidated after its request
    /// was sent.
    pub fn is_stale(&self, entry: &CacheEntry) -> bool {
        let invalidated_at = self
            .invalidated_at
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let newer = |tag: &Tag| {
            invalidated_at
                .get(tag)
                .is_some_and(|&generation| generation > entry.fetched_at)
        };
        entry.tags.iter().any(|provided| {
            newer(&Tag::all(provided.kind)) || (provided.id.is_some() && newer(provided))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(id: i64) -> Address {
        Address {
            id: AddressId::new(id),
            region: "Крым".to_string(),
            city: "Ялта".to_string(),
            street: "Ленина".to_string(),
            house: "5".to_string(),
            apartment: None,
        }
    }

    fn entry(key: &QueryKey, value: CacheValue, fetched_at: u64) -> CacheEntry {
        CacheEntry {
            tags: key.provides(&value).into(),
            value,
            fetched_at,
        }
    }

    #[test]
    fn test_request_paths() {
        assert_eq!(QueryKey::Users.request().path, "users");
        assert_eq!(QueryKey::User(UserId::new(3)).request().path, "users/3");
        assert_eq!(
            QueryKey::UnassignedAddresses.request().path,
            "addresses/without-users"
        );
        assert_eq!(
            QueryKey::Address(AddressId::new(7)).request().path,
            "addresses/7"
        );
    }

    #[test]
    fn test_lists_provide_row_tags() {
        let value = CacheValue::Addresses(vec![address(1), address(2)].into());
        let tags = QueryKey::UnassignedAddresses.provides(&value);
        assert_eq!(
            tags,
            vec![
                Tag::all(TagKind::Addresses),
                Tag::address(AddressId::new(1)),
                Tag::address(AddressId::new(2)),
            ]
        );
    }

    #[test]
    fn test_entry_goes_stale_after_matching_invalidation() {
        let ledger = TagLedger::default();
        let key = QueryKey::Addresses;
        let cached = entry(&key, CacheValue::Addresses(vec![address(7)].into()), ledger.current());
        assert!(!ledger.is_stale(&cached));

        ledger.invalidate(&[Tag::all(TagKind::Users)]);
        assert!(!ledger.is_stale(&cached));

        ledger.invalidate(&[Tag::address(AddressId::new(7))]);
        assert!(ledger.is_stale(&cached));
    }

    #[test]
    fn test_base_invalidation_reaches_id_entries() {
        let ledger = TagLedger::default();
        let key = QueryKey::Address(AddressId::new(7));
        let cached = entry(&key, CacheValue::Address(Arc::new(address(7))), ledger.current());

        ledger.invalidate(&[Tag::all(TagKind::Addresses)]);
        assert!(ledger.is_stale(&cached));
    }

    #[test]
    fn test_request_sent_before_invalidation_is_stale() {
        let ledger = TagLedger::default();
        let sent_at = ledger.current();
        ledger.invalidate(&[Tag::all(TagKind::Addresses)]);

        // Response lands after the write committed.
        let late = entry(&QueryKey::Addresses, CacheValue::Addresses(Vec::<Address>::new().into()), sent_at);
        assert!(ledger.is_stale(&late));

        let fresh = entry(
            &QueryKey::Addresses,
            CacheValue::Addresses(Vec::<Address>::new().into()),
            ledger.current(),
        );
        assert!(!ledger.is_stale(&fresh));
    }

    fn user_at(id: i64, address_id: Option<i64>) -> User {
        User {
            id: UserId::new(id),
            first_name: "Иван".to_string(),
            last_name: None,
            middle_name: None,
            phone: None,
            email: None,
            birth_date: None,
            address: address_id.map(address),
        }
    }

    #[test]
    fn test_user_reads_provide_embedded_address_tags() {
        let value = CacheValue::Users(vec![user_at(1, Some(7)), user_at(2, None)].into());
        assert_eq!(
            QueryKey::Users.provides(&value),
            vec![
                Tag::all(TagKind::Users),
                Tag::user(UserId::new(1)),
                Tag::user(UserId::new(2)),
                Tag::address(AddressId::new(7)),
            ]
        );

        let single = CacheValue::User(Arc::new(user_at(1, Some(7))));
        assert!(
            QueryKey::User(UserId::new(1))
                .provides(&single)
                .contains(&Tag::address(AddressId::new(7)))
        );
    }

    #[test]
    fn test_address_write_stales_users_embedding_it() {
        let ledger = TagLedger::default();
        let key = QueryKey::Users;
        let linked = entry(&key, CacheValue::Users(vec![user_at(1, Some(7))].into()), ledger.current());
        let unlinked = entry(&key, CacheValue::Users(vec![user_at(1, None)].into()), ledger.current());

        ledger.invalidate(&[Tag::address(AddressId::new(7))]);
        assert!(ledger.is_stale(&linked));
        assert!(!ledger.is_stale(&unlinked));
    }

    #[test]
    fn test_base_invalidation_prunes_record_marks() {
        let ledger = TagLedger::default();
        let cached = entry(
            &QueryKey::Address(AddressId::new(3)),
            CacheValue::Address(Arc::new(address(3))),
            ledger.current(),
        );

        for id in 1..=5 {
            ledger.invalidate(&[Tag::address(AddressId::new(id)), Tag::user(UserId::new(id))]);
        }
        assert_eq!(ledger.tracked(), 10);

        ledger.invalidate(&[Tag::all(TagKind::Addresses)]);
        // Five user marks plus the single Addresses mark.
        assert_eq!(ledger.tracked(), 6);
        assert!(ledger.is_stale(&cached));

        let refetched = entry(
            &QueryKey::Address(AddressId::new(3)),
            CacheValue::Address(Arc::new(address(3))),
            ledger.current(),
        );
        assert!(!ledger.is_stale(&refetched));
    }

    #[test]
    fn test_invalidate_all() {
        let ledger = TagLedger::default();
        let cached = entry(&QueryKey::Users, CacheValue::Users(Vec::<User>::new().into()), ledger.current());
        ledger.invalidate_all();
        assert!(ledger.is_stale(&cached));
    }
}
