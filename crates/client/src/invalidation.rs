//! Cache invalidation policy.
//!
//! Every write the client can issue is a [`Mutation`]. After the backend
//! accepts it, the tags returned by [`Mutation::invalidates`] are published
//! and every cached read providing a matching tag goes stale.
//!
//! # Rules
//!
//! | Mutation | Invalidates |
//! |---|---|
//! | create user | `Users`, `Addresses` |
//! | update user | `Users#id`, `Addresses` |
//! | delete user | `Users`, `Addresses` |
//! | create address | `Addresses` |
//! | update address | `Addresses#id` |
//! | delete address | `Addresses` |
//!
//! User writes reach the address cache because a user owns the one-to-one
//! link: creating a user can take an address out of the unassigned list,
//! updating one can move the link, and deleting one releases its address.
//! Address writes reach user reads only through the tags of the addresses
//! those users embed (see [`QueryKey::provides`](crate::cache::QueryKey::provides)).

use std::fmt;

use roster_core::{AddressId, UserId};

use crate::tags::{Tag, TagKind};

/// A write accepted by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    CreateUser,
    UpdateUser(UserId),
    DeleteUser(UserId),
    CreateAddress,
    UpdateAddress(AddressId),
    DeleteAddress(AddressId),
}

impl Mutation {
    /// Tags made stale by this write.
    #[must_use]
    pub fn invalidates(&self) -> Vec<Tag> {
        let addresses = Tag::all(TagKind::Addresses);
        match *self {
            Self::CreateUser | Self::DeleteUser(_) => vec![Tag::all(TagKind::Users), addresses],
            Self::UpdateUser(id) => vec![Tag::user(id), addresses],
            Self::CreateAddress | Self::DeleteAddress(_) => vec![addresses],
            Self::UpdateAddress(id) => vec![Tag::address(id)],
        }
    }
}

impl fmt::Display for Mutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateUser => write!(f, "create user"),
            Self::UpdateUser(id) => write!(f, "update user {id}"),
            Self::DeleteUser(id) => write!(f, "delete user {id}"),
            Self::CreateAddress => write!(f, "create address"),
            Self::UpdateAddress(id) => write!(f, "update address {id}"),
            Self::DeleteAddress(id) => write!(f, "delete address {id}"),
        }
    }
}

/// Broadcast to subscribers after a write commits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invalidation {
    /// The write that triggered it, or `None` for a manual flush.
    pub cause: Option<Mutation>,
    /// Tags that went stale.
    pub tags: Vec<Tag>,
}

impl Invalidation {
    /// Whether an entry providing any of `provided` is affected.
    #[must_use]
    pub fn affects(&self, provided: &[Tag]) -> bool {
        self.tags
            .iter()
            .any(|tag| provided.iter().any(|p| tag.invalidates(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unassigned_list_tags() -> Vec<Tag> {
        vec![
            Tag::all(TagKind::Addresses),
            Tag::address(AddressId::new(7)),
        ]
    }

    #[test]
    fn test_delete_user_reaches_address_lists() {
        let event = Invalidation {
            cause: Some(Mutation::DeleteUser(UserId::new(1))),
            tags: Mutation::DeleteUser(UserId::new(1)).invalidates(),
        };
        assert!(event.affects(&unassigned_list_tags()));
        assert!(event.affects(&[Tag::all(TagKind::Users)]));
    }

    #[test]
    fn test_create_and_update_user_reach_address_lists() {
        for mutation in [Mutation::CreateUser, Mutation::UpdateUser(UserId::new(2))] {
            let event = Invalidation {
                cause: Some(mutation),
                tags: mutation.invalidates(),
            };
            assert!(event.affects(&unassigned_list_tags()), "{mutation}");
        }
    }

    #[test]
    fn test_update_user_reaches_only_that_user() {
        let tags = Mutation::UpdateUser(UserId::new(2)).invalidates();
        let event = Invalidation { cause: None, tags };
        assert!(event.affects(&[Tag::user(UserId::new(2))]));
        assert!(!event.affects(&[Tag::user(UserId::new(3))]));
        assert!(!event.affects(&[Tag::all(TagKind::Users)]));
    }

    #[test]
    fn test_address_writes_never_reach_users() {
        for mutation in [
            Mutation::CreateAddress,
            Mutation::UpdateAddress(AddressId::new(7)),
            Mutation::DeleteAddress(AddressId::new(7)),
        ] {
            let event = Invalidation {
                cause: Some(mutation),
                tags: mutation.invalidates(),
            };
            assert!(
                !event.affects(&[Tag::all(TagKind::Users), Tag::user(UserId::new(7))]),
                "{mutation}"
            );
        }
    }

    #[test]
    fn test_update_address_reaches_lists_containing_it() {
        let event = Invalidation {
            cause: None,
            tags: Mutation::UpdateAddress(AddressId::new(7)).invalidates(),
        };
        assert!(event.affects(&unassigned_list_tags()));
        assert!(!event.affects(&[Tag::all(TagKind::Addresses), Tag::address(AddressId::new(8))]));
    }
}
