//! Cache tags.
//!
//! A tag groups cached query results that must be invalidated together. A
//! tag without an id stands for the whole entity type; a tag with an id
//! stands for one record.

use std::fmt;

use roster_core::{AddressId, UserId};

/// Entity type a tag belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TagKind {
    Users,
    Addresses,
}

impl fmt::Display for TagKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Users => write!(f, "Users"),
            Self::Addresses => write!(f, "Addresses"),
        }
    }
}

/// A `(kind, optional record id)` label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Tag {
    pub kind: TagKind,
    pub id: Option<i64>,
}

impl Tag {
    /// The base tag for an entity type.
    #[must_use]
    pub const fn all(kind: TagKind) -> Self {
        Self { kind, id: None }
    }

    /// Tag scoped to one user.
    #[must_use]
    pub const fn user(id: UserId) -> Self {
        Self {
            kind: TagKind::Users,
            id: Some(id.as_i64()),
        }
    }

    /// Tag scoped to one address.
    #[must_use]
    pub const fn address(id: AddressId) -> Self {
        Self {
            kind: TagKind::Addresses,
            id: Some(id.as_i64()),
        }
    }

    /// Whether invalidating `self` makes an entry providing `provided` stale.
    ///
    /// A base tag reaches every tag of its kind; an id tag reaches only the
    /// same id.
    #[must_use]
    pub fn invalidates(&self, provided: &Self) -> bool {
        self.kind == provided.kind && (self.id.is_none() || self.id == provided.id)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.id {
            Some(id) => write!(f, "{}#{id}", self.kind),
            None => write!(f, "{}", self.kind),
        }
    }
}
