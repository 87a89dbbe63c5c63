//! Roster Client - REST query client with tag-based cache invalidation.
//!
//! # Architecture
//!
//! - [`RosterClient`] is the single point of HTTP communication: it executes
//!   request descriptors against the configured base URL, caches reads in
//!   `moka`, and coalesces identical reads that are in flight.
//! - Endpoint modules ([`users`], [`addresses`]) declare the CRUD operations,
//!   the tags reads provide, and the [`Mutation`] each write commits.
//! - [`invalidation`] holds the rule table mapping writes to stale tags,
//!   including the cross-entity rules between users and addresses.
//! - [`QuerySubscription`] turns invalidation events into refetched snapshots.
//! - [`view`] derives table rows and pages from snapshots.
//!
//! # Example
//!
//! ```rust,ignore
//! use roster_client::{ClientConfig, RosterClient};
//!
//! let client = RosterClient::new(&ClientConfig::from_env()?);
//!
//! let unassigned = client.list_unassigned_addresses().await?;
//! client.delete_user(user_id).await?;
//! // Served fresh: the delete invalidated every `Addresses` read.
//! let unassigned = client.list_unassigned_addresses().await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod addresses;
pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod invalidation;
pub mod subscription;
pub mod tags;
pub mod users;
pub mod view;

pub use cache::{CacheEntry, CacheValue, QueryKey};
pub use client::{Request, RosterClient};
pub use config::{ClientConfig, ConfigError};
pub use error::ClientError;
pub use invalidation::{Invalidation, Mutation};
pub use subscription::QuerySubscription;
pub use tags::{Tag, TagKind};
