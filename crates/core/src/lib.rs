//! Roster Core - Shared domain types and form validation.
//!
//! This crate provides the types used across all Roster components:
//! - `client` - REST query client with tag-based cache invalidation
//! - `cli` - Terminal console for managing users and addresses
//!
//! # Architecture
//!
//! The core crate contains only types and validation rules - no I/O and no
//! HTTP clients. Anything that talks to the backend lives in `roster-client`.
//!
//! # Modules
//!
//! - [`types`] - Newtype ids, emails, and the `User`/`Address` records
//! - [`validation`] - Field rules evaluated before a write is submitted

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;
pub mod validation;

pub use types::*;
pub use validation::{AddressForm, FieldError, UserForm, ValidationErrors};
