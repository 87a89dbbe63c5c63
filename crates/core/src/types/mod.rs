//! Core types for Roster.
//!
//! This module provides type-safe wrappers for the two managed records and
//! the values they carry.

pub mod address;
pub mod email;
pub mod id;
pub mod user;

pub use address::{Address, AddressInput};
pub use email::{Email, EmailError};
pub use id::*;
pub use user::{User, UserInput};
