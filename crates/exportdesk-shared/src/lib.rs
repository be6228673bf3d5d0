//! # exportdesk-shared
//!
//! Types shared by every exportdesk crate: strongly-typed identifiers, the
//! enums that travel on the wire (roles, sender types, RFQ statuses,
//! product categories) and the small text helpers used when creating
//! catalog entries and profiles.

pub mod constants;
pub mod error;
pub mod slug;
pub mod types;

pub use error::ParseEnumError;
pub use types::*;
