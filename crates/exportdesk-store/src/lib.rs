//! # exportdesk-store
//!
//! Persistence and insert-notification backends for the RFQ core.
//!
//! Both backends implement the async [`Store`] trait so that calling code
//! never needs to know which one is active:
//!
//! - [`MemoryStore`] keeps everything in process memory and can persist a
//!   JSON snapshot to disk after every write (the client-local backend).
//! - [`SqliteStore`] wraps a migrated SQLite [`Database`] (the
//!   database-backed backend).
//!
//! Each backend owns a [`Notifier`] and publishes a [`StoreEvent`] after
//! every committed message insert.

pub mod database;
pub mod memory;
pub mod messages;
pub mod migrations;
pub mod models;
pub mod notify;
pub mod products;
pub mod profiles;
pub mod rfqs;
pub mod sqlite;
pub mod store;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use models::*;
pub use notify::{MessageSubscription, Notifier, StoreEvent, SubscriptionEvent};
pub use sqlite::SqliteStore;
pub use store::Store;
