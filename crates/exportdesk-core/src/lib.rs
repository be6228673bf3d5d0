//! # exportdesk-core
//!
//! The RFQ and messaging core of the export marketplace.
//!
//! - [`RfqManager`] creates RFQs and applies status changes.
//! - [`ThreadManager`] appends to and reads RFQ message threads.
//! - [`ThreadSync`] keeps open thread views consistent with the store.
//! - [`guard`] holds the single authorization predicate every operation
//!   goes through.
//! - [`Catalog`] and [`AdminConsole`] cover the product and back-office
//!   operations the RFQ flow depends on.
//!
//! Everything is generic over [`exportdesk_store::Store`]; [`Marketplace`]
//! wires the pieces to one backend.

pub mod actor;
pub mod admin;
pub mod catalog;
pub mod config;
pub mod guard;
pub mod marketplace;
pub mod rfq;
pub mod sync;
pub mod thread;

mod error;

#[cfg(test)]
mod testing;

pub use actor::{require_actor, Actor, IdentityProvider, NewProfile, SessionIdentity, StoreIdentity};
pub use admin::{AdminConsole, DashboardStats};
pub use catalog::{Catalog, ProductDraft, ProductFilter};
pub use config::{CoreConfig, MoqPolicy, TransitionPolicy};
pub use error::{CoreError, Result};
pub use marketplace::Marketplace;
pub use rfq::{BuyerSummary, CreateRfq, RfqFilter, RfqManager, RfqSummary};
pub use sync::{PendingMessage, ThreadSnapshot, ThreadSync, ThreadView};
pub use thread::ThreadManager;
