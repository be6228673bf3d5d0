//! The persistence and notification contract shared by every backend.

use async_trait::async_trait;

use exportdesk_shared::{ProductId, RfqId, RfqStatus, UserId};

use crate::error::Result;
use crate::models::{
    Message, NewMessage, NewRfq, Product, Profile, ProfileUpdate, PurgeReport, Rfq,
    RfqQuery,
};
use crate::notify::MessageSubscription;

/// Repository trait over products, profiles, RFQs and messages, plus an
/// insert subscription primitive for message threads.
///
/// Identifiers and timestamps of RFQs and messages are generated by the
/// store.  Implementations must publish a notification only after the
/// corresponding write has committed.
#[async_trait]
pub trait Store: Send + Sync {
    // -- products --

    /// Insert a new product.  Fails with `DuplicateSlug` if the slug is taken.
    async fn insert_product(&self, product: &Product) -> Result<()>;

    /// Replace an existing product row.
    async fn update_product(&self, product: &Product) -> Result<()>;

    /// Delete a product.  Fails with `InUse` while RFQs reference it.
    async fn delete_product(&self, id: ProductId) -> Result<()>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>>;

    /// All products, newest first.
    async fn list_products(&self) -> Result<Vec<Product>>;

    // -- profiles --

    /// Insert a new profile.  Fails with `DuplicateProfile` if the user id
    /// already has one; an existing row is never touched.
    async fn insert_profile(&self, profile: &Profile) -> Result<()>;

    async fn upsert_profile(&self, profile: &Profile) -> Result<()>;

    /// Change only the contact fields of an existing profile and bump
    /// `updated_at`.
    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile>;

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>>;

    /// All profiles, newest first.
    async fn list_profiles(&self) -> Result<Vec<Profile>>;

    async fn set_profile_active(&self, user_id: UserId, active: bool) -> Result<Profile>;

    // -- rfqs --

    /// Atomically insert a new RFQ with status `Pending` and version 1.
    async fn insert_rfq(&self, rfq: NewRfq) -> Result<Rfq>;

    async fn get_rfq(&self, id: RfqId) -> Result<Option<Rfq>>;

    /// Matching RFQs, newest first.
    async fn list_rfqs(&self, query: &RfqQuery) -> Result<Vec<Rfq>>;

    /// Set the status, bump `version` and `updated_at`.
    ///
    /// With `expected_version` the write only happens if the stored version
    /// matches; otherwise it fails with `VersionMismatch`.
    async fn update_rfq_status(
        &self,
        id: RfqId,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> Result<Rfq>;

    // -- messages --

    /// Append a message and notify subscribers of its RFQ.
    async fn insert_message(&self, message: NewMessage) -> Result<Message>;

    /// The full thread, ascending by creation time then insertion order.
    async fn list_messages(&self, rfq_id: RfqId) -> Result<Vec<Message>>;

    /// Subscribe to message inserts for one RFQ.
    fn subscribe_messages(&self, rfq_id: RfqId) -> MessageSubscription;

    // -- cascade --

    /// Delete a user's profile, their RFQs, the messages on those RFQs and
    /// every message they sent, as one unit.
    async fn purge_user(&self, user_id: UserId) -> Result<PurgeReport>;
}
