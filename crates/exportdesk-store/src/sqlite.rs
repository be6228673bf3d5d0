//! Database-backed [`Store`] over a migrated SQLite [`Database`].

use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use exportdesk_shared::{ProductId, RfqId, RfqStatus, UserId};

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{Message, NewMessage, NewRfq, Product, Profile, ProfileUpdate, PurgeReport, Rfq, RfqQuery};
use crate::notify::{MessageSubscription, Notifier, StoreEvent};
use crate::store::Store;

/// Async store over a single SQLite connection.
///
/// Statements are short, so the connection is guarded by a plain mutex and
/// never held across an `.await`.  Notifications reach subscribers of this
/// process only.
pub struct SqliteStore {
    db: Mutex<Database>,
    notifier: Notifier,
}

impl SqliteStore {
    pub fn new(db: Database, notifier: Notifier) -> Self {
        Self {
            db: Mutex::new(db),
            notifier,
        }
    }

    /// Open (or create) a database file with a default-sized notifier.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self::new(Database::open_at(path)?, Notifier::default()))
    }

    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?, Notifier::default()))
    }

    fn with_db<T>(&self, f: impl FnOnce(&mut Database) -> Result<T>) -> Result<T> {
        let mut guard = self
            .db
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("Lock poisoned: {e}")))?;
        f(&mut guard)
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.with_db(|db| db.insert_product(product))
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        self.with_db(|db| db.update_product(product))
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.with_db(|db| db.delete_product(id))
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.with_db(|db| db.get_product(id))
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        self.with_db(|db| db.get_product_by_slug(slug))
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.with_db(|db| db.list_products())
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.with_db(|db| db.insert_profile(profile))
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.with_db(|db| db.upsert_profile(profile))
    }

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile> {
        self.with_db(|db| db.update_profile(user_id, update))
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        self.with_db(|db| db.get_profile(user_id))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.with_db(|db| db.list_profiles())
    }

    async fn set_profile_active(&self, user_id: UserId, active: bool) -> Result<Profile> {
        self.with_db(|db| db.set_profile_active(user_id, active))
    }

    async fn insert_rfq(&self, rfq: NewRfq) -> Result<Rfq> {
        self.with_db(|db| db.insert_rfq(&rfq))
    }

    async fn get_rfq(&self, id: RfqId) -> Result<Option<Rfq>> {
        self.with_db(|db| db.get_rfq(id))
    }

    async fn list_rfqs(&self, query: &RfqQuery) -> Result<Vec<Rfq>> {
        self.with_db(|db| db.list_rfqs(query))
    }

    async fn update_rfq_status(
        &self,
        id: RfqId,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> Result<Rfq> {
        self.with_db(|db| db.update_rfq_status(id, status, expected_version))
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        let message = self.with_db(|db| db.insert_message(&message))?;
        debug!(rfq_id = %message.rfq_id, message_id = %message.id, "message row inserted");
        self.notifier.publish(StoreEvent::MessageInserted {
            rfq_id: message.rfq_id,
            message_id: message.id,
        });
        Ok(message)
    }

    async fn list_messages(&self, rfq_id: RfqId) -> Result<Vec<Message>> {
        self.with_db(|db| db.get_messages_for_rfq(rfq_id))
    }

    fn subscribe_messages(&self, rfq_id: RfqId) -> MessageSubscription {
        self.notifier.subscribe_messages(rfq_id)
    }

    async fn purge_user(&self, user_id: UserId) -> Result<PurgeReport> {
        self.with_db(|db| db.purge_user(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::SubscriptionEvent;
    use crate::products::tests::sample_product;
    use exportdesk_shared::SenderType;

    #[tokio::test]
    async fn insert_message_notifies_after_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteStore::open(&dir.path().join("store.db")).unwrap();
        let product = sample_product("Turmeric", 100);
        store.insert_product(&product).await.unwrap();
        let buyer = UserId::new();
        let rfq = store
            .insert_rfq(NewRfq {
                user_id: buyer,
                product_id: product.id,
                quantity: 100,
                target_price: None,
                country: "Japan".into(),
                message: "Curcumin 5%".into(),
            })
            .await
            .unwrap();

        let mut sub = store.subscribe_messages(rfq.id);
        let message = store
            .insert_message(NewMessage {
                rfq_id: rfq.id,
                sender_type: SenderType::User,
                sender_id: buyer,
                text: "Sample available?".into(),
            })
            .await
            .unwrap();

        assert_eq!(sub.recv().await, Some(SubscriptionEvent::Inserted(message.id)));
        assert_eq!(store.list_messages(rfq.id).await.unwrap(), vec![message]);
    }
}
