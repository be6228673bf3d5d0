//! Shared fixtures for the core's unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::Semaphore;

use exportdesk_shared::slug::generate_slug;
use exportdesk_shared::{ProductCategory, ProductId, RfqId, RfqStatus, Role, UserId};
use exportdesk_store::{
    MemoryStore, Message, MessageSubscription, NewMessage, NewRfq, Product, Profile,
    ProfileUpdate, PurgeReport, Rfq, RfqQuery, SqliteStore, Store, StoreError,
};

use crate::actor::NewProfile;

pub(crate) fn memory_store() -> Arc<dyn Store> {
    Arc::new(MemoryStore::new())
}

/// One instance of every backend, for tests that must hold on both.
pub(crate) fn backends() -> Vec<(&'static str, Arc<dyn Store>)> {
    vec![
        ("memory", memory_store()),
        ("sqlite", Arc::new(SqliteStore::open_in_memory().unwrap())),
    ]
}

pub(crate) fn product(name: &str, moq: u32) -> Product {
    let now = Utc::now();
    Product {
        id: ProductId::new(),
        name: name.to_string(),
        slug: generate_slug(name),
        category: ProductCategory::SpicesAndHerbs,
        short_description: String::new(),
        full_description: String::new(),
        images: vec![],
        video_url: None,
        featured: false,
        moq,
        export_highlight: String::new(),
        payment_terms: vec![],
        customization_note: String::new(),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) async fn seed_product(store: &dyn Store, name: &str, moq: u32) -> Product {
    let product = product(name, moq);
    store.insert_product(&product).await.unwrap();
    product
}

pub(crate) async fn seed_rfq(
    store: &dyn Store,
    owner: UserId,
    product_id: ProductId,
    quantity: u32,
) -> Rfq {
    store
        .insert_rfq(NewRfq {
            user_id: owner,
            product_id,
            quantity,
            target_price: None,
            country: "USA".into(),
            message: "Please quote CIF".into(),
        })
        .await
        .unwrap()
}

pub(crate) fn new_profile(username: &str) -> NewProfile {
    NewProfile {
        user_id: UserId::new(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        phone: String::new(),
        company_name: None,
        country: "India".into(),
        state: String::new(),
        city: String::new(),
    }
}

pub(crate) async fn seed_profile(store: &dyn Store, username: &str, role: Role) -> Profile {
    let now = Utc::now();
    let profile = Profile {
        user_id: UserId::new(),
        username: username.to_string(),
        email: format!("{username}@example.com"),
        phone: String::new(),
        company_name: None,
        country: "India".into(),
        state: String::new(),
        city: String::new(),
        user_code: "17".into(),
        role,
        active: true,
        created_at: now,
        updated_at: now,
    };
    store.upsert_profile(&profile).await.unwrap();
    profile
}

/// Delegating store whose message inserts and thread reads can be made to
/// fail, and whose inserts can be held until a permit is released.
pub(crate) struct FlakyStore {
    inner: Arc<dyn Store>,
    pub(crate) fail_inserts: AtomicBool,
    pub(crate) fail_lists: AtomicBool,
    pub(crate) insert_gate: Option<Arc<Semaphore>>,
}

impl FlakyStore {
    pub(crate) fn new(inner: Arc<dyn Store>) -> Self {
        Self {
            inner,
            fail_inserts: AtomicBool::new(false),
            fail_lists: AtomicBool::new(false),
            insert_gate: None,
        }
    }

    pub(crate) fn gated(inner: Arc<dyn Store>, gate: Arc<Semaphore>) -> Self {
        Self {
            insert_gate: Some(gate),
            ..Self::new(inner)
        }
    }

    pub(crate) fn set_failing(&self, failing: bool) {
        self.fail_inserts.store(failing, Ordering::SeqCst);
    }

    pub(crate) fn set_failing_lists(&self, failing: bool) {
        self.fail_lists.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl Store for FlakyStore {
    async fn insert_product(&self, product: &Product) -> exportdesk_store::Result<()> {
        self.inner.insert_product(product).await
    }

    async fn update_product(&self, product: &Product) -> exportdesk_store::Result<()> {
        self.inner.update_product(product).await
    }

    async fn delete_product(&self, id: ProductId) -> exportdesk_store::Result<()> {
        self.inner.delete_product(id).await
    }

    async fn get_product(&self, id: ProductId) -> exportdesk_store::Result<Option<Product>> {
        self.inner.get_product(id).await
    }

    async fn get_product_by_slug(&self, slug: &str) -> exportdesk_store::Result<Option<Product>> {
        self.inner.get_product_by_slug(slug).await
    }

    async fn list_products(&self) -> exportdesk_store::Result<Vec<Product>> {
        self.inner.list_products().await
    }

    async fn insert_profile(&self, profile: &Profile) -> exportdesk_store::Result<()> {
        self.inner.insert_profile(profile).await
    }

    async fn upsert_profile(&self, profile: &Profile) -> exportdesk_store::Result<()> {
        self.inner.upsert_profile(profile).await
    }

    async fn update_profile(
        &self,
        user_id: UserId,
        update: &ProfileUpdate,
    ) -> exportdesk_store::Result<Profile> {
        self.inner.update_profile(user_id, update).await
    }

    async fn get_profile(&self, user_id: UserId) -> exportdesk_store::Result<Option<Profile>> {
        self.inner.get_profile(user_id).await
    }

    async fn list_profiles(&self) -> exportdesk_store::Result<Vec<Profile>> {
        self.inner.list_profiles().await
    }

    async fn set_profile_active(
        &self,
        user_id: UserId,
        active: bool,
    ) -> exportdesk_store::Result<Profile> {
        self.inner.set_profile_active(user_id, active).await
    }

    async fn insert_rfq(&self, rfq: NewRfq) -> exportdesk_store::Result<Rfq> {
        self.inner.insert_rfq(rfq).await
    }

    async fn get_rfq(&self, id: RfqId) -> exportdesk_store::Result<Option<Rfq>> {
        self.inner.get_rfq(id).await
    }

    async fn list_rfqs(&self, query: &RfqQuery) -> exportdesk_store::Result<Vec<Rfq>> {
        self.inner.list_rfqs(query).await
    }

    async fn update_rfq_status(
        &self,
        id: RfqId,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> exportdesk_store::Result<Rfq> {
        self.inner.update_rfq_status(id, status, expected_version).await
    }

    async fn insert_message(&self, message: NewMessage) -> exportdesk_store::Result<Message> {
        if let Some(gate) = &self.insert_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| StoreError::Unavailable(e.to_string()))?;
            permit.forget();
        }
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.insert_message(message).await
    }

    async fn list_messages(&self, rfq_id: RfqId) -> exportdesk_store::Result<Vec<Message>> {
        if self.fail_lists.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.list_messages(rfq_id).await
    }

    fn subscribe_messages(&self, rfq_id: RfqId) -> MessageSubscription {
        self.inner.subscribe_messages(rfq_id)
    }

    async fn purge_user(&self, user_id: UserId) -> exportdesk_store::Result<PurgeReport> {
        self.inner.purge_user(user_id).await
    }
}
