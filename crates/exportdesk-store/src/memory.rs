//! Client-local [`Store`] kept in process memory.
//!
//! When opened with a snapshot path the whole state is written to disk as
//! JSON after every successful write and reloaded on the next open.  Writes
//! are applied to a copy of the state and only committed once the snapshot
//! has been persisted, so a failed write leaves no trace.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use exportdesk_shared::{MessageId, ProductId, RfqId, RfqStatus, UserId};

use crate::database::now;
use crate::error::{Result, StoreError};
use crate::models::{Message, NewMessage, NewRfq, Product, Profile, ProfileUpdate, PurgeReport, Rfq, RfqQuery};
use crate::notify::{MessageSubscription, Notifier, StoreEvent};
use crate::store::Store;

/// Everything the memory backend holds.  Vectors keep insertion order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct State {
    products: Vec<Product>,
    profiles: Vec<Profile>,
    rfqs: Vec<Rfq>,
    messages: Vec<Message>,
}

pub struct MemoryStore {
    state: Mutex<State>,
    snapshot_path: Option<PathBuf>,
    notifier: Notifier,
}

impl MemoryStore {
    /// A store that forgets everything when dropped.
    pub fn new() -> Self {
        Self::with_notifier(Notifier::default())
    }

    pub fn with_notifier(notifier: Notifier) -> Self {
        Self {
            state: Mutex::new(State::default()),
            snapshot_path: None,
            notifier,
        }
    }

    /// Open a store persisted at `path`, loading the previous snapshot if the
    /// file exists.
    pub async fn open(path: impl Into<PathBuf>, notifier: Notifier) -> Result<Self> {
        let path = path.into();
        let state = match tokio::fs::read(&path).await {
            Ok(bytes) => {
                let state: State = serde_json::from_slice(&bytes)?;
                info!(
                    path = %path.display(),
                    rfqs = state.rfqs.len(),
                    messages = state.messages.len(),
                    "loaded store snapshot"
                );
                state
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "no snapshot yet, starting empty");
                State::default()
            }
            Err(e) => return Err(e.into()),
        };

        Ok(Self {
            state: Mutex::new(state),
            snapshot_path: Some(path),
            notifier,
        })
    }

    async fn read<T>(&self, f: impl FnOnce(&State) -> Result<T>) -> Result<T> {
        let guard = self.state.lock().await;
        f(&guard)
    }

    /// Apply `f` to a copy of the state, persist it, then commit.
    async fn write<T>(&self, f: impl FnOnce(&mut State) -> Result<T>) -> Result<T> {
        let mut guard = self.state.lock().await;
        let mut next = guard.clone();
        let out = f(&mut next)?;
        if let Some(path) = &self.snapshot_path {
            persist(path, &next).await?;
        }
        *guard = next;
        Ok(out)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

async fn persist(path: &Path, state: &State) -> Result<()> {
    let bytes = serde_json::to_vec(state)?;
    let tmp = path.with_extension("tmp");
    tokio::fs::write(&tmp, &bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    debug!(path = %path.display(), len = bytes.len(), "snapshot written");
    Ok(())
}

fn newest_first<T>(
    items: impl DoubleEndedIterator<Item = T>,
    key: impl Fn(&T) -> DateTime<Utc>,
) -> Vec<T> {
    // Reversed insertion order plus a stable sort keeps later inserts first
    // on equal timestamps.
    let mut out: Vec<T> = items.rev().collect();
    out.sort_by(|a, b| key(b).cmp(&key(a)));
    out
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<()> {
        self.write(|state| {
            if state.products.iter().any(|p| p.slug == product.slug) {
                return Err(StoreError::DuplicateSlug(product.slug.clone()));
            }
            state.products.push(product.clone());
            Ok(())
        })
        .await
    }

    async fn update_product(&self, product: &Product) -> Result<()> {
        self.write(|state| {
            if state
                .products
                .iter()
                .any(|p| p.slug == product.slug && p.id != product.id)
            {
                return Err(StoreError::DuplicateSlug(product.slug.clone()));
            }
            let slot = state
                .products
                .iter_mut()
                .find(|p| p.id == product.id)
                .ok_or(StoreError::NotFound)?;
            let created_at = slot.created_at;
            *slot = Product {
                created_at,
                ..product.clone()
            };
            Ok(())
        })
        .await
    }

    async fn delete_product(&self, id: ProductId) -> Result<()> {
        self.write(|state| {
            let referencing = state.rfqs.iter().filter(|r| r.product_id == id).count();
            if referencing > 0 {
                return Err(StoreError::InUse(format!(
                    "product {id} is referenced by {referencing} RFQ(s)"
                )));
            }
            let before = state.products.len();
            state.products.retain(|p| p.id != id);
            if state.products.len() == before {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        self.read(|state| Ok(state.products.iter().find(|p| p.id == id).cloned()))
            .await
    }

    async fn get_product_by_slug(&self, slug: &str) -> Result<Option<Product>> {
        self.read(|state| Ok(state.products.iter().find(|p| p.slug == slug).cloned()))
            .await
    }

    async fn list_products(&self) -> Result<Vec<Product>> {
        self.read(|state| Ok(newest_first(state.products.iter().cloned(), |p| p.created_at)))
            .await
    }

    async fn insert_profile(&self, profile: &Profile) -> Result<()> {
        self.write(|state| {
            if state.profiles.iter().any(|p| p.user_id == profile.user_id) {
                return Err(StoreError::DuplicateProfile(profile.user_id.to_string()));
            }
            state.profiles.push(profile.clone());
            Ok(())
        })
        .await
    }

    async fn update_profile(&self, user_id: UserId, update: &ProfileUpdate) -> Result<Profile> {
        self.write(|state| {
            let profile = state
                .profiles
                .iter_mut()
                .find(|p| p.user_id == user_id)
                .ok_or(StoreError::NotFound)?;
            update.apply_to(profile);
            profile.updated_at = now();
            Ok(profile.clone())
        })
        .await
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<()> {
        self.write(|state| {
            match state
                .profiles
                .iter_mut()
                .find(|p| p.user_id == profile.user_id)
            {
                Some(existing) => {
                    let created_at = existing.created_at;
                    *existing = Profile {
                        created_at,
                        ..profile.clone()
                    };
                }
                None => state.profiles.push(profile.clone()),
            }
            Ok(())
        })
        .await
    }

    async fn get_profile(&self, user_id: UserId) -> Result<Option<Profile>> {
        self.read(|state| {
            Ok(state
                .profiles
                .iter()
                .find(|p| p.user_id == user_id)
                .cloned())
        })
        .await
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>> {
        self.read(|state| Ok(newest_first(state.profiles.iter().cloned(), |p| p.created_at)))
            .await
    }

    async fn set_profile_active(&self, user_id: UserId, active: bool) -> Result<Profile> {
        self.write(|state| {
            let profile = state
                .profiles
                .iter_mut()
                .find(|p| p.user_id == user_id)
                .ok_or(StoreError::NotFound)?;
            profile.active = active;
            profile.updated_at = now();
            Ok(profile.clone())
        })
        .await
    }

    async fn insert_rfq(&self, rfq: NewRfq) -> Result<Rfq> {
        self.write(|state| {
            if !state.products.iter().any(|p| p.id == rfq.product_id) {
                return Err(StoreError::MissingReference(format!(
                    "product {}",
                    rfq.product_id
                )));
            }
            let ts = now();
            let row = Rfq {
                id: RfqId::new(),
                user_id: rfq.user_id,
                product_id: rfq.product_id,
                quantity: rfq.quantity,
                target_price: rfq.target_price,
                country: rfq.country,
                message: rfq.message,
                status: RfqStatus::Pending,
                version: 1,
                created_at: ts,
                updated_at: ts,
            };
            state.rfqs.push(row.clone());
            Ok(row)
        })
        .await
    }

    async fn get_rfq(&self, id: RfqId) -> Result<Option<Rfq>> {
        self.read(|state| Ok(state.rfqs.iter().find(|r| r.id == id).cloned()))
            .await
    }

    async fn list_rfqs(&self, query: &RfqQuery) -> Result<Vec<Rfq>> {
        self.read(|state| {
            Ok(newest_first(
                state.rfqs.iter().filter(|r| query.matches(r)).cloned(),
                |r| r.created_at,
            ))
        })
        .await
    }

    async fn update_rfq_status(
        &self,
        id: RfqId,
        status: RfqStatus,
        expected_version: Option<u64>,
    ) -> Result<Rfq> {
        self.write(|state| {
            let rfq = state
                .rfqs
                .iter_mut()
                .find(|r| r.id == id)
                .ok_or(StoreError::NotFound)?;
            if let Some(expected) = expected_version {
                if rfq.version != expected {
                    return Err(StoreError::VersionMismatch {
                        expected,
                        actual: rfq.version,
                    });
                }
            }
            rfq.status = status;
            rfq.version += 1;
            rfq.updated_at = now();
            Ok(rfq.clone())
        })
        .await
    }

    async fn insert_message(&self, message: NewMessage) -> Result<Message> {
        let row = self
            .write(|state| {
                if !state.rfqs.iter().any(|r| r.id == message.rfq_id) {
                    return Err(StoreError::MissingReference(format!(
                        "rfq {}",
                        message.rfq_id
                    )));
                }
                let row = Message {
                    id: MessageId::new(),
                    rfq_id: message.rfq_id,
                    sender_type: message.sender_type,
                    sender_id: message.sender_id,
                    text: message.text,
                    created_at: now(),
                };
                state.messages.push(row.clone());
                Ok(row)
            })
            .await?;

        self.notifier.publish(StoreEvent::MessageInserted {
            rfq_id: row.rfq_id,
            message_id: row.id,
        });
        Ok(row)
    }

    async fn list_messages(&self, rfq_id: RfqId) -> Result<Vec<Message>> {
        self.read(|state| {
            let mut thread: Vec<Message> = state
                .messages
                .iter()
                .filter(|m| m.rfq_id == rfq_id)
                .cloned()
                .collect();
            // Stable: equal timestamps keep insertion order.
            thread.sort_by_key(|m| m.created_at);
            Ok(thread)
        })
        .await
    }

    fn subscribe_messages(&self, rfq_id: RfqId) -> MessageSubscription {
        self.notifier.subscribe_messages(rfq_id)
    }

    async fn purge_user(&self, user_id: UserId) -> Result<PurgeReport> {
        self.write(|state| {
            let owned: Vec<RfqId> = state
                .rfqs
                .iter()
                .filter(|r| r.user_id == user_id)
                .map(|r| r.id)
                .collect();

            let messages_before = state.messages.len();
            state
                .messages
                .retain(|m| m.sender_id != user_id && !owned.contains(&m.rfq_id));
            let rfqs_before = state.rfqs.len();
            state.rfqs.retain(|r| r.user_id != user_id);
            let profiles_before = state.profiles.len();
            state.profiles.retain(|p| p.user_id != user_id);

            Ok(PurgeReport {
                rfqs_deleted: (rfqs_before - state.rfqs.len()) as u64,
                messages_deleted: (messages_before - state.messages.len()) as u64,
                profile_deleted: profiles_before != state.profiles.len(),
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::products::tests::sample_product;
    use exportdesk_shared::SenderType;

    async fn seeded(store: &MemoryStore) -> (Product, Rfq) {
        let product = sample_product("Cashew W240", 1000);
        store.insert_product(&product).await.unwrap();
        let rfq = store
            .insert_rfq(NewRfq {
                user_id: UserId::new(),
                product_id: product.id,
                quantity: 1500,
                target_price: Some("$7/kg".into()),
                country: "Netherlands".into(),
                message: "Vacuum packed tins".into(),
            })
            .await
            .unwrap();
        (product, rfq)
    }

    #[tokio::test]
    async fn snapshot_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::open(&path, Notifier::default()).await.unwrap();
        let (_, rfq) = seeded(&store).await;
        store
            .insert_message(NewMessage {
                rfq_id: rfq.id,
                sender_type: SenderType::User,
                sender_id: rfq.user_id,
                text: "Grade certificate?".into(),
            })
            .await
            .unwrap();
        drop(store);

        let reopened = MemoryStore::open(&path, Notifier::default()).await.unwrap();
        assert_eq!(reopened.get_rfq(rfq.id).await.unwrap(), Some(rfq.clone()));
        assert_eq!(reopened.list_messages(rfq.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_state_untouched() {
        let store = MemoryStore::new();
        let (product, _) = seeded(&store).await;

        let err = store.delete_product(product.id).await.unwrap_err();
        assert!(matches!(err, StoreError::InUse(_)));
        assert!(store.get_product(product.id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn unknown_status_in_snapshot_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = MemoryStore::open(&path, Notifier::default()).await.unwrap();
        seeded(&store).await;
        drop(store);

        let mut snapshot: serde_json::Value =
            serde_json::from_slice(&tokio::fs::read(&path).await.unwrap()).unwrap();
        assert_eq!(snapshot["rfqs"][0]["status"], "Pending");
        snapshot["rfqs"][0]["status"] = "Archived".into();
        tokio::fs::write(&path, serde_json::to_vec(&snapshot).unwrap())
            .await
            .unwrap();

        let err = MemoryStore::open(&path, Notifier::default()).await.err().unwrap();
        match err {
            StoreError::Snapshot(e) => assert!(e.to_string().contains("Archived"), "{e}"),
            other => panic!("expected snapshot error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn version_check_on_status_update() {
        let store = MemoryStore::new();
        let (_, rfq) = seeded(&store).await;

        store
            .update_rfq_status(rfq.id, RfqStatus::Closed, None)
            .await
            .unwrap();
        let err = store
            .update_rfq_status(rfq.id, RfqStatus::Pending, Some(1))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::VersionMismatch { actual: 2, .. }));
    }
}
