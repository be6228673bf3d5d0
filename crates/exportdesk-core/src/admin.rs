//! Back-office operations over user profiles.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use exportdesk_shared::{RfqStatus, UserId};
use exportdesk_store::{Profile, PurgeReport, RfqQuery, Store, StoreError};

use crate::actor::Actor;
use crate::error::{CoreError, Result};
use crate::guard::require_admin;

/// Counts shown on the admin dashboard.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardStats {
    pub users: usize,
    pub products: usize,
    pub rfqs: usize,
    pub pending_rfqs: usize,
    pub in_discussion_rfqs: usize,
    pub closed_rfqs: usize,
}

#[derive(Clone)]
pub struct AdminConsole {
    store: Arc<dyn Store>,
}

impl AdminConsole {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Every profile, newest first.
    pub async fn list_users(&self, actor: &Actor) -> Result<Vec<Profile>> {
        require_admin(actor)?;
        Ok(self.store.list_profiles().await?)
    }

    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn set_user_active(&self, actor: &Actor, user_id: UserId, active: bool) -> Result<Profile> {
        require_admin(actor)?;
        if user_id == actor.id && !active {
            return Err(CoreError::validation("admins cannot deactivate themselves"));
        }
        let profile = match self.store.set_profile_active(user_id, active).await {
            Ok(profile) => profile,
            Err(StoreError::NotFound) => return Err(CoreError::not_found("user", user_id)),
            Err(e) => return Err(e.into()),
        };
        info!(user = %user_id, active, "user activation changed");
        Ok(profile)
    }

    /// Delete a user with their RFQs, the messages on those RFQs and every
    /// message they sent.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn purge_user(&self, actor: &Actor, user_id: UserId) -> Result<PurgeReport> {
        require_admin(actor)?;
        if user_id == actor.id {
            return Err(CoreError::validation("admins cannot delete themselves"));
        }
        let report = self.store.purge_user(user_id).await?;
        if report == PurgeReport::default() {
            return Err(CoreError::not_found("user", user_id));
        }
        info!(
            user = %user_id,
            rfqs = report.rfqs_deleted,
            messages = report.messages_deleted,
            "user purged"
        );
        Ok(report)
    }

    pub async fn stats(&self, actor: &Actor) -> Result<DashboardStats> {
        require_admin(actor)?;
        let rfqs = self.store.list_rfqs(&RfqQuery::default()).await?;
        let count = |status: RfqStatus| rfqs.iter().filter(|r| r.status == status).count();

        Ok(DashboardStats {
            users: self.store.list_profiles().await?.len(),
            products: self.store.list_products().await?.len(),
            rfqs: rfqs.len(),
            pending_rfqs: count(RfqStatus::Pending),
            in_discussion_rfqs: count(RfqStatus::InDiscussion),
            closed_rfqs: count(RfqStatus::Closed),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{backends, memory_store, seed_product, seed_profile, seed_rfq};
    use crate::thread::ThreadManager;
    use exportdesk_shared::Role;

    #[tokio::test]
    async fn purge_cascades_to_rfqs_and_messages() {
        for (name, store) in backends() {
            let admin_profile = seed_profile(store.as_ref(), "ops", Role::Admin).await;
            let admin = Actor::admin(admin_profile.user_id);
            let buyer_profile = seed_profile(store.as_ref(), "meera", Role::User).await;
            let buyer = Actor::buyer(buyer_profile.user_id);
            let other = seed_profile(store.as_ref(), "tom", Role::User).await;

            let product = seed_product(store.as_ref(), "Indigo Dye", 10).await;
            let owned = seed_rfq(store.as_ref(), buyer.id, product.id, 50).await;
            let kept = seed_rfq(store.as_ref(), other.user_id, product.id, 60).await;

            let threads = ThreadManager::new(store.clone());
            threads.reply(&buyer, owned.id, "price?").await.unwrap();
            threads.reply(&admin, owned.id, "$3/kg").await.unwrap();
            threads.reply(&admin, kept.id, "hello tom").await.unwrap();

            let console = AdminConsole::new(store.clone());
            let report = console.purge_user(&admin, buyer.id).await.unwrap();
            assert_eq!(report.rfqs_deleted, 1, "{name}");
            assert_eq!(report.messages_deleted, 2, "{name}");
            assert!(report.profile_deleted, "{name}");

            assert!(store.get_rfq(owned.id).await.unwrap().is_none(), "{name}");
            assert_eq!(store.list_messages(kept.id).await.unwrap().len(), 1, "{name}");
            assert!(store.get_profile(buyer.id).await.unwrap().is_none(), "{name}");

            assert!(
                matches!(
                    console.purge_user(&admin, buyer.id).await,
                    Err(CoreError::NotFound { .. })
                ),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn admins_cannot_remove_themselves() {
        let store = memory_store();
        let admin_profile = seed_profile(store.as_ref(), "ops", Role::Admin).await;
        let admin = Actor::admin(admin_profile.user_id);
        let console = AdminConsole::new(store);

        assert!(matches!(
            console.purge_user(&admin, admin.id).await,
            Err(CoreError::Validation(_))
        ));
        assert!(matches!(
            console.set_user_active(&admin, admin.id, false).await,
            Err(CoreError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn deactivate_and_reactivate() {
        let store = memory_store();
        let user = seed_profile(store.as_ref(), "lena", Role::User).await;
        let console = AdminConsole::new(store);
        let admin = Actor::admin(UserId::new());

        let off = console.set_user_active(&admin, user.user_id, false).await.unwrap();
        assert!(!off.active);
        let on = console.set_user_active(&admin, user.user_id, true).await.unwrap();
        assert!(on.active);

        assert!(matches!(
            console.set_user_active(&admin, UserId::new(), false).await,
            Err(CoreError::NotFound { .. })
        ));
        assert!(matches!(
            console.list_users(&Actor::buyer(user.user_id)).await,
            Err(CoreError::Authorization)
        ));
    }

    #[tokio::test]
    async fn stats_count_by_status() {
        let store = memory_store();
        let buyer = seed_profile(store.as_ref(), "ana", Role::User).await;
        let product = seed_product(store.as_ref(), "Tea", 1).await;
        seed_rfq(store.as_ref(), buyer.user_id, product.id, 5).await;
        let closed = seed_rfq(store.as_ref(), buyer.user_id, product.id, 6).await;
        store
            .update_rfq_status(closed.id, RfqStatus::Closed, None)
            .await
            .unwrap();

        let stats = AdminConsole::new(store)
            .stats(&Actor::admin(UserId::new()))
            .await
            .unwrap();
        assert_eq!(
            stats,
            DashboardStats {
                users: 1,
                products: 1,
                rfqs: 2,
                pending_rfqs: 1,
                in_discussion_rfqs: 0,
                closed_rfqs: 1,
            }
        );
    }
}
