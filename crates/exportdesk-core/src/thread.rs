//! Append-only message threads attached to RFQs.

use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use exportdesk_shared::{RfqId, SenderType};
use exportdesk_store::{Message, NewMessage, Store};

use crate::actor::Actor;
use crate::error::{CoreError, Result};
use crate::guard::load_authorized_rfq;

#[derive(Clone)]
pub struct ThreadManager {
    store: Arc<dyn Store>,
}

impl ThreadManager {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Append a message to an RFQ's thread.
    ///
    /// `sender_type` must match the actor's role.  Text is stored trimmed;
    /// blank text is rejected and nothing is written.
    #[instrument(skip(self, actor, text), fields(actor = %actor.id))]
    pub async fn append(
        &self,
        actor: &Actor,
        sender_type: SenderType,
        rfq_id: RfqId,
        text: &str,
    ) -> Result<Message> {
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::validation("message text is empty"));
        }
        if sender_type != SenderType::from(actor.role) {
            warn!(claimed = %sender_type, role = %actor.role, "sender type does not match role");
            return Err(CoreError::Authorization);
        }
        load_authorized_rfq(self.store.as_ref(), actor, rfq_id).await?;

        let message = self
            .store
            .insert_message(NewMessage {
                rfq_id,
                sender_type,
                sender_id: actor.id,
                text: text.to_string(),
            })
            .await?;

        info!(message_id = %message.id, "message appended");
        Ok(message)
    }

    /// Append as whatever the actor's role says they are.
    pub async fn reply(&self, actor: &Actor, rfq_id: RfqId, text: &str) -> Result<Message> {
        self.append(actor, SenderType::from(actor.role), rfq_id, text)
            .await
    }

    /// The whole thread, oldest first.
    pub async fn list_by_rfq(&self, actor: &Actor, rfq_id: RfqId) -> Result<Vec<Message>> {
        load_authorized_rfq(self.store.as_ref(), actor, rfq_id).await?;
        let messages = self.store.list_messages(rfq_id).await?;
        debug!(rfq_id = %rfq_id, count = messages.len(), "thread read");
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{backends, memory_store, seed_product, seed_rfq};
    use exportdesk_shared::UserId;
    use exportdesk_store::Rfq;

    async fn setup(store: &Arc<dyn Store>) -> (Actor, Actor, Rfq) {
        let product = seed_product(store.as_ref(), "Cinnamon Quills", 100).await;
        let buyer = Actor::buyer(UserId::new());
        let rfq = seed_rfq(store.as_ref(), buyer.id, product.id, 500).await;
        (buyer, Actor::admin(UserId::new()), rfq)
    }

    #[tokio::test]
    async fn scenario_c_thread_order_and_tags() {
        for (name, store) in backends() {
            let (u1, admin, rfq) = setup(&store).await;
            let threads = ThreadManager::new(store);

            threads
                .append(&u1, SenderType::User, rfq.id, "What's the lead time?")
                .await
                .unwrap();
            threads
                .append(&admin, SenderType::Admin, rfq.id, "2 weeks FOB")
                .await
                .unwrap();

            for viewer in [&u1, &admin] {
                let thread = threads.list_by_rfq(viewer, rfq.id).await.unwrap();
                let got: Vec<_> = thread
                    .iter()
                    .map(|m| (m.sender_type, m.text.as_str()))
                    .collect();
                assert_eq!(
                    got,
                    vec![
                        (SenderType::User, "What's the lead time?"),
                        (SenderType::Admin, "2 weeks FOB"),
                    ],
                    "{name}"
                );
            }
        }
    }

    #[tokio::test]
    async fn scenario_d_foreign_buyer_denied() {
        for (name, store) in backends() {
            let (u1, _, rfq) = setup(&store).await;
            let threads = ThreadManager::new(store);
            threads.reply(&u1, rfq.id, "hello").await.unwrap();

            let u2 = Actor::buyer(UserId::new());
            assert!(
                matches!(
                    threads.list_by_rfq(&u2, rfq.id).await,
                    Err(CoreError::Authorization)
                ),
                "{name}"
            );
            assert!(
                matches!(
                    threads.append(&u2, SenderType::User, rfq.id, "hi").await,
                    Err(CoreError::Authorization)
                ),
                "{name}"
            );
        }
    }

    #[tokio::test]
    async fn scenario_e_and_p4_blank_text_persists_nothing() {
        for (name, store) in backends() {
            let (u1, admin, rfq) = setup(&store).await;
            let threads = ThreadManager::new(store.clone());

            for text in ["", "   ", "\n\t"] {
                assert!(
                    matches!(
                        threads.append(&u1, SenderType::User, rfq.id, text).await,
                        Err(CoreError::Validation(_))
                    ),
                    "{name}"
                );
                assert!(
                    matches!(
                        threads.append(&admin, SenderType::Admin, rfq.id, text).await,
                        Err(CoreError::Validation(_))
                    ),
                    "{name}"
                );
            }
            assert!(store.list_messages(rfq.id).await.unwrap().is_empty(), "{name}");
        }
    }

    #[tokio::test]
    async fn p3_order_is_stable_across_reads() {
        for (name, store) in backends() {
            let (u1, admin, rfq) = setup(&store).await;
            let threads = ThreadManager::new(store);

            for i in 0..20 {
                let actor = if i % 2 == 0 { &u1 } else { &admin };
                threads
                    .reply(actor, rfq.id, &format!("message {i}"))
                    .await
                    .unwrap();
            }

            let first = threads.list_by_rfq(&admin, rfq.id).await.unwrap();
            let second = threads.list_by_rfq(&u1, rfq.id).await.unwrap();
            assert_eq!(first, second, "{name}");
            assert!(
                first.windows(2).all(|w| w[0].created_at <= w[1].created_at),
                "{name}"
            );
            let texts: Vec<_> = first.iter().map(|m| m.text.clone()).collect();
            let expected: Vec<_> = (0..20).map(|i| format!("message {i}")).collect();
            assert_eq!(texts, expected, "{name}");
        }
    }

    #[tokio::test]
    async fn sender_type_must_match_role() {
        let store = memory_store();
        let (u1, admin, rfq) = setup(&store).await;
        let threads = ThreadManager::new(store.clone());

        assert!(matches!(
            threads.append(&u1, SenderType::Admin, rfq.id, "I am staff").await,
            Err(CoreError::Authorization)
        ));
        assert!(matches!(
            threads.append(&admin, SenderType::User, rfq.id, "I am a buyer").await,
            Err(CoreError::Authorization)
        ));
        assert!(store.list_messages(rfq.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn text_is_stored_trimmed() {
        let store = memory_store();
        let (u1, _, rfq) = setup(&store).await;
        let threads = ThreadManager::new(store);

        let message = threads.reply(&u1, rfq.id, "  samples?  \n").await.unwrap();
        assert_eq!(message.text, "samples?");
        assert_eq!(message.sender_id, u1.id);
    }

    #[tokio::test]
    async fn append_notifies_subscribers_of_that_rfq_only() {
        let store = memory_store();
        let (u1, _, rfq) = setup(&store).await;
        let other = seed_rfq(store.as_ref(), u1.id, rfq.product_id, 200).await;
        let mut sub = store.subscribe_messages(rfq.id);
        let threads = ThreadManager::new(store.clone());

        threads.reply(&u1, other.id, "elsewhere").await.unwrap();
        let message = threads.reply(&u1, rfq.id, "here").await.unwrap();

        match sub.recv().await {
            Some(exportdesk_store::SubscriptionEvent::Inserted(id)) => assert_eq!(id, message.id),
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
