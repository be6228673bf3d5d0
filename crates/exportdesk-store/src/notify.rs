//! Insert notification fan-out.
//!
//! Every backend owns one [`Notifier`].  Publishing is fire-and-forget: a
//! store with no open subscriptions simply drops the event.  Subscribers
//! filter the shared broadcast stream down to a single RFQ.

use tokio::sync::broadcast;
use tracing::debug;

use exportdesk_shared::{MessageId, RfqId};

/// Change events published by a store after a write has committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreEvent {
    MessageInserted { rfq_id: RfqId, message_id: MessageId },
}

/// What a [`MessageSubscription`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionEvent {
    /// A message was inserted into the subscribed thread.
    Inserted(MessageId),
    /// The subscriber fell behind and `n` events were dropped.  The thread
    /// must be refetched.
    Lagged(u64),
}

/// Broadcast sender shared by a backend.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<StoreEvent>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn publish(&self, event: StoreEvent) {
        // An error only means nobody is listening.
        let receivers = self.tx.send(event).unwrap_or(0);
        debug!(?event, receivers, "store event published");
    }

    pub fn subscribe_messages(&self, rfq_id: RfqId) -> MessageSubscription {
        MessageSubscription {
            rfq_id,
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(exportdesk_shared::constants::DEFAULT_NOTIFY_CAPACITY)
    }
}

/// Insert notifications for one RFQ thread.
#[derive(Debug)]
pub struct MessageSubscription {
    rfq_id: RfqId,
    rx: broadcast::Receiver<StoreEvent>,
}

impl MessageSubscription {
    /// Wait for the next event concerning this RFQ.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn recv(&mut self) -> Option<SubscriptionEvent> {
        loop {
            match self.rx.recv().await {
                Ok(StoreEvent::MessageInserted { rfq_id, message_id }) => {
                    if rfq_id == self.rfq_id {
                        return Some(SubscriptionEvent::Inserted(message_id));
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    return Some(SubscriptionEvent::Lagged(n));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
