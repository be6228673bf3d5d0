//! Live views over RFQ threads.
//!
//! A [`ThreadView`] keeps a snapshot of one thread in step with the store.
//! It subscribes to the store's insert notifications for its RFQ, and every
//! notification triggers a full refetch; refetching is idempotent so
//! duplicate or reordered notifications are harmless.  A subscriber that
//! lags behind the broadcast buffer refetches as well.
//!
//! Local sends are optimistic: the text shows up as a [`PendingMessage`]
//! straight away and is replaced by the confirmed row once the store
//! accepts it, or removed again if the store rejects it.
//!
//! Closing (or dropping) a view aborts its subscription task.  Results that
//! arrive after close are discarded, never applied.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use exportdesk_shared::{RfqId, SenderType};
use exportdesk_store::{Message, Store, SubscriptionEvent};

use crate::actor::{Actor, IdentityProvider};
use crate::error::{CoreError, Result};
use crate::guard::load_authorized_rfq;
use crate::thread::ThreadManager;

/// A locally sent message the store has not confirmed yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PendingMessage {
    pub local_id: u64,
    pub sender_type: SenderType,
    pub text: String,
    pub queued_at: DateTime<Utc>,
}

/// The state of a thread as seen by one view.
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSnapshot {
    pub rfq_id: RfqId,
    /// Rows read back from the store, oldest first.
    pub confirmed: Vec<Message>,
    /// Optimistic entries, in send order.
    pub pending: Vec<PendingMessage>,
    /// Bumped on every change to this snapshot.
    pub revision: u64,
    /// Set when the latest refetch failed; the confirmed rows are then the
    /// last ones successfully read.
    pub last_error: Option<String>,
}

impl ThreadSnapshot {
    fn new(rfq_id: RfqId, confirmed: Vec<Message>) -> Self {
        Self {
            rfq_id,
            confirmed,
            pending: Vec::new(),
            revision: 0,
            last_error: None,
        }
    }
}

/// Opens [`ThreadView`]s.
#[derive(Clone)]
pub struct ThreadSync {
    store: Arc<dyn Store>,
    threads: ThreadManager,
}

impl ThreadSync {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            threads: ThreadManager::new(store.clone()),
            store,
        }
    }

    /// Open a view of an RFQ thread for `actor`.
    ///
    /// Access is checked before subscribing.  The subscription is taken
    /// before the initial fetch so no insert can fall between the two.
    pub async fn open(&self, actor: Actor, rfq_id: RfqId) -> Result<ThreadView> {
        self.open_inner(actor, rfq_id, None).await
    }

    /// Open a view for whoever is signed in to `identity`.  The view closes
    /// itself as soon as that actor signs out or is replaced.
    pub async fn open_for_session(
        &self,
        identity: &dyn IdentityProvider,
        rfq_id: RfqId,
    ) -> Result<ThreadView> {
        let mut changes = identity.subscribe();
        let actor = (*changes.borrow_and_update()).ok_or(CoreError::Authorization)?;
        self.open_inner(actor, rfq_id, Some(changes)).await
    }

    async fn open_inner(
        &self,
        actor: Actor,
        rfq_id: RfqId,
        actor_changes: Option<watch::Receiver<Option<Actor>>>,
    ) -> Result<ThreadView> {
        load_authorized_rfq(self.store.as_ref(), &actor, rfq_id).await?;
        let mut subscription = self.store.subscribe_messages(rfq_id);
        let initial = self.threads.list_by_rfq(&actor, rfq_id).await?;

        let (state, _) = watch::channel(ThreadSnapshot::new(rfq_id, initial));
        let shared = Arc::new(Shared {
            actor,
            rfq_id,
            threads: self.threads.clone(),
            state,
            closed: AtomicBool::new(false),
            next_local_id: AtomicU64::new(1),
            fetch_seq: AtomicU64::new(0),
            applied_seq: AtomicU64::new(0),
        });

        let task_shared = shared.clone();
        let task = tokio::spawn(async move {
            let mut actor_changes = actor_changes;
            loop {
                tokio::select! {
                    event = subscription.recv() => match event {
                        Some(SubscriptionEvent::Inserted(message_id)) => {
                            debug!(rfq_id = %rfq_id, message_id = %message_id, "thread insert notified");
                            let _ = task_shared.refetch().await;
                        }
                        Some(SubscriptionEvent::Lagged(missed)) => {
                            warn!(rfq_id = %rfq_id, missed, "thread subscription lagged, refetching");
                            let _ = task_shared.refetch().await;
                        }
                        None => {
                            debug!(rfq_id = %rfq_id, "store notifications ended");
                            break;
                        }
                    },
                    current = next_actor(&mut actor_changes) => {
                        if current != Some(task_shared.actor) {
                            info!(rfq_id = %rfq_id, "session changed, closing thread view");
                            task_shared.close();
                            break;
                        }
                    }
                }
            }
        });

        info!(rfq_id = %rfq_id, actor = %actor.id, "thread view opened");
        Ok(ThreadView { shared, task })
    }
}

/// Resolves with the new actor whenever the session changes.  A dropped
/// provider reads as signed out; no provider never resolves.
async fn next_actor(changes: &mut Option<watch::Receiver<Option<Actor>>>) -> Option<Actor> {
    match changes {
        Some(rx) => match rx.changed().await {
            Ok(()) => *rx.borrow_and_update(),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}

struct Shared {
    actor: Actor,
    rfq_id: RfqId,
    threads: ThreadManager,
    state: watch::Sender<ThreadSnapshot>,
    closed: AtomicBool,
    next_local_id: AtomicU64,
    /// Last fetch sequence number handed out.
    fetch_seq: AtomicU64,
    /// Newest fetch whose result reached the snapshot.  Only written while
    /// the snapshot lock is held.
    applied_seq: AtomicU64,
}

impl Shared {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Apply `f` unless the view has been closed.  The check runs under the
    /// snapshot lock, so nothing lands once `close` has returned.
    fn apply(&self, f: impl FnOnce(&mut ThreadSnapshot)) -> bool {
        let applied = self.state.send_if_modified(|snapshot| {
            if self.is_closed() {
                return false;
            }
            f(snapshot);
            snapshot.revision += 1;
            true
        });
        if !applied {
            debug!(rfq_id = %self.rfq_id, "late update on closed thread view discarded");
        }
        applied
    }

    fn begin_fetch(&self) -> u64 {
        self.fetch_seq.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Apply the outcome of fetch `seq` unless a newer one already landed.
    fn apply_fetch(&self, seq: u64, result: &Result<Vec<Message>>) -> bool {
        let applied = self.state.send_if_modified(|snapshot| {
            if self.is_closed() || seq <= self.applied_seq.load(Ordering::SeqCst) {
                return false;
            }
            self.applied_seq.store(seq, Ordering::SeqCst);
            match result {
                Ok(messages) => {
                    snapshot.confirmed = messages.clone();
                    snapshot.last_error = None;
                }
                Err(e) => snapshot.last_error = Some(e.to_string()),
            }
            snapshot.revision += 1;
            true
        });
        if !applied {
            debug!(rfq_id = %self.rfq_id, seq, "stale or late thread fetch discarded");
        }
        applied
    }

    async fn refetch(&self) -> Result<()> {
        let seq = self.begin_fetch();
        let result = self.threads.list_by_rfq(&self.actor, self.rfq_id).await;
        if let Err(e) = &result {
            warn!(rfq_id = %self.rfq_id, error = %e, "thread refetch failed");
        }
        self.apply_fetch(seq, &result);
        result.map(|_| ())
    }

    fn close(&self) {
        self.state.send_if_modified(|_| {
            if !self.closed.swap(true, Ordering::SeqCst) {
                debug!(rfq_id = %self.rfq_id, "thread view closed");
            }
            false
        });
    }
}

/// A live view of one RFQ thread.
pub struct ThreadView {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl ThreadView {
    pub fn rfq_id(&self) -> RfqId {
        self.shared.rfq_id
    }

    pub fn actor(&self) -> Actor {
        self.shared.actor
    }

    pub fn snapshot(&self) -> ThreadSnapshot {
        self.shared.state.borrow().clone()
    }

    /// Confirmed messages, oldest first.
    pub fn messages(&self) -> Vec<Message> {
        self.shared.state.borrow().confirmed.clone()
    }

    /// Change stream; every update to the snapshot marks it changed.
    pub fn watch(&self) -> watch::Receiver<ThreadSnapshot> {
        self.shared.state.subscribe()
    }

    /// Send a message as the view's actor.
    ///
    /// A pending entry is visible immediately.  On success it is replaced by
    /// the stored message; on failure it is removed and the error returned.
    pub async fn send(&self, text: &str) -> Result<Message> {
        if self.is_closed() {
            return Err(CoreError::validation("thread view is closed"));
        }
        let text = text.trim();
        if text.is_empty() {
            return Err(CoreError::validation("message text is empty"));
        }

        let shared = &self.shared;
        let local_id = shared.next_local_id.fetch_add(1, Ordering::SeqCst);
        shared.apply(|snapshot| {
            snapshot.pending.push(PendingMessage {
                local_id,
                sender_type: SenderType::from(shared.actor.role),
                text: text.to_string(),
                queued_at: Utc::now(),
            })
        });

        let result = shared.threads.reply(&shared.actor, shared.rfq_id, text).await;

        match &result {
            Ok(message) => {
                shared.apply(|snapshot| {
                    snapshot.pending.retain(|p| p.local_id != local_id);
                    if !snapshot.confirmed.iter().any(|m| m.id == message.id) {
                        snapshot.confirmed.push(message.clone());
                    }
                });
            }
            Err(e) => {
                warn!(rfq_id = %shared.rfq_id, error = %e, "send failed, rolling back");
                shared.apply(|snapshot| snapshot.pending.retain(|p| p.local_id != local_id));
            }
        }
        result
    }

    /// Refetch now.  A failure is also recorded in `last_error`.
    pub async fn refresh(&self) -> Result<()> {
        if self.is_closed() {
            return Err(CoreError::validation("thread view is closed"));
        }
        self.shared.refetch().await
    }

    pub fn close(&self) {
        self.shared.close();
        self.task.abort();
    }

    pub fn is_closed(&self) -> bool {
        self.shared.is_closed()
    }
}

impl Drop for ThreadView {
    fn drop(&mut self) {
        self.close();
    }
}
