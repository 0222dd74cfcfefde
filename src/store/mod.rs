//! Message Store - canonical per-conversation message log
//!
//! Information Hiding:
//! - Backend handle bound once, hidden behind the store
//! - Snapshot fan-out decoupled from the write path
//! - Default seed conversations computed at read time, never persisted

pub(crate) mod fanout;
pub mod subscription;

use crate::config::Settings;
use crate::core::error::{StoreError, StoreResult};
use crate::core::message::{now_millis, Message, StoredMessage};
use crate::storage::{MessageBackend, StorageContext};
use fanout::{Snapshot, SnapshotHub};
use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use subscription::Subscription;
use tokio::sync::OnceCell;

const CONVERSATIONS_TOPIC: &str = "conversations";

/// Result of an [`MessageStore::append`] call that did not fail outright
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// Durably written and published to subscribers
    Stored,
    /// The store is not initialized; nothing was written
    Declined,
}

impl AppendOutcome {
    pub fn is_stored(self) -> bool {
        self == Self::Stored
    }
}

struct Bound {
    backend: Arc<dyn MessageBackend>,
    known_ids: Mutex<HashSet<String>>,
}

impl Bound {
    async fn load(backend: Arc<dyn MessageBackend>) -> StoreResult<Self> {
        let ids = backend
            .query_distinct_ids()
            .await
            .map_err(|e| StoreError::persistence("load conversation index", e))?;

        Ok(Self {
            backend,
            known_ids: Mutex::new(ids.into_iter().collect()),
        })
    }

    /// Record `id` as seen; true if it was not known before
    fn mark_known(&self, id: &str) -> bool {
        let mut ids = self.known_ids.lock().unwrap_or_else(|e| e.into_inner());
        ids.insert(id.to_string())
    }
}

/// Append-only message log with live subscriptions.
///
/// Construct one per process and share it (usually behind an `Arc`). Until
/// [`MessageStore::init`] succeeds, reads return empty or default views and
/// appends are declined.
pub struct MessageStore {
    bound: OnceCell<Bound>,
    messages: SnapshotHub<Message>,
    conversations: SnapshotHub<String>,
    default_seed: Vec<String>,
}

impl MessageStore {
    pub fn new(settings: &Settings) -> Self {
        let buffer = settings.subscriptions.channel_buffer_size;
        Self {
            bound: OnceCell::new(),
            messages: SnapshotHub::new(buffer),
            conversations: SnapshotHub::new(buffer),
            default_seed: settings.conversations.default_seed.clone(),
        }
    }

    /// Bind the store to the backend described by `context`.
    ///
    /// Idempotent: once bound, later calls return `Ok` without opening anything.
    pub async fn init(&self, context: &StorageContext) -> StoreResult<()> {
        self.bind(move || async move {
            context
                .open()
                .await
                .map_err(|e| StoreError::persistence("open storage", e))
        })
        .await
    }

    /// Bind the store to an already opened backend
    pub async fn init_with_backend(&self, backend: Arc<dyn MessageBackend>) -> StoreResult<()> {
        self.bind(move || async move { Ok(backend) }).await
    }

    async fn bind<F, Fut>(&self, open: F) -> StoreResult<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = StoreResult<Arc<dyn MessageBackend>>>,
    {
        if self.bound.initialized() {
            tracing::debug!("[MessageStore] Already initialized, keeping existing backend");
            return Ok(());
        }

        let bound = self
            .bound
            .get_or_try_init(move || async move { Bound::load(open().await?).await })
            .await?;

        let count = bound.known_ids.lock().unwrap_or_else(|e| e.into_inner()).len();
        tracing::info!("[MessageStore] Initialized with {} conversations", count);

        // Subscribers that joined before init are still showing the degraded view
        for topic in self.messages.live_topics() {
            self.publish_messages(bound, &topic).await;
        }
        self.publish_conversations(bound).await;
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.bound.initialized()
    }

    fn bound(&self) -> StoreResult<&Bound> {
        self.bound.get().ok_or(StoreError::Uninitialized)
    }

    /// All messages of a conversation, oldest first.
    /// Unknown conversations (and an uninitialized store) yield an empty list.
    pub async fn get_messages(&self, conversation_id: &str) -> StoreResult<Vec<Message>> {
        let bound = match self.bound() {
            Ok(bound) => bound,
            Err(_) => {
                tracing::debug!("[MessageStore] get_messages('{}') before init", conversation_id);
                return Ok(Vec::new());
            }
        };

        bound
            .backend
            .query_by_conversation(conversation_id)
            .await
            .map_err(|e| StoreError::persistence("load messages", e))
    }

    /// Distinct conversation ids in order of first appearance, or the default
    /// seed set when nothing has been stored yet
    pub async fn list_conversations(&self) -> StoreResult<Vec<String>> {
        let ids = match self.bound() {
            Ok(bound) => bound
                .backend
                .query_distinct_ids()
                .await
                .map_err(|e| StoreError::persistence("list conversations", e))?,
            Err(_) => Vec::new(),
        };
        Ok(self.conversation_snapshot(ids).items)
    }

    /// Persist `message` under `conversation_id`, then notify that
    /// conversation's subscribers.
    pub async fn append(&self, conversation_id: &str, message: Message) -> StoreResult<AppendOutcome> {
        let bound = match self.bound() {
            Ok(bound) => bound,
            Err(_) => {
                tracing::warn!(
                    "[MessageStore] Declined append to '{}': store not initialized",
                    conversation_id
                );
                return Ok(AppendOutcome::Declined);
            }
        };

        self.write(bound, conversation_id, message, false).await?;
        Ok(AppendOutcome::Stored)
    }

    /// Insert then publish. `reserved` marks an id already claimed through
    /// `mark_known`, which must still be announced as a new conversation.
    async fn write(
        &self,
        bound: &Bound,
        conversation_id: &str,
        message: Message,
        reserved: bool,
    ) -> StoreResult<()> {
        let row = StoredMessage::new(conversation_id, message);
        bound
            .backend
            .insert(&row)
            .await
            .map_err(|e| StoreError::persistence("append message", e))?;

        tracing::debug!("[MessageStore] Appended message to '{}'", conversation_id);

        self.publish_messages(bound, conversation_id).await;
        if reserved || bound.mark_known(conversation_id) {
            tracing::info!("[MessageStore] New conversation '{}'", conversation_id);
            self.publish_conversations(bound).await;
        }
        Ok(())
    }

    /// Open a new conversation with a generated `chat_<millis>` id, seeded
    /// with `opening`. Returns the new id.
    pub async fn start_conversation(&self, opening: Message) -> StoreResult<String> {
        let bound = self.bound()?;

        // Claim the id under the index lock so concurrent callers never share one
        let mut stamp = now_millis();
        let mut conversation_id = format!("chat_{}", stamp);
        while !bound.mark_known(&conversation_id) {
            stamp += 1;
            conversation_id = format!("chat_{}", stamp);
        }

        self.write(bound, &conversation_id, opening, true).await?;
        Ok(conversation_id)
    }

    /// Live view of one conversation's messages
    pub async fn subscribe(&self, conversation_id: &str) -> StoreResult<Subscription<Message>> {
        // Register before reading so no append can slip between the two
        let receiver = self.messages.subscribe(conversation_id);
        let current = self.get_messages(conversation_id).await?;

        tracing::debug!(
            "[MessageStore] New subscriber on '{}' ({} messages)",
            conversation_id,
            current.len()
        );
        Ok(Subscription::new(
            conversation_id,
            receiver,
            Snapshot {
                generation: current.len() as u64,
                items: current,
            },
        ))
    }

    /// Live view of the conversation index
    pub async fn subscribe_conversations(&self) -> StoreResult<Subscription<String>> {
        let receiver = self.conversations.subscribe(CONVERSATIONS_TOPIC);
        let ids = match self.bound() {
            Ok(bound) => bound
                .backend
                .query_distinct_ids()
                .await
                .map_err(|e| StoreError::persistence("list conversations", e))?,
            Err(_) => Vec::new(),
        };

        Ok(Subscription::new(
            CONVERSATIONS_TOPIC,
            receiver,
            self.conversation_snapshot(ids),
        ))
    }

    async fn publish_messages(&self, bound: &Bound, conversation_id: &str) {
        if !self.messages.has_subscribers(conversation_id) {
            return;
        }

        match bound.backend.query_by_conversation(conversation_id).await {
            Ok(messages) => {
                let snapshot = Snapshot {
                    generation: messages.len() as u64,
                    items: messages,
                };
                self.messages.publish(conversation_id, snapshot);
            }
            Err(e) => {
                tracing::warn!(
                    "[MessageStore] Skipped snapshot for '{}': {:#}",
                    conversation_id,
                    e
                );
            }
        }
    }

    async fn publish_conversations(&self, bound: &Bound) {
        if !self.conversations.has_subscribers(CONVERSATIONS_TOPIC) {
            return;
        }

        match bound.backend.query_distinct_ids().await {
            Ok(ids) => {
                self.conversations
                    .publish(CONVERSATIONS_TOPIC, self.conversation_snapshot(ids));
            }
            Err(e) => {
                tracing::warn!("[MessageStore] Skipped conversation snapshot: {:#}", e);
            }
        }
    }

    /// The seed set counts as generation zero so the first real id always supersedes it
    fn conversation_snapshot(&self, ids: Vec<String>) -> Snapshot<String> {
        if ids.is_empty() {
            Snapshot {
                generation: 0,
                items: self.default_seed.clone(),
            }
        } else {
            Snapshot {
                generation: ids.len() as u64,
                items: ids,
            }
        }
    }
}

impl Default for MessageStore {
    fn default() -> Self {
        Self::new(&Settings::default())
    }
}
