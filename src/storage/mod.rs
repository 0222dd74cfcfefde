//! Message Persistence Abstraction
//!
//! Information Hiding:
//! - Table layout and query strategy hidden behind the backend trait
//! - Allows swapping between memory and SQLite without changing the store
//! - Each backend owns its own locking and ordering guarantees

use crate::config::Settings;
use crate::core::message::{Message, StoredMessage};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

pub mod memory;
pub mod sqlite;

/// Append-only message table.
///
/// Implementations must be safe to call concurrently and must never update
/// or delete rows.
#[async_trait]
pub trait MessageBackend: Send + Sync {
    /// Insert one row. Must be durable (for the backend's notion of durability)
    /// before returning `Ok`.
    async fn insert(&self, row: &StoredMessage) -> Result<()>;

    /// All messages of a conversation, ascending by timestamp then insertion order.
    /// Returns an empty vector for an unknown conversation.
    async fn query_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>>;

    /// Every conversation id present, in order of first appearance
    async fn query_distinct_ids(&self) -> Result<Vec<String>>;
}

/// Where the store keeps its messages
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageContext {
    /// Ephemeral, lost when the process exits
    Memory,
    /// SQLite database file at the given path
    Sqlite(PathBuf),
}

impl StorageContext {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        match settings.storage.backend.as_str() {
            "memory" => Ok(Self::Memory),
            "sqlite" => Ok(Self::Sqlite(PathBuf::from(&settings.storage.path))),
            other => bail!("Unknown storage backend '{}' (expected 'sqlite' or 'memory')", other),
        }
    }

    /// Open a backend handle for this context
    pub async fn open(&self) -> Result<Arc<dyn MessageBackend>> {
        let backend: Arc<dyn MessageBackend> = match self {
            Self::Memory => Arc::new(memory::InMemoryBackend::new()),
            Self::Sqlite(path) => Arc::new(sqlite::SqliteBackend::open(path.clone()).await?),
        };
        Ok(backend)
    }
}
