//! In-Memory Message Backend
//!
//! Information Hiding:
//! - Row vector and sequence counter hidden from users
//! - Thread-safe access via RwLock hidden behind async interface
//! - Suitable for testing and ephemeral sessions

use super::MessageBackend;
use crate::core::message::{Message, StoredMessage};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Rows are kept in insertion order, so the vector index is the insertion sequence
pub struct InMemoryBackend {
    rows: Arc<RwLock<Vec<StoredMessage>>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            rows: Arc::new(RwLock::new(Vec::new())),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessageBackend for InMemoryBackend {
    async fn insert(&self, row: &StoredMessage) -> Result<()> {
        let mut rows = self.rows.write().await;
        rows.push(row.clone());
        tracing::debug!(
            "[InMemoryBackend] Inserted message #{} into '{}'",
            rows.len(),
            row.conversation_id
        );
        Ok(())
    }

    async fn query_by_conversation(&self, conversation_id: &str) -> Result<Vec<Message>> {
        let rows = self.rows.read().await;
        let mut messages: Vec<Message> = rows
            .iter()
            .filter(|row| row.conversation_id == conversation_id)
            .map(|row| row.message.clone())
            .collect();
        // Stable sort keeps insertion order for equal timestamps
        messages.sort_by_key(|m| m.timestamp);

        tracing::debug!(
            "[InMemoryBackend] Loaded {} messages for '{}'",
            messages.len(),
            conversation_id
        );
        Ok(messages)
    }

    async fn query_distinct_ids(&self) -> Result<Vec<String>> {
        let rows = self.rows.read().await;
        let mut seen = HashSet::new();
        let ids: Vec<String> = rows
            .iter()
            .filter(|row| seen.insert(row.conversation_id.as_str()))
            .map(|row| row.conversation_id.clone())
            .collect();
        tracing::debug!("[InMemoryBackend] Listed {} conversations", ids.len());
        Ok(ids)
    }
}
