//! Snapshot fan-out
//!
//! Information Hiding:
//! - One bounded broadcast channel per topic, created lazily
//! - Topics without receivers are pruned on subscribe and publish
//! - Publishing never waits on a subscriber

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;

/// A full snapshot plus its generation.
///
/// Generations only grow for a given topic; subscribers use them to drop
/// snapshots that raced behind a newer one.
#[derive(Debug, Clone)]
pub(crate) struct Snapshot<T> {
    pub generation: u64,
    pub items: Vec<T>,
}

pub(crate) type SnapshotSender<T> = broadcast::Sender<Arc<Snapshot<T>>>;

pub(crate) struct SnapshotHub<T> {
    topics: Mutex<HashMap<String, SnapshotSender<T>>>,
    capacity: usize,
}

impl<T> SnapshotHub<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Mutex::new(HashMap::new()),
            // broadcast::channel panics on zero
            capacity: capacity.max(1),
        }
    }

    /// Register a new subscriber on `topic`. The caller supplies the snapshot
    /// it read *after* this call, so no publish can fall between the two.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Arc<Snapshot<T>>> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        // Drop topics whose subscribers have all gone away
        topics.retain(|_, sender| sender.receiver_count() > 0);
        topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Topics that currently have at least one live receiver
    pub fn live_topics(&self) -> Vec<String> {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        topics.retain(|_, sender| sender.receiver_count() > 0);
        topics.keys().cloned().collect()
    }

    pub fn has_subscribers(&self, topic: &str) -> bool {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        match topics.get(topic) {
            Some(sender) if sender.receiver_count() > 0 => true,
            Some(_) => {
                topics.remove(topic);
                false
            }
            None => false,
        }
    }

    /// Send a snapshot to every live subscriber of `topic`.
    /// Returns the number of receivers it was queued for.
    pub fn publish(&self, topic: &str, snapshot: Snapshot<T>) -> usize {
        let mut topics = self.topics.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = topics.get(topic) else {
            return 0;
        };

        match sender.send(Arc::new(snapshot)) {
            Ok(receivers) => {
                tracing::trace!("[SnapshotHub] Published to {} receivers on '{}'", receivers, topic);
                receivers
            }
            Err(_) => {
                topics.remove(topic);
                0
            }
        }
    }

    #[cfg(test)]
    pub fn topic_count(&self) -> usize {
        self.topics.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}
