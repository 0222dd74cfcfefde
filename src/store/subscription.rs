use super::fanout::Snapshot;
use futures::stream::{self, Stream};
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};

/// Live view of a topic: the current snapshot first, then one full snapshot per change.
///
/// The stream never ends on its own while the store is alive. Dropping the
/// subscription (or calling [`Subscription::unsubscribe`]) stops delivery at once.
pub struct Subscription<T> {
    topic: String,
    initial: Option<Vec<T>>,
    receiver: Option<broadcast::Receiver<Arc<Snapshot<T>>>>,
    last_generation: u64,
}

impl<T> Subscription<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        topic: impl Into<String>,
        receiver: broadcast::Receiver<Arc<Snapshot<T>>>,
        initial: Snapshot<T>,
    ) -> Self {
        Self {
            topic: topic.into(),
            last_generation: initial.generation,
            initial: Some(initial.items),
            receiver: Some(receiver),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.receiver.is_some()
    }

    /// Wait for the next snapshot. Returns `None` once unsubscribed or when
    /// the owning store has been dropped.
    pub async fn next(&mut self) -> Option<Vec<T>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.recv().await {
                Ok(snapshot) => {
                    if let Some(items) = self.accept(&snapshot) {
                        return Some(items);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    // Snapshots are complete, so catching up to the newest is enough
                    tracing::debug!(
                        "[Subscription] '{}' lagged behind by {} snapshots",
                        self.topic,
                        skipped
                    );
                }
                Err(RecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Non-blocking variant of [`Subscription::next`]
    pub fn try_next(&mut self) -> Option<Vec<T>> {
        if let Some(initial) = self.initial.take() {
            return Some(initial);
        }

        loop {
            let receiver = self.receiver.as_mut()?;
            match receiver.try_recv() {
                Ok(snapshot) => {
                    if let Some(items) = self.accept(&snapshot) {
                        return Some(items);
                    }
                }
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Closed) => {
                    self.receiver = None;
                    return None;
                }
            }
        }
    }

    /// Stop receiving snapshots. Anything still queued is discarded.
    pub fn unsubscribe(&mut self) {
        if self.receiver.take().is_some() {
            tracing::debug!("[Subscription] Unsubscribed from '{}'", self.topic);
        }
        self.initial = None;
    }

    pub fn into_stream(self) -> impl Stream<Item = Vec<T>> {
        stream::unfold(self, |mut subscription| async move {
            let items = subscription.next().await?;
            Some((items, subscription))
        })
    }

    fn accept(&mut self, snapshot: &Snapshot<T>) -> Option<Vec<T>> {
        if snapshot.generation <= self.last_generation {
            return None;
        }
        self.last_generation = snapshot.generation;
        Some(snapshot.items.clone())
    }
}
