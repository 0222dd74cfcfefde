use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has not been bound to a backend yet
    #[error("message store is not initialized")]
    Uninitialized,

    #[error("persistence failure while trying to {action}: {source}")]
    Persistence {
        action: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StoreError {
    pub(crate) fn persistence(action: &'static str, source: anyhow::Error) -> Self {
        Self::Persistence { action, source }
    }

    pub fn is_uninitialized(&self) -> bool {
        matches!(self, Self::Uninitialized)
    }
}

pub type StoreResult<T> = std::result::Result<T, StoreError>;
