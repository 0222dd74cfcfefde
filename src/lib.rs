//! Chatstore - append-only chat message store
//!
//! This library keeps an ordered, durable log of chat messages per
//! conversation and pushes live snapshots to subscribers as messages arrive.

pub mod config;
pub mod core;
pub mod storage;
pub mod store;
pub mod utils;

pub mod cli;

pub use crate::config::Settings;
pub use crate::core::error::{StoreError, StoreResult};
pub use crate::core::message::Message;
pub use crate::storage::{MessageBackend, StorageContext};
pub use crate::store::subscription::Subscription;
pub use crate::store::{AppendOutcome, MessageStore};
