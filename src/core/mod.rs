//! Core domain types shared by the store and its backends

pub mod error;
pub mod message;
