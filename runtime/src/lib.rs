//! # Tombola Runtime
//!
//! Store runtime for the tombola raffle system.
//!
//! This crate provides [`RaffleStore`], the single mutation entry point:
//! it serializes reducer runs behind one write lock, durably persists the
//! snapshot before a mutation is considered committed, rolls the in-memory
//! model back when the write fails, and executes the reducer's effects
//! outside the lock with their results fed back in as new actions.
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use tombola_core::{RaffleAction, RaffleEnvironment, RaffleReducer};
//! use tombola_core::types::Money;
//! use tombola_runtime::{JsonFilePersister, RaffleStore};
//!
//! let persister = Arc::new(JsonFilePersister::new("data/store.json"));
//! let store = RaffleStore::open(
//!     persister,
//!     300,
//!     RaffleReducer::new(Money::new(50_000)),
//!     environment,
//! ).await?;
//!
//! store.send(RaffleAction::RegisterUser {
//!     user_id,
//!     username: None,
//!     full_name: None,
//! }).await?;
//!
//! let remaining = store.state(|s| s.pool.remaining()).await;
//! ```

/// Snapshot persistence (atomic temp-file-and-rename JSON document)
pub mod persist;

/// The store runtime itself
pub mod store;

pub use persist::{JsonFilePersister, PersistError, Persister};
pub use store::{RaffleStore, StoreError};
