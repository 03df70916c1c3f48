//! # Tombola Core
//!
//! Domain model and business logic for the tombola raffle system: a fixed
//! pool of numbered tickets sold against manually verified payments,
//! guarded by mandatory channel subscriptions, with admin broadcasts to
//! every known user.
//!
//! ## Core Concepts
//!
//! - **State**: [`state::RaffleState`], the aggregate root owning users,
//!   tickets, submissions, channels and broadcast jobs
//! - **Action**: [`action::RaffleAction`], transport commands plus fed-back
//!   results of external calls
//! - **Reducer**: [`reducer::RaffleReducer`], pure function
//!   `(State, Action, Environment) → (State, Effects)`
//! - **Effect**: [`effect::Effect`], side effect descriptions executed by
//!   the store runtime after the mutation commits
//! - **Environment**: [`environment::RaffleEnvironment`], injected
//!   collaborators behind traits
//!
//! ## Architecture Principles
//!
//! - Functional core, imperative shell: every invariant lives in a pure
//!   state transition; I/O is described, not performed
//! - A single mutation entry point (the store's reducer run) serializes all
//!   writes; no ad-hoc locks anywhere else
//! - Slow external calls (membership checks, message sends) happen outside
//!   the mutation; their results re-enter as actions

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use smallvec::{SmallVec, smallvec};

pub mod action;
pub mod analytics;
pub mod broadcast;
pub mod effect;
pub mod environment;
pub mod error;
pub mod export;
pub mod gate;
pub mod pool;
pub mod providers;
pub mod reducer;
pub mod state;
pub mod submission;
pub mod types;

pub use action::RaffleAction;
pub use effect::Effect;
pub use environment::{Clock, RaffleEnvironment, SystemClock};
pub use error::{InvariantViolation, RaffleError};
pub use reducer::{RaffleReducer, Reducer};
pub use state::RaffleState;
