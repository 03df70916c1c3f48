//! The raffle store: the single mutation entry point of the system.

use crate::persist::{PersistError, Persister};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::sync::{Notify, RwLock};
use tombola_core::reducer::Reducer;
use tombola_core::types::BroadcastId;
use tombola_core::{Effect, InvariantViolation, RaffleAction, RaffleEnvironment, RaffleReducer, RaffleState};

/// Errors surfaced by store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The durable write failed. The in-memory model was rolled back to the
    /// pre-mutation state; the triggering action may be retried.
    #[error("failed to persist raffle state: {0}")]
    Persistence(#[source] PersistError),

    /// A reloaded snapshot describes an impossible model.
    #[error("stored snapshot is corrupt: {0}")]
    Corrupt(#[from] InvariantViolation),
}

/// The store runtime.
///
/// Owns the in-memory model behind a single write lock that acts as the
/// system's one global mutation lock: every action runs its reducer and the
/// durable snapshot write under that lock, so no two mutations ever
/// interleave and nothing observes a state that was not durably committed.
/// Effects returned by the reducer run *outside* the lock on spawned
/// tasks; actions they produce re-enter through [`RaffleStore::send`].
///
/// Cloning is cheap and shares the same store.
#[derive(Clone)]
pub struct RaffleStore {
    state: Arc<RwLock<RaffleState>>,
    reducer: RaffleReducer,
    environment: RaffleEnvironment,
    persister: Arc<dyn Persister>,
    pending_effects: Arc<AtomicUsize>,
    quiescent: Arc<Notify>,
}

/// Decrements the pending-effect counter even if the effect task panics.
struct PendingGuard {
    counter: Arc<AtomicUsize>,
    notify: Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.notify.notify_waiters();
        }
    }
}

impl RaffleStore {
    /// Opens the store: reloads the last snapshot, or initializes and
    /// persists a fresh model with `capacity` unassigned tickets when none
    /// exists. Reloaded snapshots are validated before use.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] when the snapshot cannot be read or the
    /// fresh model cannot be written; [`StoreError::Corrupt`] when the
    /// reloaded model violates the ticket-partition invariants.
    pub async fn open(
        persister: Arc<dyn Persister>,
        capacity: u32,
        reducer: RaffleReducer,
        environment: RaffleEnvironment,
    ) -> Result<Self, StoreError> {
        let state = match persister.load().await.map_err(StoreError::Persistence)? {
            Some(state) => {
                state.validate()?;
                tracing::info!(
                    users = state.users.len(),
                    submissions = state.submissions.len(),
                    remaining = state.pool.remaining(),
                    "snapshot reloaded"
                );
                state
            }
            None => {
                let state = RaffleState::new(capacity);
                persister
                    .save(&state)
                    .await
                    .map_err(StoreError::Persistence)?;
                tracing::info!(capacity, "fresh raffle initialized");
                state
            }
        };

        Ok(Self {
            state: Arc::new(RwLock::new(state)),
            reducer,
            environment,
            persister,
            pending_effects: Arc::new(AtomicUsize::new(0)),
            quiescent: Arc::new(Notify::new()),
        })
    }

    /// Processes one action: reduce, persist, then execute effects.
    ///
    /// The reducer run and the snapshot write happen under the write lock;
    /// if the write fails the in-memory model is restored from the
    /// pre-mutation copy before the lock is released, so a failed mutation
    /// is observationally a no-op.
    ///
    /// # Errors
    ///
    /// [`StoreError::Persistence`] when the durable write failed. The
    /// caller may retry the action.
    #[tracing::instrument(skip(self, action), name = "store_send")]
    pub async fn send(&self, action: RaffleAction) -> Result<(), StoreError> {
        metrics::counter!("store.actions.total").increment(1);

        let effects = {
            let mut state = self.state.write().await;
            let rollback = state.clone();

            let effects = self.reducer.reduce(&mut state, action, &self.environment);

            if let Err(error) = self.persister.save(&state).await {
                *state = rollback;
                metrics::counter!("store.persistence.failures").increment(1);
                tracing::error!(%error, "snapshot write failed, mutation rolled back");
                return Err(StoreError::Persistence(error));
            }
            effects
        };

        for effect in effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    /// Executes one effect on its own task. The task feeds any produced
    /// action back through `send`; a feedback action whose own mutation
    /// fails to persist is logged; there is no initiator left to retry it.
    fn execute_effect(&self, effect: Effect<RaffleAction>) {
        match effect {
            Effect::None => {}
            Effect::Future(fut) => {
                metrics::counter!("store.effects.executed").increment(1);
                self.pending_effects.fetch_add(1, Ordering::SeqCst);
                let guard = PendingGuard {
                    counter: Arc::clone(&self.pending_effects),
                    notify: Arc::clone(&self.quiescent),
                };
                let store = self.clone();

                tokio::spawn(async move {
                    let _guard = guard;
                    if let Some(action) = fut.await {
                        if let Err(error) = store.send(action).await {
                            tracing::error!(%error, "feedback action failed to commit");
                        }
                    }
                });
            }
        }
    }

    /// Read current state via a closure, under the read lock.
    pub async fn state<F, T>(&self, f: F) -> T
    where
        F: FnOnce(&RaffleState) -> T,
    {
        let state = self.state.read().await;
        f(&state)
    }

    /// Broadcast jobs that were interrupted before finishing, for resume
    /// after a restart.
    pub async fn unfinished_broadcasts(&self) -> Vec<BroadcastId> {
        self.state(RaffleState::unfinished_broadcasts).await
    }

    /// Waits until no effect (including effects cascaded from feedback
    /// actions) is still running. Used by tests and shutdown.
    pub async fn quiesce(&self) {
        loop {
            // Register interest before checking the counter, or a decrement
            // landing in between would be a lost wakeup.
            let mut notified = std::pin::pin!(self.quiescent.notified());
            notified.as_mut().enable();
            if self.pending_effects.load(Ordering::SeqCst) == 0 {
                return;
            }
            notified.await;
        }
    }
}
