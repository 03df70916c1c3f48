//! # Tombola Testing
//!
//! Testing utilities for the tombola raffle system:
//! - Mock implementations of the environment traits (transport, oracle)
//! - A fixed clock for deterministic timestamps
//! - Polling helpers for asynchronous assertions
//!
//! ## Example
//!
//! ```ignore
//! use tombola_testing::{MockOracle, MockTransport, test_clock};
//!
//! let transport = MockTransport::new();
//! let oracle = MockOracle::new();
//! let env = RaffleEnvironment::new(
//!     Arc::new(test_clock()),
//!     Arc::new(transport.clone()),
//!     Arc::new(oracle.clone()),
//! );
//! ```

use chrono::{DateTime, Utc};
use tombola_core::environment::Clock;

/// Mock implementations of the environment traits.
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use tokio::sync::{Mutex, Semaphore};
    use tombola_core::providers::{
        AdminNotification, ChatTransport, MembershipOracle, Notification, OracleError,
        TransportError,
    };
    use tombola_core::types::{ChannelId, UserId};

    /// Fixed clock for deterministic tests. Always returns the same time.
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC).
    ///
    /// # Panics
    ///
    /// This function will panic if the hardcoded timestamp fails to parse,
    /// which should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(
            DateTime::parse_from_rfc3339("2025-01-01T00:00:00Z")
                .expect("hardcoded timestamp should always parse")
                .with_timezone(&Utc),
        )
    }

    #[derive(Default)]
    struct TransportInner {
        user_notifications: Mutex<Vec<(UserId, Notification)>>,
        admin_notifications: Mutex<Vec<AdminNotification>>,
        failing_users: Mutex<HashSet<UserId>>,
        attempts: AtomicUsize,
        gate: Option<Semaphore>,
    }

    /// Recording chat transport.
    ///
    /// Captures every notification for assertions. Individual recipients
    /// can be made to fail, and a *gated* transport blocks each user send
    /// until the test releases a permit, which is how broadcast
    /// cancellation is pinned to an exact step without racing timers.
    #[derive(Clone, Default)]
    pub struct MockTransport {
        inner: Arc<TransportInner>,
    }

    impl MockTransport {
        /// A transport that accepts every send immediately.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// A transport whose user sends block until [`Self::release`] hands
        /// out permits.
        #[must_use]
        pub fn gated() -> Self {
            Self {
                inner: Arc::new(TransportInner {
                    gate: Some(Semaphore::new(0)),
                    ..TransportInner::default()
                }),
            }
        }

        /// Lets `n` blocked (or future) user sends proceed.
        pub fn release(&self, n: usize) {
            if let Some(gate) = &self.inner.gate {
                gate.add_permits(n);
            }
        }

        /// Makes every send to `user_id` fail from now on.
        pub async fn fail_for(&self, user_id: UserId) {
            self.inner.failing_users.lock().await.insert(user_id);
        }

        /// Every user notification delivered so far, in order.
        pub async fn sent(&self) -> Vec<(UserId, Notification)> {
            self.inner.user_notifications.lock().await.clone()
        }

        /// Number of user sends attempted, including failed ones.
        #[must_use]
        pub fn attempts(&self) -> usize {
            self.inner.attempts.load(Ordering::SeqCst)
        }

        /// Every admin notification delivered so far, in order.
        pub async fn admin_messages(&self) -> Vec<AdminNotification> {
            self.inner.admin_notifications.lock().await.clone()
        }
    }

    #[async_trait]
    impl ChatTransport for MockTransport {
        async fn notify(
            &self,
            user_id: UserId,
            notification: Notification,
        ) -> Result<(), TransportError> {
            if let Some(gate) = &self.inner.gate {
                let permit = gate
                    .acquire()
                    .await
                    .map_err(|_| TransportError::Other("gate closed".to_owned()))?;
                permit.forget();
            }
            self.inner.attempts.fetch_add(1, Ordering::SeqCst);
            if self.inner.failing_users.lock().await.contains(&user_id) {
                return Err(TransportError::Unreachable(user_id.to_string()));
            }
            self.inner
                .user_notifications
                .lock()
                .await
                .push((user_id, notification));
            Ok(())
        }

        async fn notify_admin(
            &self,
            notification: AdminNotification,
        ) -> Result<(), TransportError> {
            self.inner
                .admin_notifications
                .lock()
                .await
                .push(notification);
            Ok(())
        }
    }

    #[derive(Default)]
    struct OracleInner {
        members: Mutex<HashSet<(UserId, ChannelId)>>,
        failing: AtomicBool,
    }

    /// In-memory membership oracle.
    ///
    /// Starts with no memberships; tests `join`/`leave` users explicitly.
    /// Can be switched into a failing mode to exercise the gate's
    /// fail-closed behavior.
    #[derive(Clone, Default)]
    pub struct MockOracle {
        inner: Arc<OracleInner>,
    }

    impl MockOracle {
        /// An oracle that knows no memberships.
        #[must_use]
        pub fn new() -> Self {
            Self::default()
        }

        /// Records `user_id` as a member of `channel`.
        pub async fn join(&self, user_id: UserId, channel: ChannelId) {
            self.inner.members.lock().await.insert((user_id, channel));
        }

        /// Removes `user_id` from `channel`.
        pub async fn leave(&self, user_id: UserId, channel: &ChannelId) {
            self.inner
                .members
                .lock()
                .await
                .remove(&(user_id, channel.clone()));
        }

        /// Makes every lookup fail from now on (or succeed again).
        pub fn set_failing(&self, failing: bool) {
            self.inner.failing.store(failing, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl MembershipOracle for MockOracle {
        async fn is_member(
            &self,
            user_id: UserId,
            channel: &ChannelId,
        ) -> Result<bool, OracleError> {
            if self.inner.failing.load(Ordering::SeqCst) {
                return Err(OracleError::Lookup("oracle unavailable".to_owned()));
            }
            Ok(self
                .inner
                .members
                .lock()
                .await
                .contains(&(user_id, channel.clone())))
        }
    }
}

/// Polling helpers for asynchronous assertions.
pub mod helpers {
    use std::future::Future;
    use std::time::Duration;

    /// Polls `condition` until it holds or roughly a second elapses.
    /// Returns whether it ever held.
    pub async fn eventually<F, Fut>(mut condition: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..200 {
            if condition().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        false
    }
}

// Re-export commonly used items
pub use helpers::eventually;
pub use mocks::{FixedClock, MockOracle, MockTransport, test_clock};
