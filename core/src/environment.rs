//! Injected dependencies for the raffle reducer.

use crate::providers::{ChatTransport, MembershipOracle};
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// Clock trait - abstracts time operations for testability.
pub trait Clock: Send + Sync {
    /// Get the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by the system time.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Environment dependencies for the raffle reducer.
///
/// All external collaborators are behind traits: the clock, the chat
/// transport the notifications go out on, and the membership oracle the
/// channel gate consults.
#[derive(Clone)]
pub struct RaffleEnvironment {
    /// Clock for timestamps.
    pub clock: Arc<dyn Clock>,
    /// Outbound message boundary.
    pub transport: Arc<dyn ChatTransport>,
    /// Channel membership lookups.
    pub oracle: Arc<dyn MembershipOracle>,
}

impl RaffleEnvironment {
    /// Creates a new environment from its collaborators.
    #[must_use]
    pub fn new(
        clock: Arc<dyn Clock>,
        transport: Arc<dyn ChatTransport>,
        oracle: Arc<dyn MembershipOracle>,
    ) -> Self {
        Self {
            clock,
            transport,
            oracle,
        }
    }
}
