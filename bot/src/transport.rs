//! Console adapters: the thin outer shell around the core.
//!
//! A real deployment would implement [`ChatTransport`] and
//! [`MembershipOracle`] against the chat platform's API; these stand-ins
//! print notifications to the log and wave every membership check through,
//! which is all the demo binary needs.

use async_trait::async_trait;
use tombola_core::providers::{
    AdminNotification, ChatTransport, MembershipOracle, Notification, OracleError, TransportError,
};
use tombola_core::types::{ChannelId, UserId};

/// Transport that renders notifications to the process log.
#[derive(Clone, Copy, Debug, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl ChatTransport for ConsoleTransport {
    async fn notify(
        &self,
        user_id: UserId,
        notification: Notification,
    ) -> Result<(), TransportError> {
        tracing::info!(%user_id, ?notification, "notify user");
        Ok(())
    }

    async fn notify_admin(&self, notification: AdminNotification) -> Result<(), TransportError> {
        tracing::info!(?notification, "notify admin");
        Ok(())
    }
}

/// Oracle that treats every user as subscribed everywhere.
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAllOracle;

#[async_trait]
impl MembershipOracle for AllowAllOracle {
    async fn is_member(&self, _user_id: UserId, _channel: &ChannelId) -> Result<bool, OracleError> {
        Ok(true)
    }
}
