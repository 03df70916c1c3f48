//! Collaborator traits: the chat transport and the membership oracle.
//!
//! The core never talks to the outside world directly. Everything it needs
//! from the platform is expressed as a trait here and injected through the
//! environment, so production adapters, mocks, and future transports are
//! interchangeable.

use crate::broadcast::{BroadcastContent, BroadcastReport};
use crate::state::ChannelRequirement;
use crate::submission::RejectReason;
use crate::types::{BroadcastId, Money, SubmissionId, TicketNumber, UserId};
use async_trait::async_trait;
use thiserror::Error;

/// A message the core wants delivered to a user.
///
/// Payloads are semantic (ticket numbers, reasons, channels to join) and
/// rendering them into chat text is entirely the transport's business.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notification {
    /// The receipt was accepted and is awaiting admin review.
    ReceiptReceived {
        /// The submission created for it.
        submission_id: SubmissionId,
    },
    /// A new submission was refused before reaching review.
    SubmissionRefused {
        /// Why it was refused.
        reason: RefusalReason,
    },
    /// The purchase was approved and these tickets now belong to the user.
    TicketsAllocated {
        /// The approved submission.
        submission_id: SubmissionId,
        /// Allocated ticket numbers, ascending.
        tickets: Vec<TicketNumber>,
    },
    /// The purchase was rejected.
    PurchaseRejected {
        /// The rejected submission.
        submission_id: SubmissionId,
        /// Why it was rejected.
        reason: RejectReason,
    },
    /// The user must join these channels before buying.
    JoinChannels {
        /// Channels the user is missing, with titles and invite links.
        channels: Vec<ChannelRequirement>,
    },
    /// A user-initiated subscription check passed.
    SubscriptionConfirmed,
    /// An admin broadcast message.
    Broadcast {
        /// The broadcast content.
        content: BroadcastContent,
    },
}

/// Why a new submission was refused before review.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefusalReason {
    /// An earlier submission of the same user is still pending.
    AlreadyPending,
    /// The requested quantity was zero.
    InvalidQuantity,
}

/// A message the core wants delivered to the admin.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdminNotification {
    /// A receipt arrived and needs a decision.
    ReceiptPending {
        /// The submission to decide on.
        submission_id: SubmissionId,
        /// The buyer.
        user_id: UserId,
        /// Requested ticket quantity.
        quantity: u32,
        /// Claimed payment amount.
        amount: Money,
    },
    /// A broadcast job reached a terminal state.
    BroadcastFinished {
        /// The finished job.
        job_id: BroadcastId,
        /// Its final tally.
        report: BroadcastReport,
    },
}

/// A notification could not be delivered.
///
/// Always best-effort from the core's point of view: a failed delivery is
/// recorded or logged, never propagated to abort the mutation that caused
/// it.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The recipient cannot be reached (blocked the bot, left the chat).
    #[error("recipient unreachable: {0}")]
    Unreachable(String),
    /// Any other transport-level failure.
    #[error("transport failure: {0}")]
    Other(String),
}

/// The membership oracle behind the channel gate.
#[derive(Debug, Error)]
pub enum OracleError {
    /// The lookup could not be completed. The gate treats this as
    /// not-a-member (fail closed).
    #[error("membership lookup failed: {0}")]
    Lookup(String),
}

/// Outbound message boundary of the chat platform.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Delivers a notification to a user.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the platform refuses the send; the
    /// caller records or logs it and moves on.
    async fn notify(&self, user_id: UserId, notification: Notification)
        -> Result<(), TransportError>;

    /// Delivers a notification to the admin.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the platform refuses the send.
    async fn notify_admin(&self, notification: AdminNotification) -> Result<(), TransportError>;
}

/// Answers "is this user currently a member of this channel?".
///
/// Assumed eventually consistent and allowed to be slow or fail; the gate
/// treats failures as not-a-member.
#[async_trait]
pub trait MembershipOracle: Send + Sync {
    /// Checks current membership of `user_id` in `channel`.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] when the lookup cannot be completed.
    async fn is_member(
        &self,
        user_id: UserId,
        channel: &crate::types::ChannelId,
    ) -> Result<bool, OracleError>;
}
