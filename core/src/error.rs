//! Error types for raffle state transitions.

use crate::types::{BroadcastId, ChannelId, SubmissionId, UserId};
use thiserror::Error;

/// Errors produced by state transitions on the raffle model.
///
/// These cover the recoverable, caller-visible failures. Persistence
/// failures live in the runtime crate (`StoreError`), and channel-gate
/// ineligibility is not an error at all: it is a regular outcome carried
/// by [`crate::gate::GateOutcome`] and recorded as a rejection reason.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RaffleError {
    /// The requested quantity exceeds the remaining ticket supply.
    ///
    /// Terminal for the purchase: the workflow rejects the submission and
    /// never retries with a smaller amount on its own.
    #[error("requested {requested} tickets but only {remaining} remain")]
    InsufficientSupply {
        /// Tickets the submission asked for.
        requested: u32,
        /// Tickets still unassigned at decision time.
        remaining: u32,
    },

    /// A decision was replayed against a submission that already left
    /// pending review. The replay is a no-op on state.
    #[error("submission {0} is already resolved")]
    AlreadyResolved(SubmissionId),

    /// The user already has a submission pending review; a new one is not
    /// accepted until the pending one is decided.
    #[error("user {user_id} already has submission {submission_id} pending review")]
    SubmissionPending {
        /// Owner of the pending submission.
        user_id: UserId,
        /// The submission still awaiting a decision.
        submission_id: SubmissionId,
    },

    /// A purchase must request at least one ticket.
    #[error("ticket quantity must be at least 1")]
    InvalidQuantity,

    /// No submission with this id exists.
    #[error("unknown submission {0}")]
    UnknownSubmission(SubmissionId),

    /// No user record with this id exists.
    #[error("unknown user {0}")]
    UnknownUser(UserId),

    /// No channel requirement with this id exists.
    #[error("unknown channel {0}")]
    UnknownChannel(ChannelId),

    /// No broadcast job with this id exists.
    #[error("unknown broadcast {0}")]
    UnknownBroadcast(BroadcastId),
}

/// A reloaded snapshot describes an impossible model, e.g. a ticket number
/// assigned twice or one that is both assigned and still in the pool.
#[derive(Debug, Error)]
#[error("state invariant violated: {0}")]
pub struct InvariantViolation(pub String);
