//! Broadcast jobs: admin messages fanned out to every known user.

use crate::types::{BroadcastId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Content of a broadcast message.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastContent {
    /// Message text.
    pub text: String,
    /// Optional transport-side media handle attached to the message.
    pub media: Option<String>,
}

/// Outcome of delivering a broadcast to a single recipient.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The transport accepted the message.
    Delivered,
    /// The send failed (user blocked the bot, transport error). Recorded
    /// and skipped; never aborts the job.
    Failed,
}

/// Final tally of a broadcast job, reported to the admin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastReport {
    /// Recipients the transport accepted.
    pub sent: u32,
    /// Recipients whose send failed.
    pub failed: u32,
    /// Recipients never attempted because the job was cancelled first.
    pub skipped: u32,
}

/// A fan-out of one message to a snapshot of all known users.
///
/// The recipient list is frozen at launch, ascending by user id, so the
/// delivery order, and therefore cancellation behavior, is reproducible.
/// Jobs persist with their cursor and can be resumed after a restart; the
/// `in_flight` marker is deliberately not persisted, since a delivery chain
/// never survives the process that spawned it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastJob {
    /// Unique job id.
    pub id: BroadcastId,
    /// What is being sent.
    pub content: BroadcastContent,
    /// Snapshot of recipient user ids, ascending.
    pub recipients: Vec<UserId>,
    /// Index of the next recipient to attempt.
    pub cursor: usize,
    /// Successful sends so far.
    pub sent: u32,
    /// Failed sends so far.
    pub failed: u32,
    /// Set by `cancel`; observed between recipients.
    pub cancelled: bool,
    /// When the job was launched.
    pub started_at: DateTime<Utc>,
    /// Set when the cursor exhausts the snapshot or cancellation lands.
    pub finished_at: Option<DateTime<Utc>>,
    /// Whether a delivery chain is currently driving this job.
    #[serde(skip)]
    pub in_flight: bool,
}

impl BroadcastJob {
    /// Whether the job reached a terminal state.
    #[must_use]
    pub const fn is_finished(&self) -> bool {
        self.finished_at.is_some()
    }

    /// The next recipient to attempt, unless the job is done or cancelled.
    #[must_use]
    pub fn next_recipient(&self) -> Option<UserId> {
        if self.cancelled || self.is_finished() {
            return None;
        }
        self.recipients.get(self.cursor).copied()
    }

    /// Tally of the job so far.
    #[allow(clippy::cast_possible_truncation)] // recipient counts fit u32
    #[must_use]
    pub fn report(&self) -> BroadcastReport {
        BroadcastReport {
            sent: self.sent,
            failed: self.failed,
            skipped: (self.recipients.len() - self.cursor) as u32,
        }
    }
}
