//! Payment submissions and their decision state machine.

use crate::types::{ChannelId, Money, SubmissionId, TicketNumber, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque reference to the payment receipt a user attached.
///
/// The core never inspects the attachment; it only carries the transport's
/// handle so an admin client can fetch and display it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRef {
    /// Transport-side file handle.
    pub file_id: String,
    /// Kind of attachment the handle points at.
    pub kind: ReceiptKind,
}

/// Attachment kind of a receipt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReceiptKind {
    /// An inline photo.
    Photo,
    /// A document upload (PDF scan etc.).
    Document,
}

/// Why a submission was rejected.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RejectReason {
    /// The requested quantity exceeded the remaining supply at decision time.
    InsufficientSupply {
        /// Tickets the submission asked for.
        requested: u32,
        /// Tickets that remained when the decision was made.
        remaining: u32,
    },
    /// The user no longer satisfied the mandatory channel subscriptions.
    NotSubscribed {
        /// Channels the user is missing.
        missing: Vec<ChannelId>,
    },
    /// The admin rejected the payment manually.
    Manual {
        /// Free-form note from the admin.
        note: String,
    },
}

/// Decision status of a submission.
///
/// A submission is created pending admin review and transitions exactly
/// once, to `Approved` or `Rejected`. Resolved submissions are retained
/// forever for audit and export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubmissionStatus {
    /// Waiting for an admin decision.
    Pending,
    /// Approved; the listed tickets were allocated in the same transition.
    Approved {
        /// Ticket numbers allocated to the buyer, ascending.
        tickets: Vec<TicketNumber>,
        /// When the decision was made.
        resolved_at: DateTime<Utc>,
    },
    /// Rejected with a reason; no tickets changed hands.
    Rejected {
        /// Why the purchase was refused.
        reason: RejectReason,
        /// When the decision was made.
        resolved_at: DateTime<Utc>,
    },
}

/// A user's claim of having paid for a number of tickets.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// Unique submission id.
    pub id: SubmissionId,
    /// The buyer.
    pub user_id: UserId,
    /// Requested ticket quantity, at least 1.
    pub quantity: u32,
    /// Price per ticket at submission time. Later price changes never
    /// reprice an in-flight purchase.
    pub unit_price: Money,
    /// The attached payment receipt.
    pub receipt: ReceiptRef,
    /// When the receipt was submitted.
    pub submitted_at: DateTime<Utc>,
    /// Current decision status.
    pub status: SubmissionStatus,
}

impl Submission {
    /// Total amount this submission claims to have paid.
    #[must_use]
    pub const fn amount(&self) -> Money {
        self.unit_price.times(self.quantity)
    }

    /// Whether the submission still awaits a decision.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self.status, SubmissionStatus::Pending)
    }

    /// Whether the submission was approved.
    #[must_use]
    pub const fn is_approved(&self) -> bool {
        matches!(self.status, SubmissionStatus::Approved { .. })
    }
}
