//! The unified input type for the raffle reducer.

use crate::broadcast::{BroadcastContent, DeliveryOutcome};
use crate::gate::GateOutcome;
use crate::submission::ReceiptRef;
use crate::types::{BroadcastId, ChannelId, SubmissionId, UserId};

/// All possible inputs to the raffle reducer.
///
/// The first group are commands arriving from the chat transport (user and
/// admin interactions). The second group are the results of external calls
/// (membership checks, broadcast sends) fed back into the store as their
/// own actions, so the mutation that uses a result is separate from the
/// slow call that produced it and the store lock is never held across
/// either.
#[derive(Debug)]
pub enum RaffleAction {
    // ------------------------------------------------------------------
    // Commands
    // ------------------------------------------------------------------
    /// A user started interacting with the bot.
    RegisterUser {
        /// The user.
        user_id: UserId,
        /// Platform handle, if known.
        username: Option<String>,
        /// Display name, if known.
        full_name: Option<String>,
    },

    /// A user sent a payment receipt for a number of tickets.
    SubmitReceipt {
        /// The buyer.
        user_id: UserId,
        /// Requested ticket quantity.
        quantity: u32,
        /// The attached receipt.
        receipt: ReceiptRef,
    },

    /// A user shared their phone number after purchasing.
    SubmitPhone {
        /// The user.
        user_id: UserId,
        /// The phone number as entered.
        phone: String,
    },

    /// A user asked to re-verify their channel subscriptions.
    CheckSubscription {
        /// The user.
        user_id: UserId,
    },

    /// The admin approved a submission.
    Approve {
        /// The submission to approve.
        submission_id: SubmissionId,
    },

    /// The admin rejected a submission.
    Reject {
        /// The submission to reject.
        submission_id: SubmissionId,
        /// Free-form note shown to the buyer.
        note: String,
    },

    /// The admin added (or re-titled) a mandatory channel.
    AddChannel {
        /// Channel identifier.
        id: ChannelId,
        /// Display title.
        title: String,
        /// Invite link, if any.
        link: Option<String>,
    },

    /// The admin removed a mandatory channel.
    RemoveChannel {
        /// Channel identifier.
        id: ChannelId,
    },

    /// The admin toggled a channel requirement on or off.
    SetChannelEnabled {
        /// Channel identifier.
        id: ChannelId,
        /// New enabled flag.
        enabled: bool,
    },

    /// The admin launched a broadcast to all known users.
    StartBroadcast {
        /// The message to fan out.
        content: BroadcastContent,
    },

    /// The admin cancelled a running broadcast.
    CancelBroadcast {
        /// The job to cancel.
        job_id: BroadcastId,
    },

    /// Restart an interrupted broadcast's delivery chain (after a process
    /// restart).
    ResumeBroadcast {
        /// The job to resume.
        job_id: BroadcastId,
    },

    // ------------------------------------------------------------------
    // Fed-back results of external calls
    // ------------------------------------------------------------------
    /// Channel-gate outcome for a receipt submission attempt.
    ReceiptGateChecked {
        /// The buyer.
        user_id: UserId,
        /// Requested ticket quantity, carried through the check.
        quantity: u32,
        /// The attached receipt, carried through the check.
        receipt: ReceiptRef,
        /// What the gate found.
        outcome: GateOutcome,
    },

    /// Channel-gate outcome for an admin approval.
    ApprovalGateChecked {
        /// The submission being approved.
        submission_id: SubmissionId,
        /// What the gate found.
        outcome: GateOutcome,
    },

    /// Channel-gate outcome for a user-initiated subscription check.
    SubscriptionChecked {
        /// The user who asked.
        user_id: UserId,
        /// What the gate found.
        outcome: GateOutcome,
    },

    /// One broadcast recipient was attempted.
    BroadcastStep {
        /// The job being delivered.
        job_id: BroadcastId,
        /// The recipient that was attempted.
        recipient: UserId,
        /// How the send went.
        outcome: DeliveryOutcome,
    },
}
