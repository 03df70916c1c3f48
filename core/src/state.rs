//! The raffle aggregate root.
//!
//! `RaffleState` owns every persisted entity (users, the ticket pool,
//! payment submissions, channel requirements, broadcast jobs) and exposes
//! each state transition as a pure method returning `Result`. The store
//! runtime serializes calls to these methods and persists the whole model
//! after each one, so every method body is one atomic mutation: it either
//! applies completely or returns an error having changed nothing.

use crate::broadcast::{BroadcastContent, BroadcastJob, BroadcastReport, DeliveryOutcome};
use crate::error::{InvariantViolation, RaffleError};
use crate::gate::GateOutcome;
use crate::pool::TicketPool;
use crate::submission::{ReceiptRef, RejectReason, Submission, SubmissionStatus};
use crate::types::{BroadcastId, ChannelId, Money, SubmissionId, TicketNumber, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A known user of the raffle. Created on first interaction, never deleted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Platform user id.
    pub id: UserId,
    /// Platform handle, if the user has one.
    pub username: Option<String>,
    /// Display name.
    pub full_name: Option<String>,
    /// Phone number, collected after a purchase.
    pub phone_number: Option<String>,
    /// Owned ticket numbers in allocation order.
    pub tickets: Vec<TicketNumber>,
    /// Number of approved purchases.
    pub purchases: u32,
    /// Aggregate spend across approved purchases.
    pub total_spent: Money,
    /// First time this user was seen.
    pub first_seen: DateTime<Utc>,
    /// Last interaction timestamp.
    pub last_active: DateTime<Utc>,
}

impl User {
    fn new(id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            username: None,
            full_name: None,
            phone_number: None,
            tickets: Vec::new(),
            purchases: 0,
            total_spent: Money::ZERO,
            first_seen: now,
            last_active: now,
        }
    }
}

/// A channel users must be subscribed to before purchasing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelRequirement {
    /// Channel identifier as the membership oracle knows it.
    pub id: ChannelId,
    /// Human-readable title shown in join prompts.
    pub title: String,
    /// Invite link, if the channel has one.
    pub link: Option<String>,
    /// Only enabled requirements take part in gate checks.
    pub enabled: bool,
}

/// Result of resolving a submission, used by the reducer to notify the buyer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Resolution {
    /// The purchase was approved and these tickets were allocated.
    Approved {
        /// The buyer.
        user_id: UserId,
        /// Allocated ticket numbers, ascending.
        tickets: Vec<TicketNumber>,
    },
    /// The purchase was rejected.
    Rejected {
        /// The buyer.
        user_id: UserId,
        /// Why the purchase was refused.
        reason: RejectReason,
    },
}

/// Progress of a broadcast delivery chain after one recorded step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BroadcastProgress {
    /// Deliver to this recipient next.
    Continue {
        /// The next recipient in the snapshot.
        next: UserId,
    },
    /// The job reached a terminal state with this tally.
    Finished(BroadcastReport),
}

/// Outcome of a cancellation request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelOutcome {
    /// The flag was set; the running delivery chain will observe it at the
    /// next step boundary and finalize the job.
    Flagged,
    /// No chain was driving the job, so it finalized immediately.
    Finished(BroadcastReport),
}

/// The full in-memory model of the raffle. The store runtime is its sole
/// writer; everything else reads through store queries.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaffleState {
    /// The fixed ticket pool.
    pub pool: TicketPool,
    /// All known users, keyed by platform id.
    #[serde(default)]
    pub users: BTreeMap<UserId, User>,
    /// Every submission ever made, pending and resolved alike.
    #[serde(default)]
    pub submissions: BTreeMap<SubmissionId, Submission>,
    /// Mandatory-subscription channel requirements.
    #[serde(default)]
    pub channels: Vec<ChannelRequirement>,
    /// Broadcast jobs, running and finished.
    #[serde(default)]
    pub broadcasts: BTreeMap<BroadcastId, BroadcastJob>,
}

impl RaffleState {
    /// Fresh model: full pool unassigned, no users, submissions or channels.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            pool: TicketPool::new(capacity),
            users: BTreeMap::new(),
            submissions: BTreeMap::new(),
            channels: Vec::new(),
            broadcasts: BTreeMap::new(),
        }
    }

    // ------------------------------------------------------------------
    // Users
    // ------------------------------------------------------------------

    /// Creates or refreshes a user record. Present fields overwrite, absent
    /// fields leave the previous value alone.
    pub fn register_user(
        &mut self,
        id: UserId,
        username: Option<String>,
        full_name: Option<String>,
        now: DateTime<Utc>,
    ) -> &User {
        let user = self.users.entry(id).or_insert_with(|| User::new(id, now));
        if username.is_some() {
            user.username = username;
        }
        if full_name.is_some() {
            user.full_name = full_name;
        }
        user.last_active = now;
        user
    }

    /// Records the phone number a user shared after purchasing.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownUser`] if the user was never seen.
    pub fn set_phone(
        &mut self,
        id: UserId,
        phone: String,
        now: DateTime<Utc>,
    ) -> Result<(), RaffleError> {
        let user = self.users.get_mut(&id).ok_or(RaffleError::UnknownUser(id))?;
        user.phone_number = Some(phone);
        user.last_active = now;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Payment workflow
    // ------------------------------------------------------------------

    /// The user's submission currently pending review, if any.
    #[must_use]
    pub fn pending_submission_of(&self, user_id: UserId) -> Option<&Submission> {
        self.submissions
            .values()
            .find(|s| s.user_id == user_id && s.is_pending())
    }

    /// Validates that a new submission would be accepted, without creating
    /// it. Used before the (slow) channel-gate round trip.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::InvalidQuantity`] for a zero quantity and
    /// [`RaffleError::SubmissionPending`] while an earlier submission of the
    /// same user awaits a decision.
    pub fn check_submittable(&self, user_id: UserId, quantity: u32) -> Result<(), RaffleError> {
        if quantity == 0 {
            return Err(RaffleError::InvalidQuantity);
        }
        if let Some(pending) = self.pending_submission_of(user_id) {
            return Err(RaffleError::SubmissionPending {
                user_id,
                submission_id: pending.id,
            });
        }
        Ok(())
    }

    /// Creates a submission pending admin review.
    ///
    /// The caller supplies the id so the transition stays deterministic
    /// under test. The buyer's user record is created on the fly when this
    /// is their first interaction.
    ///
    /// # Errors
    ///
    /// Same conditions as [`Self::check_submittable`].
    pub fn submit_receipt(
        &mut self,
        id: SubmissionId,
        user_id: UserId,
        quantity: u32,
        unit_price: Money,
        receipt: ReceiptRef,
        now: DateTime<Utc>,
    ) -> Result<&Submission, RaffleError> {
        self.check_submittable(user_id, quantity)?;

        self.users
            .entry(user_id)
            .or_insert_with(|| User::new(user_id, now))
            .last_active = now;

        let submission = Submission {
            id,
            user_id,
            quantity,
            unit_price,
            receipt,
            submitted_at: now,
            status: SubmissionStatus::Pending,
        };
        Ok(self.submissions.entry(id).or_insert(submission))
    }

    /// Looks up a submission.
    #[must_use]
    pub fn submission(&self, id: SubmissionId) -> Option<&Submission> {
        self.submissions.get(&id)
    }

    /// Resolves an approval decision with the channel-gate outcome that was
    /// evaluated for it.
    ///
    /// On an eligible outcome the requested quantity is drawn from the pool
    /// and assigned to the buyer; allocation and approval are one
    /// transition, so no partial allocation is ever observable. An
    /// ineligible outcome or exhausted supply rejects the submission
    /// instead; both are regular resolutions, not errors.
    ///
    /// # Errors
    ///
    /// [`RaffleError::UnknownSubmission`] for an id that was never created,
    /// [`RaffleError::AlreadyResolved`] when the submission has already left
    /// pending review (the replayed decision is a no-op on state).
    pub fn resolve_approval(
        &mut self,
        id: SubmissionId,
        gate: &GateOutcome,
        now: DateTime<Utc>,
    ) -> Result<Resolution, RaffleError> {
        let submission = self
            .submissions
            .get(&id)
            .ok_or(RaffleError::UnknownSubmission(id))?;
        if !submission.is_pending() {
            return Err(RaffleError::AlreadyResolved(id));
        }
        let user_id = submission.user_id;
        let quantity = submission.quantity;
        let amount = submission.amount();

        if !gate.is_eligible() {
            let reason = RejectReason::NotSubscribed {
                missing: gate.missing_channel_ids(),
            };
            self.mark_rejected(id, user_id, reason.clone(), now);
            return Ok(Resolution::Rejected { user_id, reason });
        }

        match self.pool.draw(quantity) {
            Ok(tickets) => {
                let user = self
                    .users
                    .entry(user_id)
                    .or_insert_with(|| User::new(user_id, now));
                user.tickets.extend(tickets.iter().copied());
                user.purchases += 1;
                user.total_spent += amount;
                user.last_active = now;

                if let Some(submission) = self.submissions.get_mut(&id) {
                    submission.status = SubmissionStatus::Approved {
                        tickets: tickets.clone(),
                        resolved_at: now,
                    };
                }
                Ok(Resolution::Approved { user_id, tickets })
            }
            Err(RaffleError::InsufficientSupply {
                requested,
                remaining,
            }) => {
                let reason = RejectReason::InsufficientSupply {
                    requested,
                    remaining,
                };
                self.mark_rejected(id, user_id, reason.clone(), now);
                Ok(Resolution::Rejected { user_id, reason })
            }
            Err(other) => Err(other),
        }
    }

    /// Rejects a pending submission with an admin note. Never touches the
    /// ticket pool.
    ///
    /// # Errors
    ///
    /// [`RaffleError::UnknownSubmission`] or [`RaffleError::AlreadyResolved`]
    /// as for [`Self::resolve_approval`].
    pub fn reject(
        &mut self,
        id: SubmissionId,
        note: String,
        now: DateTime<Utc>,
    ) -> Result<Resolution, RaffleError> {
        let submission = self
            .submissions
            .get(&id)
            .ok_or(RaffleError::UnknownSubmission(id))?;
        if !submission.is_pending() {
            return Err(RaffleError::AlreadyResolved(id));
        }
        let user_id = submission.user_id;
        let reason = RejectReason::Manual { note };
        self.mark_rejected(id, user_id, reason.clone(), now);
        Ok(Resolution::Rejected { user_id, reason })
    }

    fn mark_rejected(
        &mut self,
        id: SubmissionId,
        user_id: UserId,
        reason: RejectReason,
        now: DateTime<Utc>,
    ) {
        if let Some(submission) = self.submissions.get_mut(&id) {
            submission.status = SubmissionStatus::Rejected {
                reason,
                resolved_at: now,
            };
        }
        if let Some(user) = self.users.get_mut(&user_id) {
            user.last_active = now;
        }
    }

    // ------------------------------------------------------------------
    // Channel requirements
    // ------------------------------------------------------------------

    /// Adds a channel requirement, or updates title and link of an existing
    /// one. New requirements start enabled.
    pub fn upsert_channel(&mut self, id: ChannelId, title: String, link: Option<String>) {
        if let Some(existing) = self.channels.iter_mut().find(|c| c.id == id) {
            existing.title = title;
            existing.link = link;
        } else {
            self.channels.push(ChannelRequirement {
                id,
                title,
                link,
                enabled: true,
            });
        }
    }

    /// Removes a channel requirement.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownChannel`] if no requirement has this id.
    pub fn remove_channel(&mut self, id: &ChannelId) -> Result<(), RaffleError> {
        let before = self.channels.len();
        self.channels.retain(|c| &c.id != id);
        if self.channels.len() == before {
            return Err(RaffleError::UnknownChannel(id.clone()));
        }
        Ok(())
    }

    /// Enables or disables a channel requirement. Disabled requirements
    /// leave the evaluated set on the very next gate check.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownChannel`] if no requirement has this id.
    pub fn set_channel_enabled(&mut self, id: &ChannelId, enabled: bool) -> Result<(), RaffleError> {
        let channel = self
            .channels
            .iter_mut()
            .find(|c| &c.id == id)
            .ok_or_else(|| RaffleError::UnknownChannel(id.clone()))?;
        channel.enabled = enabled;
        Ok(())
    }

    /// Snapshot of the currently enabled requirements, taken freshly for
    /// every gate evaluation. Pass/fail results are never cached.
    #[must_use]
    pub fn enabled_channels(&self) -> Vec<ChannelRequirement> {
        self.channels.iter().filter(|c| c.enabled).cloned().collect()
    }

    // ------------------------------------------------------------------
    // Broadcasts
    // ------------------------------------------------------------------

    /// Launches a broadcast over a snapshot of all known users, ascending
    /// by user id. Returns the job; a job with no recipients finalizes
    /// immediately.
    pub fn start_broadcast(
        &mut self,
        id: BroadcastId,
        content: BroadcastContent,
        now: DateTime<Utc>,
    ) -> &BroadcastJob {
        let recipients: Vec<UserId> = self.users.keys().copied().collect();
        let mut job = BroadcastJob {
            id,
            content,
            recipients,
            cursor: 0,
            sent: 0,
            failed: 0,
            cancelled: false,
            started_at: now,
            finished_at: None,
            in_flight: false,
        };
        if job.recipients.is_empty() {
            job.finished_at = Some(now);
        } else {
            job.in_flight = true;
        }
        self.broadcasts.entry(id).or_insert(job)
    }

    /// Records one delivery outcome and advances the cursor.
    ///
    /// Cancellation is observed here, between recipients: once the flag is
    /// set, the step that was already in flight still counts, but no
    /// further recipient is handed out.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownBroadcast`] for an unknown job id.
    pub fn record_delivery(
        &mut self,
        id: BroadcastId,
        outcome: DeliveryOutcome,
        now: DateTime<Utc>,
    ) -> Result<BroadcastProgress, RaffleError> {
        let job = self
            .broadcasts
            .get_mut(&id)
            .ok_or(RaffleError::UnknownBroadcast(id))?;
        if job.is_finished() {
            return Ok(BroadcastProgress::Finished(job.report()));
        }

        job.cursor += 1;
        match outcome {
            DeliveryOutcome::Delivered => job.sent += 1,
            DeliveryOutcome::Failed => job.failed += 1,
        }

        if let Some(next) = job.next_recipient() {
            Ok(BroadcastProgress::Continue { next })
        } else {
            job.finished_at = Some(now);
            job.in_flight = false;
            Ok(BroadcastProgress::Finished(job.report()))
        }
    }

    /// Requests cancellation of a running broadcast.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownBroadcast`] for an unknown job id.
    pub fn cancel_broadcast(
        &mut self,
        id: BroadcastId,
        now: DateTime<Utc>,
    ) -> Result<CancelOutcome, RaffleError> {
        let job = self
            .broadcasts
            .get_mut(&id)
            .ok_or(RaffleError::UnknownBroadcast(id))?;

        if job.is_finished() {
            return Ok(CancelOutcome::Finished(job.report()));
        }
        job.cancelled = true;
        if job.in_flight {
            Ok(CancelOutcome::Flagged)
        } else {
            job.finished_at = Some(now);
            Ok(CancelOutcome::Finished(job.report()))
        }
    }

    /// Takes over an interrupted job after a restart. Returns the next
    /// recipient to deliver to, or `None` when nothing remains to do (also
    /// when a chain is already driving the job).
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::UnknownBroadcast`] for an unknown job id.
    pub fn resume_broadcast(
        &mut self,
        id: BroadcastId,
        now: DateTime<Utc>,
    ) -> Result<Option<UserId>, RaffleError> {
        let job = self
            .broadcasts
            .get_mut(&id)
            .ok_or(RaffleError::UnknownBroadcast(id))?;

        if job.is_finished() || job.in_flight {
            return Ok(None);
        }
        match job.next_recipient() {
            Some(next) => {
                job.in_flight = true;
                Ok(Some(next))
            }
            None => {
                job.finished_at = Some(now);
                Ok(None)
            }
        }
    }

    /// Jobs that have not reached a terminal state, in id order.
    #[must_use]
    pub fn unfinished_broadcasts(&self) -> Vec<BroadcastId> {
        self.broadcasts
            .values()
            .filter(|job| !job.is_finished())
            .map(|job| job.id)
            .collect()
    }

    // ------------------------------------------------------------------
    // Invariants
    // ------------------------------------------------------------------

    /// Checks that the model is internally consistent: every ticket number
    /// is either in the pool or owned by exactly one user, and the two sets
    /// partition `1..=capacity`. Run after reloading a snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`InvariantViolation`] describing the first inconsistency.
    pub fn validate(&self) -> Result<(), InvariantViolation> {
        let capacity = self.pool.capacity();
        let in_range = |t: TicketNumber| (1..=capacity).contains(&t.get());

        let mut assigned: BTreeSet<TicketNumber> = BTreeSet::new();
        for user in self.users.values() {
            for &ticket in &user.tickets {
                if !in_range(ticket) {
                    return Err(InvariantViolation(format!(
                        "user {} holds out-of-range ticket {ticket}",
                        user.id
                    )));
                }
                if !assigned.insert(ticket) {
                    return Err(InvariantViolation(format!(
                        "ticket {ticket} assigned more than once"
                    )));
                }
            }
        }

        let mut unassigned: BTreeSet<TicketNumber> = BTreeSet::new();
        for ticket in self.pool.unassigned() {
            if !in_range(ticket) {
                return Err(InvariantViolation(format!(
                    "pool holds out-of-range ticket {ticket}"
                )));
            }
            if !unassigned.insert(ticket) {
                return Err(InvariantViolation(format!(
                    "ticket {ticket} duplicated in the pool"
                )));
            }
            if assigned.contains(&ticket) {
                return Err(InvariantViolation(format!(
                    "ticket {ticket} both assigned and still in the pool"
                )));
            }
        }

        let covered = assigned.len() + unassigned.len();
        if covered != capacity as usize {
            return Err(InvariantViolation(format!(
                "{covered} tickets accounted for, capacity is {capacity}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::submission::{ReceiptKind, ReceiptRef};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid date")
    }

    fn receipt() -> ReceiptRef {
        ReceiptRef {
            file_id: "r".to_owned(),
            kind: ReceiptKind::Document,
        }
    }

    fn submit(state: &mut RaffleState, user: i64, quantity: u32) -> SubmissionId {
        let id = SubmissionId::new();
        state
            .submit_receipt(
                id,
                UserId::new(user),
                quantity,
                Money::new(50_000),
                receipt(),
                now(),
            )
            .expect("submission accepted");
        id
    }

    #[test]
    fn test_submission_creates_user_on_first_contact() {
        let mut state = RaffleState::new(10);
        submit(&mut state, 42, 1);
        assert!(state.users.contains_key(&UserId::new(42)));
    }

    #[test]
    fn test_pending_submission_blocks_a_second_one() {
        let mut state = RaffleState::new(10);
        let first = submit(&mut state, 42, 1);

        let result = state.submit_receipt(
            SubmissionId::new(),
            UserId::new(42),
            2,
            Money::new(50_000),
            receipt(),
            now(),
        );
        assert_eq!(
            result.err(),
            Some(RaffleError::SubmissionPending {
                user_id: UserId::new(42),
                submission_id: first,
            })
        );
    }

    #[test]
    fn test_zero_quantity_is_refused() {
        let state = RaffleState::new(10);
        assert_eq!(
            state.check_submittable(UserId::new(1), 0),
            Err(RaffleError::InvalidQuantity)
        );
    }

    #[test]
    fn test_resolution_happens_at_most_once() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 3);

        let resolution = state
            .resolve_approval(id, &GateOutcome::eligible(), now())
            .expect("first resolution succeeds");
        assert!(matches!(resolution, Resolution::Approved { .. }));

        assert_eq!(
            state
                .resolve_approval(id, &GateOutcome::eligible(), now())
                .err(),
            Some(RaffleError::AlreadyResolved(id))
        );
        assert_eq!(
            state.reject(id, "late".to_owned(), now()).err(),
            Some(RaffleError::AlreadyResolved(id))
        );
        assert_eq!(state.pool.remaining(), 7);
    }

    #[test]
    fn test_rejection_keeps_the_pool_intact() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 3);

        let resolution = state
            .reject(id, "unreadable".to_owned(), now())
            .expect("rejection succeeds");
        assert!(matches!(
            resolution,
            Resolution::Rejected {
                reason: RejectReason::Manual { .. },
                ..
            }
        ));
        assert_eq!(state.pool.remaining(), 10);
        assert_eq!(
            state.users.get(&UserId::new(42)).expect("user").tickets.len(),
            0
        );
    }

    #[test]
    fn test_ineligible_gate_outcome_rejects_without_allocation() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 3);

        let gate = GateOutcome {
            failing: vec![ChannelRequirement {
                id: ChannelId::new("@news"),
                title: "News".to_owned(),
                link: None,
                enabled: true,
            }],
        };
        let resolution = state
            .resolve_approval(id, &gate, now())
            .expect("resolution succeeds");
        assert!(matches!(
            resolution,
            Resolution::Rejected {
                reason: RejectReason::NotSubscribed { .. },
                ..
            }
        ));
        assert_eq!(state.pool.remaining(), 10);
    }

    #[test]
    fn test_insufficient_supply_resolves_to_rejection() {
        let mut state = RaffleState::new(2);
        let id = submit(&mut state, 42, 3);

        let resolution = state
            .resolve_approval(id, &GateOutcome::eligible(), now())
            .expect("resolution succeeds");
        assert_eq!(
            resolution,
            Resolution::Rejected {
                user_id: UserId::new(42),
                reason: RejectReason::InsufficientSupply {
                    requested: 3,
                    remaining: 2,
                },
            }
        );
        assert_eq!(state.pool.remaining(), 2);
        // The submission stays resolved: a retry is a fresh submission.
        assert!(!state.submission(id).expect("submission").is_pending());
    }

    #[test]
    fn test_approval_updates_buyer_aggregates() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 4);
        let _ = state.resolve_approval(id, &GateOutcome::eligible(), now());

        let user = state.users.get(&UserId::new(42)).expect("user");
        assert_eq!(user.purchases, 1);
        assert_eq!(user.total_spent, Money::new(200_000));
        assert_eq!(user.tickets.len(), 4);
    }

    #[test]
    fn test_channel_upsert_updates_in_place() {
        let mut state = RaffleState::new(10);
        state.upsert_channel(ChannelId::new("@a"), "A".to_owned(), None);
        state.upsert_channel(
            ChannelId::new("@a"),
            "A renamed".to_owned(),
            Some("https://t.me/a".to_owned()),
        );

        assert_eq!(state.channels.len(), 1);
        assert_eq!(state.channels[0].title, "A renamed");
        assert!(state.channels[0].enabled);
    }

    #[test]
    fn test_disabled_channel_leaves_the_enabled_snapshot() {
        let mut state = RaffleState::new(10);
        state.upsert_channel(ChannelId::new("@a"), "A".to_owned(), None);
        state.upsert_channel(ChannelId::new("@b"), "B".to_owned(), None);
        state
            .set_channel_enabled(&ChannelId::new("@a"), false)
            .expect("channel exists");

        let enabled = state.enabled_channels();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].id, ChannelId::new("@b"));
    }

    #[test]
    fn test_broadcast_snapshot_is_ascending_by_user_id() {
        let mut state = RaffleState::new(10);
        for id in [9, 3, 7] {
            state.register_user(UserId::new(id), None, None, now());
        }
        let job = state.start_broadcast(
            BroadcastId::new(),
            BroadcastContent {
                text: "hi".to_owned(),
                media: None,
            },
            now(),
        );
        let ids: Vec<i64> = job.recipients.iter().map(|u| u.as_i64()).collect();
        assert_eq!(ids, vec![3, 7, 9]);
        assert!(job.in_flight);
    }

    #[test]
    fn test_cancel_without_running_chain_finalizes_immediately() {
        let mut state = RaffleState::new(10);
        state.register_user(UserId::new(1), None, None, now());
        let id = BroadcastId::new();
        state.start_broadcast(
            id,
            BroadcastContent {
                text: "hi".to_owned(),
                media: None,
            },
            now(),
        );
        // Simulate a restart: the chain is gone, the flag is not persisted.
        state.broadcasts.get_mut(&id).expect("job").in_flight = false;

        let outcome = state.cancel_broadcast(id, now()).expect("job exists");
        assert!(matches!(outcome, CancelOutcome::Finished(report) if report.skipped == 1));
        assert!(state.broadcasts.get(&id).expect("job").is_finished());
    }

    #[test]
    fn test_resume_hands_out_the_cursor_recipient_once() {
        let mut state = RaffleState::new(10);
        for id in 1..=3 {
            state.register_user(UserId::new(id), None, None, now());
        }
        let id = BroadcastId::new();
        state.start_broadcast(
            id,
            BroadcastContent {
                text: "hi".to_owned(),
                media: None,
            },
            now(),
        );
        let _ = state.record_delivery(id, DeliveryOutcome::Delivered, now());
        state.broadcasts.get_mut(&id).expect("job").in_flight = false;

        let next = state.resume_broadcast(id, now()).expect("job exists");
        assert_eq!(next, Some(UserId::new(2)));
        // A second resume while the chain runs is a no-op.
        assert_eq!(state.resume_broadcast(id, now()).expect("job exists"), None);
    }

    #[test]
    fn test_validate_accepts_a_consistent_model() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 4);
        let _ = state.resolve_approval(id, &GateOutcome::eligible(), now());
        assert!(state.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_double_assignment() {
        let mut state = RaffleState::new(10);
        let id = submit(&mut state, 42, 2);
        let _ = state.resolve_approval(id, &GateOutcome::eligible(), now());

        let ticket = state.users.get(&UserId::new(42)).expect("user").tickets[0];
        let mut intruder = User::new(UserId::new(1), now());
        intruder.tickets.push(ticket);
        state.users.insert(UserId::new(1), intruder);
        assert!(state.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_ticket_both_assigned_and_pooled() {
        let mut state = RaffleState::new(10);
        let user = UserId::new(42);
        state.register_user(user, None, None, now());
        state
            .users
            .get_mut(&user)
            .expect("user")
            .tickets
            .push(TicketNumber::new(3));
        assert!(state.validate().is_err());
    }
}
