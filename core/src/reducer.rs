//! The raffle reducer: business logic as a pure function over state.

use crate::action::RaffleAction;
use crate::broadcast::{BroadcastContent, DeliveryOutcome};
use crate::effect::Effect;
use crate::environment::RaffleEnvironment;
use crate::error::RaffleError;
use crate::gate::{self, GateOutcome};
use crate::providers::{AdminNotification, Notification, RefusalReason};
use crate::state::{BroadcastProgress, CancelOutcome, ChannelRequirement, RaffleState, Resolution};
use crate::types::{BroadcastId, Money, SubmissionId, UserId};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

/// The Reducer trait - core abstraction for business logic.
///
/// Reducers are pure functions: `(State, Action, Environment) → (State,
/// Effects)`. One call is one store mutation; the returned effects run only
/// after the mutation has durably committed.
pub trait Reducer {
    /// The state type this reducer operates on.
    type State;

    /// The action type this reducer processes.
    type Action;

    /// The environment type with injected dependencies.
    type Environment;

    /// Reduce an action into state changes and effects.
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]>;
}

/// Reducer for the raffle: payment workflow, channel gate orchestration,
/// and broadcast delivery.
#[derive(Clone, Copy, Debug)]
pub struct RaffleReducer {
    /// Price of a single ticket, recorded on each submission at submission
    /// time.
    ticket_price: Money,
}

impl RaffleReducer {
    /// Creates a reducer selling tickets at the given unit price.
    #[must_use]
    pub const fn new(ticket_price: Money) -> Self {
        Self { ticket_price }
    }
}

type Effects = SmallVec<[Effect<RaffleAction>; 4]>;

/// Best-effort user notification. Failure is logged, never propagated: the
/// state change it reports has already committed.
fn notify(env: &RaffleEnvironment, user_id: UserId, notification: Notification) -> Effect<RaffleAction> {
    let transport = Arc::clone(&env.transport);
    Effect::future(async move {
        if let Err(error) = transport.notify(user_id, notification).await {
            tracing::warn!(%user_id, %error, "user notification failed");
        }
        None
    })
}

/// Best-effort admin notification.
fn notify_admin(env: &RaffleEnvironment, notification: AdminNotification) -> Effect<RaffleAction> {
    let transport = Arc::clone(&env.transport);
    Effect::future(async move {
        if let Err(error) = transport.notify_admin(notification).await {
            tracing::warn!(%error, "admin notification failed");
        }
        None
    })
}

/// Evaluates the channel gate outside the store lock and feeds the outcome
/// back as the action built by `wrap`.
fn check_gate<F>(
    env: &RaffleEnvironment,
    user_id: UserId,
    requirements: Vec<ChannelRequirement>,
    wrap: F,
) -> Effect<RaffleAction>
where
    F: FnOnce(GateOutcome) -> RaffleAction + Send + 'static,
{
    let oracle = Arc::clone(&env.oracle);
    Effect::future(async move {
        let outcome = gate::evaluate(oracle.as_ref(), user_id, &requirements).await;
        Some(wrap(outcome))
    })
}

/// Sends one broadcast message and feeds the outcome back as a
/// [`RaffleAction::BroadcastStep`].
fn deliver(
    env: &RaffleEnvironment,
    job_id: BroadcastId,
    recipient: UserId,
    content: BroadcastContent,
) -> Effect<RaffleAction> {
    let transport = Arc::clone(&env.transport);
    Effect::future(async move {
        let outcome = match transport
            .notify(recipient, Notification::Broadcast { content })
            .await
        {
            Ok(()) => DeliveryOutcome::Delivered,
            Err(error) => {
                tracing::warn!(%recipient, %error, "broadcast delivery failed, skipping recipient");
                DeliveryOutcome::Failed
            }
        };
        Some(RaffleAction::BroadcastStep {
            job_id,
            recipient,
            outcome,
        })
    })
}

impl Reducer for RaffleReducer {
    type State = RaffleState;
    type Action = RaffleAction;
    type Environment = RaffleEnvironment;

    #[allow(clippy::too_many_lines)] // one arm per action keeps the flow readable
    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> Effects {
        let now = env.clock.now();
        match action {
            RaffleAction::RegisterUser {
                user_id,
                username,
                full_name,
            } => {
                state.register_user(user_id, username, full_name, now);
                smallvec![Effect::None]
            }

            RaffleAction::SubmitReceipt {
                user_id,
                quantity,
                receipt,
            } => match state.check_submittable(user_id, quantity) {
                Ok(()) => smallvec![check_gate(
                    env,
                    user_id,
                    state.enabled_channels(),
                    move |outcome| RaffleAction::ReceiptGateChecked {
                        user_id,
                        quantity,
                        receipt,
                        outcome,
                    },
                )],
                Err(error) => {
                    tracing::info!(%user_id, %error, "receipt refused");
                    smallvec![notify(
                        env,
                        user_id,
                        Notification::SubmissionRefused {
                            reason: refusal_reason(&error),
                        },
                    )]
                }
            },

            RaffleAction::ReceiptGateChecked {
                user_id,
                quantity,
                receipt,
                outcome,
            } => {
                if !outcome.is_eligible() {
                    return smallvec![notify(
                        env,
                        user_id,
                        Notification::JoinChannels {
                            channels: outcome.failing,
                        },
                    )];
                }
                let id = SubmissionId::new();
                // Re-validated here: another submission may have landed
                // while the oracle round trip was in flight.
                match state.submit_receipt(id, user_id, quantity, self.ticket_price, receipt, now) {
                    Ok(submission) => {
                        let amount = submission.amount();
                        smallvec![
                            notify(
                                env,
                                user_id,
                                Notification::ReceiptReceived { submission_id: id },
                            ),
                            notify_admin(
                                env,
                                AdminNotification::ReceiptPending {
                                    submission_id: id,
                                    user_id,
                                    quantity,
                                    amount,
                                },
                            ),
                        ]
                    }
                    Err(error) => {
                        tracing::info!(%user_id, %error, "receipt refused after gate check");
                        smallvec![notify(
                            env,
                            user_id,
                            Notification::SubmissionRefused {
                                reason: refusal_reason(&error),
                            },
                        )]
                    }
                }
            }

            RaffleAction::Approve { submission_id } => match state.submission(submission_id) {
                None => {
                    tracing::warn!(%submission_id, "approval for unknown submission ignored");
                    smallvec![Effect::None]
                }
                Some(submission) if !submission.is_pending() => {
                    // Decision replay; deliberately a no-op on state.
                    tracing::warn!(%submission_id, "submission already resolved, approval ignored");
                    smallvec![Effect::None]
                }
                Some(submission) => {
                    let user_id = submission.user_id;
                    smallvec![check_gate(
                        env,
                        user_id,
                        state.enabled_channels(),
                        move |outcome| RaffleAction::ApprovalGateChecked {
                            submission_id,
                            outcome,
                        },
                    )]
                }
            },

            RaffleAction::ApprovalGateChecked {
                submission_id,
                outcome,
            } => match state.resolve_approval(submission_id, &outcome, now) {
                Ok(Resolution::Approved { user_id, tickets }) => {
                    tracing::info!(%submission_id, %user_id, count = tickets.len(), "purchase approved");
                    smallvec![notify(
                        env,
                        user_id,
                        Notification::TicketsAllocated {
                            submission_id,
                            tickets,
                        },
                    )]
                }
                Ok(Resolution::Rejected { user_id, reason }) => {
                    tracing::info!(%submission_id, %user_id, ?reason, "purchase rejected at approval");
                    smallvec![notify(
                        env,
                        user_id,
                        Notification::PurchaseRejected {
                            submission_id,
                            reason,
                        },
                    )]
                }
                Err(RaffleError::AlreadyResolved(_)) => {
                    tracing::warn!(%submission_id, "submission resolved while gate check ran, no-op");
                    smallvec![Effect::None]
                }
                Err(error) => {
                    tracing::error!(%submission_id, %error, "approval could not be resolved");
                    smallvec![Effect::None]
                }
            },

            RaffleAction::Reject {
                submission_id,
                note,
            } => match state.reject(submission_id, note, now) {
                Ok(Resolution::Rejected { user_id, reason }) => {
                    tracing::info!(%submission_id, %user_id, "purchase rejected");
                    smallvec![notify(
                        env,
                        user_id,
                        Notification::PurchaseRejected {
                            submission_id,
                            reason,
                        },
                    )]
                }
                Ok(Resolution::Approved { .. }) => {
                    // reject() can only produce rejections.
                    smallvec![Effect::None]
                }
                Err(error) => {
                    tracing::warn!(%submission_id, %error, "rejection ignored");
                    smallvec![Effect::None]
                }
            },

            RaffleAction::SubmitPhone { user_id, phone } => {
                if let Err(error) = state.set_phone(user_id, phone, now) {
                    tracing::warn!(%user_id, %error, "phone submission ignored");
                }
                smallvec![Effect::None]
            }

            RaffleAction::CheckSubscription { user_id } => {
                smallvec![check_gate(
                    env,
                    user_id,
                    state.enabled_channels(),
                    move |outcome| RaffleAction::SubscriptionChecked { user_id, outcome },
                )]
            }

            RaffleAction::SubscriptionChecked { user_id, outcome } => {
                let notification = if outcome.is_eligible() {
                    Notification::SubscriptionConfirmed
                } else {
                    Notification::JoinChannels {
                        channels: outcome.failing,
                    }
                };
                smallvec![notify(env, user_id, notification)]
            }

            RaffleAction::AddChannel { id, title, link } => {
                tracing::info!(channel = %id, "channel requirement added");
                state.upsert_channel(id, title, link);
                smallvec![Effect::None]
            }

            RaffleAction::RemoveChannel { id } => {
                if let Err(error) = state.remove_channel(&id) {
                    tracing::warn!(channel = %id, %error, "channel removal ignored");
                }
                smallvec![Effect::None]
            }

            RaffleAction::SetChannelEnabled { id, enabled } => {
                if let Err(error) = state.set_channel_enabled(&id, enabled) {
                    tracing::warn!(channel = %id, %error, "channel toggle ignored");
                }
                smallvec![Effect::None]
            }

            RaffleAction::StartBroadcast { content } => {
                let id = BroadcastId::new();
                let job = state.start_broadcast(id, content, now);
                tracing::info!(job_id = %id, recipients = job.recipients.len(), "broadcast started");
                match job.next_recipient() {
                    Some(first) => {
                        let content = job.content.clone();
                        smallvec![deliver(env, id, first, content)]
                    }
                    None => smallvec![notify_admin(
                        env,
                        AdminNotification::BroadcastFinished {
                            job_id: id,
                            report: job.report(),
                        },
                    )],
                }
            }

            RaffleAction::BroadcastStep {
                job_id,
                recipient,
                outcome,
            } => {
                tracing::debug!(%job_id, %recipient, ?outcome, "broadcast step recorded");
                match state.record_delivery(job_id, outcome, now) {
                    Ok(BroadcastProgress::Continue { next }) => {
                        let content = state
                            .broadcasts
                            .get(&job_id)
                            .map(|job| job.content.clone());
                        match content {
                            Some(content) => smallvec![deliver(env, job_id, next, content)],
                            None => smallvec![Effect::None],
                        }
                    }
                    Ok(BroadcastProgress::Finished(report)) => {
                        tracing::info!(%job_id, ?report, "broadcast finished");
                        smallvec![notify_admin(
                            env,
                            AdminNotification::BroadcastFinished { job_id, report },
                        )]
                    }
                    Err(error) => {
                        tracing::warn!(%job_id, %error, "broadcast step for unknown job ignored");
                        smallvec![Effect::None]
                    }
                }
            }

            RaffleAction::CancelBroadcast { job_id } => {
                match state.cancel_broadcast(job_id, now) {
                    Ok(CancelOutcome::Flagged) => {
                        tracing::info!(%job_id, "broadcast cancellation requested");
                        smallvec![Effect::None]
                    }
                    Ok(CancelOutcome::Finished(report)) => {
                        tracing::info!(%job_id, ?report, "broadcast cancelled");
                        smallvec![notify_admin(
                            env,
                            AdminNotification::BroadcastFinished { job_id, report },
                        )]
                    }
                    Err(error) => {
                        tracing::warn!(%job_id, %error, "broadcast cancellation ignored");
                        smallvec![Effect::None]
                    }
                }
            }

            RaffleAction::ResumeBroadcast { job_id } => {
                match state.resume_broadcast(job_id, now) {
                    Ok(Some(next)) => {
                        let content = state
                            .broadcasts
                            .get(&job_id)
                            .map(|job| job.content.clone());
                        match content {
                            Some(content) => {
                                tracing::info!(%job_id, "broadcast resumed");
                                smallvec![deliver(env, job_id, next, content)]
                            }
                            None => smallvec![Effect::None],
                        }
                    }
                    Ok(None) => smallvec![Effect::None],
                    Err(error) => {
                        tracing::warn!(%job_id, %error, "broadcast resume ignored");
                        smallvec![Effect::None]
                    }
                }
            }
        }
    }
}

/// Maps a pre-review validation error to its user-facing refusal reason.
fn refusal_reason(error: &RaffleError) -> RefusalReason {
    match error {
        RaffleError::InvalidQuantity => RefusalReason::InvalidQuantity,
        _ => RefusalReason::AlreadyPending,
    }
}
