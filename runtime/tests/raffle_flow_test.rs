//! End-to-end payment workflow tests through the store runtime.
//!
//! These drive real actions through `RaffleStore` (reducer, snapshot
//! persistence and effect feedback included) with mock collaborators.

#![allow(clippy::expect_used, clippy::panic)]

use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;
use tombola_core::submission::{ReceiptKind, ReceiptRef, RejectReason, SubmissionStatus};
use tombola_core::types::{ChannelId, Money, SubmissionId, TicketNumber, UserId};
use tombola_core::{RaffleAction, RaffleEnvironment, RaffleReducer};
use tombola_runtime::{JsonFilePersister, RaffleStore};
use tombola_testing::{MockOracle, MockTransport, test_clock};

struct Harness {
    store: RaffleStore,
    oracle: MockOracle,
    _dir: TempDir,
}

async fn harness(capacity: u32) -> Harness {
    let dir = tempfile::tempdir().expect("tempdir");
    let transport = MockTransport::new();
    let oracle = MockOracle::new();
    let env = RaffleEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(transport),
        Arc::new(oracle.clone()),
    );
    let persister = Arc::new(JsonFilePersister::new(dir.path().join("store.json")));
    let store = RaffleStore::open(
        persister,
        capacity,
        RaffleReducer::new(Money::new(50_000)),
        env,
    )
    .await
    .expect("store opens");
    Harness {
        store,
        oracle,
        _dir: dir,
    }
}

fn receipt() -> ReceiptRef {
    ReceiptRef {
        file_id: "receipt".to_owned(),
        kind: ReceiptKind::Photo,
    }
}

async fn submit(h: &Harness, user: i64, quantity: u32) -> SubmissionId {
    h.store
        .send(RaffleAction::SubmitReceipt {
            user_id: UserId::new(user),
            quantity,
            receipt: receipt(),
        })
        .await
        .expect("send succeeds");
    h.store.quiesce().await;
    h.store
        .state(move |s| s.pending_submission_of(UserId::new(user)).map(|sub| sub.id))
        .await
        .expect("submission is pending")
}

async fn approve(h: &Harness, submission_id: SubmissionId) {
    h.store
        .send(RaffleAction::Approve { submission_id })
        .await
        .expect("send succeeds");
    h.store.quiesce().await;
}

#[tokio::test]
async fn test_approval_allocates_exactly_the_requested_quantity() {
    let h = harness(300).await;
    let id = submit(&h, 10, 5).await;
    approve(&h, id).await;

    let (status, remaining) = h
        .store
        .state(move |s| {
            (
                s.submission(id).map(|sub| sub.status.clone()),
                s.pool.remaining(),
            )
        })
        .await;
    let Some(SubmissionStatus::Approved { tickets, .. }) = status else {
        panic!("submission not approved: {status:?}");
    };
    assert_eq!(tickets.len(), 5);
    assert!(tickets.iter().all(|t| (1..=300).contains(&t.get())));
    assert_eq!(remaining, 295);
}

#[tokio::test]
async fn test_replayed_decision_is_a_noop() {
    let h = harness(300).await;
    let id = submit(&h, 10, 5).await;
    approve(&h, id).await;
    assert_eq!(h.store.state(|s| s.pool.remaining()).await, 295);

    // Replay the approval and pile a rejection on top.
    approve(&h, id).await;
    h.store
        .send(RaffleAction::Reject {
            submission_id: id,
            note: "late".to_owned(),
        })
        .await
        .expect("send succeeds");
    h.store.quiesce().await;

    assert_eq!(h.store.state(|s| s.pool.remaining()).await, 295);
    assert!(
        h.store
            .state(move |s| s.submission(id).map(tombola_core::submission::Submission::is_approved))
            .await
            .expect("submission exists")
    );
}

#[tokio::test]
async fn test_concurrent_approvals_never_duplicate_a_ticket() {
    let h = harness(60).await;

    let mut ids = Vec::new();
    for user in 1..=10 {
        ids.push(submit(&h, user, 3).await);
    }

    let handles: Vec<_> = ids
        .iter()
        .map(|&submission_id| {
            let store = h.store.clone();
            tokio::spawn(async move {
                store
                    .send(RaffleAction::Approve { submission_id })
                    .await
                    .expect("send succeeds");
            })
        })
        .collect();
    for handle in handles {
        handle.await.expect("approval task completes");
    }
    h.store.quiesce().await;

    let state = h.store.state(Clone::clone).await;
    let mut all_tickets: Vec<TicketNumber> = Vec::new();
    for user in state.users.values() {
        all_tickets.extend(user.tickets.iter().copied());
    }
    let distinct: HashSet<_> = all_tickets.iter().copied().collect();
    assert_eq!(all_tickets.len(), 30, "sum of approved quantities");
    assert_eq!(distinct.len(), 30, "no ticket issued twice");
    assert_eq!(state.pool.remaining(), 30);
    assert!(state.validate().is_ok());
    assert!(state.submissions.values().all(|s| s.is_approved()));
}

#[tokio::test]
async fn test_exhausted_pool_rejects_and_preserves_assignments() {
    let h = harness(1).await;
    let first = submit(&h, 1, 1).await;
    approve(&h, first).await;
    let assigned_before = h
        .store
        .state(|s| s.users.values().flat_map(|u| u.tickets.clone()).collect::<Vec<_>>())
        .await;
    assert_eq!(h.store.state(|s| s.pool.remaining()).await, 0);

    let second = submit(&h, 2, 1).await;
    approve(&h, second).await;

    let state = h.store.state(Clone::clone).await;
    let submission = state.submission(second).expect("submission exists");
    assert!(matches!(
        submission.status,
        SubmissionStatus::Rejected {
            reason: RejectReason::InsufficientSupply {
                requested: 1,
                remaining: 0
            },
            ..
        }
    ));
    let assigned_after: Vec<_> = state.users.values().flat_map(|u| u.tickets.clone()).collect();
    assert_eq!(assigned_before, assigned_after);
    assert_eq!(state.pool.remaining(), 0);
}

#[tokio::test]
async fn test_subscription_lapse_rejects_at_decision_time() {
    let h = harness(300).await;
    let buyer = UserId::new(10);
    let channel = ChannelId::new("@news");

    h.store
        .send(RaffleAction::AddChannel {
            id: channel.clone(),
            title: "News".to_owned(),
            link: None,
        })
        .await
        .expect("send succeeds");
    h.oracle.join(buyer, channel.clone()).await;

    let id = submit(&h, 10, 2).await;

    // Subscription lapses between submission and decision.
    h.oracle.leave(buyer, &channel).await;
    approve(&h, id).await;

    let state = h.store.state(Clone::clone).await;
    let submission = state.submission(id).expect("submission exists");
    assert!(matches!(
        &submission.status,
        SubmissionStatus::Rejected {
            reason: RejectReason::NotSubscribed { missing },
            ..
        } if missing == &vec![channel.clone()]
    ));
    assert_eq!(state.pool.remaining(), 300);
}

#[tokio::test]
async fn test_disabling_a_channel_unblocks_the_next_decision() {
    let h = harness(300).await;
    let channel = ChannelId::new("@news");

    h.store
        .send(RaffleAction::AddChannel {
            id: channel.clone(),
            title: "News".to_owned(),
            link: None,
        })
        .await
        .expect("send succeeds");

    // The buyer is not subscribed, but the requirement gets disabled
    // before the decision, so the gate no longer evaluates it.
    h.oracle.join(UserId::new(10), channel.clone()).await;
    let id = submit(&h, 10, 1).await;
    h.oracle.leave(UserId::new(10), &channel).await;
    h.store
        .send(RaffleAction::SetChannelEnabled {
            id: channel,
            enabled: false,
        })
        .await
        .expect("send succeeds");

    approve(&h, id).await;
    assert!(
        h.store
            .state(move |s| s.submission(id).map(tombola_core::submission::Submission::is_approved))
            .await
            .expect("submission exists")
    );
}

#[tokio::test]
async fn test_oracle_outage_fails_closed() {
    let h = harness(300).await;
    let channel = ChannelId::new("@news");

    h.store
        .send(RaffleAction::AddChannel {
            id: channel.clone(),
            title: "News".to_owned(),
            link: None,
        })
        .await
        .expect("send succeeds");
    h.oracle.join(UserId::new(10), channel).await;
    let id = submit(&h, 10, 1).await;

    h.oracle.set_failing(true);
    approve(&h, id).await;

    let submission = h
        .store
        .state(move |s| s.submission(id).cloned())
        .await
        .expect("submission exists");
    assert!(matches!(
        submission.status,
        SubmissionStatus::Rejected {
            reason: RejectReason::NotSubscribed { .. },
            ..
        }
    ));
}
