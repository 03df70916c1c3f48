//! Durability: restart identity, rollback on write failure, corruption
//! detection.

#![allow(clippy::expect_used, clippy::panic)]

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use tombola_core::submission::{ReceiptKind, ReceiptRef};
use tombola_core::types::{Money, TicketNumber, UserId};
use tombola_core::{RaffleAction, RaffleEnvironment, RaffleReducer, RaffleState};
use tombola_runtime::persist::{JsonFilePersister, PersistError, Persister};
use tombola_runtime::{RaffleStore, StoreError};
use tombola_testing::{MockOracle, MockTransport, test_clock};

fn environment() -> RaffleEnvironment {
    RaffleEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(MockTransport::new()),
        Arc::new(MockOracle::new()),
    )
}

async fn open_store(dir: &TempDir) -> RaffleStore {
    let persister = Arc::new(JsonFilePersister::new(dir.path().join("store.json")));
    RaffleStore::open(
        persister,
        300,
        RaffleReducer::new(Money::new(50_000)),
        environment(),
    )
    .await
    .expect("store opens")
}

fn receipt() -> ReceiptRef {
    ReceiptRef {
        file_id: "receipt".to_owned(),
        kind: ReceiptKind::Document,
    }
}

/// Persister that can be switched into a failing mode mid-test.
struct FlakyPersister {
    inner: JsonFilePersister,
    failing: AtomicBool,
}

impl FlakyPersister {
    fn new(inner: JsonFilePersister) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl Persister for FlakyPersister {
    async fn load(&self) -> Result<Option<RaffleState>, PersistError> {
        self.inner.load().await
    }

    async fn save(&self, state: &RaffleState) -> Result<(), PersistError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PersistError::Io(std::io::Error::other("disk full")));
        }
        self.inner.save(state).await
    }
}

#[tokio::test]
async fn test_opening_a_fresh_store_writes_the_initial_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let _store = open_store(&dir).await;
    assert!(dir.path().join("store.json").exists());
}

#[tokio::test]
async fn test_restart_reproduces_an_identical_snapshot() {
    let dir = tempfile::tempdir().expect("tempdir");
    let store = open_store(&dir).await;

    // Some realistic traffic: registrations, a decided purchase, a channel.
    store
        .send(RaffleAction::RegisterUser {
            user_id: UserId::new(7),
            username: Some("bobur".to_owned()),
            full_name: Some("Bobur K.".to_owned()),
        })
        .await
        .expect("send succeeds");
    store
        .send(RaffleAction::SubmitReceipt {
            user_id: UserId::new(7),
            quantity: 3,
            receipt: receipt(),
        })
        .await
        .expect("send succeeds");
    store.quiesce().await;
    let submission_id = store
        .state(|s| s.pending_submission_of(UserId::new(7)).map(|sub| sub.id))
        .await
        .expect("submission pending");
    store
        .send(RaffleAction::Approve { submission_id })
        .await
        .expect("send succeeds");
    store
        .send(RaffleAction::AddChannel {
            id: tombola_core::types::ChannelId::new("@news"),
            title: "News".to_owned(),
            link: None,
        })
        .await
        .expect("send succeeds");
    store.quiesce().await;

    let before = store.state(Clone::clone).await;
    drop(store);

    let reopened = open_store(&dir).await;
    let after = reopened.state(Clone::clone).await;
    assert_eq!(before, after);
}

#[tokio::test]
async fn test_failed_write_rolls_back_and_the_action_is_retryable() {
    let dir = tempfile::tempdir().expect("tempdir");
    let persister = Arc::new(FlakyPersister::new(JsonFilePersister::new(
        dir.path().join("store.json"),
    )));
    let store = RaffleStore::open(
        Arc::clone(&persister) as Arc<dyn Persister>,
        300,
        RaffleReducer::new(Money::new(50_000)),
        environment(),
    )
    .await
    .expect("store opens");

    store
        .send(RaffleAction::RegisterUser {
            user_id: UserId::new(1),
            username: None,
            full_name: None,
        })
        .await
        .expect("send succeeds");

    persister.failing.store(true, Ordering::SeqCst);
    let result = store
        .send(RaffleAction::RegisterUser {
            user_id: UserId::new(2),
            username: None,
            full_name: None,
        })
        .await;
    assert!(matches!(result, Err(StoreError::Persistence(_))));
    // The failed mutation left no trace in memory.
    assert_eq!(store.state(|s| s.users.len()).await, 1);

    // The initiator retries once persistence recovers.
    persister.failing.store(false, Ordering::SeqCst);
    store
        .send(RaffleAction::RegisterUser {
            user_id: UserId::new(2),
            username: None,
            full_name: None,
        })
        .await
        .expect("retry succeeds");
    assert_eq!(store.state(|s| s.users.len()).await, 2);
}

#[tokio::test]
async fn test_corrupt_snapshot_is_refused_on_open() {
    let dir = tempfile::tempdir().expect("tempdir");
    let persister = JsonFilePersister::new(dir.path().join("store.json"));

    // A model where ticket 3 is owned by a user yet still in the pool.
    let mut state = RaffleState::new(10);
    state.register_user(UserId::new(1), None, None, test_clock_now());
    state
        .users
        .get_mut(&UserId::new(1))
        .expect("user exists")
        .tickets
        .push(TicketNumber::new(3));
    persister.save(&state).await.expect("save succeeds");

    let result = RaffleStore::open(
        Arc::new(persister),
        10,
        RaffleReducer::new(Money::new(50_000)),
        environment(),
    )
    .await;
    assert!(matches!(result, Err(StoreError::Corrupt(_))));
}

fn test_clock_now() -> chrono::DateTime<chrono::Utc> {
    use tombola_core::environment::Clock;
    test_clock().now()
}
