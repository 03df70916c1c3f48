//! Raffle bot demo binary.
//!
//! Wires the raffle core to console adapters: opens (or initializes) the
//! durable store, resumes any broadcast interrupted by a previous run,
//! walks a fresh store through a full purchase lifecycle, and prints the
//! admin views.

mod config;
mod transport;

use crate::config::Settings;
use crate::transport::{AllowAllOracle, ConsoleTransport};
use std::sync::Arc;
use tombola_core::broadcast::BroadcastContent;
use tombola_core::submission::{ReceiptKind, ReceiptRef};
use tombola_core::types::UserId;
use tombola_core::{RaffleAction, RaffleEnvironment, RaffleReducer, SystemClock, analytics, export};
use tombola_runtime::{JsonFilePersister, RaffleStore};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tombola_bot=info,tombola_runtime=info,tombola_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    tracing::info!(
        store = %settings.store_path.display(),
        total_tickets = settings.total_tickets,
        price = %settings.ticket_price,
        prize = %settings.prize_name,
        card = %settings.card_number,
        "starting raffle"
    );

    let environment = RaffleEnvironment::new(
        Arc::new(SystemClock),
        Arc::new(ConsoleTransport),
        Arc::new(AllowAllOracle),
    );
    let store = RaffleStore::open(
        Arc::new(JsonFilePersister::new(&settings.store_path)),
        settings.total_tickets,
        RaffleReducer::new(settings.ticket_price),
        environment,
    )
    .await?;

    // Pick up where an interrupted run left off.
    for job_id in store.unfinished_broadcasts().await {
        tracing::info!(%job_id, "resuming interrupted broadcast");
        store.send(RaffleAction::ResumeBroadcast { job_id }).await?;
    }

    if store.state(|s| s.users.is_empty()).await {
        walkthrough(&store).await?;
    }
    store.quiesce().await;

    let summary = store.state(analytics::summary).await;
    println!("summary: {}", serde_json::to_string_pretty(&summary)?);

    let now = tombola_core::Utc::now();
    let stats = store.state(move |s| analytics::detailed_stats(s, now)).await;
    println!("stats: {}", serde_json::to_string_pretty(&stats)?);

    let rows = store.state(export::ticket_rows).await;
    println!("export rows: {}", serde_json::to_string_pretty(&rows)?);

    Ok(())
}

/// Drives a fresh store through one full purchase lifecycle and a
/// broadcast, so every moving part shows up in the log once.
async fn walkthrough(store: &RaffleStore) -> anyhow::Result<()> {
    println!("=== fresh store: running a demo purchase lifecycle ===");

    for (id, name) in [(1001, "Aziza"), (1002, "Bobur"), (1003, "Kamola")] {
        store
            .send(RaffleAction::RegisterUser {
                user_id: UserId::new(id),
                username: None,
                full_name: Some(name.to_owned()),
            })
            .await?;
    }

    store
        .send(RaffleAction::SubmitReceipt {
            user_id: UserId::new(1001),
            quantity: 3,
            receipt: ReceiptRef {
                file_id: "demo-receipt".to_owned(),
                kind: ReceiptKind::Photo,
            },
        })
        .await?;
    store.quiesce().await;

    let submission_id = store
        .state(|s| s.pending_submission_of(UserId::new(1001)).map(|sub| sub.id))
        .await;
    if let Some(submission_id) = submission_id {
        store.send(RaffleAction::Approve { submission_id }).await?;
        store.quiesce().await;
    }

    store
        .send(RaffleAction::StartBroadcast {
            content: BroadcastContent {
                text: "The draw happens this Friday!".to_owned(),
                media: None,
            },
        })
        .await?;
    store.quiesce().await;
    Ok(())
}
