//! Read models over the raffle state for admin dashboards.
//!
//! Pure functions over `&RaffleState`; nothing here ever mutates. Numbers
//! are recomputed from the entities on every call: sold counts, revenue
//! and averages are views, not stored counters.

use crate::state::RaffleState;
use crate::types::{Money, UserId};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Quick headline figures for the admin menu.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Summary {
    /// Pool capacity.
    pub total_tickets: u32,
    /// Tickets allocated so far.
    pub sold: u32,
    /// Tickets still available.
    pub remaining: u32,
    /// Submissions awaiting a decision.
    pub pending_count: usize,
    /// Revenue across approved submissions.
    pub revenue: Money,
}

/// Headline figures of the raffle.
#[must_use]
pub fn summary(state: &RaffleState) -> Summary {
    let revenue = state
        .submissions
        .values()
        .filter(|s| s.is_approved())
        .map(crate::submission::Submission::amount)
        .sum();
    Summary {
        total_tickets: state.pool.capacity(),
        sold: state.pool.assigned(),
        remaining: state.pool.remaining(),
        pending_count: state
            .submissions
            .values()
            .filter(|s| s.is_pending())
            .count(),
        revenue,
    }
}

/// One of the biggest buyers, for the leaderboard.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TopUser {
    /// The buyer.
    pub user_id: UserId,
    /// Display name, if known.
    pub full_name: Option<String>,
    /// Platform handle, if known.
    pub username: Option<String>,
    /// Tickets owned.
    pub tickets: u32,
    /// Aggregate spend.
    pub spent: Money,
}

/// Detailed statistics for the admin stats screen.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DetailedStats {
    /// Pool capacity.
    pub total_tickets: u32,
    /// Tickets still available.
    pub remaining_tickets: u32,
    /// Tickets sold across all users.
    pub tickets_sold: u32,
    /// Revenue across approved submissions.
    pub total_revenue: Money,
    /// Claimed value of submissions still pending.
    pub pending_amount: Money,
    /// Submissions awaiting a decision.
    pub pending_count: usize,
    /// Approved submissions.
    pub approved_count: usize,
    /// Rejected submissions.
    pub rejected_count: usize,
    /// Users ever seen.
    pub total_users: usize,
    /// Users active in the last 24 hours.
    pub active_users_24h: usize,
    /// Users first seen in the last 24 hours.
    pub new_users_24h: usize,
    /// Approved purchases across all users.
    pub total_purchases: u32,
    /// Mean tickets per known user.
    pub avg_tickets_per_user: f64,
    /// Mean spend per known user.
    pub avg_spend_per_user: f64,
    /// Top five buyers by ticket count, spend as tie-breaker.
    pub top_users: Vec<TopUser>,
}

/// Computes the detailed statistics as of `now`.
#[allow(clippy::cast_precision_loss)] // averages are informational
#[must_use]
pub fn detailed_stats(state: &RaffleState, now: DateTime<Utc>) -> DetailedStats {
    let day_ago = now - Duration::hours(24);

    let total_users = state.users.len();
    let active_users_24h = state
        .users
        .values()
        .filter(|u| u.last_active >= day_ago)
        .count();
    let new_users_24h = state
        .users
        .values()
        .filter(|u| u.first_seen >= day_ago)
        .count();

    #[allow(clippy::cast_possible_truncation)] // bounded by pool capacity
    let tickets_sold: u32 = state
        .users
        .values()
        .map(|u| u.tickets.len() as u32)
        .sum();
    let total_revenue: Money = state.users.values().map(|u| u.total_spent).sum();
    let total_purchases: u32 = state.users.values().map(|u| u.purchases).sum();

    let pending: Vec<_> = state
        .submissions
        .values()
        .filter(|s| s.is_pending())
        .collect();
    let pending_amount = pending.iter().map(|s| s.amount()).sum();
    let approved_count = state
        .submissions
        .values()
        .filter(|s| s.is_approved())
        .count();
    let rejected_count = state.submissions.len() - approved_count - pending.len();

    let mut top_users: Vec<TopUser> = state
        .users
        .values()
        .filter(|u| !u.tickets.is_empty())
        .map(|u| {
            #[allow(clippy::cast_possible_truncation)] // bounded by pool capacity
            let tickets = u.tickets.len() as u32;
            TopUser {
                user_id: u.id,
                full_name: u.full_name.clone(),
                username: u.username.clone(),
                tickets,
                spent: u.total_spent,
            }
        })
        .collect();
    top_users.sort_by(|a, b| (b.tickets, b.spent).cmp(&(a.tickets, a.spent)));
    top_users.truncate(5);

    let (avg_tickets_per_user, avg_spend_per_user) = if total_users == 0 {
        (0.0, 0.0)
    } else {
        (
            f64::from(tickets_sold) / total_users as f64,
            total_revenue.units() as f64 / total_users as f64,
        )
    };

    DetailedStats {
        total_tickets: state.pool.capacity(),
        remaining_tickets: state.pool.remaining(),
        tickets_sold,
        total_revenue,
        pending_amount,
        pending_count: pending.len(),
        approved_count,
        rejected_count,
        total_users,
        active_users_24h,
        new_users_24h,
        total_purchases,
        avg_tickets_per_user,
        avg_spend_per_user,
        top_users,
    }
}
