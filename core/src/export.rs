//! Read-only export view of approved purchases.
//!
//! The spreadsheet collaborator consumes these rows; how they are formatted
//! into a workbook is its business, not the core's.

use crate::state::RaffleState;
use crate::submission::SubmissionStatus;
use crate::types::{Money, SubmissionId, TicketNumber, UserId};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One approved purchase, flattened for export.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExportRow {
    /// The approved submission.
    pub submission_id: SubmissionId,
    /// The buyer.
    pub user_id: UserId,
    /// Buyer display name, if known.
    pub full_name: Option<String>,
    /// Buyer platform handle, if known.
    pub username: Option<String>,
    /// Buyer phone number, if shared.
    pub phone_number: Option<String>,
    /// Tickets purchased in this submission.
    pub quantity: u32,
    /// The allocated ticket numbers, ascending.
    pub tickets: Vec<TicketNumber>,
    /// Amount paid.
    pub amount: Money,
    /// When the purchase was approved.
    pub resolved_at: DateTime<Utc>,
}

/// All approved purchases, oldest approval first.
#[must_use]
pub fn ticket_rows(state: &RaffleState) -> Vec<ExportRow> {
    let mut rows: Vec<ExportRow> = state
        .submissions
        .values()
        .filter_map(|submission| {
            let SubmissionStatus::Approved {
                tickets,
                resolved_at,
            } = &submission.status
            else {
                return None;
            };
            let user = state.users.get(&submission.user_id);
            Some(ExportRow {
                submission_id: submission.id,
                user_id: submission.user_id,
                full_name: user.and_then(|u| u.full_name.clone()),
                username: user.and_then(|u| u.username.clone()),
                phone_number: user.and_then(|u| u.phone_number.clone()),
                quantity: submission.quantity,
                tickets: tickets.clone(),
                amount: submission.amount(),
                resolved_at: *resolved_at,
            })
        })
        .collect();
    rows.sort_by_key(|row| row.resolved_at);
    rows
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]

    use super::*;
    use crate::gate::GateOutcome;
    use crate::submission::{ReceiptKind, ReceiptRef};
    use chrono::TimeZone;

    #[test]
    fn test_rows_cover_only_approved_submissions() {
        let now = Utc
            .with_ymd_and_hms(2025, 6, 1, 12, 0, 0)
            .single()
            .expect("valid date");
        let mut state = RaffleState::new(50);
        state.register_user(
            UserId::new(1),
            Some("alice".to_owned()),
            Some("Alice".to_owned()),
            now,
        );

        let approved = SubmissionId::new();
        let receipt = ReceiptRef {
            file_id: "r".to_owned(),
            kind: ReceiptKind::Photo,
        };
        state
            .submit_receipt(approved, UserId::new(1), 2, Money::new(50_000), receipt.clone(), now)
            .expect("submission accepted");
        state
            .resolve_approval(approved, &GateOutcome::eligible(), now)
            .expect("resolution succeeds");

        let rejected = SubmissionId::new();
        state
            .submit_receipt(rejected, UserId::new(2), 1, Money::new(50_000), receipt, now)
            .expect("submission accepted");
        state
            .reject(rejected, "no".to_owned(), now)
            .expect("rejection succeeds");

        let rows = ticket_rows(&state);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].submission_id, approved);
        assert_eq!(rows[0].username.as_deref(), Some("alice"));
        assert_eq!(rows[0].quantity, 2);
        assert_eq!(rows[0].tickets.len(), 2);
        assert_eq!(rows[0].amount, Money::new(100_000));
    }
}
