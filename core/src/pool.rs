//! The fixed pool of numbered raffle tickets.

use crate::error::RaffleError;
use crate::types::TicketNumber;
use serde::{Deserialize, Serialize};

/// Fixed pool of tickets `1..=capacity`.
///
/// Only the unassigned numbers are stored, as a plain vector so a random
/// draw removes in O(1) via swap-remove. The remaining count is always the
/// vector length, never a separately maintained counter that could drift
/// from the truth.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketPool {
    capacity: u32,
    unassigned: Vec<TicketNumber>,
}

impl TicketPool {
    /// Creates a fresh pool with every number `1..=capacity` unassigned.
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            capacity,
            unassigned: (1..=capacity).map(TicketNumber::new).collect(),
        }
    }

    /// Total number of tickets this raffle sells.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Tickets still available for allocation.
    #[allow(clippy::cast_possible_truncation)] // unassigned never exceeds capacity: u32
    #[must_use]
    pub fn remaining(&self) -> u32 {
        self.unassigned.len() as u32
    }

    /// Tickets already allocated, derived from the remaining count.
    #[must_use]
    pub fn assigned(&self) -> u32 {
        self.capacity - self.remaining()
    }

    /// Whether a particular number is still in the pool.
    #[must_use]
    pub fn is_unassigned(&self, number: TicketNumber) -> bool {
        self.unassigned.contains(&number)
    }

    /// Iterates over the unassigned numbers in pool order.
    pub fn unassigned(&self) -> impl Iterator<Item = TicketNumber> + '_ {
        self.unassigned.iter().copied()
    }

    /// Draws `quantity` distinct numbers uniformly at random from the live
    /// unassigned set and removes them from the pool.
    ///
    /// The drawn numbers are returned in ascending order. The draw is
    /// all-or-nothing: on error the pool is untouched.
    ///
    /// # Errors
    ///
    /// Returns [`RaffleError::InsufficientSupply`] when `quantity` exceeds
    /// the remaining count.
    pub fn draw(&mut self, quantity: u32) -> Result<Vec<TicketNumber>, RaffleError> {
        let remaining = self.remaining();
        if quantity > remaining {
            return Err(RaffleError::InsufficientSupply {
                requested: quantity,
                remaining,
            });
        }

        let mut rng = rand::thread_rng();
        let mut indices =
            rand::seq::index::sample(&mut rng, self.unassigned.len(), quantity as usize).into_vec();
        // Remove highest index first so earlier removals do not shift later ones.
        indices.sort_unstable_by(|a, b| b.cmp(a));

        let mut drawn: Vec<TicketNumber> = indices
            .into_iter()
            .map(|index| self.unassigned.swap_remove(index))
            .collect();
        drawn.sort_unstable();
        Ok(drawn)
    }
}
