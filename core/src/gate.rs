//! The channel gate: mandatory-subscription checks against the membership
//! oracle.

use crate::providers::MembershipOracle;
use crate::state::ChannelRequirement;
use crate::types::{ChannelId, UserId};

/// Result of evaluating the enabled channel requirements for one user.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GateOutcome {
    /// Requirements the user does not currently satisfy. Carried whole so
    /// the transport can render titles and invite links in join prompts.
    pub failing: Vec<ChannelRequirement>,
}

impl GateOutcome {
    /// An outcome with no failing requirements.
    #[must_use]
    pub const fn eligible() -> Self {
        Self {
            failing: Vec::new(),
        }
    }

    /// Whether every enabled requirement passed.
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        self.failing.is_empty()
    }

    /// Ids of the failing channels, for rejection records.
    #[must_use]
    pub fn missing_channel_ids(&self) -> Vec<ChannelId> {
        self.failing.iter().map(|c| c.id.clone()).collect()
    }
}

/// Evaluates the given requirements against the live membership oracle.
///
/// Every purchase attempt and every admin approval runs this afresh over a
/// snapshot of the *currently* enabled requirements; outcomes are never
/// cached. An oracle failure counts as not-a-member (fail closed), since an
/// unverifiable subscription must not unlock a purchase.
pub async fn evaluate(
    oracle: &dyn MembershipOracle,
    user_id: UserId,
    requirements: &[ChannelRequirement],
) -> GateOutcome {
    let mut failing = Vec::new();
    for requirement in requirements.iter().filter(|r| r.enabled) {
        match oracle.is_member(user_id, &requirement.id).await {
            Ok(true) => {}
            Ok(false) => failing.push(requirement.clone()),
            Err(error) => {
                tracing::warn!(
                    %user_id,
                    channel = %requirement.id,
                    %error,
                    "membership lookup failed, treating as not subscribed"
                );
                failing.push(requirement.clone());
            }
        }
    }
    GateOutcome { failing }
}
