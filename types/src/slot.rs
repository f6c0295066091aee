//! Round slots: the deterministic partition of volunteer identities.

use crate::Identity;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Bucket owning the leveled-voting state for a volunteer.
///
/// Computed as `volunteer mod roster_size`, so every participant maps a
/// volunteer's traffic to the same round without coordinating.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RoundSlot(usize);

impl RoundSlot {
    /// Slot of `volunteer` in a roster of `roster_size` servers.
    ///
    /// Returns `None` for an empty roster.
    pub fn for_volunteer(volunteer: Identity, roster_size: usize) -> Option<Self> {
        if roster_size == 0 {
            return None;
        }
        let slot = volunteer.as_u64() % roster_size as u64;
        Some(Self(slot as usize))
    }

    pub fn index(self) -> usize {
        self.0
    }

    /// Whether the slot addresses a round inside a roster of `roster_size`.
    pub fn fits(self, roster_size: usize) -> bool {
        self.0 < roster_size
    }
}

impl fmt::Display for RoundSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}
