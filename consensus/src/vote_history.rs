//! Per-leader history of the most recent leveled votes.

use fedvote_messages::LeaderLevelMessage;
use fedvote_types::Identity;

/// Number of levels a history retains.
pub const HISTORY_DEPTH: usize = 2;

/// Outcome of adding a level message to a [`LeaderVoteHistory`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum HistoryUpdate {
    /// The level was already stored for the same volunteer.
    Duplicate,
    /// The level was already stored for a different volunteer; the stored
    /// entry is kept.
    Conflicting { stored: Identity },
    /// The two retained levels are sequential and name this volunteer.
    Complete(Identity),
    /// The message was recorded but the history does not show agreement.
    Incomplete,
}

/// The last [`HISTORY_DEPTH`] levels a leader issued, highest first.
///
/// No two entries share a level. Adding a message below both retained
/// levels is a no-op for a full history.
#[derive(Clone, Debug, Default)]
pub struct LeaderVoteHistory {
    entries: Vec<(u32, Identity)>,
}

impl LeaderVoteHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, msg: &LeaderLevelMessage) -> HistoryUpdate {
        let volunteer = msg.volunteer.signer;
        if let Some(&(_, stored)) = self.entries.iter().find(|(level, _)| *level == msg.level) {
            return if stored == volunteer {
                HistoryUpdate::Duplicate
            } else {
                HistoryUpdate::Conflicting { stored }
            };
        }

        self.entries.push((msg.level, volunteer));
        self.entries.sort_unstable_by(|a, b| b.0.cmp(&a.0));
        self.entries.truncate(HISTORY_DEPTH);
        self.status()
    }

    /// Agreement status of the retained levels.
    pub fn status(&self) -> HistoryUpdate {
        match self.entries.as_slice() {
            [(high, a), (low, b)] if *high == low + 1 && a == b => HistoryUpdate::Complete(*a),
            _ => HistoryUpdate::Incomplete,
        }
    }

    /// Retained `(level, volunteer)` pairs, highest level first.
    pub fn entries(&self) -> &[(u32, Identity)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
