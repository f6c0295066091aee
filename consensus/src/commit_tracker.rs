//! Commit-safety detection over leaders' leveled votes.
//!
//! A leader's history is "complete" once its two most recent levels are
//! sequential and name the same volunteer; the leader's commit marker then
//! points at that volunteer. A round may commit once a majority of leaders
//! carry the same marker.

use std::collections::BTreeMap;

use fedvote_messages::LeaderLevelMessage;
use fedvote_types::{AuthSet, Identity};

use crate::vote_history::{HistoryUpdate, LeaderVoteHistory};

/// Tracks per-leader vote histories and a live tally of commit markers.
#[derive(Clone, Debug)]
pub struct CommitTracker {
    majority: usize,
    histories: BTreeMap<Identity, LeaderVoteHistory>,
    /// Leader → volunteer its history currently agrees on (`None` = incomplete).
    markers: BTreeMap<Identity, Option<Identity>>,
    /// Volunteer → number of leaders whose marker names it.
    tallies: BTreeMap<Identity, usize>,
}

impl CommitTracker {
    pub fn new(majority: usize) -> Self {
        Self {
            majority,
            histories: BTreeMap::new(),
            markers: BTreeMap::new(),
            tallies: BTreeMap::new(),
        }
    }

    pub fn for_authset(authset: &AuthSet) -> Self {
        Self::new(authset.majority())
    }

    /// Feed `msg` into its signer's history and report whether the
    /// signer's marker is now shared by at least a majority of leaders.
    ///
    /// Duplicate and conflicting levels leave the tracker unchanged.
    pub fn should_i_commit(&mut self, msg: &LeaderLevelMessage) -> bool {
        let leader = msg.signer;
        let update = self.histories.entry(leader).or_default().add(msg);
        match update {
            HistoryUpdate::Duplicate => {
                tracing::trace!(leader = %leader, level = msg.level, "duplicate level ignored");
            }
            HistoryUpdate::Conflicting { stored } => {
                tracing::warn!(
                    leader = %leader,
                    level = msg.level,
                    stored = %stored,
                    offered = %msg.volunteer.signer,
                    "leader issued two messages for one level"
                );
            }
            HistoryUpdate::Complete(volunteer) => self.set_marker(leader, Some(volunteer)),
            HistoryUpdate::Incomplete => self.set_marker(leader, None),
        }

        match self.marker(leader) {
            Some(volunteer) => self.tally(volunteer) >= self.majority,
            None => false,
        }
    }

    fn set_marker(&mut self, leader: Identity, marker: Option<Identity>) {
        let previous = self.markers.insert(leader, marker).flatten();
        if previous == marker {
            return;
        }
        if let Some(old) = previous {
            if let Some(count) = self.tallies.get_mut(&old) {
                *count = count.saturating_sub(1);
            }
        }
        if let Some(new) = marker {
            *self.tallies.entry(new).or_insert(0) += 1;
        }
    }

    /// Volunteer `leader`'s history currently agrees on.
    pub fn marker(&self, leader: Identity) -> Option<Identity> {
        self.markers.get(&leader).copied().flatten()
    }

    /// Number of leaders whose marker names `volunteer`.
    pub fn tally(&self, volunteer: Identity) -> usize {
        self.tallies.get(&volunteer).copied().unwrap_or(0)
    }

    pub fn majority(&self) -> usize {
        self.majority
    }

    pub fn history(&self, leader: Identity) -> Option<&LeaderVoteHistory> {
        self.histories.get(&leader)
    }
}
