//! Flip-flop detection for leaders alternating between two standings.
//!
//! Purely diagnostic: a looping leader is reported, never excluded.

use std::collections::{BTreeMap, BTreeSet};

use fedvote_messages::LeaderLevelMessage;
use fedvote_types::Identity;

use crate::config::MIN_LOOP_WINDOW;

#[derive(Clone, Debug)]
pub struct LoopDetector {
    window: usize,
    /// Leader → level → (rank, volunteer priority), newest `window` levels.
    standings: BTreeMap<Identity, BTreeMap<u32, (u32, u32)>>,
    looping: BTreeSet<Identity>,
}

impl LoopDetector {
    /// Windows below [`MIN_LOOP_WINDOW`] are raised to it.
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(MIN_LOOP_WINDOW),
            standings: BTreeMap::new(),
            looping: BTreeSet::new(),
        }
    }

    /// Record `msg` and return true if its signer has just started looping.
    pub fn observe(&mut self, msg: &LeaderLevelMessage) -> bool {
        let levels = self.standings.entry(msg.signer).or_default();
        if levels.contains_key(&msg.level) {
            return false;
        }
        levels.insert(msg.level, msg.standing());
        while levels.len() > self.window {
            levels.pop_first();
        }

        let alternating = levels.len() == self.window && {
            let seq: Vec<(u32, u32)> = levels.values().copied().collect();
            seq[0] != seq[1] && (2..seq.len()).all(|i| seq[i] == seq[i - 2])
        };
        if alternating {
            self.looping.insert(msg.signer)
        } else {
            self.looping.remove(&msg.signer);
            false
        }
    }

    pub fn is_looping(&self, leader: Identity) -> bool {
        self.looping.contains(&leader)
    }

    pub fn looping_leaders(&self) -> impl Iterator<Item = Identity> + '_ {
        self.looping.iter().copied()
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Default for LoopDetector {
    fn default() -> Self {
        Self::new(4)
    }
}
