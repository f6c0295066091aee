//! Leveled voting for one round slot.
//!
//! Each volunteer's traffic lands in the round owning its slot. Leaders
//! first cast level-0 votes; once a volunteer holds a majority of votes a
//! leader may claim it at rank 0, and every majority of claims at rank `r`
//! lets a leader claim rank `r + 1` on a higher level. The round commits
//! when the [`CommitTracker`] sees a majority of leaders agree on two
//! sequential levels.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedvote_messages::{
    ElectionMessage, LeaderLevelMessage, PublishMessage, VolunteerMessage, VoteMessage,
};
use fedvote_types::{AuthSet, Identity, ProcessListLocation, RoundSlot};

use crate::commit_tracker::CommitTracker;
use crate::loop_detector::LoopDetector;
use crate::ConsensusError;

/// State of one round slot, owned by its [`Election`](crate::Election).
#[derive(Clone, Debug)]
pub struct Round {
    slot: RoundSlot,
    self_id: Identity,
    authset: Arc<AuthSet>,
    location: ProcessListLocation,
    /// Every volunteer seen in this round, from any message.
    volunteers: BTreeMap<Identity, VolunteerMessage>,
    /// Volunteer → leader → level-0 vote.
    votes: BTreeMap<Identity, BTreeMap<Identity, VoteMessage>>,
    /// Highest-level message per leader.
    latest: BTreeMap<Identity, LeaderLevelMessage>,
    tracker: CommitTracker,
    loops: LoopDetector,
    /// Lowest level the local node may issue next.
    next_level: u32,
    current_vote: Option<LeaderLevelMessage>,
    publish: Option<PublishMessage>,
}

impl Round {
    pub fn new(
        slot: RoundSlot,
        self_id: Identity,
        authset: Arc<AuthSet>,
        location: ProcessListLocation,
        loop_window: usize,
    ) -> Result<Self, ConsensusError> {
        if !slot.fits(authset.len()) {
            return Err(ConsensusError::SlotOutOfBounds {
                slot,
                roster: authset.len(),
            });
        }
        let tracker = CommitTracker::for_authset(&authset);
        Ok(Self {
            slot,
            self_id,
            authset,
            location,
            volunteers: BTreeMap::new(),
            votes: BTreeMap::new(),
            latest: BTreeMap::new(),
            tracker,
            loops: LoopDetector::new(loop_window),
            next_level: 1,
            current_vote: None,
            publish: None,
        })
    }

    /// Process one message and return everything the local node emits in
    /// response. Once committed, every call answers with the round's
    /// [`PublishMessage`].
    pub fn execute(&mut self, msg: &ElectionMessage) -> Result<Vec<ElectionMessage>, ConsensusError> {
        let kind = msg.kind();
        let volunteer = msg
            .volunteer()
            .ok_or(ConsensusError::MissingVolunteer { kind })?;
        let found = self.authset.round_slot(volunteer.signer);
        if found != self.slot {
            return Err(ConsensusError::WrongRound {
                expected: self.slot,
                found,
            });
        }
        if let ElectionMessage::LeaderLevel(ll) = msg {
            if ll.level <= ll.rank {
                return Err(ConsensusError::InvalidLevel {
                    signer: ll.signer,
                    level: ll.level,
                    rank: ll.rank,
                });
            }
        }

        if let Some(publish) = &self.publish {
            return Ok(vec![publish.clone().into()]);
        }
        if !self.authset.is_audit(volunteer.signer) {
            tracing::debug!(
                slot = %self.slot,
                volunteer = %volunteer.signer,
                "ignoring message for a volunteer that is not an audit server"
            );
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        match msg {
            ElectionMessage::Fault(_) => return Err(ConsensusError::MissingVolunteer { kind }),
            ElectionMessage::Volunteer(v) => self.on_volunteer(v, &mut out)?,
            ElectionMessage::Vote(v) => self.on_vote(v, &mut out)?,
            ElectionMessage::LeaderLevel(ll) => self.on_level(ll, &mut out)?,
            ElectionMessage::Publish(p) => self.adopt_publish(p, &mut out),
        }
        Ok(out)
    }

    fn is_leader(&self) -> bool {
        self.authset.is_leader(self.self_id)
    }

    fn remember(&mut self, volunteer: &VolunteerMessage) {
        self.volunteers
            .entry(volunteer.signer)
            .or_insert_with(|| volunteer.clone());
    }

    fn on_volunteer(
        &mut self,
        volunteer: &VolunteerMessage,
        out: &mut Vec<ElectionMessage>,
    ) -> Result<(), ConsensusError> {
        self.remember(volunteer);
        if !self.is_leader() {
            return Ok(());
        }
        let already_voted = self
            .votes
            .get(&volunteer.signer)
            .is_some_and(|backers| backers.contains_key(&self.self_id));
        if already_voted {
            tracing::trace!(slot = %self.slot, volunteer = %volunteer.signer, "already voted");
            return Ok(());
        }

        let vote = VoteMessage::new(self.self_id, volunteer.clone());
        tracing::debug!(slot = %self.slot, volunteer = %volunteer.signer, "casting vote");
        out.push(vote.clone().into());
        self.on_vote(&vote, out)
    }

    fn on_vote(&mut self, vote: &VoteMessage, out: &mut Vec<ElectionMessage>) -> Result<(), ConsensusError> {
        if !self.authset.is_leader(vote.signer) {
            tracing::debug!(slot = %self.slot, signer = %vote.signer, "ignoring vote from non-leader");
            return Ok(());
        }
        let volunteer = vote.volunteer.signer;
        let backers = self.votes.entry(volunteer).or_default();
        if backers.contains_key(&vote.signer) {
            tracing::trace!(slot = %self.slot, leader = %vote.signer, "duplicate vote");
            return Ok(());
        }
        backers.insert(vote.signer, vote.clone());
        let support = backers.len();
        self.remember(&vote.volunteer);

        if support >= self.authset.majority() {
            let mut candidate = self.candidate(volunteer, 0)?;
            candidate.votes = self
                .votes
                .get(&volunteer)
                .map(|backers| backers.values().cloned().collect())
                .unwrap_or_default();
            self.offer(candidate, out)?;
        }
        Ok(())
    }

    fn on_level(
        &mut self,
        msg: &LeaderLevelMessage,
        out: &mut Vec<ElectionMessage>,
    ) -> Result<(), ConsensusError> {
        if !self.authset.is_leader(msg.signer) {
            tracing::debug!(slot = %self.slot, signer = %msg.signer, "ignoring level from non-leader");
            return Ok(());
        }
        if self.loops.observe(msg) {
            tracing::warn!(
                slot = %self.slot,
                leader = %msg.signer,
                level = msg.level,
                "leader is alternating between two standings"
            );
        }
        self.remember(&msg.volunteer);
        let newer = self
            .latest
            .get(&msg.signer)
            .map_or(true, |prev| msg.level > prev.level);
        if newer {
            self.latest.insert(msg.signer, msg.clone());
        }

        if self.tracker.should_i_commit(msg) {
            if let Some(volunteer) = self.tracker.marker(msg.signer) {
                return self.commit(volunteer, out);
            }
        }

        for vote in msg.votes.iter().filter(|v| v.volunteer == msg.volunteer) {
            self.on_vote(vote, out)?;
            if self.publish.is_some() {
                return Ok(());
            }
        }
        self.offer_leveled(out)
    }

    /// Claim the strongest volunteer backed by a majority of leaders'
    /// latest messages.
    fn offer_leveled(&mut self, out: &mut Vec<ElectionMessage>) -> Result<(), ConsensusError> {
        if self.publish.is_some() || !self.is_leader() {
            return Ok(());
        }
        let majority = self.authset.majority();
        let mut ranks: BTreeMap<Identity, Vec<u32>> = BTreeMap::new();
        for ll in self.latest.values() {
            ranks.entry(ll.volunteer.signer).or_default().push(ll.rank);
        }

        let mut best: Option<LeaderLevelMessage> = None;
        for (volunteer, mut backing) in ranks {
            if backing.len() < majority {
                continue;
            }
            backing.sort_unstable_by(|a, b| b.cmp(a));
            let rank = next_rank(backing[majority - 1])?;
            let candidate = self.candidate(volunteer, rank)?;
            if best.as_ref().map_or(true, |b| b.is_weaker_than(&candidate)) {
                best = Some(candidate);
            }
        }
        match best {
            Some(candidate) => self.offer(candidate, out),
            None => Ok(()),
        }
    }

    fn candidate(&self, volunteer: Identity, rank: u32) -> Result<LeaderLevelMessage, ConsensusError> {
        let msg = self
            .volunteers
            .get(&volunteer)
            .cloned()
            .ok_or(ConsensusError::UnknownVolunteer(volunteer))?;
        let priority = self
            .authset
            .volunteer_priority(volunteer, &self.location)
            .unwrap_or(0);
        Ok(LeaderLevelMessage::new(self.self_id, rank, 0, priority, msg))
    }

    /// Reserve the next level for a message of `rank`. A level always
    /// exceeds its rank.
    fn take_level(&mut self, rank: u32) -> Result<u32, ConsensusError> {
        let level = if rank >= self.next_level {
            next_rank(rank)?
        } else {
            self.next_level
        };
        self.next_level = next_rank(level)?;
        Ok(level)
    }

    /// Issue `candidate` as the local vote if it is strictly stronger than
    /// the current one.
    fn offer(
        &mut self,
        mut candidate: LeaderLevelMessage,
        out: &mut Vec<ElectionMessage>,
    ) -> Result<(), ConsensusError> {
        if self.publish.is_some() || !self.is_leader() {
            return Ok(());
        }
        if let Some(current) = &self.current_vote {
            if !current.is_weaker_than(&candidate) {
                return Ok(());
            }
        }

        candidate.level = self.take_level(candidate.rank)?;
        tracing::debug!(
            slot = %self.slot,
            level = candidate.level,
            rank = candidate.rank,
            volunteer = %candidate.volunteer.signer,
            "issuing level"
        );
        self.current_vote = Some(candidate.clone());
        out.push(candidate.clone().into());
        self.on_level(&candidate, out)
    }

    fn commit(&mut self, volunteer: Identity, out: &mut Vec<ElectionMessage>) -> Result<(), ConsensusError> {
        let msg = self
            .volunteers
            .get(&volunteer)
            .cloned()
            .ok_or(ConsensusError::UnknownVolunteer(volunteer))?;

        if self.is_leader() {
            let top_rank = self
                .latest
                .values()
                .filter(|ll| ll.volunteer.signer == volunteer)
                .map(|ll| ll.rank)
                .max()
                .unwrap_or(0);
            let mut marker = self.candidate(volunteer, next_rank(top_rank)?)?;
            marker.level = self.take_level(marker.rank)?;
            marker.committed = true;
            self.current_vote = Some(marker.clone());
            out.push(marker.into());
        }

        let publish = PublishMessage::new(msg);
        tracing::info!(slot = %self.slot, volunteer = %volunteer, "round committed");
        self.publish = Some(publish.clone());
        out.push(publish.into());
        Ok(())
    }

    fn adopt_publish(&mut self, publish: &PublishMessage, out: &mut Vec<ElectionMessage>) {
        self.remember(&publish.volunteer);
        self.publish = Some(publish.clone());
        out.push(publish.clone().into());
    }

    pub fn slot(&self) -> RoundSlot {
        self.slot
    }

    /// The local node's latest leveled vote in this round.
    pub fn current_vote(&self) -> Option<&LeaderLevelMessage> {
        self.current_vote.as_ref()
    }

    pub fn publish(&self) -> Option<&PublishMessage> {
        self.publish.as_ref()
    }

    pub fn is_committed(&self) -> bool {
        self.publish.is_some()
    }

    /// Number of level-0 votes recorded for `volunteer`.
    pub fn vote_count(&self, volunteer: Identity) -> usize {
        self.votes.get(&volunteer).map_or(0, BTreeMap::len)
    }

    pub fn latest(&self, leader: Identity) -> Option<&LeaderLevelMessage> {
        self.latest.get(&leader)
    }

    pub fn tracker(&self) -> &CommitTracker {
        &self.tracker
    }

    pub fn loop_detector(&self) -> &LoopDetector {
        &self.loops
    }
}

fn next_rank(value: u32) -> Result<u32, ConsensusError> {
    value
        .checked_add(1)
        .ok_or(ConsensusError::LevelOverflow { rank: value })
}
