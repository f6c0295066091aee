//! Election state machine: agrees on the replacement for one faulted leader.
//!
//! An election is created per (location, fault). Traffic is routed to the
//! [`Round`] owning the volunteer's slot; the first round to commit moves
//! the election from Working to Publishing, a terminal state. While
//! Publishing, a lower-slot publish still supersedes the held one so every
//! participant converges on the same answer.

use std::collections::BTreeMap;
use std::sync::Arc;

use fedvote_messages::{ElectionMessage, FaultMsg, LeaderLevelMessage, PublishMessage, VolunteerMessage};
use fedvote_types::{AuthSet, Identity, ProcessListLocation, RoundSlot};
use serde::{Deserialize, Serialize};

use crate::config::ElectionConfig;
use crate::round::Round;
use crate::ConsensusError;

/// The lifecycle state of an election.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ElectionState {
    /// Rounds are still voting.
    Working,
    /// A round committed. Terminal state.
    Publishing,
}

/// Per-fault coordinator owning one [`Round`] per active slot.
#[derive(Clone, Debug)]
pub struct Election {
    self_id: Identity,
    authset: Arc<AuthSet>,
    location: ProcessListLocation,
    config: ElectionConfig,
    state: ElectionState,
    rounds: BTreeMap<RoundSlot, Round>,
    publishing_round: Option<RoundSlot>,
    publish: Option<PublishMessage>,
    fault: Option<FaultMsg>,
}

impl Election {
    pub fn new(
        self_id: Identity,
        authset: Arc<AuthSet>,
        location: ProcessListLocation,
        config: ElectionConfig,
    ) -> Self {
        tracing::debug!(
            node = %self_id,
            location = %location,
            roster = %authset.digest(),
            "election started"
        );
        Self {
            self_id,
            authset,
            location,
            config,
            state: ElectionState::Working,
            rounds: BTreeMap::new(),
            publishing_round: None,
            publish: None,
            fault: None,
        }
    }

    /// Process one inbound message and return the local node's responses.
    ///
    /// Malformed messages (wrong location, wrong slot, no volunteer, a level
    /// not above its rank) are rejected before any state changes.
    /// [`ConsensusError::LevelOverflow`] can only surface after the message
    /// that exhausted the level space has been recorded.
    pub fn execute_msg(&mut self, msg: &ElectionMessage) -> Result<Vec<ElectionMessage>, ConsensusError> {
        if msg.location() != &self.location {
            return Err(ConsensusError::LocationMismatch {
                expected: self.location,
                found: *msg.location(),
            });
        }

        match msg {
            ElectionMessage::Fault(fault) => self.on_fault(fault),
            ElectionMessage::Publish(publish) => {
                self.adopt(publish);
                Ok(self.publish_answer())
            }
            _ => self.route(msg),
        }
    }

    fn on_fault(&mut self, fault: &FaultMsg) -> Result<Vec<ElectionMessage>, ConsensusError> {
        if !self.authset.is_leader(fault.faulted) {
            tracing::warn!(
                faulted = %fault.faulted,
                signer = %fault.signer,
                "fault names a server that is not federated"
            );
            return Ok(self.publish_answer());
        }
        if self.fault.is_some() {
            tracing::trace!(signer = %fault.signer, "fault already recorded");
            return Ok(self.publish_answer());
        }

        // An audit whose slot is below the published one can still win.
        let own_slot = self.authset.round_slot(self.self_id);
        if !self.authset.is_audit(self.self_id) || !self.is_live(own_slot) {
            self.fault = Some(fault.clone());
            return Ok(self.publish_answer());
        }

        let volunteer = ElectionMessage::from(VolunteerMessage::new(self.self_id, fault.clone()));
        let answer = self.route(&volunteer)?;
        self.fault = Some(fault.clone());
        tracing::info!(node = %self.self_id, faulted = %fault.faulted, "volunteering");
        let mut out = vec![volunteer];
        out.extend(answer);
        Ok(out)
    }

    /// Whether traffic for `slot` is still processed.
    fn is_live(&self, slot: RoundSlot) -> bool {
        self.publishing_round.map_or(true, |published| slot < published)
    }

    fn route(&mut self, msg: &ElectionMessage) -> Result<Vec<ElectionMessage>, ConsensusError> {
        let volunteer = msg
            .volunteer()
            .ok_or(ConsensusError::MissingVolunteer { kind: msg.kind() })?;
        let slot = self.authset.round_slot(volunteer.signer);
        if !self.is_live(slot) {
            tracing::trace!(slot = %slot, "dropping message for settled round");
            return Ok(self.publish_answer());
        }

        let mut out = match self.rounds.get_mut(&slot) {
            Some(round) => round.execute(msg)?,
            None => {
                let mut round = Round::new(
                    slot,
                    self.self_id,
                    Arc::clone(&self.authset),
                    self.location,
                    self.config.loop_window,
                )?;
                let out = round.execute(msg)?;
                self.rounds.insert(slot, round);
                out
            }
        };

        if let Some(publish) = out.iter().find_map(ElectionMessage::as_publish).cloned() {
            self.adopt(&publish);
        }
        if let Some(publish) = &self.publish {
            let answer = ElectionMessage::from(publish.clone());
            if !out.contains(&answer) {
                out.push(answer);
            }
        }
        Ok(out)
    }

    /// Hold whichever of the current and offered publish has the lower slot.
    fn adopt(&mut self, publish: &PublishMessage) {
        let volunteer = publish.volunteer.signer;
        if !self.authset.is_audit(volunteer) {
            tracing::debug!(volunteer = %volunteer, "ignoring publish for a server that is not an audit");
            return;
        }
        let slot = self.authset.round_slot(volunteer);
        match self.publishing_round {
            None => {
                tracing::info!(slot = %slot, volunteer = %volunteer, "election published");
            }
            Some(held) if slot < held => {
                tracing::info!(
                    slot = %slot,
                    superseded = %held,
                    volunteer = %volunteer,
                    "lower round supersedes published answer"
                );
            }
            Some(_) => return,
        }
        self.publishing_round = Some(slot);
        self.publish = Some(publish.clone());
        self.state = ElectionState::Publishing;
    }

    fn publish_answer(&self) -> Vec<ElectionMessage> {
        self.publish.iter().cloned().map(ElectionMessage::from).collect()
    }

    pub fn state(&self) -> ElectionState {
        self.state
    }

    pub fn is_publishing(&self) -> bool {
        self.state == ElectionState::Publishing
    }

    /// The authoritative answer once publishing.
    pub fn publish(&self) -> Option<&PublishMessage> {
        self.publish.as_ref()
    }

    pub fn publishing_round(&self) -> Option<RoundSlot> {
        self.publishing_round
    }

    pub fn fault(&self) -> Option<&FaultMsg> {
        self.fault.as_ref()
    }

    pub fn round(&self, slot: RoundSlot) -> Option<&Round> {
        self.rounds.get(&slot)
    }

    /// The local node's latest leveled vote in `slot`.
    pub fn current_vote(&self, slot: RoundSlot) -> Option<&LeaderLevelMessage> {
        self.rounds.get(&slot).and_then(Round::current_vote)
    }

    /// Leaders flagged as alternating in any round, without duplicates.
    pub fn looping_leaders(&self) -> Vec<Identity> {
        let mut leaders: Vec<Identity> = self
            .rounds
            .values()
            .flat_map(|r| r.loop_detector().looping_leaders())
            .collect();
        leaders.sort_unstable();
        leaders.dedup();
        leaders
    }

    pub fn config(&self) -> &ElectionConfig {
        &self.config
    }

    pub fn self_id(&self) -> Identity {
        self.self_id
    }

    pub fn authset(&self) -> &AuthSet {
        &self.authset
    }

    pub fn location(&self) -> &ProcessListLocation {
        &self.location
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedvote_messages::VoteMessage;

    fn authset() -> Arc<AuthSet> {
        let mut builder = AuthSet::builder();
        for id in 0..5u64 {
            builder = builder.federated(id);
        }
        for id in 5..8u64 {
            builder = builder.audit(id);
        }
        Arc::new(builder.build().unwrap())
    }

    fn loc() -> ProcessListLocation {
        ProcessListLocation::new(2, 7, 1_000)
    }

    fn fault() -> FaultMsg {
        FaultMsg::new(Identity::new(1), Identity::new(4), loc())
    }

    fn volunteer(id: u64) -> VolunteerMessage {
        VolunteerMessage::new(Identity::new(id), fault())
    }

    fn publish_of(id: u64) -> ElectionMessage {
        PublishMessage::new(volunteer(id)).into()
    }

    fn election(self_id: u64) -> Election {
        Election::new(Identity::new(self_id), authset(), loc(), ElectionConfig::default())
    }

    fn level(leader: u64, level: u32, vol: u64) -> ElectionMessage {
        LeaderLevelMessage::new(Identity::new(leader), level - 1, level, 1, volunteer(vol)).into()
    }

    #[test]
    fn starts_working() {
        let e = election(0);
        assert_eq!(e.state(), ElectionState::Working);
        assert!(e.publish().is_none());
    }

    #[test]
    fn audit_answers_fault_with_volunteer() {
        let mut e = election(5);
        let out = e.execute_msg(&fault().into()).unwrap();
        assert_eq!(out, vec![ElectionMessage::from(volunteer(5))]);
        assert_eq!(e.fault(), Some(&fault()));
        // Recorded once.
        assert!(e.execute_msg(&fault().into()).unwrap().is_empty());
    }

    #[test]
    fn leader_records_fault_silently() {
        let mut e = election(0);
        assert!(e.execute_msg(&fault().into()).unwrap().is_empty());
        assert!(e.fault().is_some());
    }

    #[test]
    fn fault_naming_a_non_leader_is_ignored() {
        let mut e = election(5);
        let bogus = FaultMsg::new(Identity::new(1), Identity::new(6), loc());
        assert!(e.execute_msg(&bogus.into()).unwrap().is_empty());
        assert!(e.fault().is_none());
    }

    #[test]
    fn leader_votes_for_volunteer() {
        let mut e = election(0);
        let out = e.execute_msg(&volunteer(5).into()).unwrap();
        assert_eq!(
            out,
            vec![ElectionMessage::from(VoteMessage::new(Identity::new(0), volunteer(5)))]
        );
        let slot = e.authset().round_slot(Identity::new(5));
        assert_eq!(e.round(slot).unwrap().vote_count(Identity::new(5)), 1);
    }

    #[test]
    fn round_commit_latches_publishing() {
        let mut e = election(100);
        for leader in 0..3 {
            e.execute_msg(&level(leader, 4, 6)).unwrap();
            e.execute_msg(&level(leader, 5, 6)).unwrap();
        }
        assert!(e.is_publishing());
        assert_eq!(e.publish().map(|p| p.volunteer.signer), Some(Identity::new(6)));
        assert_eq!(e.publishing_round().map(RoundSlot::index), Some(6));
    }

    #[test]
    fn publishing_is_terminal() {
        let mut e = election(0);
        e.execute_msg(&publish_of(6)).unwrap();
        assert!(e.is_publishing());

        let answers = [
            e.execute_msg(&fault().into()).unwrap(),
            e.execute_msg(&volunteer(6).into()).unwrap(),
            e.execute_msg(&volunteer(7).into()).unwrap(),
            e.execute_msg(&level(2, 9, 7)).unwrap(),
        ];
        for answer in answers {
            assert_eq!(answer, vec![publish_of(6)]);
        }
        assert_eq!(e.state(), ElectionState::Publishing);
    }

    #[test]
    fn lower_slot_publish_supersedes() {
        let mut e = election(100);
        assert_eq!(e.execute_msg(&publish_of(7)).unwrap(), vec![publish_of(7)]);
        assert_eq!(e.execute_msg(&publish_of(5)).unwrap(), vec![publish_of(5)]);
        assert_eq!(e.execute_msg(&publish_of(6)).unwrap(), vec![publish_of(5)]);
        assert_eq!(e.publishing_round().map(RoundSlot::index), Some(5));
    }

    #[test]
    fn lower_slot_traffic_is_still_processed_while_publishing() {
        let mut e = election(0);
        e.execute_msg(&publish_of(7)).unwrap();
        let out = e.execute_msg(&volunteer(5).into()).unwrap();
        assert_eq!(
            out,
            vec![
                ElectionMessage::from(VoteMessage::new(Identity::new(0), volunteer(5))),
                publish_of(7),
            ]
        );
    }

    #[test]
    fn lower_round_commit_replaces_publish() {
        let mut e = election(100);
        e.execute_msg(&publish_of(7)).unwrap();
        for leader in 0..3 {
            e.execute_msg(&level(leader, 4, 5)).unwrap();
            e.execute_msg(&level(leader, 5, 5)).unwrap();
        }
        assert_eq!(e.publish().map(|p| p.volunteer.signer), Some(Identity::new(5)));
    }

    #[test]
    fn lower_slot_audit_volunteers_after_publish() {
        let mut e = election(5);
        e.execute_msg(&publish_of(6)).unwrap();
        let out = e.execute_msg(&fault().into()).unwrap();
        assert_eq!(out, vec![ElectionMessage::from(volunteer(5)), publish_of(6)]);
        assert!(e.fault().is_some());
        let slot = e.authset().round_slot(Identity::new(5));
        assert!(e.round(slot).is_some());
    }

    #[test]
    fn higher_slot_audit_stays_quiet_after_publish() {
        let mut e = election(7);
        e.execute_msg(&publish_of(6)).unwrap();
        assert_eq!(e.execute_msg(&fault().into()).unwrap(), vec![publish_of(6)]);
        assert!(e.fault().is_some());
        assert!(e.round(e.authset().round_slot(Identity::new(7))).is_none());
    }

    #[test]
    fn rejected_message_leaves_no_round_behind() {
        let mut e = election(0);
        let bad = LeaderLevelMessage::new(Identity::new(1), 3, 3, 1, volunteer(5));
        let err = e.execute_msg(&bad.into()).unwrap_err();
        assert!(matches!(err, ConsensusError::InvalidLevel { .. }));
        assert!(e.round(e.authset().round_slot(Identity::new(5))).is_none());
    }

    #[test]
    fn location_mismatch_is_rejected() {
        let mut e = election(0);
        let elsewhere = FaultMsg::new(Identity::new(1), Identity::new(4), ProcessListLocation::new(0, 0, 1));
        let err = e.execute_msg(&elsewhere.into()).unwrap_err();
        assert!(matches!(err, ConsensusError::LocationMismatch { .. }));
        assert!(e.fault().is_none());
    }

    #[test]
    fn current_vote_is_visible_per_slot() {
        let mut e = election(0);
        e.execute_msg(&volunteer(5).into()).unwrap();
        let slot = e.authset().round_slot(Identity::new(5));
        assert!(e.current_vote(slot).is_none());
        for leader in 1..3 {
            e.execute_msg(&VoteMessage::new(Identity::new(leader), volunteer(5)).into())
                .unwrap();
        }
        assert_eq!(e.current_vote(slot).map(|v| v.rank), Some(0));
        assert!(e.looping_leaders().is_empty());
    }
}
