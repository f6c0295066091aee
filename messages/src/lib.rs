//! Election message types exchanged between servers.
//!
//! Messages arrive at the election core already authenticated by the
//! transport; here they are plain immutable values. The message set is closed,
//! so inbound traffic is modelled as the [`ElectionMessage`] sum type and
//! matched exhaustively.

use fedvote_types::{Identity, ProcessListLocation};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Discriminant of an [`ElectionMessage`], used in errors and log lines.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    Fault,
    Volunteer,
    Vote,
    LeaderLevel,
    Publish,
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MessageKind::Fault => "fault",
            MessageKind::Volunteer => "volunteer",
            MessageKind::Vote => "vote",
            MessageKind::LeaderLevel => "leader-level",
            MessageKind::Publish => "publish",
        };
        f.write_str(s)
    }
}

/// A server's claim that a Federated server stopped responding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FaultMsg {
    pub signer: Identity,
    /// The leader believed to have failed.
    pub faulted: Identity,
    pub location: ProcessListLocation,
    /// Fault round at this location, bumped by the host on re-faults.
    pub round: u32,
}

impl FaultMsg {
    pub fn new(signer: Identity, faulted: Identity, location: ProcessListLocation) -> Self {
        Self {
            signer,
            faulted,
            location,
            round: 0,
        }
    }
}

/// An Audit server nominating itself to replace the faulted leader.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VolunteerMessage {
    /// The volunteering audit server.
    pub signer: Identity,
    pub fault: FaultMsg,
}

impl VolunteerMessage {
    pub fn new(signer: Identity, fault: FaultMsg) -> Self {
        Self { signer, fault }
    }

    pub fn location(&self) -> &ProcessListLocation {
        &self.fault.location
    }
}

/// Level-0 support of a leader for a volunteer.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct VoteMessage {
    pub signer: Identity,
    pub volunteer: VolunteerMessage,
}

impl VoteMessage {
    pub fn new(signer: Identity, volunteer: VolunteerMessage) -> Self {
        Self { signer, volunteer }
    }
}

/// A leader's ballot at one level of the leveled-voting protocol.
///
/// A leader never issues two messages for the same level.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LeaderLevelMessage {
    pub signer: Identity,
    pub level: u32,
    pub rank: u32,
    pub volunteer_priority: u32,
    pub volunteer: VolunteerMessage,
    /// Set on the final message a leader issues once it has committed.
    pub committed: bool,
    /// Level-0 votes justifying a rank-0 claim.
    pub votes: Vec<VoteMessage>,
}

impl LeaderLevelMessage {
    pub fn new(
        signer: Identity,
        rank: u32,
        level: u32,
        volunteer_priority: u32,
        volunteer: VolunteerMessage,
    ) -> Self {
        Self {
            signer,
            level,
            rank,
            volunteer_priority,
            volunteer,
            committed: false,
            votes: Vec::new(),
        }
    }

    /// Strength of the claim: rank first, volunteer priority breaks ties.
    pub fn standing(&self) -> (u32, u32) {
        (self.rank, self.volunteer_priority)
    }

    /// Whether `other` makes a strictly stronger claim than `self`.
    pub fn is_weaker_than(&self, other: &LeaderLevelMessage) -> bool {
        self.standing() < other.standing()
    }
}

/// The agreed replacement for the faulted leader.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PublishMessage {
    pub volunteer: VolunteerMessage,
}

impl PublishMessage {
    pub fn new(volunteer: VolunteerMessage) -> Self {
        Self { volunteer }
    }
}

/// Every message the election core consumes or produces.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElectionMessage {
    Fault(FaultMsg),
    Volunteer(VolunteerMessage),
    Vote(VoteMessage),
    LeaderLevel(LeaderLevelMessage),
    Publish(PublishMessage),
}

impl ElectionMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            ElectionMessage::Fault(_) => MessageKind::Fault,
            ElectionMessage::Volunteer(_) => MessageKind::Volunteer,
            ElectionMessage::Vote(_) => MessageKind::Vote,
            ElectionMessage::LeaderLevel(_) => MessageKind::LeaderLevel,
            ElectionMessage::Publish(_) => MessageKind::Publish,
        }
    }

    /// The volunteer this message is about; `None` only for faults.
    pub fn volunteer(&self) -> Option<&VolunteerMessage> {
        match self {
            ElectionMessage::Fault(_) => None,
            ElectionMessage::Volunteer(v) => Some(v),
            ElectionMessage::Vote(v) => Some(&v.volunteer),
            ElectionMessage::LeaderLevel(ll) => Some(&ll.volunteer),
            ElectionMessage::Publish(p) => Some(&p.volunteer),
        }
    }

    /// Originating server. Publish messages are answers, not claims, and
    /// carry no signer.
    pub fn signer(&self) -> Option<Identity> {
        match self {
            ElectionMessage::Fault(f) => Some(f.signer),
            ElectionMessage::Volunteer(v) => Some(v.signer),
            ElectionMessage::Vote(v) => Some(v.signer),
            ElectionMessage::LeaderLevel(ll) => Some(ll.signer),
            ElectionMessage::Publish(_) => None,
        }
    }

    pub fn location(&self) -> &ProcessListLocation {
        match self {
            ElectionMessage::Fault(f) => &f.location,
            ElectionMessage::Volunteer(v) => v.location(),
            ElectionMessage::Vote(v) => v.volunteer.location(),
            ElectionMessage::LeaderLevel(ll) => ll.volunteer.location(),
            ElectionMessage::Publish(p) => p.volunteer.location(),
        }
    }

    pub fn as_publish(&self) -> Option<&PublishMessage> {
        match self {
            ElectionMessage::Publish(p) => Some(p),
            _ => None,
        }
    }

    pub fn as_leader_level(&self) -> Option<&LeaderLevelMessage> {
        match self {
            ElectionMessage::LeaderLevel(ll) => Some(ll),
            _ => None,
        }
    }
}

impl From<FaultMsg> for ElectionMessage {
    fn from(m: FaultMsg) -> Self {
        ElectionMessage::Fault(m)
    }
}

impl From<VolunteerMessage> for ElectionMessage {
    fn from(m: VolunteerMessage) -> Self {
        ElectionMessage::Volunteer(m)
    }
}

impl From<VoteMessage> for ElectionMessage {
    fn from(m: VoteMessage) -> Self {
        ElectionMessage::Vote(m)
    }
}

impl From<LeaderLevelMessage> for ElectionMessage {
    fn from(m: LeaderLevelMessage) -> Self {
        ElectionMessage::LeaderLevel(m)
    }
}

impl From<PublishMessage> for ElectionMessage {
    fn from(m: PublishMessage) -> Self {
        ElectionMessage::Publish(m)
    }
}

impl fmt::Display for ElectionMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElectionMessage::Fault(m) => {
                write!(f, "fault[{} by {} @ {}]", m.faulted, m.signer, m.location)
            }
            ElectionMessage::Volunteer(m) => write!(f, "volunteer[{}]", m.signer),
            ElectionMessage::Vote(m) => write!(f, "vote[{} -> {}]", m.signer, m.volunteer.signer),
            ElectionMessage::LeaderLevel(m) => {
                let tag = if m.committed { "EOM" } else { "" };
                write!(
                    f,
                    "level[{} L{} {}.{}{} -> {}]",
                    m.signer, m.level, m.rank, m.volunteer_priority, tag, m.volunteer.signer
                )
            }
            ElectionMessage::Publish(m) => write!(f, "publish[{}]", m.volunteer.signer),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loc() -> ProcessListLocation {
        ProcessListLocation::new(1, 3, 40)
    }

    fn volunteer(id: u64) -> VolunteerMessage {
        let fault = FaultMsg::new(Identity::new(0), Identity::new(4), loc());
        VolunteerMessage::new(Identity::new(id), fault)
    }

    #[test]
    fn every_non_fault_message_names_a_volunteer() {
        let vol = volunteer(7);
        let msgs: Vec<ElectionMessage> = vec![
            vol.clone().into(),
            VoteMessage::new(Identity::new(1), vol.clone()).into(),
            LeaderLevelMessage::new(Identity::new(1), 0, 1, 2, vol.clone()).into(),
            PublishMessage::new(vol.clone()).into(),
        ];
        for msg in &msgs {
            assert_eq!(msg.volunteer().map(|v| v.signer), Some(Identity::new(7)));
            assert_eq!(msg.location(), &loc());
        }
    }

    #[test]
    fn fault_has_location_but_no_volunteer() {
        let msg: ElectionMessage = FaultMsg::new(Identity::new(1), Identity::new(4), loc()).into();
        assert!(msg.volunteer().is_none());
        assert_eq!(msg.kind(), MessageKind::Fault);
        assert_eq!(msg.location(), &loc());
    }

    #[test]
    fn publish_has_no_signer() {
        let msg: ElectionMessage = PublishMessage::new(volunteer(7)).into();
        assert_eq!(msg.signer(), None);
        assert!(msg.as_publish().is_some());
    }

    #[test]
    fn standing_orders_by_rank_then_priority() {
        let vol = volunteer(7);
        let low = LeaderLevelMessage::new(Identity::new(1), 0, 1, 3, vol.clone());
        let high_prio = LeaderLevelMessage::new(Identity::new(1), 0, 2, 4, vol.clone());
        let high_rank = LeaderLevelMessage::new(Identity::new(1), 1, 3, 1, vol);
        assert!(low.is_weaker_than(&high_prio));
        assert!(high_prio.is_weaker_than(&high_rank));
        assert!(!high_rank.is_weaker_than(&low));
        assert!(!low.is_weaker_than(&low));
    }

    #[test]
    fn display_is_compact() {
        let ll = LeaderLevelMessage::new(Identity::new(1), 2, 3, 4, volunteer(7));
        assert_eq!(
            ElectionMessage::from(ll).to_string(),
            "level[ID-00000001 L3 2.4 -> ID-00000007]"
        );
    }

    #[test]
    fn message_enum_survives_bincode() {
        let vol = volunteer(7);
        let mut ll = LeaderLevelMessage::new(Identity::new(2), 0, 1, 1, vol.clone());
        ll.votes.push(VoteMessage::new(Identity::new(1), vol));
        let msg = ElectionMessage::from(ll);
        let bytes = bincode::serialize(&msg).expect("encode");
        let back: ElectionMessage = bincode::deserialize(&bytes).expect("decode");
        assert_eq!(back, msg);
    }
}
