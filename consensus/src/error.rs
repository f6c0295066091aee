use fedvote_messages::MessageKind;
use fedvote_types::{Identity, ProcessListLocation, RoundSlot};
use thiserror::Error;

/// Protocol-invariant violations and configuration failures.
///
/// Every variant signals input that upstream validation should have
/// rejected; the election state is left untouched when one is returned.
#[derive(Debug, Error)]
pub enum ConsensusError {
    #[error("{kind} message carries no volunteer to derive a round slot from")]
    MissingVolunteer { kind: MessageKind },

    #[error("round slot {slot} is outside an authority set of {roster} servers")]
    SlotOutOfBounds { slot: RoundSlot, roster: usize },

    #[error("message for round {found} delivered to round {expected}")]
    WrongRound { expected: RoundSlot, found: RoundSlot },

    #[error("message for location {found} delivered to election at {expected}")]
    LocationMismatch {
        expected: ProcessListLocation,
        found: ProcessListLocation,
    },

    #[error("leader {signer} sent level {level} for rank {rank}; a level must exceed its rank")]
    InvalidLevel { signer: Identity, level: u32, rank: u32 },

    #[error("no level left above rank {rank}")]
    LevelOverflow { rank: u32 },

    #[error("no volunteer message recorded for {0}")]
    UnknownVolunteer(Identity),

    #[error("config error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
