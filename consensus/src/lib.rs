//! Consensus: leveled voting to replace a faulted Federated server.
//!
//! A fixed roster of Federated (leader) and Audit (standby) servers agrees on
//! which audit server takes over from a leader believed to have failed,
//! without a coordinator and under message reordering and duplication.
//!
//! ## Module overview
//!
//! - [`election`]: Per-fault coordinator (Working → Publishing).
//! - [`round`]: Leveled-voting state machine for one round slot.
//! - [`commit_tracker`]: Majority detection over leaders' agreeing levels.
//! - [`vote_history`]: Last two levels issued by one leader.
//! - [`loop_detector`]: Diagnostic for leaders flip-flopping between standings.
//! - [`routing`]: Adapter that re-sends the current vote to idle peers.
//! - [`config`]: TOML-backed election configuration.
//! - [`error`]: Consensus error types.

pub mod commit_tracker;
pub mod config;
pub mod election;
pub mod error;
pub mod loop_detector;
pub mod round;
pub mod routing;
pub mod vote_history;

pub use commit_tracker::CommitTracker;
pub use config::ElectionConfig;
pub use election::{Election, ElectionState};
pub use error::ConsensusError;
pub use loop_detector::LoopDetector;
pub use round::Round;
pub use routing::RoutingElection;
pub use vote_history::{HistoryUpdate, LeaderVoteHistory, HISTORY_DEPTH};
