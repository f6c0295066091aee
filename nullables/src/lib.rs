//! Nullable infrastructure for deterministic testing.
//!
//! Replaces the transport and randomness an election would see in
//! production with controllable in-memory versions that:
//! - Produce the same interleaving for the same seed
//! - Never touch the network
//!
//! Usage: wire several [`Election`](fedvote_consensus::Election)s into a
//! [`NullNetwork`] and drive it step by step or to quiescence.

pub mod network;
pub mod random;

pub use network::NullNetwork;
pub use random::NullRandom;
