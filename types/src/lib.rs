//! Fundamental types for the federated-server election.
//!
//! This crate defines the values shared by every other crate in the workspace:
//! server identities, the immutable authority set, process-list locations and
//! the round slots that partition volunteer traffic.

pub mod authset;
pub mod digest;
pub mod error;
pub mod identity;
pub mod location;
pub mod slot;

pub use authset::{AuthSet, AuthSetBuilder, AuthorityStatus};
pub use digest::RosterDigest;
pub use error::TypesError;
pub use identity::Identity;
pub use location::{MinuteLocation, ProcessListLocation, NUMBER_OF_MINUTES};
pub use slot::RoundSlot;
