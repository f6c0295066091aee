//! Errors raised while building roster snapshots.

use crate::Identity;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypesError {
    #[error("authority set has no members")]
    EmptyRoster,

    #[error("identity {0} appears more than once in the authority set")]
    DuplicateIdentity(Identity),
}
