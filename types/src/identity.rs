//! Server identity.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of a server, stable for the lifetime of an election.
///
/// The authority registry hands these out; inside the election core they are
/// only compared, hashed and reduced modulo the roster size.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Identity(u64);

impl Identity {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl From<u64> for Identity {
    fn from(id: u64) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ID-{:08x}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_zero_padded_hex() {
        assert_eq!(Identity::new(0x2a).to_string(), "ID-0000002a");
    }

    #[test]
    fn ordering_follows_raw_value() {
        assert!(Identity::new(3) < Identity::new(10));
    }
}
