//! Process-list coordinates an election is bound to.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of minutes in a block.
pub const NUMBER_OF_MINUTES: u32 = 10;

/// A minute inside a block.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MinuteLocation {
    pub height: u64,
    pub minute: u32,
}

impl MinuteLocation {
    pub fn new(height: u64, minute: u32) -> Self {
        Self { height, minute }
    }

    /// Height plus minute, the rotation offset used for VM assignment.
    pub fn sum(&self) -> u64 {
        self.height + u64::from(self.minute)
    }
}

impl fmt::Display for MinuteLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.height, self.minute)
    }
}

/// Where in the process list a fault was observed.
///
/// Every message handled by one election carries the same location.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProcessListLocation {
    pub vm: u32,
    pub minute: u32,
    pub height: u64,
}

impl ProcessListLocation {
    pub fn new(vm: u32, minute: u32, height: u64) -> Self {
        Self { vm, minute, height }
    }

    pub fn minute_location(&self) -> MinuteLocation {
        MinuteLocation::new(self.height, self.minute)
    }

    /// Fixed-width little-endian encoding, used as hashing input.
    pub fn to_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[..8].copy_from_slice(&self.height.to_le_bytes());
        out[8..12].copy_from_slice(&self.minute.to_le_bytes());
        out[12..].copy_from_slice(&self.vm.to_le_bytes());
        out
    }
}

impl fmt::Display for ProcessListLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.height, self.minute, self.vm)
    }
}
