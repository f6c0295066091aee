//! Blake2b digests over roster snapshots and locations.

use blake2::digest::consts::U32;
use blake2::{Blake2b, Digest};
use serde::{Deserialize, Serialize};
use std::fmt;

type Blake2b256 = Blake2b<U32>;

/// Hash several byte slices in sequence.
pub fn blake2b_256_multi(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    for part in parts {
        hasher.update(part);
    }
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Fingerprint of an [`AuthSet`](crate::AuthSet).
///
/// Two participants holding equal digests are running against the same
/// roster snapshot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RosterDigest([u8; 32]);

impl RosterDigest {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl fmt::Debug for RosterDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RosterDigest({})", hex::encode(&self.0[..4]))
    }
}

impl fmt::Display for RosterDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multi_part_hash_is_deterministic() {
        assert_eq!(
            blake2b_256_multi(&[b"a", b"bc"]),
            blake2b_256_multi(&[b"a", b"bc"])
        );
        assert_ne!(blake2b_256_multi(&[b"a"]), blake2b_256_multi(&[b"b"]));
    }

    #[test]
    fn digest_displays_as_hex() {
        let d = RosterDigest::new([0xab; 32]);
        assert_eq!(d.to_string().len(), 64);
        assert!(d.to_string().starts_with("abab"));
    }
}
