//! Authority set: the immutable roster snapshot an election runs against.
//!
//! The roster is supplied by the identity registry when an election starts
//! and never changes for that election's lifetime. A membership change
//! starts a fresh election with a new snapshot.

use crate::digest::{blake2b_256_multi, RosterDigest};
use crate::error::TypesError;
use crate::location::{MinuteLocation, ProcessListLocation, NUMBER_OF_MINUTES};
use crate::{Identity, RoundSlot};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Domain separator for the volunteer priority mask.
const PRIORITY_DOMAIN: &[u8] = b"fedvote/volunteer-priority";

/// Role of a server in the roster.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthorityStatus {
    /// Active leader, votes in elections.
    Federated,
    /// Standby server, may volunteer to replace a faulted leader.
    Audit,
    /// Known to the registry but holding no role.
    Unassigned,
}

impl AuthorityStatus {
    fn tag(self) -> u8 {
        match self {
            AuthorityStatus::Federated => 1,
            AuthorityStatus::Audit => 2,
            AuthorityStatus::Unassigned => 0,
        }
    }
}

impl fmt::Display for AuthorityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthorityStatus::Federated => "federated",
            AuthorityStatus::Audit => "audit",
            AuthorityStatus::Unassigned => "unassigned",
        };
        f.write_str(s)
    }
}

/// Ordered roster of identities with a parallel status array.
///
/// Identities are kept ascending and unique; `statuses[i]` is the role of
/// `identities[i]`. Only [`AuthSetBuilder`] can create one, so those
/// invariants hold for every instance.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuthSet {
    identities: Vec<Identity>,
    statuses: Vec<AuthorityStatus>,
    index: HashMap<Identity, usize>,
}

impl AuthSet {
    pub fn builder() -> AuthSetBuilder {
        AuthSetBuilder::default()
    }

    /// Total number of servers in the roster.
    pub fn len(&self) -> usize {
        self.identities.len()
    }

    /// Always false; an empty roster cannot be built.
    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }

    pub fn identities(&self) -> &[Identity] {
        &self.identities
    }

    pub fn contains(&self, id: Identity) -> bool {
        self.index.contains_key(&id)
    }

    pub fn status(&self, id: Identity) -> Option<AuthorityStatus> {
        self.index.get(&id).map(|&i| self.statuses[i])
    }

    /// Whether `id` is a Federated server. Unknown identities are not.
    pub fn is_leader(&self, id: Identity) -> bool {
        self.status(id) == Some(AuthorityStatus::Federated)
    }

    /// Whether `id` is an Audit server. Unknown identities are not.
    pub fn is_audit(&self, id: Identity) -> bool {
        self.status(id) == Some(AuthorityStatus::Audit)
    }

    /// Federated servers in roster order.
    pub fn federated(&self) -> impl Iterator<Item = Identity> + '_ {
        self.with_status(AuthorityStatus::Federated)
    }

    /// Audit servers in roster order.
    pub fn audits(&self) -> impl Iterator<Item = Identity> + '_ {
        self.with_status(AuthorityStatus::Audit)
    }

    fn with_status(&self, status: AuthorityStatus) -> impl Iterator<Item = Identity> + '_ {
        self.identities
            .iter()
            .zip(&self.statuses)
            .filter(move |(_, s)| **s == status)
            .map(|(id, _)| *id)
    }

    pub fn federated_count(&self) -> usize {
        self.federated().count()
    }

    /// Quorum size: more than half of the Federated servers.
    pub fn majority(&self) -> usize {
        self.federated_count() / 2 + 1
    }

    /// Position of `id` among the Federated servers.
    pub fn fed_index(&self, id: Identity) -> Option<usize> {
        self.federated().position(|f| f == id)
    }

    /// VM a Federated server is responsible for at `location`.
    ///
    /// VM assignment rotates by one every minute across the
    /// [`NUMBER_OF_MINUTES`] VMs of a block.
    pub fn vm_for_identity(&self, id: Identity, location: MinuteLocation) -> Option<usize> {
        let index = self.fed_index(id)? as u64;
        Some(((location.sum() + index) % u64::from(NUMBER_OF_MINUTES)) as usize)
    }

    /// Round slot owning `volunteer`'s traffic.
    pub fn round_slot(&self, volunteer: Identity) -> RoundSlot {
        // The builder rejects empty rosters, so the slot always exists.
        RoundSlot::for_volunteer(volunteer, self.len()).unwrap_or_default()
    }

    /// Audit servers ordered from highest to lowest volunteer priority at
    /// `location`.
    ///
    /// The order is a pure function of the roster and the location, so every
    /// participant derives the same ranking without coordinating.
    pub fn priority_order(&self, location: &ProcessListLocation) -> Vec<Identity> {
        let mask = priority_mask(location);
        let mut audits: Vec<Identity> = self.audits().collect();
        audits.sort_by(|a, b| (b.as_u64() ^ mask).cmp(&(a.as_u64() ^ mask)));
        audits
    }

    /// Priority of `volunteer` at `location`; higher wins.
    ///
    /// The best audit scores the number of audits, the worst scores 1.
    /// Servers that are not audits have no priority.
    pub fn volunteer_priority(&self, volunteer: Identity, location: &ProcessListLocation) -> Option<u32> {
        let order = self.priority_order(location);
        let position = order.iter().position(|a| *a == volunteer)?;
        Some((order.len() - position) as u32)
    }

    /// Fingerprint of the roster contents.
    pub fn digest(&self) -> RosterDigest {
        let encoded: Vec<[u8; 9]> = self
            .identities
            .iter()
            .zip(&self.statuses)
            .map(|(id, status)| {
                let mut entry = [0u8; 9];
                entry[..8].copy_from_slice(&id.as_u64().to_le_bytes());
                entry[8] = status.tag();
                entry
            })
            .collect();
        let parts: Vec<&[u8]> = encoded.iter().map(|e| e.as_slice()).collect();
        RosterDigest::new(blake2b_256_multi(&parts))
    }
}

fn priority_mask(location: &ProcessListLocation) -> u64 {
    let digest = blake2b_256_multi(&[PRIORITY_DOMAIN, &location.to_bytes()]);
    let mut word = [0u8; 8];
    word.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(word)
}

/// Collects roster entries and validates them into an [`AuthSet`].
#[derive(Clone, Debug, Default)]
pub struct AuthSetBuilder {
    entries: Vec<(Identity, AuthorityStatus)>,
}

impl AuthSetBuilder {
    pub fn member(mut self, id: impl Into<Identity>, status: AuthorityStatus) -> Self {
        self.entries.push((id.into(), status));
        self
    }

    pub fn federated(self, id: impl Into<Identity>) -> Self {
        self.member(id, AuthorityStatus::Federated)
    }

    pub fn audit(self, id: impl Into<Identity>) -> Self {
        self.member(id, AuthorityStatus::Audit)
    }

    pub fn unassigned(self, id: impl Into<Identity>) -> Self {
        self.member(id, AuthorityStatus::Unassigned)
    }

    pub fn build(mut self) -> Result<AuthSet, TypesError> {
        if self.entries.is_empty() {
            return Err(TypesError::EmptyRoster);
        }
        self.entries.sort_by_key(|(id, _)| *id);
        if let Some(pair) = self.entries.windows(2).find(|w| w[0].0 == w[1].0) {
            return Err(TypesError::DuplicateIdentity(pair[0].0));
        }

        let (identities, statuses): (Vec<_>, Vec<_>) = self.entries.into_iter().unzip();
        let index = identities
            .iter()
            .enumerate()
            .map(|(i, id)| (*id, i))
            .collect();
        Ok(AuthSet {
            identities,
            statuses,
            index,
        })
    }
}
