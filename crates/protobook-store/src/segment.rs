//! Sharded peer → protocols index.
//!
//! Peers are spread over `SHARD_COUNT` independently locked segments,
//! picked by the trailing byte of the peer id. Unrelated peers mutate in
//! parallel; contention is bounded by the peers that share a trailing byte.
//!
//! Readers get owned snapshots, never a guard. Writers get the guard itself
//! so the caller can finish the reverse-index update before releasing it.

use std::collections::{HashMap, HashSet};

use parking_lot::{RwLock, RwLockWriteGuard};
use protobook_core::{PeerId, ProtocolId};

/// Number of shards. One per possible trailing byte.
pub const SHARD_COUNT: usize = 256;

pub type ProtocolSet = HashSet<ProtocolId>;
pub type ShardMap = HashMap<PeerId, ProtocolSet>;

/// Shard owning `peer`. Stable for the life of the peer.
#[inline]
pub fn shard_index(peer: &PeerId) -> usize {
    peer.last_byte() as usize
}

pub struct Segments {
    shards: Box<[RwLock<ShardMap>; SHARD_COUNT]>,
}

impl Default for Segments {
    fn default() -> Self {
        Self::new()
    }
}

impl Segments {
    pub fn new() -> Self {
        Self {
            shards: Box::new(std::array::from_fn(|_| RwLock::new(HashMap::new()))),
        }
    }

    fn shard(&self, peer: &PeerId) -> &RwLock<ShardMap> {
        &self.shards[shard_index(peer)]
    }

    /// Exclusive access to the peer's shard.
    pub fn write(&self, peer: &PeerId) -> RwLockWriteGuard<'_, ShardMap> {
        self.shard(peer).write()
    }

    pub fn protocols(&self, peer: &PeerId) -> Vec<ProtocolId> {
        self.shard(peer)
            .read()
            .get(peer)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Members of `wanted` present in the peer's set, in input order.
    /// Returns the stored (canonical) instances.
    pub fn supports(&self, peer: &PeerId, wanted: &[ProtocolId]) -> Vec<ProtocolId> {
        let shard = self.shard(peer).read();
        let Some(set) = shard.get(peer) else {
            return Vec::new();
        };
        wanted.iter().filter_map(|p| set.get(p)).cloned().collect()
    }

    pub fn first_supported(&self, peer: &PeerId, wanted: &[ProtocolId]) -> Option<ProtocolId> {
        let shard = self.shard(peer).read();
        let set = shard.get(peer)?;
        wanted.iter().find_map(|p| set.get(p)).cloned()
    }

    /// Total peers with an entry. Locks one shard at a time.
    pub fn peer_count(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    /// All peers with an entry. Locks one shard at a time.
    pub fn peers(&self) -> Vec<PeerId> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().keys().copied());
        }
        out
    }

    /// Owned copy of every entry, one shard at a time.
    pub fn snapshot(&self) -> Vec<(PeerId, ProtocolSet)> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.read().iter().map(|(p, set)| (*p, set.clone())));
        }
        out
    }
}
