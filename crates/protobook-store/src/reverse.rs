//! Protocol → peers reverse index.
//!
//! One map behind one lock. Entries appear the first time a protocol is
//! recorded for any peer and then stay, even once their peer set empties:
//! a known protocol with no peers answers with an empty list, an unknown
//! one answers with an error.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use protobook_core::{PeerId, ProtocolId};

use crate::error::ProtoBookError;

#[derive(Default)]
pub struct ReverseIndex {
    peers: RwLock<HashMap<ProtocolId, HashSet<PeerId>>>,
}

impl ReverseIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            peers: RwLock::new(HashMap::with_capacity(capacity)),
        }
    }

    /// Record `peer` under each protocol, creating entries as needed.
    pub fn add_peer<'a, I>(&self, peer: &PeerId, protocols: I)
    where
        I: IntoIterator<Item = &'a ProtocolId>,
    {
        self.reassign(peer, std::iter::empty(), protocols);
    }

    /// Drop `peer` from each protocol's entry. Unknown protocols are skipped.
    pub fn remove_peer<'a, I>(&self, peer: &PeerId, protocols: I)
    where
        I: IntoIterator<Item = &'a ProtocolId>,
    {
        self.reassign(peer, protocols, std::iter::empty());
    }

    /// Move `peer` off `stale` and onto `current` under one lock hold.
    pub fn reassign<'a, S, C>(&self, peer: &PeerId, stale: S, current: C)
    where
        S: IntoIterator<Item = &'a ProtocolId>,
        C: IntoIterator<Item = &'a ProtocolId>,
    {
        let mut map = self.peers.write();
        for proto in stale {
            if let Some(peers) = map.get_mut(proto.as_str()) {
                peers.remove(peer);
            }
        }
        for proto in current {
            match map.get_mut(proto.as_str()) {
                Some(peers) => {
                    peers.insert(*peer);
                }
                None => {
                    map.insert(proto.clone(), HashSet::from([*peer]));
                }
            }
        }
    }

    /// Drop `peer` from every entry named in its last known protocol set.
    pub fn remove_peer_everywhere(&self, peer: &PeerId, known: &HashSet<ProtocolId>) {
        self.remove_peer(peer, known);
    }

    pub fn peers_for(&self, protocol: &ProtocolId) -> Result<Vec<PeerId>, ProtoBookError> {
        let map = self.peers.read();
        let peers = map
            .get(protocol.as_str())
            .ok_or_else(|| ProtoBookError::NoPeersForProtocol(protocol.clone()))?;
        Ok(peers.iter().copied().collect())
    }

    #[cfg(test)]
    fn contains(&self, protocol: &str, peer: &PeerId) -> bool {
        self.peers
            .read()
            .get(protocol)
            .is_some_and(|peers| peers.contains(peer))
    }

    /// Number of protocols with an entry, empty ones included.
    pub fn protocol_count(&self) -> usize {
        self.peers.read().len()
    }

    /// Owned copy of every entry.
    pub fn snapshot(&self) -> Vec<(ProtocolId, HashSet<PeerId>)> {
        self.peers
            .read()
            .iter()
            .map(|(proto, peers)| (proto.clone(), peers.clone()))
            .collect()
    }
}
