//! MemoryProtoBook — the in-memory `ProtoBook`.
//!
//! Every write interns its protocols, then updates the peer's shard, then
//! the reverse index. The reverse update happens while the shard's write
//! lock is still held, so two writes to the same peer cannot interleave
//! their reverse updates. A reader of the reverse index can still see a
//! shard change a moment before its reverse counterpart lands.
//!
//! The capacity check gates the reverse index: a rejected write never
//! reaches it.

use std::collections::{HashMap, HashSet};

use protobook_core::config::ProtoBookConfig;
use protobook_core::{PeerId, ProtoBook, ProtocolId};

use crate::error::ProtoBookError;
use crate::intern::InternTable;
use crate::reverse::ReverseIndex;
use crate::segment::Segments;

pub struct MemoryProtoBook {
    segments: Segments,
    max_protocols: usize,
    interned: InternTable,
    peers: ReverseIndex,
}

/// Point-in-time counters. Each figure is read under its own lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BookStats {
    /// Peers with a protocol entry (possibly empty).
    pub peers: usize,
    /// Distinct protocol names ever interned.
    pub protocols_interned: usize,
    /// Protocols with a reverse-index entry, emptied ones included.
    pub protocols_indexed: usize,
}

/// A violation of the peer ↔ protocol invariant, found by `check_consistency`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Inconsistency {
    #[error("peer {peer} lists {protocol} but is missing from its reverse entry")]
    MissingReverse { peer: PeerId, protocol: ProtocolId },
    #[error("reverse entry for {protocol} lists peer {peer} which does not support it")]
    StaleReverse { peer: PeerId, protocol: ProtocolId },
    #[error("protocol {0} is not the interned instance")]
    NotCanonical(ProtocolId),
}

impl Default for MemoryProtoBook {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryProtoBook {
    /// Book with default limits (1024 protocols per peer).
    pub fn new() -> Self {
        Self::from_valid_config(&ProtoBookConfig::default())
    }

    pub fn with_config(config: &ProtoBookConfig) -> Result<Self, ProtoBookError> {
        config.validate()?;
        Ok(Self::from_valid_config(config))
    }

    pub fn builder() -> MemoryProtoBookBuilder {
        MemoryProtoBookBuilder::default()
    }

    fn from_valid_config(config: &ProtoBookConfig) -> Self {
        tracing::info!(
            max_protocols = config.max_protocols,
            intern_capacity = config.intern_capacity,
            "protocol book ready"
        );
        Self {
            segments: Segments::new(),
            max_protocols: config.max_protocols,
            interned: InternTable::with_capacity(config.intern_capacity),
            peers: ReverseIndex::with_capacity(config.intern_capacity),
        }
    }

    pub fn max_protocols(&self) -> usize {
        self.max_protocols
    }

    /// Every peer with an entry.
    pub fn peers(&self) -> Vec<PeerId> {
        self.segments.peers()
    }

    pub fn stats(&self) -> BookStats {
        BookStats {
            peers: self.segments.peer_count(),
            protocols_interned: self.interned.len(),
            protocols_indexed: self.peers.protocol_count(),
        }
    }

    /// Verify both indices agree and hold only interned instances.
    ///
    /// Meaningful only when no write is in flight; the two indices are
    /// snapshotted separately.
    pub fn check_consistency(&self) -> Result<(), Inconsistency> {
        let forward: HashMap<PeerId, HashSet<ProtocolId>> =
            self.segments.snapshot().into_iter().collect();
        let reverse: HashMap<ProtocolId, HashSet<PeerId>> =
            self.peers.snapshot().into_iter().collect();

        for (peer, protocols) in &forward {
            for proto in protocols {
                self.check_canonical(proto)?;
                let listed = reverse
                    .get(proto)
                    .is_some_and(|peers| peers.contains(peer));
                if !listed {
                    return Err(Inconsistency::MissingReverse {
                        peer: *peer,
                        protocol: proto.clone(),
                    });
                }
            }
        }

        for (proto, peers) in &reverse {
            self.check_canonical(proto)?;
            for peer in peers {
                let supported = forward
                    .get(peer)
                    .is_some_and(|protocols| protocols.contains(proto));
                if !supported {
                    return Err(Inconsistency::StaleReverse {
                        peer: *peer,
                        protocol: proto.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn check_canonical(&self, proto: &ProtocolId) -> Result<(), Inconsistency> {
        match self.interned.lookup(proto.as_str()) {
            Some(canonical) if ProtocolId::ptr_eq(&canonical, proto) => Ok(()),
            _ => Err(Inconsistency::NotCanonical(proto.clone())),
        }
    }

    fn intern_all(&self, protocols: &[ProtocolId]) -> Vec<ProtocolId> {
        protocols.iter().map(|p| self.interned.intern(p)).collect()
    }
}

impl ProtoBook for MemoryProtoBook {
    type Error = ProtoBookError;

    fn set_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Result<(), ProtoBookError> {
        if protocols.len() > self.max_protocols {
            let err = ProtoBookError::TooManyProtocols {
                requested: protocols.len(),
                max: self.max_protocols,
            };
            tracing::debug!(
                peer = %peer.short(),
                requested = protocols.len(),
                max = self.max_protocols,
                code = err.error_code(),
                "set rejected"
            );
            return Err(err);
        }

        let fresh: HashSet<ProtocolId> = self.intern_all(protocols).into_iter().collect();

        let mut shard = self.segments.write(peer);
        let previous = shard.insert(*peer, fresh).unwrap_or_default();
        let current = &shard[peer];
        let stale: Vec<&ProtocolId> = previous.difference(current).collect();
        self.peers.reassign(peer, stale, current);
        let count = current.len();
        drop(shard);

        tracing::trace!(peer = %peer.short(), count, "protocols set");
        Ok(())
    }

    fn add_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Result<(), ProtoBookError> {
        let interned = self.intern_all(protocols);

        let mut shard = self.segments.write(peer);
        let existing = shard.get(peer);
        let added: HashSet<ProtocolId> = interned
            .into_iter()
            .filter(|proto| !existing.is_some_and(|set| set.contains(proto)))
            .collect();
        let requested = existing.map_or(0, |set| set.len()) + added.len();
        if requested > self.max_protocols {
            drop(shard);
            let err = ProtoBookError::TooManyProtocols {
                requested,
                max: self.max_protocols,
            };
            tracing::debug!(
                peer = %peer.short(),
                requested,
                max = self.max_protocols,
                code = err.error_code(),
                "add rejected"
            );
            return Err(err);
        }

        shard.entry(*peer).or_default().extend(added.iter().cloned());
        self.peers.add_peer(peer, &added);
        drop(shard);

        tracing::trace!(peer = %peer.short(), added = added.len(), "protocols added");
        Ok(())
    }

    fn remove_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) {
        // A name that was never interned cannot be in any set.
        let known: Vec<ProtocolId> = protocols
            .iter()
            .filter_map(|p| self.interned.lookup(p.as_str()))
            .collect();
        if known.is_empty() {
            return;
        }

        let mut shard = self.segments.write(peer);
        let Some(set) = shard.get_mut(peer) else {
            return;
        };
        for proto in &known {
            set.remove(proto);
        }
        self.peers.remove_peer(peer, &known);
        drop(shard);

        tracing::trace!(peer = %peer.short(), count = known.len(), "protocols removed");
    }

    fn protocols(&self, peer: &PeerId) -> Vec<ProtocolId> {
        self.segments.protocols(peer)
    }

    fn supports_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Vec<ProtocolId> {
        self.segments.supports(peer, protocols)
    }

    fn first_supported_protocol(
        &self,
        peer: &PeerId,
        protocols: &[ProtocolId],
    ) -> Option<ProtocolId> {
        self.segments.first_supported(peer, protocols)
    }

    fn remove_peer(&self, peer: &PeerId) {
        let mut shard = self.segments.write(peer);
        if let Some(known) = shard.remove(peer) {
            self.peers.remove_peer_everywhere(peer, &known);
            tracing::trace!(peer = %peer.short(), protocols = known.len(), "peer removed");
        }
    }

    fn peers_for_protocol(&self, protocol: &ProtocolId) -> Result<Vec<PeerId>, ProtoBookError> {
        self.peers.peers_for(protocol)
    }
}

// ── Builder ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct MemoryProtoBookBuilder {
    config: ProtoBookConfig,
}

impl MemoryProtoBookBuilder {
    pub fn max_protocols(mut self, max: usize) -> Self {
        self.config.max_protocols = max;
        self
    }

    pub fn intern_capacity(mut self, capacity: usize) -> Self {
        self.config.intern_capacity = capacity;
        self
    }

    pub fn build(self) -> Result<MemoryProtoBook, ProtoBookError> {
        MemoryProtoBook::with_config(&self.config)
    }
}
