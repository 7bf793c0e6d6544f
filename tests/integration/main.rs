//! Protobook integration test harness.
//!
//! Exercises the public `ProtoBook` surface of `MemoryProtoBook` end to end:
//!
//!   cargo test --test integration
//!
//! Every test builds its own book; nothing is shared between tests.

use std::collections::HashSet;

pub use anyhow::{bail, Context, Result};
use protobook_core::{PeerId, ProtocolId};
use protobook_store::MemoryProtoBook;

mod concurrency;

// ── Harness ───────────────────────────────────────────────────────────────────

/// Deterministic peer id for test index `n`.
pub fn peer(n: u32) -> PeerId {
    PeerId::from_public_key(&n.to_be_bytes())
}

/// Peer id whose trailing byte (and so shard) is `shard`.
pub fn peer_in_shard(shard: u8, n: u8) -> PeerId {
    let mut bytes = [n; 32];
    bytes[31] = shard;
    PeerId::from_bytes(bytes)
}

/// Book limited to `max` protocols per peer.
pub fn book_with_limit(max: usize) -> Result<MemoryProtoBook> {
    MemoryProtoBook::builder()
        .max_protocols(max)
        .build()
        .with_context(|| format!("building book with max_protocols = {max}"))
}

pub fn protos(names: &[&str]) -> Vec<ProtocolId> {
    names.iter().map(|n| ProtocolId::from(*n)).collect()
}

pub fn as_set(list: Vec<ProtocolId>) -> HashSet<ProtocolId> {
    list.into_iter().collect()
}

pub fn peer_set(list: Vec<PeerId>) -> HashSet<PeerId> {
    list.into_iter().collect()
}
