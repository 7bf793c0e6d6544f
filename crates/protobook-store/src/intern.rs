//! Interning table — one canonical `ProtocolId` per distinct name.
//!
//! Peers tend to speak the same handful of protocols, so a book holding
//! thousands of peers would otherwise hold thousands of copies of
//! `/ipfs/id/1.0.0`. Every protocol entering the book is swapped for the
//! canonical instance here first.
//!
//! The table is append-only. It grows with the number of distinct names
//! ever seen and never shrinks, even after every peer has dropped a name.
//! If peers can feed arbitrary names in, that growth is theirs to drive;
//! `len()` is exposed through the book's stats for that reason.

use dashmap::DashMap;
use protobook_core::ProtocolId;

pub struct InternTable {
    table: DashMap<ProtocolId, ()>,
}

impl Default for InternTable {
    fn default() -> Self {
        Self::new()
    }
}

impl InternTable {
    pub fn new() -> Self {
        Self {
            table: DashMap::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            table: DashMap::with_capacity(capacity),
        }
    }

    /// Return the canonical instance for `proto`, inserting it if unseen.
    ///
    /// Checks under the shard's read lock first. On a miss, `entry` takes the
    /// write lock and looks again, so two threads racing on a new name
    /// still agree on one instance.
    pub fn intern(&self, proto: &ProtocolId) -> ProtocolId {
        if let Some(found) = self.table.get(proto.as_str()) {
            return found.key().clone();
        }
        let entry = self.table.entry(proto.clone()).or_insert(());
        let canonical = entry.key().clone();
        drop(entry);
        tracing::trace!(protocol = %canonical, "protocol interned");
        canonical
    }

    /// Canonical instance for `name` if it has been interned. Never inserts.
    pub fn lookup(&self, name: &str) -> Option<ProtocolId> {
        self.table.get(name).map(|found| found.key().clone())
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}
