//! ProtoBook trait — which protocols each peer speaks, and who speaks a protocol.
//!
//! This is the contract between the peer store and its consumers
//! (protocol negotiation, protocol-based discovery). The book only records
//! negotiation outcomes; it never negotiates anything itself.

use crate::{PeerId, ProtocolId};

/// Bidirectional index of peer ↔ protocol support.
///
/// Implementations are shared by reference across threads for the life of
/// the process. Only the two capacity-checked writes and the reverse lookup
/// can fail; everything else is total over its inputs.
pub trait ProtoBook: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Replace the peer's protocol set.
    fn set_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Result<(), Self::Error>;

    /// Union protocols into the peer's set. All or nothing.
    fn add_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Result<(), Self::Error>;

    /// Drop protocols from the peer's set. Unknown peers are a no-op.
    fn remove_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]);

    /// Snapshot of the peer's protocols, in no particular order.
    fn protocols(&self, peer: &PeerId) -> Vec<ProtocolId>;

    /// The subset of `protocols` the peer supports, in input order.
    fn supports_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Vec<ProtocolId>;

    /// First of `protocols` (in input order) the peer supports.
    fn first_supported_protocol(
        &self,
        peer: &PeerId,
        protocols: &[ProtocolId],
    ) -> Option<ProtocolId>;

    /// Forget the peer entirely, in both directions.
    fn remove_peer(&self, peer: &PeerId);

    /// Peers known to support `protocol`.
    ///
    /// Fails only when the protocol has never been referenced; a protocol
    /// whose peers have all gone returns an empty list.
    fn peers_for_protocol(&self, protocol: &ProtocolId) -> Result<Vec<PeerId>, Self::Error>;
}
