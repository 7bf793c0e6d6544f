//! protobook-core — shared identifier types, the protocol book contract,
//! and configuration. The store and the stress driver depend on this one.

pub mod book;
pub mod config;
pub mod peer;
pub mod protocol;

pub use book::ProtoBook;
pub use peer::{ParsePeerIdError, PeerId};
pub use protocol::ProtocolId;
