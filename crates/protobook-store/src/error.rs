//! Errors returned by the in-memory protocol book.

use protobook_core::config::ConfigError;
use protobook_core::ProtocolId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtoBookError {
    /// The write would leave the peer with more than `max` protocols.
    /// Nothing was changed.
    #[error("too many protocols: {requested} exceeds limit of {max}")]
    TooManyProtocols { requested: usize, max: usize },

    /// The protocol has never been recorded for any peer.
    #[error("no peers available for queried protocol {0}")]
    NoPeersForProtocol(ProtocolId),

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl ProtoBookError {
    /// Static label for log fields.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::TooManyProtocols { .. } => "too_many_protocols",
            Self::NoPeersForProtocol(_) => "no_peers_for_protocol",
            Self::InvalidConfig(_) => "invalid_config",
        }
    }
}
