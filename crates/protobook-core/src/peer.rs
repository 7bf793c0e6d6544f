//! Peer identifiers.
//!
//! A peer is named by 32 opaque bytes. Nothing in the book looks inside
//! them except the shard selector, which uses the trailing byte.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Length of a peer identifier in bytes.
pub const PEER_ID_LEN: usize = 32;

/// Opaque, fixed-size identifier for a network peer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId([u8; PEER_ID_LEN]);

impl PeerId {
    pub const fn from_bytes(bytes: [u8; PEER_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Derive an identifier from a public key (BLAKE3 digest of the key bytes).
    pub fn from_public_key(public_key: &[u8]) -> Self {
        Self(*blake3::hash(public_key).as_bytes())
    }

    /// Trailing byte of the identifier. Selects the peer's shard.
    pub fn last_byte(&self) -> u8 {
        self.0[PEER_ID_LEN - 1]
    }

    /// First 8 bytes as hex, for log lines.
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.short())
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParsePeerIdError {
    #[error("invalid hex in peer id: {0}")]
    InvalidHex(#[from] hex::FromHexError),
    #[error("peer id must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl FromStr for PeerId {
    type Err = ParsePeerIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let bytes: [u8; PEER_ID_LEN] = bytes
            .try_into()
            .map_err(|_| ParsePeerIdError::InvalidLength(len))?;
        Ok(Self(bytes))
    }
}

impl Serialize for PeerId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PeerId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}
