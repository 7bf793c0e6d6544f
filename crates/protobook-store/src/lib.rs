//! protobook-store — in-memory, concurrency-safe protocol book.
//!
//! Three lock domains, always entered in this order:
//!   interning table → peer shard → reverse index
//!
//! A call touches exactly one peer, so it holds at most one shard.

pub mod book;
pub mod error;
pub mod intern;
pub mod reverse;
pub mod segment;

pub use book::{BookStats, Inconsistency, MemoryProtoBook, MemoryProtoBookBuilder};
pub use error::ProtoBookError;
pub use intern::InternTable;
pub use reverse::ReverseIndex;
pub use segment::{shard_index, Segments, SHARD_COUNT};
