//! Packet framing (C6): the on-wire packet envelope and the
//! Reed-Solomon segmentation that lets a receiver reassemble a
//! message despite dropped shards.

mod error;
mod packet;
mod segment;

pub use error::{FecError, Result};
pub use packet::{validate_common_fields, Packet, CIPHER_OVERHEAD, CLEAR_OVERHEAD, OVERHEAD};
pub use segment::{compute_segments, join, split, SegmentGroup, Shard};
