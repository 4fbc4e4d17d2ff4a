//! FEC / packet-framing error taxonomy.

use indra_crypto::CryptoError;
use indra_splice::SpliceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FecError {
    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("checksum mismatch")]
    ChecksumMismatch,

    #[error("message has no packets")]
    EmptyPackets,

    #[error("duplicate packet at seq {0}")]
    Duplicate(u16),

    #[error("mismatched {field} across packets of one message")]
    Mismatch { field: &'static str },

    #[error("insufficient shards in group {group}: have {have}, need {need}")]
    InsufficientShards { group: usize, have: usize, need: usize },

    #[error(transparent)]
    ReedSolomon(#[from] reed_solomon_erasure::Error),
}

pub type Result<T> = std::result::Result<T, FecError>;
