//! Framing error taxonomy for the splice codec.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SpliceError {
    #[error("truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },

    #[error("buffer too small: needed {needed} bytes, {remaining} remaining")]
    BufferTooSmall { needed: usize, remaining: usize },

    #[error("bad magic: expected {expected:?}, got {got:?}")]
    BadMagic { expected: [u8; 4], got: [u8; 4] },

    #[error("invalid address family byte: {0}")]
    InvalidAddrFamily(u8),

    #[error("invalid key bytes: {0}")]
    InvalidKey(String),
}

pub type Result<T> = std::result::Result<T, SpliceError>;
