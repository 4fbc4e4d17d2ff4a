//! Crypto error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("key parse failed: {0}")]
    KeyParseFailed(String),

    #[error("decrypt failed")]
    DecryptFailed,

    #[error("signature invalid")]
    SignatureInvalid,

    #[error("signature recovery failed: {0}")]
    RecoveryFailed(String),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
