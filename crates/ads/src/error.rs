//! Ad codec error taxonomy.

use indra_core::CoreError;
use indra_crypto::CryptoError;
use indra_splice::SpliceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AdsError {
    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("unrecognised ad magic: {0:?}")]
    UnknownMagic([u8; 4]),

    #[error("ad signature does not recover to the embedded key")]
    SignatureMismatch,
}

pub type Result<T> = std::result::Result<T, AdsError>;
