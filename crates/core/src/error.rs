//! Onion layer / registry error taxonomy.

use indra_crypto::CryptoError;
use indra_splice::SpliceError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("unrecognised magic: {0:?}")]
    UnknownMagic([u8; 4]),

    #[error("no cloak match for this hop")]
    UnknownCloak,

    #[error("session expired")]
    SessionExpired,

    #[error("layer chain is incomplete: {0} expects an inner layer")]
    MissingInner(&'static str),

    #[error("a layer was wrapped onto a terminal layer: {0}")]
    TerminalLayer(&'static str),
}

pub type Result<T> = std::result::Result<T, CoreError>;
