//! Engine-level error taxonomy (§7) and the collapsed, client-facing
//! `ProtocolError` a caller of `send_and_await` actually sees.

use indra_ads::AdsError;
use indra_core::CoreError;
use indra_crypto::CryptoError;
use indra_fec::FecError;
use indra_session::SessionError;
use indra_splice::SpliceError;
use thiserror::Error;

use crate::transport::TransportError;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Splice(#[from] SpliceError),

    #[error(transparent)]
    Fec(#[from] FecError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Ads(#[from] AdsError),

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error("no exit service registered on port {0}")]
    NoMatchingService(u16),

    #[error("request timed out")]
    Timeout,

    #[error("engine is shutting down")]
    ShuttingDown,
}

pub type Result<T> = std::result::Result<T, EngineError>;

/// What `send_and_await` actually returns to a caller. Per §7: only
/// `Timeout` and `InsufficientBalance` are distinguishable outside the
/// engine; everything else collapses to one opaque variant so a
/// caller can't use error shape as a timing or behavioural side
/// channel into the routing or crypto internals.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("request timed out")]
    Timeout,

    #[error("insufficient session balance")]
    InsufficientBalance,

    #[error("request failed")]
    Protocol,
}

impl From<EngineError> for ProtocolError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Timeout => ProtocolError::Timeout,
            EngineError::Session(SessionError::InsufficientBalance(_)) => {
                ProtocolError::InsufficientBalance
            }
            _ => ProtocolError::Protocol,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeout_survives_the_collapse() {
        let protocol: ProtocolError = EngineError::Timeout.into();
        assert!(matches!(protocol, ProtocolError::Timeout));
    }

    #[test]
    fn insufficient_balance_survives_the_collapse() {
        let protocol: ProtocolError =
            EngineError::Session(SessionError::InsufficientBalance([0u8; 8])).into();
        assert!(matches!(protocol, ProtocolError::InsufficientBalance));
    }

    #[test]
    fn everything_else_collapses_to_protocol() {
        let protocol: ProtocolError = EngineError::NoMatchingService(80).into();
        assert!(matches!(protocol, ProtocolError::Protocol));
    }
}
