//! Session manager error taxonomy.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("no session with id {0:?}")]
    NotFound([u8; 8]),

    #[error("session {0:?} has insufficient balance")]
    InsufficientBalance([u8; 8]),

    #[error("session {0:?} has expired")]
    Expired([u8; 8]),

    #[error("not enough sessions to select {need} hops, have {have}")]
    NotEnoughSessions { need: usize, have: usize },

    #[error("no pending payment for preimage hash")]
    NoPendingPayment,
}

pub type Result<T> = std::result::Result<T, SessionError>;
