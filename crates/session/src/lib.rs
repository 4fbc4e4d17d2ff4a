//! Session manager (C7): per-session keys, balance accounting,
//! cloaked-key lookup for inbound `Crypt` layers, and hop selection
//! for outbound circuit construction.

mod error;
mod manager;
mod session;

pub use error::{Result, SessionError};
pub use manager::SessionManager;
pub use session::Session;
