//! The fixed-width/length-prefixed binary codec (C3) every onion layer
//! and advert encodes through.

mod error;
mod splice;

pub use error::{Result, SpliceError};
pub use splice::{AddrPort, Splice, Magic, MAGIC_LEN};
