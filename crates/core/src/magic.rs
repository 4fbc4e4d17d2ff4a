//! Wire magic tags for every onion layer variant.

use indra_splice::Magic;

pub const CRYPT: Magic = *b"cryp";
pub const FORWARD: Magic = *b"fwrd";
pub const REVERSE: Magic = *b"rvrs";
pub const EXIT: Magic = *b"exit";
pub const RESPONSE: Magic = *b"resp";
pub const SESSION: Magic = *b"sess";
pub const CONFIRMATION: Magic = *b"cnfm";
pub const DELAY: Magic = *b"dely";
pub const ROUTE: Magic = *b"rout";
pub const READY: Magic = *b"redy";
pub const HIDDEN_SERVICE: Magic = *b"hsvc";
pub const MESSAGE: Magic = *b"mesg";
pub const END: Magic = *b"end_";
