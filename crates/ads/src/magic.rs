use indra_splice::Magic;

pub const ADDRESS: Magic = *b"adad";
pub const SERVICES: Magic = *b"advs";
pub const LOAD: Magic = *b"advl";
pub const PEER: Magic = *b"peer";
pub const INTRO: Magic = *b"advi";
