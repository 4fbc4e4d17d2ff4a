//! One module per onion layer variant (C5).

use rand::rngs::OsRng;
use rand::RngCore;

pub mod confirmation;
pub mod crypt;
pub mod delay;
pub mod exit;
pub mod forward;
pub mod hidden_service;
pub mod message;
pub mod ready;
pub mod response;
pub mod reverse;
pub mod route;
pub mod session;

/// Top up `bytes` with random noise back up to `target_len`, the
/// encoded length of the layer this buffer was stripped out of. A
/// relay that just peeled off a `next_addr` (and, for `Reverse`, a
/// routing header) would otherwise hand the next hop a packet that's
/// shrunk by exactly those stripped bytes, making the hop count
/// readable from packet size alone (§4.5).
pub(crate) fn pad_with_random(bytes: &mut Vec<u8>, target_len: usize) {
    if bytes.len() >= target_len {
        return;
    }
    let start = bytes.len();
    bytes.resize(target_len, 0);
    OsRng.fill_bytes(&mut bytes[start..]);
}
