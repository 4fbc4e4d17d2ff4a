//! AES-256-CTR stream cipher over an ECDH-derived key.
//!
//! Resolves the open question on block-cipher key length: the full
//! 32-byte ECDH hash keys AES-256, as the specification recommends.
//! The 16-byte IV is carried alongside the ciphertext on the wire
//! (`Crypt.iv`, the packet frame's IV).

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ctr::Ctr128BE;

use crate::hash::HASH_LEN;

pub const IV_LEN: usize = 16;
pub type Iv = [u8; IV_LEN];

type Aes256Ctr = Ctr128BE<Aes256>;

/// XORs `data` in place with the AES-256-CTR keystream derived from
/// `key` and `iv`. Enciphering and deciphering are the same operation.
pub fn encipher(key: &[u8; HASH_LEN], iv: &Iv, data: &mut [u8]) {
    let mut cipher = Aes256Ctr::new(key.into(), iv.into());
    cipher.apply_keystream(data);
}
