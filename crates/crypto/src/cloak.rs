//! Cloaked key tags: blinded public-key identifiers.
//!
//! A cloak tag lets a relay recognise that a packet addresses one of
//! its keys without revealing to any other observer which key that
//! is. Only someone holding the matching private key can recompute
//! the tail and confirm a match.

use rand::rngs::OsRng;
use rand::RngCore;

use crate::hash::hash;
use crate::keys::PublicKey;

pub const BLINDER_LEN: usize = 3;
pub const TAIL_LEN: usize = 5;
pub const CLOAK_LEN: usize = BLINDER_LEN + TAIL_LEN;

pub type CloakedKey = [u8; CLOAK_LEN];

/// `blinder ∥ SHA-256(blinder ∥ pubkey)[0..5]` for a freshly sampled
/// blinder.
pub fn cloak(pub_key: &PublicKey) -> CloakedKey {
    let mut blinder = [0u8; BLINDER_LEN];
    OsRng.fill_bytes(&mut blinder);
    cloak_with_blinder(&blinder, pub_key)
}

fn cloak_with_blinder(blinder: &[u8; BLINDER_LEN], pub_key: &PublicKey) -> CloakedKey {
    let mut preimage = Vec::with_capacity(BLINDER_LEN + crate::keys::PUBLIC_KEY_LEN);
    preimage.extend_from_slice(blinder);
    preimage.extend_from_slice(&pub_key.to_bytes());
    let digest = hash(&preimage);

    let mut tag = [0u8; CLOAK_LEN];
    tag[..BLINDER_LEN].copy_from_slice(blinder);
    tag[BLINDER_LEN..].copy_from_slice(&digest[..TAIL_LEN]);
    tag
}

/// Recompute the tail for `tag`'s blinder against `pub_key` and
/// compare in constant time, so a timing side channel cannot be used
/// to probe which key a relay holds.
pub fn matches(tag: &CloakedKey, pub_key: &PublicKey) -> bool {
    let mut blinder = [0u8; BLINDER_LEN];
    blinder.copy_from_slice(&tag[..BLINDER_LEN]);
    let recomputed = cloak_with_blinder(&blinder, pub_key);
    constant_time_eq(&recomputed, tag)
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::Identity;

    #[test]
    fn cloak_matches_its_own_key() {
        let id = Identity::generate();
        let tag = cloak(&id.public);
        assert!(matches(&tag, &id.public));
    }

    #[test]
    fn cloak_does_not_match_unrelated_keys() {
        let id = Identity::generate();
        let tag = cloak(&id.public);
        let mut false_positives = 0;
        for _ in 0..1000 {
            let other = Identity::generate();
            if matches(&tag, &other.public) {
                false_positives += 1;
            }
        }
        assert_eq!(false_positives, 0);
    }

    #[test]
    fn fixed_blinder_is_deterministic() {
        let id = Identity::generate();
        let blinder = [0xAB, 0xCD, 0xEF];
        let tag_a = cloak_with_blinder(&blinder, &id.public);
        let tag_b = cloak_with_blinder(&blinder, &id.public);
        assert_eq!(tag_a, tag_b);
    }
}
