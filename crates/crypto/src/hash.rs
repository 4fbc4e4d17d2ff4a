//! SHA-256 hashing and the message/session ID generator.

use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

pub const ID_LEN: usize = 8;
pub const HASH_LEN: usize = 32;

/// `SHA-256(data)`.
pub fn hash(data: &[u8]) -> [u8; HASH_LEN] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// An 8-byte message/session identifier.
pub type Id = [u8; ID_LEN];

/// Reseeds every `RESEED_INTERVAL` emissions so that an attacker who
/// recovers one generator state cannot predict IDs emitted long before
/// or after the leak.
const RESEED_INTERVAL: u32 = 1 << 16;

/// CSPRNG-seeded hash chain: `next() = SHA-256(seed ∥ counter)[0..8]`.
/// Not thread-safe by itself; callers that need concurrent access
/// (the session manager, the engine) wrap one instance in a mutex, per
/// the single-lock-per-resource design.
pub struct IdGenerator {
    seed: [u8; HASH_LEN],
    counter: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            seed: Self::fresh_seed(),
            counter: 0,
        }
    }

    fn fresh_seed() -> [u8; HASH_LEN] {
        let mut seed = [0u8; HASH_LEN];
        OsRng.fill_bytes(&mut seed);
        seed
    }

    pub fn next(&mut self) -> Id {
        if self.counter >= RESEED_INTERVAL {
            self.seed = Self::fresh_seed();
            self.counter = 0;
        }
        let mut input = Vec::with_capacity(HASH_LEN + 4);
        input.extend_from_slice(&self.seed);
        input.extend_from_slice(&self.counter.to_be_bytes());
        self.counter += 1;
        let digest = hash(&input);
        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(&digest[..ID_LEN]);
        id
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_within_a_window() {
        let mut gen = IdGenerator::new();
        let mut seen = std::collections::HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(gen.next()));
        }
    }

    #[test]
    fn reseeds_after_interval() {
        let mut gen = IdGenerator::new();
        let seed_before = gen.seed;
        for _ in 0..RESEED_INTERVAL {
            gen.next();
        }
        assert_ne!(gen.seed, seed_before);
        assert_eq!(gen.counter, 1);
    }

    #[test]
    fn hash_is_deterministic() {
        assert_eq!(hash(b"indra"), hash(b"indra"));
        assert_ne!(hash(b"indra"), hash(b"Indra"));
    }
}
