//! Ephemeral key-set generator.
//!
//! Bulk crypt-layer construction needs many ephemeral keys quickly.
//! Rather than pay a full keypair-generation cost per layer, the
//! generator advances a base scalar by a fixed increment each call;
//! correctness only requires that the sequence of resulting public
//! keys be unlinkable to an outside observer, which holds as long as
//! the increment and the initial base are both unpredictable.

use std::sync::Mutex;

use secp256k1::{Scalar, SecretKey};

use crate::error::{CryptoError, Result};
use crate::keys::PrivateKey;

struct Inner {
    base: SecretKey,
    increment: Scalar,
}

/// Thread-safe: internally mutex-guarded so `next()` can be called
/// concurrently from multiple handler tasks without external locking.
pub struct KeySet(Mutex<Inner>);

impl KeySet {
    pub fn new() -> Self {
        let base = PrivateKey::generate().0;
        let increment_key = PrivateKey::generate();
        let increment = Scalar::from_be_bytes(increment_key.to_bytes())
            .expect("freshly generated secret key is always a valid scalar");
        Self(Mutex::new(Inner { base, increment }))
    }

    /// Produce the next ephemeral private key and advance the
    /// internal base for the following call.
    pub fn next(&self) -> Result<PrivateKey> {
        let mut inner = self.0.lock().expect("key-set mutex poisoned");
        let current = inner.base;
        inner.base = inner
            .base
            .add_tweak(&inner.increment)
            .map_err(|e| CryptoError::KeyParseFailed(e.to_string()))?;
        Ok(PrivateKey(current))
    }
}

impl Default for KeySet {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn successive_keys_are_distinct() {
        let ks = KeySet::new();
        let a = ks.next().unwrap();
        let b = ks.next().unwrap();
        assert_ne!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn advances_deterministically_by_the_same_increment() {
        let ks = KeySet::new();
        let a = ks.next().unwrap();
        let b = ks.next().unwrap();
        let c = ks.next().unwrap();

        // a -> b and b -> c are the same scalar step.
        let inner = ks.0.lock().unwrap();
        let step_ab = a.0.add_tweak(&inner.increment).unwrap();
        assert_eq!(step_ab, b.0);
        let step_bc = b.0.add_tweak(&inner.increment).unwrap();
        assert_eq!(step_bc, c.0);
    }
}
