//! secp256k1 key types.
//!
//! A private key is a 32-byte scalar; the matching public key is its
//! 33-byte compressed point. Public keys are totally ordered by their
//! compressed encoding so they can be used as map keys and sorted
//! deterministically (e.g. when selecting hops).

use std::cmp::Ordering;
use std::fmt;

use rand::rngs::OsRng;
use secp256k1::{PublicKey as Secp256k1PublicKey, Secp256k1, SecretKey};

use crate::error::{CryptoError, Result};

pub const PRIVATE_KEY_LEN: usize = 32;
pub const PUBLIC_KEY_LEN: usize = 33;

/// A secp256k1 private scalar.
#[derive(Clone)]
pub struct PrivateKey(pub(crate) SecretKey);

impl PrivateKey {
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret, _) = secp.generate_keypair(&mut OsRng);
        Self(secret)
    }

    pub fn from_bytes(bytes: &[u8; PRIVATE_KEY_LEN]) -> Result<Self> {
        SecretKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| CryptoError::KeyParseFailed(e.to_string()))
    }

    pub fn to_bytes(&self) -> [u8; PRIVATE_KEY_LEN] {
        self.0.secret_bytes()
    }

    pub fn public_key(&self) -> PublicKey {
        let secp = Secp256k1::new();
        PublicKey(self.0.public_key(&secp))
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey(..)")
    }
}

/// A secp256k1 compressed public point.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PublicKey(pub(crate) Secp256k1PublicKey);

impl PublicKey {
    pub fn from_bytes(bytes: &[u8; PUBLIC_KEY_LEN]) -> Result<Self> {
        Secp256k1PublicKey::from_slice(bytes)
            .map(Self)
            .map_err(|e| CryptoError::KeyParseFailed(e.to_string()))
    }

    pub fn to_bytes(&self) -> [u8; PUBLIC_KEY_LEN] {
        self.0.serialize()
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({})", hex::encode(self.to_bytes()))
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_bytes().cmp(&other.to_bytes())
    }
}

/// A node's long-lived identity: the keypair it signs ads and
/// session installs with.
#[derive(Clone, Debug)]
pub struct Identity {
    pub private: PrivateKey,
    pub public: PublicKey,
}

impl Identity {
    pub fn generate() -> Self {
        let private = PrivateKey::generate();
        let public = private.public_key();
        Self { private, public }
    }

    pub fn from_private(private: PrivateKey) -> Self {
        let public = private.public_key();
        Self { private, public }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn public_key_roundtrip() {
        let id = Identity::generate();
        let bytes = id.public.to_bytes();
        let parsed = PublicKey::from_bytes(&bytes).unwrap();
        assert_eq!(id.public, parsed);
    }

    #[test]
    fn public_keys_totally_ordered() {
        let a = Identity::generate().public;
        let b = Identity::generate().public;
        // total order: exactly one of the three holds
        let lt = a < b;
        let gt = a > b;
        let eq = a == b;
        assert_eq!([lt, gt, eq].iter().filter(|x| **x).count(), 1);
    }

    #[test]
    fn private_key_roundtrip() {
        let k = PrivateKey::generate();
        let bytes = k.to_bytes();
        let parsed = PrivateKey::from_bytes(&bytes).unwrap();
        assert_eq!(k.public_key(), parsed.public_key());
    }
}
