//! ECDH shared-secret derivation.

use secp256k1::{Scalar, Secp256k1};

use crate::error::{CryptoError, Result};
use crate::hash::{hash, HASH_LEN};
use crate::keys::{PrivateKey, PublicKey};

/// `SHA-256(x-coordinate(prv · pub))`.
///
/// Computed as scalar multiplication of `pub`'s point by `prv`'s
/// scalar, which is the same point either side of the exchange
/// arrives at (`prv_a · pub_b == prv_b · pub_a`). The y-coordinate is
/// discarded: only the x-coordinate is hashed, matching the wire
/// format's key schedule exactly.
pub fn shared_secret(prv: &PrivateKey, pub_key: &PublicKey) -> Result<[u8; HASH_LEN]> {
    let secp = Secp256k1::new();
    let scalar = Scalar::from_be_bytes(prv.to_bytes())
        .map_err(|_| CryptoError::KeyParseFailed("scalar out of range".into()))?;
    let point = pub_key
        .0
        .mul_tweak(&secp, &scalar)
        .map_err(|e| CryptoError::KeyParseFailed(e.to_string()))?;
    let uncompressed = point.serialize_uncompressed();
    Ok(hash(&uncompressed[1..33]))
}
