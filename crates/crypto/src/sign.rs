//! BIP-62 compact recoverable ECDSA signatures.
//!
//! `sign` produces 65 bytes (1-byte recovery id ∥ 64-byte compact
//! signature); `recover` yields the public key that produced a
//! signature over a given digest, without the verifier needing to
//! already know which key to check against.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};

use crate::error::{CryptoError, Result};
use crate::keys::{PrivateKey, PublicKey};

pub const SIGNATURE_LEN: usize = 65;
pub type Signature = [u8; SIGNATURE_LEN];

/// Sign a 32-byte digest, producing a recovery-id-prefixed compact
/// signature.
pub fn sign(prv: &PrivateKey, digest: &[u8; 32]) -> Result<Signature> {
    let secp = Secp256k1::new();
    let message =
        Message::from_digest_slice(digest).map_err(|e| CryptoError::KeyParseFailed(e.to_string()))?;
    let recoverable = secp.sign_ecdsa_recoverable(&message, &prv.0);
    let (recovery_id, compact) = recoverable.serialize_compact();

    let mut sig = [0u8; SIGNATURE_LEN];
    sig[0] = recovery_id.to_i32() as u8;
    sig[1..].copy_from_slice(&compact);
    Ok(sig)
}

/// Recover the public key that produced `sig` over `digest`.
pub fn recover(sig: &Signature, digest: &[u8; 32]) -> Result<PublicKey> {
    let secp = Secp256k1::new();
    let message =
        Message::from_digest_slice(digest).map_err(|e| CryptoError::KeyParseFailed(e.to_string()))?;
    let recovery_id = RecoveryId::from_i32(sig[0] as i32)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    let recoverable = RecoverableSignature::from_compact(&sig[1..], recovery_id)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    let public = secp
        .recover_ecdsa(&message, &recoverable)
        .map_err(|e| CryptoError::RecoveryFailed(e.to_string()))?;
    Ok(PublicKey(public))
}

/// Recover and check the result matches `expected`.
pub fn verify(sig: &Signature, digest: &[u8; 32], expected: &PublicKey) -> Result<()> {
    let recovered = recover(sig, digest)?;
    if &recovered == expected {
        Ok(())
    } else {
        Err(CryptoError::SignatureInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::hash;
    use crate::keys::Identity;

    #[test]
    fn sign_then_recover_yields_signer() {
        let id = Identity::generate();
        let digest = hash(b"hello indra");

        let sig = sign(&id.private, &digest).unwrap();
        let recovered = recover(&sig, &digest).unwrap();

        assert_eq!(recovered, id.public);
    }

    #[test]
    fn verify_rejects_wrong_key() {
        let id = Identity::generate();
        let other = Identity::generate();
        let digest = hash(b"hello indra");

        let sig = sign(&id.private, &digest).unwrap();
        assert!(verify(&sig, &digest, &other.public).is_err());
    }

    #[test]
    fn verify_rejects_tampered_digest() {
        let id = Identity::generate();
        let digest = hash(b"hello indra");
        let other_digest = hash(b"goodbye indra");

        let sig = sign(&id.private, &digest).unwrap();
        assert!(verify(&sig, &other_digest, &id.public).is_err());
    }
}
