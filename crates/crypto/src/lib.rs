//! Indra crypto primitives (C1) and cloaked-key tags (C2).
//!
//! secp256k1 key ops, ECDH shared secrets, AES-256-CTR, BIP-62
//! compact recoverable signatures, and the ephemeral key-set
//! generator used to amortise bulk crypt-layer construction.

mod cipher;
mod cloak;
mod ecdh;
mod error;
mod hash;
mod keys;
mod keyset;
mod sign;

pub use cipher::{encipher, Iv, IV_LEN};
pub use cloak::{cloak, matches, CloakedKey, BLINDER_LEN, CLOAK_LEN, TAIL_LEN};
pub use ecdh::shared_secret;
pub use error::{CryptoError, Result};
pub use hash::{hash, Id, IdGenerator, HASH_LEN, ID_LEN};
pub use keys::{Identity, PrivateKey, PublicKey, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN};
pub use keyset::KeySet;
pub use sign::{recover, sign, verify, Signature, SIGNATURE_LEN};
