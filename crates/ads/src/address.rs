//! `AddressAd`: a relay or hidden-service introducer announcing one
//! of its reachable addresses.

use std::time::Duration;

use indra_crypto::{hash, recover, sign, Id, PublicKey, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use indra_splice::Splice;

use crate::error::{AdsError, Result};
use crate::magic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressAd {
    pub id: Id,
    pub key: PublicKey,
    pub addr: String,
    pub index: u8,
    pub expiry: Duration,
    pub sig: Signature,
}

impl AddressAd {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + 2 + self.addr.len() + 1 + 8 + SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        splice.write_multiaddr(&self.addr)?;
        splice.write_u8(self.index)?;
        splice.write_duration(self.expiry)?;
        Ok(())
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&magic::ADDRESS)?;
        self.encode_fields(splice)?;
        splice.write_signature(&self.sig)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let key = splice.read_pubkey()?;
        let addr = splice.read_multiaddr()?;
        let index = splice.read_u8()?;
        let expiry = splice.read_duration()?;
        let sig = splice.read_signature()?;
        Ok(Self {
            id,
            key,
            addr,
            index,
            expiry,
            sig,
        })
    }

    fn signed_digest(&self) -> Result<[u8; 32]> {
        let mut splice = Splice::with_capacity(self.len() - SIGNATURE_LEN);
        self.encode_fields(&mut splice)?;
        Ok(hash(&splice.into_bytes()))
    }

    pub fn sign(&mut self, prv: &indra_crypto::PrivateKey) -> Result<()> {
        let digest = self.signed_digest()?;
        self.sig = sign(prv, &digest)?;
        Ok(())
    }

    /// Recompute the signed digest and check it recovers to `key`.
    pub fn verify(&self) -> Result<()> {
        let digest = self.signed_digest()?;
        let recovered = recover(&self.sig, &digest)?;
        if recovered == self.key {
            Ok(())
        } else {
            Err(AdsError::SignatureMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::Identity;

    #[test]
    fn sign_then_verify_succeeds() {
        let id = Identity::generate();
        let mut ad = AddressAd {
            id: [1u8; 8],
            key: id.public,
            addr: "/ip4/127.0.0.1/tcp/9000".to_string(),
            index: 0,
            expiry: Duration::from_secs(3600),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();
        ad.verify().unwrap();
    }

    #[test]
    fn encode_decode_roundtrips() {
        let id = Identity::generate();
        let mut ad = AddressAd {
            id: [2u8; 8],
            key: id.public,
            addr: "/ip4/10.0.0.1/tcp/8080".to_string(),
            index: 3,
            expiry: Duration::from_secs(60),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();
        let mut s = Splice::with_capacity(ad.len() + 4);
        ad.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_magic().unwrap(), magic::ADDRESS);
        let decoded = AddressAd::decode(&mut r).unwrap();
        assert_eq!(decoded, ad);
        decoded.verify().unwrap();
    }

    #[test]
    fn tampered_field_fails_verification() {
        let id = Identity::generate();
        let mut ad = AddressAd {
            id: [3u8; 8],
            key: id.public,
            addr: "/ip4/1.2.3.4/tcp/443".to_string(),
            index: 1,
            expiry: Duration::from_secs(10),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();
        ad.index = 9;
        assert!(matches!(ad.verify(), Err(AdsError::SignatureMismatch)));
    }
}
