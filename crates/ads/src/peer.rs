//! `PeerAd`: a peer's root identity document. Indexed by `key`;
//! `AddressAd`/`ServicesAd` entries for the same peer are found by
//! concatenating its index with theirs, which is the gossip
//! collaborator's concern, not this crate's.

use std::time::Duration;

use indra_crypto::{hash, recover, sign, Id, PrivateKey, PublicKey, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use indra_splice::Splice;

use crate::error::{AdsError, Result};
use crate::magic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeerAd {
    pub id: Id,
    pub key: PublicKey,
    pub relay_rate: u64,
    pub expiry: Duration,
    pub sig: Signature,
}

impl PeerAd {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + 8 + 8 + SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        splice.write_u64(self.relay_rate)?;
        splice.write_duration(self.expiry)?;
        Ok(())
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&magic::PEER)?;
        self.encode_fields(splice)?;
        splice.write_signature(&self.sig)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let key = splice.read_pubkey()?;
        let relay_rate = splice.read_u64()?;
        let expiry = splice.read_duration()?;
        let sig = splice.read_signature()?;
        Ok(Self {
            id,
            key,
            relay_rate,
            expiry,
            sig,
        })
    }

    fn signed_digest(&self) -> Result<[u8; 32]> {
        let mut splice = Splice::with_capacity(self.len() - SIGNATURE_LEN);
        self.encode_fields(&mut splice)?;
        Ok(hash(&splice.into_bytes()))
    }

    pub fn sign(&mut self, prv: &PrivateKey) -> Result<()> {
        let digest = self.signed_digest()?;
        self.sig = sign(prv, &digest)?;
        Ok(())
    }

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
    fn sign_verify_roundtrip() {
        let id = Identity::generate();
        let mut ad = PeerAd {
            id: [4u8; 8],
            key: id.public,
            relay_rate: 250,
            expiry: Duration::from_secs(86_400),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();

        let mut s = Splice::with_capacity(ad.len() + 4);
        ad.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_magic().unwrap(), magic::PEER);
        let decoded = PeerAd::decode(&mut r).unwrap();
        assert_eq!(decoded, ad);
        decoded.verify().unwrap();
    }
}
