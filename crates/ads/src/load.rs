//! `LoadAd`: a relay's self-reported load sample, gossiped so peers
//! can weight route selection away from saturated hops.

use std::time::Duration;

use indra_crypto::{hash, recover, sign, Id, PrivateKey, PublicKey, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use indra_splice::Splice;

use crate::error::{AdsError, Result};
use crate::magic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadAd {
    pub id: Id,
    pub key: PublicKey,
    /// 0 idle, 255 saturated.
    pub load: u8,
    pub expiry: Duration,
    pub sig: Signature,
}

impl LoadAd {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + 1 + 8 + SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        splice.write_u8(self.load)?;
        splice.write_duration(self.expiry)?;
        Ok(())
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&magic::LOAD)?;
        self.encode_fields(splice)?;
        splice.write_signature(&self.sig)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let key = splice.read_pubkey()?;
        let load = splice.read_u8()?;
        let expiry = splice.read_duration()?;
        let sig = splice.read_signature()?;
        Ok(Self {
            id,
            key,
            load,
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
