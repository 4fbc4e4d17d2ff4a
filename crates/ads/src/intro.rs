//! `IntroAd`: an introduction point gossiping that it will forward
//! `Route` layers to a hidden service. It carries the
//! `indra_core::Introduction` token the service handed this
//! introducer, re-signed under the introducer's own key so the
//! gossip network can verify the ad without trusting the introducer's
//! transport.

use std::time::Duration;

use indra_core::Introduction;
use indra_crypto::{hash, recover, sign, Id, PrivateKey, PublicKey, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use indra_splice::Splice;

use crate::error::{AdsError, Result};
use crate::magic;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntroAd {
    pub id: Id,
    /// The introducer's own identity key; this ad is signed with the
    /// matching private key.
    pub key: PublicKey,
    /// The hidden service's token authorising this introducer.
    pub token: Introduction,
    pub expiry: Duration,
    pub sig: Signature,
}

impl IntroAd {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + self.token.len() + 8 + SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        self.token.encode(splice)?;
        splice.write_duration(self.expiry)?;
        Ok(())
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&magic::INTRO)?;
        self.encode_fields(splice)?;
        splice.write_signature(&self.sig)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let key = splice.read_pubkey()?;
        let token = Introduction::decode(splice)?;
        let expiry = splice.read_duration()?;
        let sig = splice.read_signature()?;
        Ok(Self {
            id,
            key,
            token,
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
