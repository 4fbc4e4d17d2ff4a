//! `ServicesAd`: the set of well-known ports a peer answers on and
//! the relay rate for each.

use std::time::Duration;

use indra_crypto::{hash, recover, sign, Id, PrivateKey, PublicKey, Signature, PUBLIC_KEY_LEN, SIGNATURE_LEN};
use indra_splice::Splice;

use crate::error::{AdsError, Result};
use crate::magic;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceEntry {
    pub port: u16,
    pub relay_rate: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServicesAd {
    pub id: Id,
    pub key: PublicKey,
    pub services: Vec<ServiceEntry>,
    pub expiry: Duration,
    pub sig: Signature,
}

impl ServicesAd {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + 2 + self.services.len() * 10 + 8 + SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        splice.write_u16(self.services.len() as u16)?;
        for entry in &self.services {
            splice.write_u16(entry.port)?;
            splice.write_u64(entry.relay_rate)?;
        }
        splice.write_duration(self.expiry)?;
        Ok(())
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&magic::SERVICES)?;
        self.encode_fields(splice)?;
        splice.write_signature(&self.sig)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let key = splice.read_pubkey()?;
        let count = splice.read_u16()?;
        let mut services = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let port = splice.read_u16()?;
            let relay_rate = splice.read_u64()?;
            services.push(ServiceEntry { port, relay_rate });
        }
        let expiry = splice.read_duration()?;
        let sig = splice.read_signature()?;
        Ok(Self {
            id,
            key,
            services,
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
    fn sign_verify_roundtrip_with_multiple_services() {
        let id = Identity::generate();
        let mut ad = ServicesAd {
            id: [1u8; 8],
            key: id.public,
            services: vec![
                ServiceEntry { port: 80, relay_rate: 10 },
                ServiceEntry { port: 53, relay_rate: 2 },
            ],
            expiry: Duration::from_secs(300),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();

        let mut s = Splice::with_capacity(ad.len() + 4);
        ad.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_magic().unwrap(), magic::SERVICES);
        let decoded = ServicesAd::decode(&mut r).unwrap();
        assert_eq!(decoded, ad);
        decoded.verify().unwrap();
    }
}
