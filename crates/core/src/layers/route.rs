//! `Route`: a client's request, via an introducer, to open a
//! rendezvous with a hidden service.
//!
//! Mirrors the original's two-phase shape: a cleartext header the
//! introducer can always read (who the service is, addressed by
//! cloak tag), and a body only the hidden service's private key can
//! decrypt, carrying the three reply ciphers/nonces and the routing
//! header the service should answer through.

use indra_crypto::{
    encipher, shared_secret, CloakedKey, Id, Iv, PrivateKey, PublicKey, CLOAK_LEN, ID_LEN,
    IV_LEN, PUBLIC_KEY_LEN,
};
use indra_splice::Splice;

use crate::error::{CoreError, Result};
use crate::header::{RoutingHeader, ROUTING_HEADER_LEN};

#[derive(Debug, Clone)]
pub enum RouteBody {
    Ciphertext(Vec<u8>),
    Decoded {
        id: Id,
        ciphers: [[u8; 32]; 3],
        nonces: [Iv; 3],
        routing_header: RoutingHeader,
    },
}

const DECODED_BODY_LEN: usize = ID_LEN + 32 * 3 + IV_LEN * 3 + ROUTING_HEADER_LEN;

#[derive(Debug, Clone)]
pub struct Route {
    pub hidden_service: CloakedKey,
    pub sender_pub: PublicKey,
    pub iv: Iv,
    pub body: RouteBody,
}

impl Route {
    pub fn field_len(&self) -> usize {
        CLOAK_LEN
            + PUBLIC_KEY_LEN
            + IV_LEN
            + match &self.body {
                RouteBody::Ciphertext(bytes) => bytes.len(),
                RouteBody::Decoded { .. } => DECODED_BODY_LEN,
            }
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_cloaked(&self.hidden_service)?;
        splice.write_pubkey(&self.sender_pub)?;
        splice.write_iv(&self.iv)?;
        match &self.body {
            RouteBody::Ciphertext(bytes) => {
                splice.write_raw(bytes)?;
            }
            RouteBody::Decoded {
                id,
                ciphers,
                nonces,
                routing_header,
            } => {
                splice.write_id(id)?;
                splice.write_hash_triple(ciphers)?;
                splice.write_iv_triple(nonces)?;
                routing_header.encode(splice)?;
            }
        }
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let hidden_service = splice.read_cloaked()?;
        let sender_pub = splice.read_pubkey()?;
        let iv = splice.read_iv()?;
        let ciphertext = splice.take_to_end();
        Ok(Self {
            hidden_service,
            sender_pub,
            iv,
            body: RouteBody::Ciphertext(ciphertext),
        })
    }

    /// Decrypt with the hidden service's private key, once the
    /// introducer has located it via the cloak tag.
    pub fn decrypt(&mut self, service_prv: &PrivateKey) -> Result<()> {
        let ciphertext = match std::mem::replace(&mut self.body, RouteBody::Ciphertext(Vec::new()))
        {
            RouteBody::Ciphertext(bytes) => bytes,
            decoded @ RouteBody::Decoded { .. } => {
                self.body = decoded;
                return Err(CoreError::TerminalLayer("route already decrypted"));
            }
        };
        let key = shared_secret(service_prv, &self.sender_pub)?;
        let mut plaintext = ciphertext;
        encipher(&key, &self.iv, &mut plaintext);
        let mut reader = Splice::from_bytes(plaintext);
        let id = reader.read_id()?;
        let ciphers = reader.read_hash_triple()?;
        let nonces = reader.read_iv_triple()?;
        let routing_header = RoutingHeader::decode(&mut reader)?;
        self.body = RouteBody::Decoded {
            id,
            ciphers,
            nonces,
            routing_header,
        };
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::{cloak, Identity};

    fn sample_header() -> RoutingHeader {
        let seg = || crate::header::ReplySegment {
            to_header: cloak(&Identity::generate().public),
            from_pub: Identity::generate().public,
            iv: [1u8; IV_LEN],
        };
        RoutingHeader {
            segments: [seg(), seg(), seg()],
        }
    }

    #[test]
    fn decrypts_with_service_key() {
        let service = Identity::generate();
        let sender = Identity::generate();
        let iv = [2u8; IV_LEN];

        let mut plain = Splice::with_capacity(DECODED_BODY_LEN);
        plain.write_id(&[5u8; ID_LEN]).unwrap();
        plain.write_hash_triple(&[[1u8; 32]; 3]).unwrap();
        plain.write_iv_triple(&[[2u8; IV_LEN]; 3]).unwrap();
        sample_header().encode(&mut plain).unwrap();
        let mut bytes = plain.into_bytes();
        let key = shared_secret(&sender.private, &service.public).unwrap();
        encipher(&key, &iv, &mut bytes);

        let mut route = Route {
            hidden_service: cloak(&service.public),
            sender_pub: sender.public,
            iv,
            body: RouteBody::Ciphertext(bytes),
        };
        route.decrypt(&service.private).unwrap();
        match route.body {
            RouteBody::Decoded { id, .. } => assert_eq!(id, [5u8; ID_LEN]),
            _ => panic!("expected decoded body"),
        }
    }
}
