//! `Crypt`: ECDH-derived AES-CTR over the remainder of the packet.

use indra_crypto::{
    cloak, encipher, shared_secret, CloakedKey, Iv, PrivateKey, PublicKey, CLOAK_LEN, IV_LEN,
    PUBLIC_KEY_LEN,
};
use indra_splice::Splice;

use crate::context::{CloakMatch, EngineContext};
use crate::error::{CoreError, Result};
use crate::header::ROUTING_HEADER_LEN;
use crate::layer::Layer;

#[derive(Debug, Clone)]
pub enum CryptBody {
    /// Received, recognised, not yet decrypted.
    Ciphertext(Vec<u8>),
    /// Either decrypted, or built locally by a sender who already
    /// knows the inner layer.
    Inner(Box<Layer>),
}

#[derive(Debug, Clone)]
pub struct Crypt {
    pub to_header: CloakedKey,
    pub from_pub: PublicKey,
    pub iv: Iv,
    pub body: CryptBody,
}

impl Crypt {
    /// Wrap `inner` for a hop addressed by its long-lived identity
    /// key: one ECDH-derived stream covers the whole body, since
    /// there is no separate header/payload split outside a session.
    pub fn new_identity(to_pub: &PublicKey, from_prv: &PrivateKey, iv: Iv, inner: Layer) -> Result<Self> {
        let key = shared_secret(from_prv, to_pub)?;
        let mut plain = Splice::with_capacity(inner.len());
        inner.encode(&mut plain)?;
        let mut bytes = plain.into_bytes();
        encipher(&key, &iv, &mut bytes);
        Ok(Self {
            to_header: cloak(to_pub),
            from_pub: from_prv.public_key(),
            iv,
            body: CryptBody::Ciphertext(bytes),
        })
    }

    /// Wrap `inner` for a hop addressed by an installed session: the
    /// leading `ROUTING_HEADER_LEN` bytes are covered by the header
    /// key's stream, the remainder by the payload key's, mirroring
    /// `decrypt_session`'s split.
    pub fn new_session(
        header_pub: &PublicKey,
        payload_pub: &PublicKey,
        from_prv: &PrivateKey,
        iv: Iv,
        inner: Layer,
    ) -> Result<Self> {
        let header_key = shared_secret(from_prv, header_pub)?;
        let payload_key = shared_secret(from_prv, payload_pub)?;
        let mut plain = Splice::with_capacity(inner.len());
        inner.encode(&mut plain)?;
        let mut bytes = plain.into_bytes();
        let split = ROUTING_HEADER_LEN.min(bytes.len());
        let (head, tail) = bytes.split_at_mut(split);
        encipher(&header_key, &iv, head);
        encipher(&payload_key, &iv, tail);
        Ok(Self {
            to_header: cloak(header_pub),
            from_pub: from_prv.public_key(),
            iv,
            body: CryptBody::Ciphertext(bytes),
        })
    }

    pub fn body_len(&self) -> usize {
        CLOAK_LEN
            + PUBLIC_KEY_LEN
            + IV_LEN
            + match &self.body {
                CryptBody::Ciphertext(bytes) => bytes.len(),
                CryptBody::Inner(inner) => inner.len(),
            }
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_cloaked(&self.to_header)?;
        splice.write_pubkey(&self.from_pub)?;
        splice.write_iv(&self.iv)?;
        match &self.body {
            CryptBody::Ciphertext(bytes) => {
                splice.write_raw(bytes)?;
            }
            CryptBody::Inner(inner) => {
                let mut plain = Splice::with_capacity(inner.len());
                inner.encode(&mut plain)?;
                splice.write_raw(plain.as_slice())?;
            }
        }
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let to_header = splice.read_cloaked()?;
        let from_pub = splice.read_pubkey()?;
        let iv = splice.read_iv()?;
        let ciphertext = splice.take_to_end();
        Ok(Self {
            to_header,
            from_pub,
            iv,
            body: CryptBody::Ciphertext(ciphertext),
        })
    }

    fn take_ciphertext(&mut self) -> Result<Vec<u8>> {
        match std::mem::replace(&mut self.body, CryptBody::Ciphertext(Vec::new())) {
            CryptBody::Ciphertext(bytes) => Ok(bytes),
            CryptBody::Inner(inner) => {
                self.body = CryptBody::Inner(inner);
                Err(CoreError::TerminalLayer("crypt already decrypted"))
            }
        }
    }

    /// Decrypt with the node's own identity key: no separate payload
    /// key exists outside of a session, so one stream covers the
    /// whole body.
    pub fn decrypt_identity(&mut self, identity_prv: &PrivateKey) -> Result<Layer> {
        let key = shared_secret(identity_prv, &self.from_pub)?;
        let mut plaintext = self.take_ciphertext()?;
        encipher(&key, &self.iv, &mut plaintext);
        let inner = crate::registry::decode_chain(&mut Splice::from_bytes(plaintext))?;
        self.body = CryptBody::Inner(Box::new(inner.clone()));
        Ok(inner)
    }

    /// Decrypt with a session's two keys: the header key covers the
    /// leading `ROUTING_HEADER_LEN` slice, the payload key the rest.
    pub fn decrypt_session(
        &mut self,
        header_prv: &PrivateKey,
        payload_prv: &PrivateKey,
    ) -> Result<Layer> {
        let header_key = shared_secret(header_prv, &self.from_pub)?;
        let payload_key = shared_secret(payload_prv, &self.from_pub)?;
        let mut plaintext = self.take_ciphertext()?;
        let split = ROUTING_HEADER_LEN.min(plaintext.len());
        let (head, tail) = plaintext.split_at_mut(split);
        encipher(&header_key, &self.iv, head);
        encipher(&payload_key, &self.iv, tail);
        let inner = crate::registry::decode_chain(&mut Splice::from_bytes(plaintext))?;
        self.body = CryptBody::Inner(Box::new(inner.clone()));
        Ok(inner)
    }

    /// Resolve the cloak, decrypt with whichever key matched, and
    /// return the inner layer for further dispatch.
    pub fn handle(&mut self, ctx: &dyn EngineContext) -> Result<Layer> {
        match ctx.find_cloaked(&self.to_header) {
            Some(CloakMatch::Identity) => {
                let identity = ctx.identity_private();
                self.decrypt_identity(&identity)
            }
            Some(CloakMatch::Session {
                header_prv,
                payload_prv,
            }) => self.decrypt_session(&header_prv, &payload_prv),
            None => Err(CoreError::UnknownCloak),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::confirmation::Confirmation;
    use indra_crypto::Identity;

    #[test]
    fn round_trips_through_registry_with_identity_key() {
        crate::registry::register_all();
        let receiver = Identity::generate();
        let sender = Identity::generate();
        let iv = [0u8; IV_LEN];

        let crypt = Crypt::new_identity(
            &receiver.public,
            &sender.private,
            iv,
            Layer::Confirmation(Confirmation {
                id: [0xAA; 8],
                load: 0,
            }),
        )
        .unwrap();
        let layer = Layer::Crypt(crypt);
        let mut splice = Splice::with_capacity(layer.len());
        layer.encode(&mut splice).unwrap();

        let mut reader = Splice::from_bytes(splice.into_bytes());
        let decoded = crate::registry::decode_chain(&mut reader).unwrap();
        let mut crypt = match decoded {
            Layer::Crypt(c) => c,
            _ => panic!("expected crypt"),
        };

        let inner = crypt.decrypt_identity(&receiver.private).unwrap();
        match inner {
            Layer::Confirmation(c) => assert_eq!(c.id, [0xAA; 8]),
            _ => panic!("expected confirmation"),
        }
    }
}
