//! `Message`: the general forward-and-reply envelope once a client
//! holds a hidden service's `Ready` header. Carries a forward routing
//! header (how to reach the service), a return routing header plus
//! its three reply ciphers/nonces (how the service replies), and an
//! opaque payload.

use indra_crypto::{Id, Iv, PublicKey, ID_LEN, PUBLIC_KEY_LEN};
use indra_splice::Splice;

use crate::error::Result;
use crate::header::{RoutingHeader, ROUTING_HEADER_LEN};

#[derive(Debug, Clone)]
pub struct Message {
    pub address: PublicKey,
    pub id: Id,
    pub reply_to: Id,
    pub forward_header: RoutingHeader,
    pub return_header: RoutingHeader,
    pub return_ciphers: [[u8; 32]; 3],
    pub return_nonces: [Iv; 3],
    pub payload: Vec<u8>,
}

impl Message {
    pub fn field_len(&self) -> usize {
        PUBLIC_KEY_LEN
            + ID_LEN * 2
            + ROUTING_HEADER_LEN * 2
            + 32 * 3
            + 16 * 3
            + 4
            + self.payload.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_pubkey(&self.address)?;
        splice.write_id(&self.id)?;
        splice.write_id(&self.reply_to)?;
        self.forward_header.encode(splice)?;
        self.return_header.encode(splice)?;
        splice.write_hash_triple(&self.return_ciphers)?;
        splice.write_iv_triple(&self.return_nonces)?;
        splice.write_var_bytes(&self.payload)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            address: splice.read_pubkey()?,
            id: splice.read_id()?,
            reply_to: splice.read_id()?,
            forward_header: RoutingHeader::decode(splice)?,
            return_header: RoutingHeader::decode(splice)?,
            return_ciphers: splice.read_hash_triple()?,
            return_nonces: splice.read_iv_triple()?,
            payload: splice.read_var_bytes()?,
        })
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
            iv: [1u8; 16],
        };
        RoutingHeader {
            segments: [seg(), seg(), seg()],
        }
    }

    #[test]
    fn encode_decode_roundtrips() {
        let message = Message {
            address: Identity::generate().public,
            id: [1u8; 8],
            reply_to: [2u8; 8],
            forward_header: sample_header(),
            return_header: sample_header(),
            return_ciphers: [[3u8; 32]; 3],
            return_nonces: [[4u8; 16]; 3],
            payload: b"hello hidden service".to_vec(),
        };
        let mut s = Splice::with_capacity(message.field_len());
        message.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Message::decode(&mut r).unwrap();
        assert_eq!(decoded.id, message.id);
        assert_eq!(decoded.payload, message.payload);
    }
}
