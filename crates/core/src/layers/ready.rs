//! `Ready`: the hidden service's five-hop reply-path terminator,
//! returned to the client through the introducer. Carries both the
//! client-facing and service-facing routing headers plus their reply
//! ciphers/nonces, so either side can address the other without a
//! further handshake.

use indra_crypto::{Id, Iv, PublicKey, ID_LEN, PUBLIC_KEY_LEN};
use indra_splice::Splice;

use crate::error::Result;
use crate::header::{RoutingHeader, ROUTING_HEADER_LEN};

#[derive(Debug, Clone)]
pub struct Ready {
    pub id: Id,
    pub service_key: PublicKey,
    pub client_header: RoutingHeader,
    pub service_header: RoutingHeader,
    pub client_ciphers: [[u8; 32]; 3],
    pub service_ciphers: [[u8; 32]; 3],
    pub client_nonces: [Iv; 3],
    pub service_nonces: [Iv; 3],
}

impl Ready {
    pub fn field_len(&self) -> usize {
        ID_LEN + PUBLIC_KEY_LEN + ROUTING_HEADER_LEN * 2 + 32 * 3 * 2 + 16 * 3 * 2
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.service_key)?;
        self.client_header.encode(splice)?;
        self.service_header.encode(splice)?;
        splice.write_hash_triple(&self.client_ciphers)?;
        splice.write_hash_triple(&self.service_ciphers)?;
        splice.write_iv_triple(&self.client_nonces)?;
        splice.write_iv_triple(&self.service_nonces)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            id: splice.read_id()?,
            service_key: splice.read_pubkey()?,
            client_header: RoutingHeader::decode(splice)?,
            service_header: RoutingHeader::decode(splice)?,
            client_ciphers: splice.read_hash_triple()?,
            service_ciphers: splice.read_hash_triple()?,
            client_nonces: splice.read_iv_triple()?,
            service_nonces: splice.read_iv_triple()?,
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
        let ready = Ready {
            id: [7u8; 8],
            service_key: Identity::generate().public,
            client_header: sample_header(),
            service_header: sample_header(),
            client_ciphers: [[1u8; 32]; 3],
            service_ciphers: [[2u8; 32]; 3],
            client_nonces: [[3u8; 16]; 3],
            service_nonces: [[4u8; 16]; 3],
        };
        let mut s = Splice::with_capacity(ready.field_len());
        ready.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Ready::decode(&mut r).unwrap();
        assert_eq!(decoded.id, ready.id);
        assert_eq!(decoded.client_header, ready.client_header);
    }
}
