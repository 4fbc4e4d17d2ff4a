//! `HiddenService`: announces an introduction point plus the reply
//! ciphers/nonces and inline routing header an introducer uses to
//! forward a `Route` request through to the service.
//!
//! The on-wire layout resolves the specification's open question
//! about the two divergent source encodings by taking the superset:
//! the signed `Introduction`, then the three reply cipher/nonce
//! pairs, then an inline routing header consuming the rest of the
//! splice (frozen here as the canonical form).

use indra_crypto::Iv;
use indra_splice::Splice;

use crate::error::Result;
use crate::header::{Introduction, RoutingHeader};

#[derive(Debug, Clone)]
pub struct HiddenService {
    pub intro: Introduction,
    pub ciphers: [[u8; 32]; 3],
    pub nonces: [Iv; 3],
    pub routing_header: RoutingHeader,
}

impl HiddenService {
    pub fn field_len(&self) -> usize {
        self.intro.len() + 32 * 3 + 16 * 3 + crate::header::ROUTING_HEADER_LEN
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        self.intro.encode(splice)?;
        splice.write_hash_triple(&self.ciphers)?;
        splice.write_iv_triple(&self.nonces)?;
        self.routing_header.encode(splice)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let intro = Introduction::decode(splice)?;
        let ciphers = splice.read_hash_triple()?;
        let nonces = splice.read_iv_triple()?;
        let routing_header = RoutingHeader::decode(splice)?;
        Ok(Self {
            intro,
            ciphers,
            nonces,
            routing_header,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::{cloak, Identity};
    use std::time::Duration;

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
        let id = Identity::generate();
        let hs = HiddenService {
            intro: Introduction {
                id: [1u8; 8],
                key: id.public,
                addr: "/ip4/127.0.0.1/tcp/9001".into(),
                expiry: Duration::from_secs(600),
                signature: [0u8; indra_crypto::SIGNATURE_LEN],
            },
            ciphers: [[5u8; 32]; 3],
            nonces: [[6u8; 16]; 3],
            routing_header: sample_header(),
        };
        let mut s = Splice::with_capacity(hs.field_len());
        hs.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = HiddenService::decode(&mut r).unwrap();
        assert_eq!(decoded.intro, hs.intro);
        assert_eq!(decoded.routing_header, hs.routing_header);
    }
}
