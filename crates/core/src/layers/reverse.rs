//! `Reverse`: wire-identical to `Forward` — fields are `next_addr`,
//! `inner`, nothing else. What makes it `Reverse` and not `Forward` is
//! what's inside that opaque `inner` remainder: its leading
//! `ROUTING_HEADER_LEN` bytes are a three-segment reply routing
//! header, the same raw-prefix convention `Crypt::new_session` uses
//! to split header-key material from payload-key material. Unlike
//! `Forward`, this hop shifts that header forward one segment before
//! relaying: the segment it just consumed is dropped, the remaining
//! two slide down, and a fresh noise segment is appended, per §4.5.

use rand::rngs::OsRng;
use rand::RngCore;

use indra_crypto::{cloak, IV_LEN};
use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;
use crate::header::{ReplySegment, RoutingHeader, ROUTING_HEADER_LEN};
use crate::layer::{Inner, Layer};
use crate::layers::pad_with_random;

#[derive(Debug, Clone)]
pub struct Reverse {
    pub next_addr: String,
    pub inner: Inner,
}

impl Reverse {
    /// Build a fresh `Reverse` whose `inner` is `routing_header ∥
    /// encode(inner)`: the same bytes `handle` will later peel the
    /// header back off of.
    pub fn new(next_addr: String, routing_header: RoutingHeader, inner: Layer) -> Result<Self> {
        let mut body = Splice::with_capacity(ROUTING_HEADER_LEN + inner.len());
        routing_header.encode(&mut body)?;
        inner.encode(&mut body)?;
        Ok(Self {
            next_addr,
            inner: Inner::Raw(body.into_bytes()),
        })
    }

    pub fn field_len(&self) -> usize {
        2 + self.next_addr.len() + self.inner.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_multiaddr(&self.next_addr)?;
        self.inner.encode(splice)
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let next_addr = splice.read_multiaddr()?;
        let inner = Inner::decode_raw(splice);
        Ok(Self { next_addr, inner })
    }

    /// Peel the routing header off the leading `ROUTING_HEADER_LEN`
    /// bytes of the raw remainder, shift it forward one segment, and
    /// relay the shifted header plus the unchanged tail on to
    /// `next_addr`, padded back up to this layer's own encoded length
    /// the same way `Forward` is. The fresh noise segment comes from
    /// the engine's ephemeral key-set generator so it is
    /// indistinguishable from a real hop's segment to anyone without
    /// the corresponding private key.
    pub fn handle(self, ctx: &dyn EngineContext) -> Result<()> {
        let target_len = indra_splice::MAGIC_LEN + self.field_len();
        let bytes = self.inner.into_bytes()?;
        let mut reader = Splice::from_bytes(bytes);
        let mut routing_header = RoutingHeader::decode(&mut reader)?;
        let tail = reader.take_to_end();

        let mut iv = [0u8; IV_LEN];
        OsRng.fill_bytes(&mut iv);
        let noise = ReplySegment {
            to_header: cloak(&ctx.fresh_public_key()),
            from_pub: ctx.fresh_public_key(),
            iv,
        };
        routing_header.shift_for_reply(noise);

        let mut out = Splice::with_capacity(ROUTING_HEADER_LEN + tail.len());
        routing_header.encode(&mut out)?;
        out.write_raw(&tail)?;
        let mut out_bytes = out.into_bytes();
        pad_with_random(&mut out_bytes, target_len);
        ctx.send(&self.next_addr, out_bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::Identity;

    fn sample_segment() -> ReplySegment {
        ReplySegment {
            to_header: cloak(&Identity::generate().public),
            from_pub: Identity::generate().public,
            iv: [7u8; IV_LEN],
        }
    }

    fn sample_header() -> RoutingHeader {
        RoutingHeader {
            segments: [sample_segment(), sample_segment(), sample_segment()],
        }
    }

    #[test]
    fn encode_decode_roundtrips_with_header_folded_into_inner() {
        let header = sample_header();
        let mut body = Splice::with_capacity(ROUTING_HEADER_LEN + 3);
        header.encode(&mut body).unwrap();
        body.write_raw(&[9, 9, 9]).unwrap();

        let r = Reverse {
            next_addr: "/ip4/10.0.0.2/tcp/8444".into(),
            inner: Inner::Raw(body.into_bytes()),
        };
        let mut s = Splice::with_capacity(r.field_len());
        r.encode_fields(&mut s).unwrap();
        let mut reader = Splice::from_bytes(s.into_bytes());
        let decoded = Reverse::decode(&mut reader).unwrap();
        assert_eq!(decoded.next_addr, r.next_addr);

        match decoded.inner {
            Inner::Raw(bytes) => {
                let mut inner_reader = Splice::from_bytes(bytes);
                assert_eq!(RoutingHeader::decode(&mut inner_reader).unwrap(), header);
                assert_eq!(inner_reader.take_to_end(), vec![9, 9, 9]);
            }
            Inner::Decoded(_) => panic!("expected raw inner"),
        }
    }

    #[test]
    fn new_folds_the_routing_header_into_inners_leading_bytes() {
        use crate::layers::confirmation::Confirmation;

        crate::registry::register_all();
        let header = sample_header();
        let inner_layer = Layer::Confirmation(Confirmation { id: [3u8; 8], load: 0 });
        let r = Reverse::new("/ip4/10.0.0.2/tcp/8444".into(), header.clone(), inner_layer.clone())
            .unwrap();

        let bytes = r.inner.into_bytes().unwrap();
        let mut reader = Splice::from_bytes(bytes);
        assert_eq!(RoutingHeader::decode(&mut reader).unwrap(), header);
        let rest = reader.take_to_end();
        let mut rest_reader = Splice::from_bytes(rest);
        let decoded_inner = crate::registry::decode_chain(&mut rest_reader).unwrap();
        match decoded_inner {
            Layer::Confirmation(c) => assert_eq!(c.id, [3u8; 8]),
            _ => panic!("expected confirmation"),
        }
    }
}
