//! `Forward`: relay the remainder to the next hop's address, padded
//! back up to this layer's own encoded length so stripping
//! `next_addr` off doesn't shrink the packet a relay hands onward.

use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;
use crate::layer::{Inner, Layer};
use crate::layers::pad_with_random;

#[derive(Debug, Clone)]
pub struct Forward {
    pub next_addr: String,
    pub inner: Inner,
}

impl Forward {
    pub fn new(next_addr: String, inner: Layer) -> Self {
        Self {
            next_addr,
            inner: Inner::Decoded(Box::new(inner)),
        }
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

    /// A relay can't decrypt what isn't addressed to it; it carries
    /// the remainder on to `next_addr`, padded with random bytes back
    /// up to this layer's own encoded length (magic included) so the
    /// packet doesn't shrink by the `next_addr` bytes just stripped
    /// off, per §4.5.
    pub fn handle(self, ctx: &dyn EngineContext) -> Result<()> {
        let target_len = indra_splice::MAGIC_LEN + self.field_len();
        let mut bytes = self.inner.into_bytes()?;
        pad_with_random(&mut bytes, target_len);
        ctx.send(&self.next_addr, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips_raw_inner() {
        let f = Forward {
            next_addr: "/ip4/10.0.0.1/tcp/8443".into(),
            inner: Inner::Raw(vec![1, 2, 3, 4]),
        };
        let mut s = Splice::with_capacity(f.field_len());
        f.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Forward::decode(&mut r).unwrap();
        assert_eq!(decoded.next_addr, f.next_addr);
        match decoded.inner {
            Inner::Raw(bytes) => assert_eq!(bytes, vec![1, 2, 3, 4]),
            _ => panic!("expected raw inner"),
        }
    }
}
