//! `Session`: installs a session by matching a payment preimage
//! carried as two cleartext private keys inside the encrypted onion.

use indra_crypto::{hash, PrivateKey, PRIVATE_KEY_LEN};
use indra_splice::Splice;
use tracing::debug;

use crate::context::EngineContext;
use crate::error::Result;
use crate::layer::Inner;

#[derive(Debug, Clone)]
pub struct SessionLayer {
    pub hop_index: u8,
    pub header_prv: PrivateKey,
    pub payload_prv: PrivateKey,
    pub inner: Inner,
}

impl SessionLayer {
    pub fn field_len(&self) -> usize {
        1 + PRIVATE_KEY_LEN * 2 + self.inner.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_u8(self.hop_index)?;
        splice.write_prvkey(&self.header_prv)?;
        splice.write_prvkey(&self.payload_prv)?;
        self.inner.encode(splice)
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let hop_index = splice.read_u8()?;
        let header_prv = splice.read_prvkey()?;
        let payload_prv = splice.read_prvkey()?;
        let inner = Inner::decode_raw(splice);
        Ok(Self {
            hop_index,
            header_prv,
            payload_prv,
            inner,
        })
    }

    /// `H(header_prv ∥ payload_prv)` — the preimage the paying client
    /// committed to when it funded this session.
    pub fn preimage_hash(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(PRIVATE_KEY_LEN * 2);
        buf.extend_from_slice(&self.header_prv.to_bytes());
        buf.extend_from_slice(&self.payload_prv.to_bytes());
        hash(&buf)
    }

    pub fn handle(self, prev: Option<&str>, ctx: &dyn EngineContext) -> Result<()> {
        let installed = ctx.install_session(
            self.hop_index,
            self.header_prv.clone(),
            self.payload_prv.clone(),
            prev.map(str::to_owned),
        );
        if !installed {
            debug!(hop_index = self.hop_index, "session install had no matching pending payment");
            return Ok(());
        }
        if !self.inner.is_empty() {
            let inner = self.inner.decoded()?;
            return inner.handle(prev, ctx);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::PrivateKey as Prv;

    #[test]
    fn encode_decode_roundtrips() {
        let s = SessionLayer {
            hop_index: 2,
            header_prv: Prv::generate(),
            payload_prv: Prv::generate(),
            inner: Inner::Raw(vec![]),
        };
        let mut splice = Splice::with_capacity(s.field_len());
        s.encode_fields(&mut splice).unwrap();
        let mut r = Splice::from_bytes(splice.into_bytes());
        let decoded = SessionLayer::decode(&mut r).unwrap();
        assert_eq!(decoded.hop_index, 2);
        assert_eq!(decoded.header_prv.to_bytes(), s.header_prv.to_bytes());
    }

    #[test]
    fn preimage_hash_is_deterministic() {
        let s = SessionLayer {
            hop_index: 0,
            header_prv: Prv::generate(),
            payload_prv: Prv::generate(),
            inner: Inner::Raw(vec![]),
        };
        assert_eq!(s.preimage_hash(), s.preimage_hash());
    }
}
