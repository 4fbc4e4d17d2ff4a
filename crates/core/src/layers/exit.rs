//! `Exit`: forwards a payload to a locally registered service and
//! wraps its response for the reply path.

use indra_crypto::{Id, Iv};
use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;
use crate::layer::{Inner, Layer};

#[derive(Debug, Clone)]
pub struct Exit {
    pub id: Id,
    pub port: u16,
    pub ciphers: [[u8; 32]; 3],
    pub nonces: [Iv; 3],
    pub payload: Vec<u8>,
    pub inner: Inner,
}

impl Exit {
    pub fn new(
        id: Id,
        port: u16,
        ciphers: [[u8; 32]; 3],
        nonces: [Iv; 3],
        payload: Vec<u8>,
    ) -> Self {
        Self {
            id,
            port,
            ciphers,
            nonces,
            payload,
            inner: Inner::Decoded(Box::new(Layer::End)),
        }
    }

    pub fn field_len(&self) -> usize {
        8 + 2 + 32 * 3 + 16 * 3 + 4 + self.payload.len() + self.inner.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_u16(self.port)?;
        splice.write_hash_triple(&self.ciphers)?;
        splice.write_iv_triple(&self.nonces)?;
        splice.write_var_bytes(&self.payload)?;
        self.inner.encode(splice)
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let id = splice.read_id()?;
        let port = splice.read_u16()?;
        let ciphers = splice.read_hash_triple()?;
        let nonces = splice.read_iv_triple()?;
        let payload = splice.read_var_bytes()?;
        let inner = Inner::decode_raw(splice);
        Ok(Self {
            id,
            port,
            ciphers,
            nonces,
            payload,
            inner,
        })
    }

    /// Hands the payload to the locally registered service on `port`.
    /// The response is wrapped and returned asynchronously (exit
    /// round-trips are spawned independently of the dispatcher, per
    /// the concurrency model), so this only kicks the request off.
    pub fn handle(self, prev: Option<&str>, ctx: &dyn EngineContext) -> Result<()> {
        ctx.dispatch_exit(
            self.id,
            self.port,
            self.payload,
            self.ciphers,
            self.nonces,
            prev.map(str::to_owned),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips() {
        let exit = Exit::new([1u8; 8], 80, [[2u8; 32]; 3], [[3u8; 16]; 3], b"GET /".to_vec());
        let mut s = Splice::with_capacity(exit.field_len());
        exit.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Exit::decode(&mut r).unwrap();
        assert_eq!(decoded.id, exit.id);
        assert_eq!(decoded.port, exit.port);
        assert_eq!(decoded.payload, exit.payload);
    }
}
