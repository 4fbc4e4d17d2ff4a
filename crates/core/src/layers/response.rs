//! `Response`: an exit's reply back to the client. Terminal.

use indra_crypto::Id;
use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Response {
    pub id: Id,
    pub port: u16,
    pub load: u8,
    pub bytes: Vec<u8>,
}

impl Response {
    pub fn field_len(&self) -> usize {
        8 + 2 + 1 + 4 + self.bytes.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_u16(self.port)?;
        splice.write_u8(self.load)?;
        splice.write_var_bytes(&self.bytes)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            id: splice.read_id()?,
            port: splice.read_u16()?,
            load: splice.read_u8()?,
            bytes: splice.read_var_bytes()?,
        })
    }

    pub fn handle(self, ctx: &dyn EngineContext) {
        ctx.complete_response(self.id, self.port, self.load, self.bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips() {
        let r = Response {
            id: [4u8; 8],
            port: 443,
            load: 12,
            bytes: b"200 OK".to_vec(),
        };
        let mut s = Splice::with_capacity(r.field_len());
        r.encode_fields(&mut s).unwrap();
        let mut reader = Splice::from_bytes(s.into_bytes());
        let decoded = Response::decode(&mut reader).unwrap();
        assert_eq!(decoded.id, r.id);
        assert_eq!(decoded.bytes, r.bytes);
    }
}
