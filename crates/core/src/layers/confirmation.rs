//! `Confirmation`: fires a pending callback by ID, no payload.

use indra_crypto::Id;
use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;

#[derive(Debug, Clone)]
pub struct Confirmation {
    pub id: Id,
    pub load: u8,
}

impl Confirmation {
    pub fn field_len(&self) -> usize {
        8 + 1
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_u8(self.load)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            id: splice.read_id()?,
            load: splice.read_u8()?,
        })
    }

    pub fn handle(self, ctx: &dyn EngineContext) {
        ctx.fire_confirmation(self.id, self.load);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips() {
        let c = Confirmation {
            id: [0xAA; 8],
            load: 3,
        };
        let mut s = Splice::with_capacity(c.field_len());
        c.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Confirmation::decode(&mut r).unwrap();
        assert_eq!(decoded.id, c.id);
        assert_eq!(decoded.load, c.load);
    }
}
