//! `Delay`: waits, then re-dispatches its inner layer.

use std::time::Duration;

use indra_crypto::{Id, ID_LEN};
use indra_splice::Splice;

use crate::context::EngineContext;
use crate::error::Result;
use crate::layer::{Inner, Layer};

#[derive(Debug, Clone)]
pub struct Delay {
    pub duration: Duration,
    /// The session the circuit builder designated to pay for this
    /// hop's storage time, debited when the wait elapses.
    pub billing_session: Id,
    pub inner: Inner,
}

impl Delay {
    pub fn new(duration: Duration, billing_session: Id, inner: Layer) -> Self {
        Self {
            duration,
            billing_session,
            inner: Inner::Decoded(Box::new(inner)),
        }
    }

    pub fn field_len(&self) -> usize {
        8 + ID_LEN + self.inner.len()
    }

    pub fn encode_fields(&self, splice: &mut Splice) -> Result<()> {
        splice.write_duration(self.duration)?;
        splice.write_id(&self.billing_session)?;
        self.inner.encode(splice)
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let duration = splice.read_duration()?;
        let billing_session = splice.read_id()?;
        let inner = Inner::decode_raw(splice);
        Ok(Self {
            duration,
            billing_session,
            inner,
        })
    }

    /// Hands the wait off to the engine's timer queue, which debits
    /// `billing_session` for the storage time once it fires.
    pub fn handle(self, ctx: &dyn EngineContext) -> Result<()> {
        let bytes = self.inner.into_bytes()?;
        ctx.schedule_delay(self.duration, self.billing_session, bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_decode_roundtrips() {
        let d = Delay {
            duration: Duration::from_secs(5),
            billing_session: [3u8; 8],
            inner: Inner::Raw(vec![1, 2]),
        };
        let mut s = Splice::with_capacity(d.field_len());
        d.encode_fields(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = Delay::decode(&mut r).unwrap();
        assert_eq!(decoded.duration, d.duration);
        assert_eq!(decoded.billing_session, d.billing_session);
    }
}
