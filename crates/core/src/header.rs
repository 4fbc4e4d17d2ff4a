//! Routing headers and hidden-service introductions.
//!
//! A routing header is three pre-built reply segments a recipient can
//! replay without knowing the path. Each segment is exactly what a
//! `Crypt` layer needs to address one hop: a cloaked header-key tag, an
//! ephemeral public key, and an IV.

use std::time::Duration;

use indra_crypto::{CloakedKey, Iv, PublicKey, CLOAK_LEN, IV_LEN, PUBLIC_KEY_LEN};
use indra_splice::Splice;

use crate::error::Result;

/// One hop's worth of reply-path addressing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplySegment {
    pub to_header: CloakedKey,
    pub from_pub: PublicKey,
    pub iv: Iv,
}

pub const REPLY_SEGMENT_LEN: usize = CLOAK_LEN + PUBLIC_KEY_LEN + IV_LEN;

impl ReplySegment {
    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_cloaked(&self.to_header)?;
        splice.write_pubkey(&self.from_pub)?;
        splice.write_iv(&self.iv)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            to_header: splice.read_cloaked()?,
            from_pub: splice.read_pubkey()?,
            iv: splice.read_iv()?,
        })
    }
}

/// Three pre-built reply segments, replayed one hop at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingHeader {
    pub segments: [ReplySegment; 3],
}

pub const ROUTING_HEADER_LEN: usize = REPLY_SEGMENT_LEN * 3;

impl RoutingHeader {
    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        for segment in &self.segments {
            segment.encode(splice)?;
        }
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        let segments = [
            ReplySegment::decode(splice)?,
            ReplySegment::decode(splice)?,
            ReplySegment::decode(splice)?,
        ];
        Ok(Self { segments })
    }

    /// Shift the header forward one hop for the reply direction: the
    /// segment this hop just consumed is dropped, the remaining two
    /// slide down, and a fresh noise segment is appended so the header
    /// stays a constant three segments long.
    pub fn shift_for_reply(&mut self, noise: ReplySegment) {
        self.segments = [self.segments[1].clone(), self.segments[2].clone(), noise];
    }
}

/// A signed advertisement that an introducer will forward a `Route`
/// layer to a hidden service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Introduction {
    pub id: indra_crypto::Id,
    pub key: PublicKey,
    pub addr: String,
    pub expiry: Duration,
    pub signature: indra_crypto::Signature,
}

impl Introduction {
    pub fn len(&self) -> usize {
        8 + PUBLIC_KEY_LEN + 2 + self.addr.len() + 8 + indra_crypto::SIGNATURE_LEN
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_id(&self.id)?;
        splice.write_pubkey(&self.key)?;
        splice.write_multiaddr(&self.addr)?;
        splice.write_duration(self.expiry)?;
        splice.write_signature(&self.signature)?;
        Ok(())
    }

    pub fn decode(splice: &mut Splice) -> Result<Self> {
        Ok(Self {
            id: splice.read_id()?,
            key: splice.read_pubkey()?,
            addr: splice.read_multiaddr()?,
            expiry: splice.read_duration()?,
            signature: splice.read_signature()?,
        })
    }

    /// The bytes the signature covers: everything but the signature
    /// itself.
    pub fn signed_bytes(&self) -> Vec<u8> {
        let mut splice = Splice::with_capacity(self.len() - indra_crypto::SIGNATURE_LEN);
        let _ = splice.write_id(&self.id);
        let _ = splice.write_pubkey(&self.key);
        let _ = splice.write_multiaddr(&self.addr);
        let _ = splice.write_duration(self.expiry);
        splice.into_bytes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::Identity;

    fn sample_segment() -> ReplySegment {
        let id = Identity::generate();
        ReplySegment {
            to_header: indra_crypto::cloak(&id.public),
            from_pub: Identity::generate().public,
            iv: [7u8; IV_LEN],
        }
    }

    #[test]
    fn routing_header_roundtrips() {
        let header = RoutingHeader {
            segments: [sample_segment(), sample_segment(), sample_segment()],
        };
        let mut s = Splice::with_capacity(ROUTING_HEADER_LEN);
        header.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(RoutingHeader::decode(&mut r).unwrap(), header);
    }

    #[test]
    fn shift_for_reply_drops_the_consumed_segment() {
        let a = sample_segment();
        let b = sample_segment();
        let c = sample_segment();
        let noise = sample_segment();
        let mut header = RoutingHeader {
            segments: [a.clone(), b.clone(), c.clone()],
        };
        header.shift_for_reply(noise.clone());
        assert_eq!(header.segments[0], b);
        assert_eq!(header.segments[1], c);
        assert_eq!(header.segments[2], noise);
    }

    #[test]
    fn introduction_roundtrips() {
        let id = Identity::generate();
        let intro = Introduction {
            id: [1u8; 8],
            key: id.public,
            addr: "/ip4/127.0.0.1/tcp/9000".to_string(),
            expiry: Duration::from_secs(3600),
            signature: [9u8; indra_crypto::SIGNATURE_LEN],
        };
        let mut s = Splice::with_capacity(intro.len());
        intro.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(Introduction::decode(&mut r).unwrap(), intro);
    }
}
