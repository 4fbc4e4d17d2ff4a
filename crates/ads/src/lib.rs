//! Ad codec (C9): five signed peer-advertisement types sharing the
//! splice wire format and the identity signature machinery, plus both
//! halves of the gossip interface a collaborator drives: `handle_ad`
//! on the consumer side, [`AdRegistry::emit_ads`] on the producer
//! side. Propagating ads between peers over the wire is still an
//! external gossip collaborator's job; this crate only guarantees
//! round-trip fidelity, signature verification, and keeping owned ads
//! signed and fresh.

mod address;
mod error;
mod intro;
mod load;
mod magic;
mod peer;
mod registry;
mod services;

pub use address::AddressAd;
pub use error::{AdsError, Result};
pub use intro::IntroAd;
pub use load::LoadAd;
pub use peer::PeerAd;
pub use registry::AdRegistry;
pub use services::{ServiceEntry, ServicesAd};

use std::time::Duration;

use indra_crypto::PrivateKey;
use indra_splice::Splice;

/// Any one of the five ad types, recognised by its magic prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ad {
    Address(AddressAd),
    Services(ServicesAd),
    Load(LoadAd),
    Peer(PeerAd),
    Intro(IntroAd),
}

impl Ad {
    pub fn verify(&self) -> Result<()> {
        match self {
            Ad::Address(a) => a.verify(),
            Ad::Services(a) => a.verify(),
            Ad::Load(a) => a.verify(),
            Ad::Peer(a) => a.verify(),
            Ad::Intro(a) => a.verify(),
        }
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        match self {
            Ad::Address(a) => a.encode(splice),
            Ad::Services(a) => a.encode(splice),
            Ad::Load(a) => a.encode(splice),
            Ad::Peer(a) => a.encode(splice),
            Ad::Intro(a) => a.encode(splice),
        }
    }

    pub fn expiry(&self) -> Duration {
        match self {
            Ad::Address(a) => a.expiry,
            Ad::Services(a) => a.expiry,
            Ad::Load(a) => a.expiry,
            Ad::Peer(a) => a.expiry,
            Ad::Intro(a) => a.expiry,
        }
    }

    fn set_expiry(&mut self, expiry: Duration) {
        match self {
            Ad::Address(a) => a.expiry = expiry,
            Ad::Services(a) => a.expiry = expiry,
            Ad::Load(a) => a.expiry = expiry,
            Ad::Peer(a) => a.expiry = expiry,
            Ad::Intro(a) => a.expiry = expiry,
        }
    }

    fn resign(&mut self, prv: &PrivateKey) -> Result<()> {
        match self {
            Ad::Address(a) => a.sign(prv),
            Ad::Services(a) => a.sign(prv),
            Ad::Load(a) => a.sign(prv),
            Ad::Peer(a) => a.sign(prv),
            Ad::Intro(a) => a.sign(prv),
        }
    }
}

/// Decode whichever ad type `bytes` starts with and check its
/// signature. This is the single entry point a gossip collaborator
/// needs.
pub fn handle_ad(bytes: &[u8]) -> Result<Ad> {
    let mut splice = Splice::from_slice(bytes);
    let ad_magic = splice.peek_magic()?;
    let ad = match ad_magic {
        m if m == magic::ADDRESS => {
            splice.read_magic()?;
            Ad::Address(AddressAd::decode(&mut splice)?)
        }
        m if m == magic::SERVICES => {
            splice.read_magic()?;
            Ad::Services(ServicesAd::decode(&mut splice)?)
        }
        m if m == magic::LOAD => {
            splice.read_magic()?;
            Ad::Load(LoadAd::decode(&mut splice)?)
        }
        m if m == magic::PEER => {
            splice.read_magic()?;
            Ad::Peer(PeerAd::decode(&mut splice)?)
        }
        m if m == magic::INTRO => {
            splice.read_magic()?;
            Ad::Intro(IntroAd::decode(&mut splice)?)
        }
        other => return Err(AdsError::UnknownMagic(other)),
    };
    ad.verify()?;
    Ok(ad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::{Identity, SIGNATURE_LEN};
    use std::time::Duration;

    #[test]
    fn handle_ad_dispatches_by_magic_and_checks_signature() {
        let id = Identity::generate();
        let mut ad = LoadAd {
            id: [9u8; 8],
            key: id.public,
            load: 3,
            expiry: Duration::from_secs(60),
            sig: [0u8; SIGNATURE_LEN],
        };
        ad.sign(&id.private).unwrap();
        let mut s = Splice::with_capacity(ad.len() + 4);
        ad.encode(&mut s).unwrap();

        let decoded = handle_ad(&s.into_bytes()).unwrap();
        assert!(matches!(decoded, Ad::Load(_)));
    }

    #[test]
    fn handle_ad_rejects_unknown_magic() {
        assert!(matches!(handle_ad(b"xxxx"), Err(AdsError::UnknownMagic(_))));
    }
}
