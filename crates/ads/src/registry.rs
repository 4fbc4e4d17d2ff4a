//! The producer-side half of the ad gossip interface (§6): every ad
//! this node owns, and `emit_ads`, which re-signs and encodes
//! whichever owned ad is missing a signature or past its `expiry`.
//! `expiry` is wall-clock time since `UNIX_EPOCH`, the same
//! convention `indra_core::Introduction` uses.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use indra_crypto::PrivateKey;
use indra_splice::Splice;

use crate::error::Result;
use crate::Ad;

struct Owned {
    ad: Ad,
    signing_key: PrivateKey,
    ttl: Duration,
    signed: bool,
}

fn now() -> Duration {
    SystemTime::now().duration_since(UNIX_EPOCH).expect("system clock before UNIX_EPOCH")
}

/// Every ad this node is responsible for keeping current on the
/// gossip network. Registering an ad doesn't sign it; the first
/// `emit_ads` call does, since that's also when a freshly elapsed
/// one gets re-signed.
#[derive(Default)]
pub struct AdRegistry {
    owned: std::sync::Mutex<Vec<Owned>>,
}

impl AdRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) an ad this node owns. `ad`'s `expiry`
    /// and `sig` fields are placeholders; `emit_ads` fills both in
    /// each time it refreshes this entry. `ttl` is how far past the
    /// refresh time the fresh `expiry` is set.
    pub fn own(&self, ad: Ad, signing_key: PrivateKey, ttl: Duration) {
        let mut owned = self.owned.lock().expect("ad registry mutex poisoned");
        owned.push(Owned {
            ad,
            signing_key,
            ttl,
            signed: false,
        });
    }

    /// Re-sign and encode every owned ad that's missing a signature
    /// or whose current one has expired; ads still current are left
    /// alone and not returned. This is the `emit_ads() -> [bytes]`
    /// entry point a gossip collaborator polls.
    pub fn emit_ads(&self) -> Result<Vec<Vec<u8>>> {
        let now = now();
        let mut owned = self.owned.lock().expect("ad registry mutex poisoned");
        let mut out = Vec::new();
        for entry in owned.iter_mut() {
            if entry.signed && entry.ad.expiry() > now {
                continue;
            }
            entry.ad.set_expiry(now + entry.ttl);
            entry.ad.resign(&entry.signing_key)?;
            entry.signed = true;

            let mut splice = Splice::with_capacity(entry.ad.len());
            entry.ad.encode(&mut splice)?;
            out.push(splice.into_bytes());
        }
        Ok(out)
    }

    pub fn len(&self) -> usize {
        self.owned.lock().expect("ad registry mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Ad {
    fn len(&self) -> usize {
        match self {
            Ad::Address(a) => a.len(),
            Ad::Services(a) => a.len(),
            Ad::Load(a) => a.len(),
            Ad::Peer(a) => a.len(),
            Ad::Intro(a) => a.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::{Identity, SIGNATURE_LEN};

    fn sample_load_ad(key: indra_crypto::PublicKey) -> Ad {
        Ad::Load(crate::LoadAd {
            id: [1u8; 8],
            key,
            load: 0,
            expiry: Duration::from_secs(0),
            sig: [0u8; SIGNATURE_LEN],
        })
    }

    #[test]
    fn emit_ads_signs_a_freshly_owned_ad() {
        let reg = AdRegistry::new();
        let id = Identity::generate();
        reg.own(sample_load_ad(id.public), id.private.clone(), Duration::from_secs(3600));

        let emitted = reg.emit_ads().unwrap();
        assert_eq!(emitted.len(), 1);
        let decoded = crate::handle_ad(&emitted[0]).unwrap();
        assert!(decoded.expiry() > now());
    }

    #[test]
    fn emit_ads_skips_an_ad_that_is_still_current() {
        let reg = AdRegistry::new();
        let id = Identity::generate();
        reg.own(sample_load_ad(id.public), id.private.clone(), Duration::from_secs(3600));

        assert_eq!(reg.emit_ads().unwrap().len(), 1);
        assert_eq!(reg.emit_ads().unwrap().len(), 0);
    }

    #[test]
    fn emit_ads_refreshes_an_expired_ad() {
        let reg = AdRegistry::new();
        let id = Identity::generate();
        // a ttl of zero expires the instant it's signed.
        reg.own(sample_load_ad(id.public), id.private.clone(), Duration::from_secs(0));

        assert_eq!(reg.emit_ads().unwrap().len(), 1);
        assert_eq!(reg.emit_ads().unwrap().len(), 1);
    }
}
