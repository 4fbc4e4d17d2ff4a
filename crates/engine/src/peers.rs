//! A narrow address ↔ identity-key cache (§4.8): the outbound builder
//! needs the next hop's identity public key to frame a hop-to-hop FEC
//! `Packet` (`Packet::encode` ECDHs against it), and has no other way
//! to learn it. This is deliberately not a discovery/gossip
//! subsystem — just the one lookup the builder needs, populated by
//! whoever already knows the mapping (a verified `AddressAd`, a test
//! fixture, a config file).

use std::collections::HashMap;
use std::sync::Mutex;

use indra_crypto::PublicKey;

#[derive(Default)]
pub struct PeerDirectory {
    by_addr: Mutex<HashMap<String, PublicKey>>,
}

impl PeerDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, addr: &str, identity: PublicKey) {
        self.by_addr.lock().expect("peer directory mutex poisoned").insert(addr.to_string(), identity);
    }

    pub fn get(&self, addr: &str) -> Option<PublicKey> {
        self.by_addr.lock().expect("peer directory mutex poisoned").get(addr).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::Identity;

    #[test]
    fn registered_peer_resolves() {
        let dir = PeerDirectory::new();
        let id = Identity::generate();
        dir.register("/ip4/10.0.0.1/tcp/9000", id.public);
        assert_eq!(dir.get("/ip4/10.0.0.1/tcp/9000"), Some(id.public));
    }

    #[test]
    fn unregistered_address_resolves_to_none() {
        let dir = PeerDirectory::new();
        assert!(dir.get("/ip4/10.0.0.2/tcp/9000").is_none());
    }
}
