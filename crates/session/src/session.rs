//! A single installed session: two derived keys and a credit balance.

use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::time::{Duration, Instant};

use indra_crypto::{hash, Id, PrivateKey, PublicKey};

/// One hop's half of a circuit: the header and payload keys a `Crypt`
/// layer will be addressed with, the balance that pays for it, and the
/// peer this session is bound to (so a reply can be routed back
/// upstream without the relay needing to decode any further layers).
pub struct Session {
    pub id: Id,
    pub header_prv: PrivateKey,
    pub payload_prv: PrivateKey,
    pub hop_index: u8,
    /// The address of the peer that installed this session — where a
    /// relay answering on this session's behalf sends its reply.
    pub node_ref: Option<String>,
    pub deadline: Instant,
    balance: AtomicI64,
    closed: AtomicBool,
}

impl Session {
    pub fn new(
        id: Id,
        header_prv: PrivateKey,
        payload_prv: PrivateKey,
        hop_index: u8,
        balance: i64,
        node_ref: Option<String>,
        ttl: Duration,
    ) -> Self {
        Self {
            id,
            header_prv,
            payload_prv,
            hop_index,
            node_ref,
            deadline: Instant::now() + ttl,
            balance: AtomicI64::new(balance),
            closed: AtomicBool::new(false),
        }
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    pub fn header_pub(&self) -> PublicKey {
        self.header_prv.public_key()
    }

    pub fn payload_pub(&self) -> PublicKey {
        self.payload_prv.public_key()
    }

    pub fn balance(&self) -> i64 {
        self.balance.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Atomically subtract `n` from the balance; closes the session
    /// if the result goes negative. Returns the balance after the
    /// decrement.
    pub fn dec_balance(&self, n: i64) -> i64 {
        let after = self.balance.fetch_sub(n, Ordering::SeqCst) - n;
        if after < 0 {
            self.closed.store(true, Ordering::SeqCst);
        }
        after
    }

    /// The preimage hash a `Session` onion layer carrying these same
    /// two keys would present; used to match an installed session
    /// back to the pending payment that funded it.
    pub fn preimage_hash(&self) -> [u8; 32] {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&self.header_prv.to_bytes());
        preimage.extend_from_slice(&self.payload_prv.to_bytes());
        hash(&preimage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dec_balance_closes_session_once_negative() {
        let s = Session::new(
            [0u8; 8],
            PrivateKey::generate(),
            PrivateKey::generate(),
            0,
            10,
            None,
            Duration::from_secs(60),
        );
        assert_eq!(s.dec_balance(4), 6);
        assert!(!s.is_closed());
        assert_eq!(s.dec_balance(10), -4);
        assert!(s.is_closed());
    }

    #[test]
    fn a_zero_ttl_session_is_immediately_expired() {
        let s = Session::new(
            [1u8; 8],
            PrivateKey::generate(),
            PrivateKey::generate(),
            0,
            10,
            Some("/ip4/10.0.0.1/tcp/9000".into()),
            Duration::from_secs(0),
        );
        assert!(s.is_expired());
    }
}
