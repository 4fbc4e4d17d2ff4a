//! The session manager (C7): owns every active session, indexed both
//! by ID and by a live scan of header-key cloak tags, plus the
//! pending-payment map that gates installing a new one.
//!
//! Each map is behind its own mutex rather than one coarse lock, per
//! the single-lock-per-resource design: a circuit-setup burst
//! contends on `sessions`, an unrelated payment registration does
//! not.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use indra_crypto::{hash, matches, CloakedKey, Id, IdGenerator, PrivateKey};
use tracing::info;

use crate::error::{Result, SessionError};
use crate::session::Session;

pub struct SessionManager {
    sessions: Mutex<HashMap<Id, Arc<Session>>>,
    pending_payments: Mutex<HashMap<[u8; 32], i64>>,
    ids: Mutex<IdGenerator>,
}

impl SessionManager {
    pub fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            pending_payments: Mutex::new(HashMap::new()),
            ids: Mutex::new(IdGenerator::new()),
        }
    }

    /// Register a payment the circuit builder has already collected,
    /// keyed by the preimage hash the matching `Session` layer will
    /// carry.
    pub fn register_pending_payment(&self, preimage_hash: [u8; 32], amount: i64) {
        let mut pending = self.pending_payments.lock().expect("pending-payment mutex poisoned");
        pending.insert(preimage_hash, amount);
    }

    /// A `Session` onion layer arrived bearing `header_prv` and
    /// `payload_prv`. If a pending payment matches their preimage
    /// hash, consume it and install the session; otherwise refuse.
    /// `node_ref` is the peer that sent the layer, kept so a later
    /// reply on this session's behalf knows where to go, and `ttl`
    /// sets the session's deadline.
    pub fn install_session(
        &self,
        hop_index: u8,
        header_prv: PrivateKey,
        payload_prv: PrivateKey,
        node_ref: Option<String>,
        ttl: Duration,
    ) -> bool {
        let mut preimage = Vec::with_capacity(64);
        preimage.extend_from_slice(&header_prv.to_bytes());
        preimage.extend_from_slice(&payload_prv.to_bytes());
        let preimage_hash = hash(&preimage);

        let amount = {
            let mut pending = self.pending_payments.lock().expect("pending-payment mutex poisoned");
            match pending.remove(&preimage_hash) {
                Some(amount) => amount,
                None => return false,
            }
        };

        let id = self.ids.lock().expect("id generator mutex poisoned").next();
        let session = Arc::new(Session::new(
            id, header_prv, payload_prv, hop_index, amount, node_ref, ttl,
        ));
        let mut sessions = self.sessions.lock().expect("sessions mutex poisoned");
        sessions.insert(id, session);
        info!(?id, hop_index, balance = amount, "session installed");
        true
    }

    /// Resolve a cloak tag against every active session's header key.
    /// Closed or expired sessions are skipped; a relay addressed to
    /// one is treated the same as an unknown cloak.
    pub fn find_cloaked(&self, tag: &CloakedKey) -> Option<(PrivateKey, PrivateKey)> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        for session in sessions.values() {
            if session.is_closed() || session.is_expired() {
                continue;
            }
            if matches(tag, &session.header_pub()) {
                return Some((session.header_prv.clone(), session.payload_prv.clone()));
            }
        }
        None
    }

    /// The address the session whose header key `tag` cloaks was
    /// installed from, if that session is still open. Used to resolve
    /// a hidden-service reply segment's cloak tag back to a transport
    /// address without the caller needing the session's ID.
    pub fn node_ref_for_cloak(&self, tag: &CloakedKey) -> Option<String> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        sessions
            .values()
            .find(|s| !s.is_closed() && !s.is_expired() && matches(tag, &s.header_pub()))
            .and_then(|s| s.node_ref.clone())
    }

    /// The address a reply bound for `id`'s session should go to, if
    /// the session is still open.
    pub fn node_ref(&self, id: &Id) -> Option<String> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        sessions.get(id).and_then(|s| s.node_ref.clone())
    }

    /// Pick sessions for a circuit. `pattern` has one entry per hop
    /// position; `Some(id)` pins that position to an already-known
    /// session (e.g. a reused first hop), `None` asks for any open
    /// session not already used elsewhere in the pattern. `seed`
    /// selects deterministically among the open candidates so the
    /// same seed always yields the same circuit, which the test suite
    /// relies on.
    pub fn select_hops(&self, pattern: &[Option<Id>], seed: u64) -> Result<Vec<Arc<Session>>> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let mut used: Vec<Id> = pattern.iter().filter_map(|p| *p).collect();
        let mut open: Vec<Id> = sessions
            .values()
            .filter(|s| !s.is_closed() && !used.contains(&s.id))
            .map(|s| s.id)
            .collect();
        open.sort();

        let mut chosen = Vec::with_capacity(pattern.len());
        let mut cursor = seed as usize;
        for slot in pattern {
            let id = match slot {
                Some(id) => *id,
                None => {
                    if open.is_empty() {
                        return Err(SessionError::NotEnoughSessions {
                            need: pattern.len(),
                            have: chosen.len(),
                        });
                    }
                    let index = cursor % open.len();
                    cursor = cursor.wrapping_add(1);
                    let id = open.remove(index);
                    used.push(id);
                    id
                }
            };
            let session = sessions
                .get(&id)
                .cloned()
                .ok_or(SessionError::NotFound(id))?;
            chosen.push(session);
        }
        Ok(chosen)
    }

    /// Atomically debit a session; returns the balance afterward.
    pub fn dec_balance(&self, id: &Id, n: i64) -> Result<i64> {
        let sessions = self.sessions.lock().expect("sessions mutex poisoned");
        let session = sessions.get(id).ok_or(SessionError::NotFound(*id))?;
        Ok(session.dec_balance(n))
    }

    pub fn get(&self, id: &Id) -> Option<Arc<Session>> {
        self.sessions.lock().expect("sessions mutex poisoned").get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().expect("sessions mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for SessionManager {
    fn default() -> Self {
        Self::new()
    }
}
