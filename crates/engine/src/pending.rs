//! The pending-response table (§4.8): one entry per in-flight
//! `send_and_await`, keyed by message ID, resolved by a matching
//! `Response` or `Confirmation` arrival and swept for `Timeout` by a
//! background task.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use indra_crypto::Id;
use indra_session::SessionManager;
use tokio::sync::oneshot;
use tracing::debug;

struct PendingEntry {
    sender: oneshot::Sender<Vec<u8>>,
    billable_sessions: Vec<Id>,
    sent_size: usize,
    deadline: Instant,
}

/// `ID → { callback, billable_sessions, sent_size, deadline }`, one
/// mutex covering the whole map per the single-lock-per-resource
/// design; no lock here crosses a layer `handle` call.
pub struct PendingTable {
    entries: Mutex<HashMap<Id, PendingEntry>>,
}

impl PendingTable {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Register a request this node just sent. Returns the receiving
    /// half the caller awaits; the sending half is fired when a
    /// matching `Response`/`Confirmation` arrives, or dropped by
    /// `sweep_timeouts` once `timeout` elapses.
    pub fn register(
        &self,
        id: Id,
        billable_sessions: Vec<Id>,
        sent_size: usize,
        timeout: Duration,
    ) -> oneshot::Receiver<Vec<u8>> {
        let (tx, rx) = oneshot::channel();
        let entry = PendingEntry {
            sender: tx,
            billable_sessions,
            sent_size,
            deadline: Instant::now() + timeout,
        };
        self.entries.lock().expect("pending table mutex poisoned").insert(id, entry);
        rx
    }

    /// A `Response` arrived: debit every billable session
    /// proportionally to `(sent_size + received_size) * hop_rate_per_kb`
    /// and fire the callback with the response bytes.
    pub fn complete(&self, id: Id, bytes: Vec<u8>, sessions: &SessionManager, hop_rate_per_kb: u64) {
        let Some(entry) = self.entries.lock().expect("pending table mutex poisoned").remove(&id) else {
            debug!(?id, "response arrived for an unknown or already-resolved request");
            return;
        };
        self.debit(&entry, entry.sent_size + bytes.len(), sessions, hop_rate_per_kb);
        let _ = entry.sender.send(bytes);
    }

    /// A bare `Confirmation` arrived: debit for the sent bytes alone
    /// (there is no response payload) and fire the callback empty.
    pub fn confirm(&self, id: Id, sessions: &SessionManager, hop_rate_per_kb: u64) {
        let Some(entry) = self.entries.lock().expect("pending table mutex poisoned").remove(&id) else {
            debug!(?id, "confirmation arrived for an unknown or already-resolved request");
            return;
        };
        self.debit(&entry, entry.sent_size, sessions, hop_rate_per_kb);
        let _ = entry.sender.send(Vec::new());
    }

    fn debit(&self, entry: &PendingEntry, billable_bytes: usize, sessions: &SessionManager, hop_rate_per_kb: u64) {
        let charge = ((billable_bytes as u64 * hop_rate_per_kb) / 1024).max(1) as i64;
        for session_id in &entry.billable_sessions {
            if let Err(err) = sessions.dec_balance(session_id, charge) {
                debug!(?session_id, %err, "billable session missing at settlement time");
            }
        }
    }

    /// Drop every entry past its deadline; dropping the sender side
    /// of the oneshot completes the awaiting receiver with a recv
    /// error, which `Engine::send_and_await` maps to `Timeout`.
    /// Returns how many entries were swept.
    pub fn sweep_timeouts(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock().expect("pending table mutex poisoned");
        let expired: Vec<Id> = entries
            .iter()
            .filter(|(_, e)| now >= e.deadline)
            .map(|(id, _)| *id)
            .collect();
        for id in &expired {
            entries.remove(id);
        }
        expired.len()
    }

    /// Drop every outstanding entry regardless of deadline, as part of
    /// ordered engine shutdown (§5): dropping each sender fails its
    /// receiver, which `send_and_await` surfaces as `Timeout` to the
    /// caller since no other terminal state is available for a
    /// request the engine will never answer. Returns how many entries
    /// were drained.
    pub fn fail_all(&self) -> usize {
        let mut entries = self.entries.lock().expect("pending table mutex poisoned");
        let n = entries.len();
        entries.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("pending table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PendingTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_fires_the_receiver_with_the_response_bytes() {
        let table = PendingTable::new();
        let sessions = SessionManager::new();
        let mut rx = table.register([1u8; 8], vec![], 100, Duration::from_secs(5));
        table.complete([1u8; 8], b"hello".to_vec(), &sessions, 1);
        assert_eq!(rx.try_recv().unwrap(), b"hello".to_vec());
        assert!(table.is_empty());
    }

    #[test]
    fn unknown_id_completion_is_a_no_op() {
        let table = PendingTable::new();
        let sessions = SessionManager::new();
        table.complete([9u8; 8], b"x".to_vec(), &sessions, 1);
        assert!(table.is_empty());
    }

    #[test]
    fn fail_all_drains_every_entry_regardless_of_deadline() {
        let table = PendingTable::new();
        let mut a = table.register([1u8; 8], vec![], 10, Duration::from_secs(60));
        let mut b = table.register([2u8; 8], vec![], 10, Duration::from_secs(60));
        assert_eq!(table.fail_all(), 2);
        assert!(table.is_empty());
        assert!(a.try_recv().is_err());
        assert!(b.try_recv().is_err());
    }

    #[test]
    fn sweep_drops_expired_entries_and_fails_the_receiver() {
        let table = PendingTable::new();
        let mut rx = table.register([2u8; 8], vec![], 10, Duration::from_millis(0));
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(table.sweep_timeouts(), 1);
        assert!(table.is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn complete_debits_every_billable_session() {
        use indra_crypto::{hash, PrivateKey};

        let table = PendingTable::new();
        let sessions = SessionManager::new();
        let header = PrivateKey::generate();
        let payload = PrivateKey::generate();
        let mut preimage = Vec::new();
        preimage.extend_from_slice(&header.to_bytes());
        preimage.extend_from_slice(&payload.to_bytes());
        sessions.register_pending_payment(hash(&preimage), 1_000);
        sessions.install_session(0, header, payload, None, Duration::from_secs(60));
        let session_id = sessions.select_hops(&[None], 0).unwrap()[0].id;

        let mut rx = table.register([3u8; 8], vec![session_id], 1024, Duration::from_secs(5));
        table.complete([3u8; 8], vec![0u8; 1024], &sessions, 2);
        let _ = rx.try_recv();

        // sent 1024 + received 1024 = 2048 bytes, rate 2/kb -> charge 4.
        assert_eq!(sessions.get(&session_id).unwrap().balance(), 996);
    }
}
