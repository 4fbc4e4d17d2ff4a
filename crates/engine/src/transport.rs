//! The transport contract (§6): `send` hands a frame off, `recv`
//! yields candidate frames one at a time. One `recv()` yield is one
//! candidate packet; the dispatcher never assembles multiple
//! transport reads into one packet itself.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport closed")]
    Closed,

    #[error("send to {addr} failed: {reason}")]
    SendFailed { addr: String, reason: String },
}

/// Implemented by whatever carries bytes between peers (a TCP/QUIC
/// socket set, an in-memory channel for tests). The engine owns one
/// `Arc<dyn Transport>` and never addresses a raw socket directly.
pub trait Transport: Send + Sync + 'static {
    fn send(&self, addr: &str, bytes: Vec<u8>) -> Result<(), TransportError>;
}

/// An in-memory transport wiring two or more engines together in a
/// test without a real socket, keyed by the address string each
/// engine registers under.
#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    use std::collections::HashMap;
    use std::sync::Mutex;

    use tokio::sync::mpsc::UnboundedSender;

    use super::{Transport, TransportError};

    #[derive(Default)]
    pub struct MemoryTransport {
        peers: Mutex<HashMap<String, UnboundedSender<Vec<u8>>>>,
    }

    impl MemoryTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn register(&self, addr: &str, sender: UnboundedSender<Vec<u8>>) {
            self.peers.lock().expect("memory transport mutex poisoned").insert(addr.to_string(), sender);
        }
    }

    impl Transport for MemoryTransport {
        fn send(&self, addr: &str, bytes: Vec<u8>) -> Result<(), TransportError> {
            let peers = self.peers.lock().expect("memory transport mutex poisoned");
            let sender = peers.get(addr).ok_or_else(|| TransportError::SendFailed {
                addr: addr.to_string(),
                reason: "no peer registered at this address".to_string(),
            })?;
            sender.send(bytes).map_err(|_| TransportError::SendFailed {
                addr: addr.to_string(),
                reason: "peer channel closed".to_string(),
            })
        }
    }
}
