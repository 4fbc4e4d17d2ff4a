//! Exit services (§4.5/§4.8): the port-keyed registry of locally
//! hosted services an `Exit` layer addresses, and `dispatch_exit`,
//! which runs a request against one and routes the reply back.
//!
//! Reply routing resolves the Open Question recorded in DESIGN.md:
//! the exit applies all three `(cipher, nonce)` passes itself —
//! `encipher` is its own inverse, so the same call that encrypted the
//! forward leg decrypts it on the way back — then reframes the result
//! as a `Response` layer and sends it as an ordinary hop-to-hop
//! message to `reply_addr`, the one hop back the request arrived
//! from. No `async-trait` dependency is used, matching the teacher's
//! plain `async fn` idiom; a boxed future is the simplest way to keep
//! the registry's value type object-safe.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use indra_core::{Layer, Response};
use indra_crypto::{encipher, Id, Identity, Iv};
use indra_splice::Splice;
use tracing::debug;

use crate::builder::build_packets;
use crate::config::EngineConfig;
use crate::peers::PeerDirectory;
use crate::transport::Transport;

pub type ExitFuture = Pin<Box<dyn Future<Output = Vec<u8>> + Send>>;

/// A locally hosted service an `Exit` layer can address by port.
pub trait ExitService: Send + Sync + 'static {
    fn call(&self, payload: Vec<u8>) -> ExitFuture;
}

#[derive(Default)]
pub struct ExitRegistry {
    services: Mutex<HashMap<u16, Arc<dyn ExitService>>>,
}

impl ExitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, port: u16, service: Arc<dyn ExitService>) {
        self.services.lock().expect("exit registry mutex poisoned").insert(port, service);
    }

    pub fn get(&self, port: u16) -> Option<Arc<dyn ExitService>> {
        self.services.lock().expect("exit registry mutex poisoned").get(&port).cloned()
    }
}

/// Run `payload` against whatever is registered on `port`, then wrap
/// and send the reply. Spawned independently of the dispatcher per
/// §5's concurrency model, so a slow or hanging service can't stall
/// other inbound traffic.
#[allow(clippy::too_many_arguments)]
pub fn dispatch_exit(
    id: Id,
    port: u16,
    payload: Vec<u8>,
    ciphers: [[u8; 32]; 3],
    nonces: [Iv; 3],
    reply_addr: Option<String>,
    registry: Arc<ExitRegistry>,
    transport: Arc<dyn Transport>,
    peers: Arc<PeerDirectory>,
    own_identity: Arc<Identity>,
    config: EngineConfig,
) {
    let Some(service) = registry.get(port) else {
        debug!(port, "no exit service registered");
        return;
    };
    let Some(reply_addr) = reply_addr else {
        debug!(port, "exit request arrived with no return address");
        return;
    };

    tokio::spawn(async move {
        let call = service.call(payload);
        let result = tokio::time::timeout(config.request_timeout, call).await;
        let mut bytes = match result {
            Ok(bytes) => bytes,
            Err(_) => {
                debug!(port, "exit service timed out");
                return;
            }
        };

        for i in (0..ciphers.len()).rev() {
            encipher(&ciphers[i], &nonces[i], &mut bytes);
        }

        let response = Layer::Response(Response { id, port, load: 0, bytes });
        let mut splice = Splice::with_capacity(response.len());
        if let Err(err) = response.encode(&mut splice) {
            debug!(%err, %reply_addr, "failed to encode exit response");
            return;
        }
        let message = splice.into_bytes();

        match build_packets(&message, id, &config, &own_identity, &peers, &reply_addr) {
            Ok(packets) => {
                for packet in packets {
                    if let Err(err) = transport.send(&reply_addr, packet) {
                        debug!(%err, %reply_addr, "failed to send exit response packet");
                    }
                }
            }
            Err(err) => {
                debug!(%err, %reply_addr, "failed to frame exit response");
            }
        }
    });
}
