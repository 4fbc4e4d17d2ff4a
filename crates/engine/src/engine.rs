//! The engine (§4.8): the single-process coordinator that owns
//! identity, sessions, the pending-response table, and the transport,
//! and implements [`indra_core::EngineContext`] so a dispatched layer
//! can reach back into it.
//!
//! `receive` is the inbound half: FEC-reassemble per message `id`
//! (mirroring the teacher's `ExitHandler::process_shard` accumulate-
//! until-`join`-succeeds shape), then registry-decode and dispatch.
//! `send_and_await` is the outbound half a client calls directly:
//! build a chain, frame it, register a pending entry, and await the
//! oneshot the pending table resolves.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use indra_core::{
    CloakMatch, Crypt, EngineContext, Forward, Introduction, Layer, ReplySegment, Ready, Response,
    Route, RouteBody, RoutingHeader,
};
use indra_crypto::{
    cloak, encipher, matches, shared_secret, Id, Identity, IdGenerator, Iv, KeySet, PrivateKey,
    PublicKey,
};
use indra_fec::{validate_common_fields, Packet, Shard};
use indra_session::{Session, SessionManager};
use indra_splice::Splice;
use tracing::{debug, info};

use crate::builder::build_packets;
use crate::config::EngineConfig;
use crate::error::ProtocolError;
use crate::exit_service::{self, ExitRegistry, ExitService};
use crate::peers::PeerDirectory;
use crate::pending::PendingTable;
use crate::transport::Transport;

struct Inner {
    identity: Arc<Identity>,
    keyset: KeySet,
    ids: Mutex<IdGenerator>,
    config: EngineConfig,
    sessions: Arc<SessionManager>,
    pending: PendingTable,
    exits: Arc<ExitRegistry>,
    peers: Arc<PeerDirectory>,
    transport: Arc<dyn Transport>,
    reassembly: Mutex<HashMap<Id, Vec<Packet>>>,
    introductions: Mutex<HashMap<PublicKey, Introduction>>,
    hosted_services: Mutex<HashMap<PublicKey, PrivateKey>>,
    hidden_apps: Mutex<HashMap<PublicKey, Arc<dyn ExitService>>>,
    ready_headers: Mutex<HashMap<Id, Ready>>,
    shutting_down: AtomicBool,
}

/// Cheap to clone: every field lives behind the one shared `Arc`, so a
/// clone handed to a spawned timer or exit-service task is just a
/// refcount bump.
#[derive(Clone)]
pub struct Engine(Arc<Inner>);

impl Engine {
    pub fn new(identity: Identity, config: EngineConfig, transport: Arc<dyn Transport>) -> Self {
        Self(Arc::new(Inner {
            identity: Arc::new(identity),
            keyset: KeySet::new(),
            ids: Mutex::new(IdGenerator::new()),
            config,
            sessions: Arc::new(SessionManager::new()),
            pending: PendingTable::new(),
            exits: Arc::new(ExitRegistry::new()),
            peers: Arc::new(PeerDirectory::new()),
            transport,
            reassembly: Mutex::new(HashMap::new()),
            introductions: Mutex::new(HashMap::new()),
            hosted_services: Mutex::new(HashMap::new()),
            hidden_apps: Mutex::new(HashMap::new()),
            ready_headers: Mutex::new(HashMap::new()),
            shutting_down: AtomicBool::new(false),
        }))
    }

    pub fn identity(&self) -> &Identity {
        &self.0.identity
    }

    pub fn config(&self) -> &EngineConfig {
        &self.0.config
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.0.sessions
    }

    pub fn exits(&self) -> &Arc<ExitRegistry> {
        &self.0.exits
    }

    pub fn peers(&self) -> &Arc<PeerDirectory> {
        &self.0.peers
    }

    pub fn pending(&self) -> &PendingTable {
        &self.0.pending
    }

    fn next_id(&self) -> Id {
        self.0.ids.lock().expect("id generator mutex poisoned").next()
    }

    /// Claim a hidden-service identity this engine hosts directly: a
    /// `Route` addressed to `private`'s public key is decrypted and
    /// answered here rather than relayed onward. `app` answers the
    /// `Message` payloads that arrive once a rendezvous is set up.
    pub fn host_hidden_service(&self, private: PrivateKey, app: Arc<dyn ExitService>) {
        let public = private.public_key();
        self.0
            .hosted_services
            .lock()
            .expect("hosted-services mutex poisoned")
            .insert(public, private);
        self.0
            .hidden_apps
            .lock()
            .expect("hidden-apps mutex poisoned")
            .insert(public, app);
    }

    /// A `Ready` header this node received for a rendezvous it asked
    /// for, keyed by the request `id` it was sent under.
    pub fn ready_header(&self, id: &Id) -> Option<Ready> {
        self.0
            .ready_headers
            .lock()
            .expect("ready-headers mutex poisoned")
            .get(id)
            .cloned()
    }

    /// Periodically sweep the pending-response table for expired
    /// entries. Callers spawn this once at startup; not started
    /// implicitly so tests that don't need it don't pay for a timer
    /// task. Exits once [`Engine::shutdown`] is called.
    pub fn spawn_housekeeping(&self, interval: std::time::Duration) -> tokio::task::JoinHandle<()> {
        let engine = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                if engine.is_shutting_down() {
                    break;
                }
                let swept = engine.0.pending.sweep_timeouts();
                if swept > 0 {
                    debug!(swept, "pending requests timed out");
                }
            }
        })
    }

    pub fn is_shutting_down(&self) -> bool {
        self.0.shutting_down.load(Ordering::Acquire)
    }

    /// Ordered shutdown (§5): mark the engine as draining so any frame
    /// still in flight is dropped rather than dispatched, then fail
    /// every outstanding `send_and_await` caller immediately instead
    /// of waiting out its deadline. There is no inbound/outbound task
    /// owned by the engine itself to join here — the caller drives
    /// `receive`/`send` from its own transport loop — so this only
    /// covers the state this type actually owns; the housekeeping
    /// task observes the same flag and exits on its next tick.
    pub fn shutdown(&self) {
        if self.0.shutting_down.swap(true, Ordering::AcqRel) {
            return;
        }
        let failed = self.0.pending.fail_all();
        info!(failed, "engine shutting down");
    }

    /// Entry point for an inbound transport frame. `from_addr` is
    /// where the frame arrived from, threaded through as `prev` so a
    /// terminal layer (`Exit`, `Route`) can reply along the same
    /// conduit without a routing header.
    pub fn receive(&self, from_addr: Option<&str>, bytes: Vec<u8>) {
        if self.is_shutting_down() {
            debug!("engine is shutting down, dropping inbound frame");
            return;
        }
        let (from_pub, to_cloak, _iv) = match Packet::peek_header(&bytes) {
            Ok(header) => header,
            Err(err) => {
                debug!(%err, "malformed packet header, dropping");
                return;
            }
        };
        if !matches(&to_cloak, &self.0.identity.public) {
            debug!("packet cloak tag does not match this node's identity, dropping");
            return;
        }
        let key = match shared_secret(&self.0.identity.private, &from_pub) {
            Ok(key) => key,
            Err(err) => {
                debug!(%err, "failed to derive packet key, dropping");
                return;
            }
        };
        let packet = match Packet::decode(&bytes, &key) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(%err, "packet failed checksum or decode, dropping");
                return;
            }
        };

        if let Some(message) = self.reassemble(packet) {
            self.dispatch_bytes(message, from_addr.map(str::to_owned));
        }
    }

    /// Accumulate `packet` into its message group and try to complete
    /// it. Returns the joined message once enough shards have
    /// arrived; keeps buffering otherwise.
    fn reassemble(&self, packet: Packet) -> Option<Vec<u8>> {
        let id = packet.id;
        let mut reassembly = self.0.reassembly.lock().expect("reassembly mutex poisoned");
        let entry = reassembly.entry(id).or_default();
        entry.push(packet);

        if let Err(err) = validate_common_fields(entry) {
            debug!(%err, "packet group fields disagree, dropping group");
            reassembly.remove(&id);
            return None;
        }

        let (length, parity) = {
            let first = entry.first().expect("just pushed at least one packet");
            (first.length as usize, first.parity)
        };
        let shards: Vec<Shard> = entry
            .iter()
            .map(|p| Shard {
                seq: p.seq,
                data: p.data.clone(),
            })
            .collect();

        match indra_fec::join(length, self.0.config.segment_size, parity, &shards) {
            Ok(message) => {
                reassembly.remove(&id);
                Some(message)
            }
            Err(indra_fec::FecError::InsufficientShards { .. }) => None,
            Err(err) => {
                debug!(%err, "message reassembly failed, dropping group");
                reassembly.remove(&id);
                None
            }
        }
    }

    /// Decode an onion chain from already-reassembled bytes and
    /// dispatch it. Shared by inbound packet handling and `Delay`
    /// resumption.
    fn dispatch_bytes(&self, bytes: Vec<u8>, prev: Option<String>) {
        let mut splice = Splice::from_bytes(bytes);
        match indra_core::decode_chain(&mut splice) {
            Ok(layer) => {
                if let Err(err) = layer.handle(prev.as_deref(), self) {
                    debug!(%err, "layer handler failed");
                }
            }
            Err(err) => debug!(%err, "failed to decode onion layer chain"),
        }
    }

    /// The client-facing entry point (§7): build a chain, frame it,
    /// register a pending entry, and await the oneshot a matching
    /// `Response`/`Confirmation` resolves. `id` must match whatever
    /// correlation ID the chain's `Exit`/`Route` layer carries.
    pub async fn send_and_await(
        &self,
        chain: Layer,
        id: Id,
        next_hop: &str,
        billable_sessions: Vec<Id>,
    ) -> Result<Vec<u8>, ProtocolError> {
        if self.is_shutting_down() {
            return Err(ProtocolError::Timeout);
        }
        let mut splice = Splice::with_capacity(chain.len());
        chain.encode(&mut splice).map_err(|_| ProtocolError::Protocol)?;
        let bytes = splice.into_bytes();

        let packets = build_packets(&bytes, id, &self.0.config, &self.0.identity, &self.0.peers, next_hop)
            .map_err(ProtocolError::from)?;

        let rx = self
            .0
            .pending
            .register(id, billable_sessions, bytes.len(), self.0.config.request_timeout);
        for packet in packets {
            self.send(next_hop, packet);
        }

        match tokio::time::timeout(self.0.config.request_timeout, rx).await {
            Ok(Ok(bytes)) => Ok(bytes),
            Ok(Err(_)) => Err(ProtocolError::Timeout),
            Err(_) => Err(ProtocolError::Timeout),
        }
    }

    /// Build and send this hidden service's reply to a `Route`
    /// request: the five-hop rendezvous in §4.5. Selects five fresh
    /// sessions, builds the service's own three-segment reply header
    /// under fresh ephemeral keys, and wraps the `Ready` terminator in
    /// two `Forward`+`Crypt` hops before handing it to the transport.
    /// Falls back to answering `reply_addr` directly — the prior
    /// single-hop reduction — when five distinct addressed sessions
    /// aren't available to build the real path.
    fn build_and_send_ready(
        &self,
        service_key: PublicKey,
        id: Id,
        ciphers: [[u8; 32]; 3],
        nonces: [Iv; 3],
        routing_header: RoutingHeader,
        reply_addr: Option<String>,
    ) {
        let Some(reply_addr) = reply_addr else {
            debug!("route arrived with no return address, cannot answer");
            return;
        };

        match self.build_five_hop_ready(service_key, id, ciphers, nonces, routing_header.clone()) {
            Some((chain, next_addr)) => self.send_chain(chain, id, &next_addr),
            None => {
                debug!("not enough addressed sessions for a five-hop reply path, answering directly");
                let ready = Ready {
                    id,
                    service_key,
                    client_header: routing_header.clone(),
                    service_header: routing_header,
                    client_ciphers: ciphers,
                    service_ciphers: ciphers,
                    client_nonces: nonces,
                    service_nonces: nonces,
                };
                self.send_chain(Layer::Ready(ready), id, &reply_addr);
            }
        }
    }

    /// Select five fresh sessions and build the service's own return
    /// path. The first three become the reply header's segments, each
    /// addressed with a freshly drawn ephemeral key so the segment is
    /// unlinkable to the client's own header; the last two become the
    /// `Forward`+`Crypt` hops the assembled `Ready` chain travels
    /// through before reaching the first of those five peers. Returns
    /// the outermost layer to send plus the address of its first hop.
    fn build_five_hop_ready(
        &self,
        service_key: PublicKey,
        id: Id,
        client_ciphers: [[u8; 32]; 3],
        client_nonces: [Iv; 3],
        client_header: RoutingHeader,
    ) -> Option<(Layer, String)> {
        let seed = u64::from_be_bytes(id);
        let hops = self.0.sessions.select_hops(&[None; 5], seed).ok()?;
        let hops: [Arc<Session>; 5] = hops.try_into().ok()?;
        let [h0, h1, h2, f3, f4] = hops;

        let mut segments = Vec::with_capacity(3);
        let mut service_ciphers = [[0u8; 32]; 3];
        let mut service_nonces = [[0u8; 16]; 3];
        for (i, hop) in [&h0, &h1, &h2].into_iter().enumerate() {
            let ephemeral = self.0.keyset.next().ok()?;
            let iv = random_iv();
            segments.push(ReplySegment {
                to_header: cloak(&hop.header_pub()),
                from_pub: ephemeral.public_key(),
                iv,
            });
            service_ciphers[i] = shared_secret(&ephemeral, &hop.payload_pub()).ok()?;
            service_nonces[i] = iv;
        }
        let service_header = RoutingHeader {
            segments: [segments[0].clone(), segments[1].clone(), segments[2].clone()],
        };

        let ready = Ready {
            id,
            service_key,
            client_header,
            service_header,
            client_ciphers,
            service_ciphers,
            client_nonces,
            service_nonces,
        };

        let f4_addr = f4.node_ref.clone()?;
        let eph4 = self.0.keyset.next().ok()?;
        let crypt4 = Crypt::new_session(&f4.header_pub(), &f4.payload_pub(), &eph4, random_iv(), Layer::Ready(ready)).ok()?;
        let hop4 = Layer::Forward(Forward::new(f4_addr, Layer::Crypt(crypt4)));

        let f3_addr = f3.node_ref.clone()?;
        let eph3 = self.0.keyset.next().ok()?;
        let crypt3 = Crypt::new_session(&f3.header_pub(), &f3.payload_pub(), &eph3, random_iv(), hop4).ok()?;
        let chain = Layer::Forward(Forward::new(f3_addr.clone(), Layer::Crypt(crypt3)));

        Some((chain, f3_addr))
    }

    /// Encode `layer`, frame it as FEC shards keyed under `id`, and
    /// send every shard to `addr`.
    fn send_chain(&self, layer: Layer, id: Id, addr: &str) {
        let mut splice = Splice::with_capacity(layer.len());
        if let Err(err) = layer.encode(&mut splice) {
            debug!(%err, "failed to encode reply chain");
            return;
        }
        match build_packets(&splice.into_bytes(), id, &self.0.config, &self.0.identity, &self.0.peers, addr) {
            Ok(packets) => {
                for packet in packets {
                    self.send(addr, packet);
                }
            }
            Err(err) => debug!(%err, %addr, "failed to frame reply chain"),
        }
    }
}

fn random_iv() -> Iv {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut iv = [0u8; indra_crypto::IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}

impl EngineContext for Engine {
    fn identity_private(&self) -> PrivateKey {
        self.0.identity.private.clone()
    }

    fn find_cloaked(&self, tag: &indra_crypto::CloakedKey) -> Option<CloakMatch> {
        if matches(tag, &self.0.identity.public) {
            return Some(CloakMatch::Identity);
        }
        self.0
            .sessions
            .find_cloaked(tag)
            .map(|(header_prv, payload_prv)| CloakMatch::Session {
                header_prv,
                payload_prv,
            })
    }

    fn send(&self, addr: &str, bytes: Vec<u8>) {
        if let Err(err) = self.0.transport.send(addr, bytes) {
            debug!(%err, %addr, "transport send failed");
        }
    }

    fn complete_response(&self, id: Id, _port: u16, _load: u8, bytes: Vec<u8>) {
        self.0.pending.complete(id, bytes, &self.0.sessions, self.0.config.hop_rate_per_kb);
    }

    fn fire_confirmation(&self, id: Id, _load: u8) {
        self.0.pending.confirm(id, &self.0.sessions, self.0.config.hop_rate_per_kb);
    }

    fn install_session(
        &self,
        hop_index: u8,
        header_prv: PrivateKey,
        payload_prv: PrivateKey,
        node_ref: Option<String>,
    ) -> bool {
        self.0
            .sessions
            .install_session(hop_index, header_prv, payload_prv, node_ref, self.0.config.session_ttl)
    }

    fn schedule_delay(&self, duration: std::time::Duration, billing_session: Id, inner_bytes: Vec<u8>) {
        let engine = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(duration).await;
            let charge = (duration.as_secs() * engine.0.config.delay_rate_per_sec).max(1) as i64;
            if let Err(err) = engine.0.sessions.dec_balance(&billing_session, charge) {
                debug!(?billing_session, %err, "billing session missing at delay settlement");
            }
            engine.dispatch_bytes(inner_bytes, None);
        });
    }

    fn dispatch_exit(
        &self,
        id: Id,
        port: u16,
        payload: Vec<u8>,
        ciphers: [[u8; 32]; 3],
        nonces: [Iv; 3],
        reply_addr: Option<String>,
    ) {
        exit_service::dispatch_exit(
            id,
            port,
            payload,
            ciphers,
            nonces,
            reply_addr,
            self.0.exits.clone(),
            self.0.transport.clone(),
            self.0.peers.clone(),
            self.0.identity.clone(),
            self.0.config.clone(),
        );
    }

    fn handle_route(&self, route: &Route, reply_addr: Option<String>) -> indra_core::Result<()> {
        let hosted = {
            let services = self.0.hosted_services.lock().expect("hosted-services mutex poisoned");
            services
                .iter()
                .find(|(key, _)| matches(&route.hidden_service, key))
                .map(|(key, prv)| (*key, prv.clone()))
        };

        if let Some((service_key, service_prv)) = hosted {
            let mut route = route.clone();
            route.decrypt(&service_prv)?;
            if let RouteBody::Decoded {
                id,
                ciphers,
                nonces,
                routing_header,
            } = route.body
            {
                self.build_and_send_ready(service_key, id, ciphers, nonces, routing_header, reply_addr);
            }
            return Ok(());
        }

        let target_addr = {
            let introductions = self.0.introductions.lock().expect("introductions mutex poisoned");
            introductions
                .values()
                .find(|intro| matches(&route.hidden_service, &intro.key))
                .map(|intro| intro.addr.clone())
        };
        match target_addr {
            Some(addr) => {
                let layer = Layer::Route(route.clone());
                let mut splice = Splice::with_capacity(layer.len());
                layer.encode(&mut splice)?;
                self.send(&addr, splice.into_bytes());
            }
            None => debug!("route arrived for an unrecognised hidden service, dropping"),
        }
        Ok(())
    }

    fn handle_ready(&self, ready: &Ready) -> indra_core::Result<()> {
        self.0
            .ready_headers
            .lock()
            .expect("ready-headers mutex poisoned")
            .insert(ready.id, ready.clone());
        Ok(())
    }

    fn handle_message(&self, message: &indra_core::Message) -> indra_core::Result<()> {
        let app = {
            let apps = self.0.hidden_apps.lock().expect("hidden-apps mutex poisoned");
            apps.get(&message.address).cloned()
        };
        let Some(app) = app else {
            debug!("message arrived for a hidden service this node does not host");
            return Ok(());
        };

        // The reply address is resolved through the return header's
        // first segment rather than `prev`: `handle_message` carries
        // no transport address of its own, matching `EngineContext`'s
        // signature — the return conduit is exactly what the routing
        // header exists to encode.
        let reply_addr = self
            .0
            .sessions
            .node_ref_for_cloak(&message.return_header.segments[0].to_header);
        let Some(reply_addr) = reply_addr else {
            debug!("no installed session resolves this message's return header, dropping reply");
            return Ok(());
        };

        let engine = self.clone();
        let id = message.id;
        let ciphers = message.return_ciphers;
        let nonces = message.return_nonces;
        let payload = message.payload.clone();
        tokio::spawn(async move {
            let call = app.call(payload);
            let mut bytes = match tokio::time::timeout(engine.config().request_timeout, call).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    debug!("hidden-service app timed out");
                    return;
                }
            };
            for i in (0..ciphers.len()).rev() {
                encipher(&ciphers[i], &nonces[i], &mut bytes);
            }

            let response = Layer::Response(Response { id, port: 0, load: 0, bytes });
            let mut splice = Splice::with_capacity(response.len());
            if let Err(err) = response.encode(&mut splice) {
                debug!(%err, "failed to encode hidden-service response");
                return;
            }

            match build_packets(
                &splice.into_bytes(),
                id,
                engine.config(),
                &engine.0.identity,
                &engine.0.peers,
                &reply_addr,
            ) {
                Ok(packets) => {
                    for packet in packets {
                        engine.send(&reply_addr, packet);
                    }
                }
                Err(err) => debug!(%err, %reply_addr, "failed to frame hidden-service response"),
            }
        });
        Ok(())
    }

    fn register_introduction(&self, intro: Introduction) {
        self.0
            .introductions
            .lock()
            .expect("introductions mutex poisoned")
            .insert(intro.key, intro);
    }

    fn fresh_public_key(&self) -> PublicKey {
        match self.0.keyset.next() {
            Ok(prv) => prv.public_key(),
            Err(_) => PrivateKey::generate().public_key(),
        }
    }
}

/// Convenience for building an outbound cloak-addressed `Crypt`
/// wrapping, given the next hop's (or session's) public key — used by
/// callers assembling a chain before `send_and_await`.
pub fn cloak_for(pub_key: &PublicKey) -> indra_crypto::CloakedKey {
    cloak(pub_key)
}
