//! The callback surface a dispatched layer uses to reach back into
//! the engine.
//!
//! Layers live in this crate; the engine that owns transport,
//! sessions, and pending responses lives above it. Rather than invert
//! the dependency (core depending on engine), `handle` takes a
//! `&dyn EngineContext` trait object the engine implements, so the
//! call happens through a narrow interface instead of a crate cycle.

use std::time::Duration;

use indra_crypto::{CloakedKey, Id, Iv, PrivateKey, PublicKey};

use crate::header::Introduction;
use crate::layers::message::Message;
use crate::layers::ready::Ready;
use crate::layers::route::Route;

/// What a cloak tag resolved to, looked up by a `Crypt` layer's
/// `to_header` field.
pub enum CloakMatch {
    /// Addressed to this node's long-lived identity key. There is no
    /// separate payload key outside of a session, so the whole body
    /// decrypts with one ECDH-derived stream.
    Identity,
    /// Addressed to an active session's header key. The payload key
    /// covers everything past the routing-header-sized prefix.
    Session {
        header_prv: PrivateKey,
        payload_prv: PrivateKey,
    },
}

pub trait EngineContext {
    /// This node's long-lived identity private key.
    fn identity_private(&self) -> PrivateKey;

    /// Resolve a cloak tag against the identity key and every active
    /// session's header key.
    fn find_cloaked(&self, tag: &CloakedKey) -> Option<CloakMatch>;

    /// Hand `bytes` to the transport, addressed to `addr`.
    fn send(&self, addr: &str, bytes: Vec<u8>);

    /// A `Response` arrived for a pending request: deliver `bytes` to
    /// the waiting caller and debit billable sessions.
    fn complete_response(&self, id: Id, port: u16, load: u8, bytes: Vec<u8>);

    /// A bare `Confirmation` arrived: fire the callback registered
    /// under `id` with no payload.
    fn fire_confirmation(&self, id: Id, load: u8);

    /// A `Session` layer carrying a preimage arrived. `node_ref` is
    /// the peer that sent it, kept so a reply on this session's behalf
    /// later knows where to go. Returns `true` if a pending payment
    /// matched and the session was installed.
    fn install_session(
        &self,
        hop_index: u8,
        header_prv: PrivateKey,
        payload_prv: PrivateKey,
        node_ref: Option<String>,
    ) -> bool;

    /// Resume `inner_bytes` (an encoded, not-yet-dispatched layer
    /// chain) after `duration` has elapsed, debiting `billing_session`
    /// for the storage time once it fires.
    fn schedule_delay(&self, duration: Duration, billing_session: Id, inner_bytes: Vec<u8>);

    /// Hand an exit request off to the locally registered service on
    /// `port`; the response is wrapped and returned asynchronously.
    fn dispatch_exit(
        &self,
        id: Id,
        port: u16,
        payload: Vec<u8>,
        ciphers: [[u8; 32]; 3],
        nonces: [Iv; 3],
        reply_addr: Option<String>,
    );

    /// A `Route` arrived at an introducer or hidden service.
    fn handle_route(&self, route: &Route, reply_addr: Option<String>) -> Result<(), crate::error::CoreError>;

    /// A `Ready` header arrived at a client awaiting a hidden-service
    /// rendezvous.
    fn handle_ready(&self, ready: &Ready) -> Result<(), crate::error::CoreError>;

    /// A `Message` envelope arrived for an established rendezvous.
    fn handle_message(&self, message: &Message) -> Result<(), crate::error::CoreError>;

    /// A hidden service announced an introduction point.
    fn register_introduction(&self, intro: Introduction);

    /// Look up the public key for `addr_port`-less gossip callers is
    /// out of scope; this is the one escape hatch onion layers use to
    /// derive a fresh ephemeral key when forwarding, e.g. for noise
    /// segments appended by `Reverse`.
    fn fresh_public_key(&self) -> PublicKey;
}
