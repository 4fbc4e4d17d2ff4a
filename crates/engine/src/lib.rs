//! The engine crate (C8): the single-process coordinator that ties
//! every other `indra-*` crate together behind one `Engine` handle —
//! inbound FEC reassembly and layer dispatch, the outbound packet
//! builder, the pending-response table, and the exit-service and
//! transport seams a deployment plugs its own service handlers and
//! network glue into.
//!
//! Deliberately out of scope here (left to a binary built on top of
//! this crate): CLI argument parsing, on-disk configuration loading,
//! peer discovery/gossip, payment settlement, and any concrete
//! transport (TCP, QUIC, ...) beyond the in-memory one used for tests.

mod builder;
mod config;
mod engine;
mod error;
mod exit_service;
mod peers;
mod pending;
mod transport;

pub use builder::build_packets;
pub use config::EngineConfig;
pub use engine::{cloak_for, Engine};
pub use error::{EngineError, ProtocolError, Result};
pub use exit_service::{ExitFuture, ExitRegistry, ExitService};
pub use peers::PeerDirectory;
pub use pending::PendingTable;
pub use transport::{Transport, TransportError};

#[cfg(any(test, feature = "test-support"))]
pub use transport::memory::MemoryTransport;
