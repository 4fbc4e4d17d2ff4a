//! Onion registry (C4) and onion layers (C5): the tagged-sum layer
//! chain, its wire codec, and the dispatch-through-a-context pattern
//! that lets a layer reach the engine without this crate depending on
//! it.

mod context;
mod error;
mod header;
mod layer;
mod layers;
mod magic;
mod registry;

pub use context::{CloakMatch, EngineContext};
pub use error::{CoreError, Result};
pub use header::{Introduction, ReplySegment, RoutingHeader, REPLY_SEGMENT_LEN, ROUTING_HEADER_LEN};
pub use layer::{assemble, Inner, Layer};
pub use layers::confirmation::Confirmation;
pub use layers::crypt::{Crypt, CryptBody};
pub use layers::delay::Delay;
pub use layers::exit::Exit;
pub use layers::forward::Forward;
pub use layers::hidden_service::HiddenService;
pub use layers::message::Message;
pub use layers::ready::Ready;
pub use layers::response::Response;
pub use layers::reverse::Reverse;
pub use layers::route::{Route, RouteBody};
pub use layers::session::SessionLayer;
pub use magic::{
    CONFIRMATION as CONFIRMATION_MAGIC, CRYPT as CRYPT_MAGIC, DELAY as DELAY_MAGIC,
    END as END_MAGIC, EXIT as EXIT_MAGIC, FORWARD as FORWARD_MAGIC,
    HIDDEN_SERVICE as HIDDEN_SERVICE_MAGIC, MESSAGE as MESSAGE_MAGIC, READY as READY_MAGIC,
    RESPONSE as RESPONSE_MAGIC, REVERSE as REVERSE_MAGIC, ROUTE as ROUTE_MAGIC,
    SESSION as SESSION_MAGIC,
};
pub use registry::{decode_chain, recognise, register_all};
