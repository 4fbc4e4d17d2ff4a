//! The onion registry (C4): a process-wide, read-only-after-init
//! `magic → decoder` table. Populated lazily on first use rather than
//! via scattered `init()` side effects scattered across modules.

use std::collections::HashMap;
use std::sync::Mutex;

use indra_splice::{Magic, Splice};
use once_cell::sync::Lazy;
use tracing::info;

use crate::error::{CoreError, Result};
use crate::layer::Layer;
use crate::layers::confirmation::Confirmation;
use crate::layers::crypt::Crypt;
use crate::layers::delay::Delay;
use crate::layers::exit::Exit;
use crate::layers::forward::Forward;
use crate::layers::hidden_service::HiddenService;
use crate::layers::message::Message;
use crate::layers::ready::Ready;
use crate::layers::response::Response;
use crate::layers::reverse::Reverse;
use crate::layers::route::Route;
use crate::layers::session::SessionLayer;
use crate::magic;

type Decoder = fn(&mut Splice) -> Result<Layer>;

static REGISTRY: Lazy<Mutex<HashMap<Magic, Decoder>>> = Lazy::new(|| {
    let mut table: HashMap<Magic, Decoder> = HashMap::new();
    table.insert(magic::CRYPT, (|s| Ok(Layer::Crypt(Crypt::decode(s)?))) as Decoder);
    table.insert(magic::FORWARD, (|s| Ok(Layer::Forward(Forward::decode(s)?))) as Decoder);
    table.insert(magic::REVERSE, (|s| Ok(Layer::Reverse(Reverse::decode(s)?))) as Decoder);
    table.insert(magic::EXIT, (|s| Ok(Layer::Exit(Exit::decode(s)?))) as Decoder);
    table.insert(magic::RESPONSE, (|s| Ok(Layer::Response(Response::decode(s)?))) as Decoder);
    table.insert(magic::SESSION, (|s| Ok(Layer::Session(SessionLayer::decode(s)?))) as Decoder);
    table.insert(
        magic::CONFIRMATION,
        (|s| Ok(Layer::Confirmation(Confirmation::decode(s)?))) as Decoder,
    );
    table.insert(magic::DELAY, (|s| Ok(Layer::Delay(Delay::decode(s)?))) as Decoder);
    table.insert(magic::ROUTE, (|s| Ok(Layer::Route(Route::decode(s)?))) as Decoder);
    table.insert(magic::READY, (|s| Ok(Layer::Ready(Ready::decode(s)?))) as Decoder);
    table.insert(
        magic::HIDDEN_SERVICE,
        (|s| Ok(Layer::HiddenService(HiddenService::decode(s)?))) as Decoder,
    );
    table.insert(magic::MESSAGE, (|s| Ok(Layer::Message(Message::decode(s)?))) as Decoder);
    table.insert(magic::END, (|_s| Ok(Layer::End)) as Decoder);
    Mutex::new(table)
});

/// Called at process startup in the teacher's idiom; the table is
/// actually built lazily on first access regardless, so this mainly
/// documents the intent and forces initialisation eagerly if a
/// caller wants predictable first-packet latency.
pub fn register_all() {
    let registry = Lazy::force(&REGISTRY);
    info!(layers = registry.lock().expect("registry mutex poisoned").len(), "onion layer registry initialised");
}

/// Peek the next magic and report whether a decoder is registered for
/// it, without advancing the cursor.
pub fn recognise(splice: &Splice) -> Result<Option<Magic>> {
    let magic = splice.peek_magic()?;
    let registry = REGISTRY.lock().expect("registry mutex poisoned");
    Ok(registry.get(&magic).map(|_| magic))
}

/// Read the magic, advance past it, and decode the matching layer
/// (which may itself recurse to decode further nested raw bytes).
pub fn decode_chain(splice: &mut Splice) -> Result<Layer> {
    let magic = splice.read_magic()?;
    let decoder = {
        let registry = REGISTRY.lock().expect("registry mutex poisoned");
        *registry.get(&magic).ok_or(CoreError::UnknownMagic(magic))?
    };
    decoder(splice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::confirmation::Confirmation as ConfirmationLayer;

    #[test]
    fn recognises_registered_magic() {
        register_all();
        let layer = Layer::Confirmation(ConfirmationLayer { id: [0u8; 8], load: 0 });
        let mut s = Splice::with_capacity(layer.len());
        layer.encode(&mut s).unwrap();
        assert_eq!(recognise(&s).unwrap(), Some(magic::CONFIRMATION));
    }

    #[test]
    fn unknown_magic_is_reported() {
        register_all();
        let mut s = Splice::from_bytes(b"xxxx".to_vec());
        assert!(matches!(decode_chain(&mut s), Err(CoreError::UnknownMagic(_))));
    }

    #[test]
    fn end_decodes_with_no_remaining_bytes() {
        register_all();
        let layer = Layer::End;
        let mut s = Splice::with_capacity(layer.len());
        layer.encode(&mut s).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        let decoded = decode_chain(&mut r).unwrap();
        assert!(matches!(decoded, Layer::End));
        assert!(r.is_exhausted());
    }
}
