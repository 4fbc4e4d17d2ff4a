//! The onion layer tagged sum (C5) and the chain these variants form.
//!
//! The source represents a layer as a dynamic capability an interface
//! satisfies; here it is one `enum` with one variant per layer type,
//! decoded through the registry in [`crate::registry`]. `handle` walks
//! the chain recursively: a `Crypt` that successfully decrypts hands
//! its inner layer straight to `handle` again.

use indra_splice::{Magic, Splice};

use crate::context::EngineContext;
use crate::error::{CoreError, Result};
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

/// A layer's not-yet-dispatched remainder: either a chain this node
/// just built and knows the structure of, or bytes it received and
/// has no business parsing further (everything past a `Forward` or
/// `Reverse` hop is opaque to the relay carrying it).
#[derive(Debug, Clone)]
pub enum Inner {
    Decoded(Box<Layer>),
    Raw(Vec<u8>),
}

impl Inner {
    pub fn len(&self) -> usize {
        match self {
            Inner::Decoded(layer) => layer.len(),
            Inner::Raw(bytes) => bytes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        match self {
            Inner::Decoded(layer) => layer.encode(splice),
            Inner::Raw(bytes) => {
                splice.write_raw(bytes)?;
                Ok(())
            }
        }
    }

    /// Consume the rest of `splice` without attempting to recognise
    /// it; used while decoding a relaying layer whose payload is
    /// meant for a different hop.
    pub fn decode_raw(splice: &mut Splice) -> Self {
        Inner::Raw(splice.take_to_end())
    }

    pub fn into_bytes(self) -> Result<Vec<u8>> {
        match self {
            Inner::Raw(bytes) => Ok(bytes),
            Inner::Decoded(layer) => {
                let mut splice = Splice::with_capacity(layer.len());
                layer.encode(&mut splice)?;
                Ok(splice.into_bytes())
            }
        }
    }

    /// Recognise and decode the remainder, if it hasn't been already
    /// — used when a layer that normally just relays bytes onward
    /// instead needs to act on its own inner layer locally (e.g. a
    /// `Session` layer after a successful install).
    pub fn decoded(self) -> Result<Layer> {
        match self {
            Inner::Decoded(layer) => Ok(*layer),
            Inner::Raw(bytes) => crate::registry::decode_chain(&mut Splice::from_bytes(bytes)),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Layer {
    Crypt(Crypt),
    Forward(Forward),
    Reverse(Reverse),
    Exit(Exit),
    Response(Response),
    Session(SessionLayer),
    Confirmation(Confirmation),
    Delay(Delay),
    Route(Route),
    Ready(Ready),
    HiddenService(HiddenService),
    Message(Message),
    End,
}

impl Layer {
    pub fn name(&self) -> &'static str {
        match self {
            Layer::Crypt(_) => "crypt",
            Layer::Forward(_) => "forward",
            Layer::Reverse(_) => "reverse",
            Layer::Exit(_) => "exit",
            Layer::Response(_) => "response",
            Layer::Session(_) => "session",
            Layer::Confirmation(_) => "confirmation",
            Layer::Delay(_) => "delay",
            Layer::Route(_) => "route",
            Layer::Ready(_) => "ready",
            Layer::HiddenService(_) => "hidden_service",
            Layer::Message(_) => "message",
            Layer::End => "end",
        }
    }

    pub fn magic(&self) -> Magic {
        match self {
            Layer::Crypt(_) => magic::CRYPT,
            Layer::Forward(_) => magic::FORWARD,
            Layer::Reverse(_) => magic::REVERSE,
            Layer::Exit(_) => magic::EXIT,
            Layer::Response(_) => magic::RESPONSE,
            Layer::Session(_) => magic::SESSION,
            Layer::Confirmation(_) => magic::CONFIRMATION,
            Layer::Delay(_) => magic::DELAY,
            Layer::Route(_) => magic::ROUTE,
            Layer::Ready(_) => magic::READY,
            Layer::HiddenService(_) => magic::HIDDEN_SERVICE,
            Layer::Message(_) => magic::MESSAGE,
            Layer::End => magic::END,
        }
    }

    /// Total encoded size, magic included.
    pub fn len(&self) -> usize {
        indra_splice::MAGIC_LEN
            + match self {
                Layer::Crypt(c) => c.body_len(),
                Layer::Forward(f) => f.field_len(),
                Layer::Reverse(r) => r.field_len(),
                Layer::Exit(e) => e.field_len(),
                Layer::Response(r) => r.field_len(),
                Layer::Session(s) => s.field_len(),
                Layer::Confirmation(c) => c.field_len(),
                Layer::Delay(d) => d.field_len(),
                Layer::Route(r) => r.field_len(),
                Layer::Ready(r) => r.field_len(),
                Layer::HiddenService(h) => h.field_len(),
                Layer::Message(m) => m.field_len(),
                Layer::End => 0,
            }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn encode(&self, splice: &mut Splice) -> Result<()> {
        splice.write_magic(&self.magic())?;
        match self {
            Layer::Crypt(c) => c.encode_fields(splice),
            Layer::Forward(f) => f.encode_fields(splice),
            Layer::Reverse(r) => r.encode_fields(splice),
            Layer::Exit(e) => e.encode_fields(splice),
            Layer::Response(r) => r.encode_fields(splice),
            Layer::Session(s) => s.encode_fields(splice),
            Layer::Confirmation(c) => c.encode_fields(splice),
            Layer::Delay(d) => d.encode_fields(splice),
            Layer::Route(r) => r.encode_fields(splice),
            Layer::Ready(r) => r.encode_fields(splice),
            Layer::HiddenService(h) => h.encode_fields(splice),
            Layer::Message(m) => m.encode_fields(splice),
            Layer::End => Ok(()),
        }
    }

    /// Attach `inner` as this layer's wrapped payload. Only the
    /// layers the specification lists with an `inner` field accept
    /// one; everything else is a terminal layer.
    pub fn wrap(self, inner: Layer) -> Result<Layer> {
        match self {
            Layer::Crypt(mut c) => {
                c.body = crate::layers::crypt::CryptBody::Inner(Box::new(inner));
                Ok(Layer::Crypt(c))
            }
            Layer::Forward(mut f) => {
                f.inner = Inner::Decoded(Box::new(inner));
                Ok(Layer::Forward(f))
            }
            Layer::Reverse(mut r) => {
                r.inner = Inner::Decoded(Box::new(inner));
                Ok(Layer::Reverse(r))
            }
            Layer::Exit(mut e) => {
                e.inner = Inner::Decoded(Box::new(inner));
                Ok(Layer::Exit(e))
            }
            Layer::Delay(mut d) => {
                d.inner = Inner::Decoded(Box::new(inner));
                Ok(Layer::Delay(d))
            }
            Layer::Session(mut s) => {
                s.inner = Inner::Decoded(Box::new(inner));
                Ok(Layer::Session(s))
            }
            other => Err(CoreError::TerminalLayer(other.name())),
        }
    }

    /// Dispatch this layer, recursing into whatever it decrypts or
    /// unwraps to. `prev` is the address the packet arrived from,
    /// used by terminal layers that reply along the same conduit
    /// rather than a routing header.
    pub fn handle(self, prev: Option<&str>, ctx: &dyn EngineContext) -> Result<()> {
        match self {
            Layer::Crypt(mut c) => {
                let inner = c.handle(ctx)?;
                inner.handle(prev, ctx)
            }
            Layer::Forward(f) => f.handle(ctx),
            Layer::Reverse(r) => r.handle(ctx),
            Layer::Exit(e) => e.handle(prev, ctx),
            Layer::Response(r) => {
                r.handle(ctx);
                Ok(())
            }
            Layer::Session(s) => s.handle(prev, ctx),
            Layer::Confirmation(c) => {
                c.handle(ctx);
                Ok(())
            }
            Layer::Delay(d) => d.handle(ctx),
            Layer::Route(r) => ctx.handle_route(&r, prev.map(str::to_owned)),
            Layer::Ready(r) => ctx.handle_ready(&r),
            Layer::HiddenService(h) => {
                ctx.register_introduction(h.intro.clone());
                Ok(())
            }
            Layer::Message(m) => ctx.handle_message(&m),
            Layer::End => Ok(()),
        }
    }
}

/// Build a chain from an ordered list of layers: `l0.wrap(l1.wrap(l2.wrap(...)))`,
/// returning the outermost layer ready to encode.
pub fn assemble(mut layers: Vec<Layer>) -> Result<Layer> {
    let mut acc = layers.pop().ok_or(CoreError::MissingInner("assemble"))?;
    while let Some(layer) = layers.pop() {
        acc = layer.wrap(acc)?;
    }
    Ok(acc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layers::confirmation::Confirmation as ConfirmationLayer;
    use crate::layers::forward::Forward as ForwardLayer;

    #[test]
    fn assemble_wraps_in_order() {
        let chain = assemble(vec![
            Layer::Forward(ForwardLayer::new("/ip4/127.0.0.1/tcp/9000".into(), Layer::End)),
            Layer::Confirmation(ConfirmationLayer { id: [1u8; 8], load: 0 }),
        ])
        .unwrap();
        match chain {
            Layer::Forward(f) => match f.inner {
                Inner::Decoded(inner) => assert!(matches!(*inner, Layer::Confirmation(_))),
                Inner::Raw(_) => panic!("expected decoded inner"),
            },
            _ => panic!("expected forward outer layer"),
        }
    }

    #[test]
    fn end_is_zero_length_and_terminal() {
        assert_eq!(Layer::End.len(), indra_splice::MAGIC_LEN);
        assert!(Layer::Confirmation(crate::layers::confirmation::Confirmation { id: [0u8; 8], load: 0 })
            .wrap(Layer::End)
            .is_err());
    }
}
