//! The outbound builder (§4.8): split an already-encoded message into
//! FEC shards and frame each as a hop-to-hop `Packet` addressed to a
//! peer's identity key. Callers that start from a typed `Layer` chain
//! (the client building a fresh circuit, an exit wrapping a reply)
//! encode it first; a relay just carrying bytes onward never decodes
//! it at all, so the builder works on bytes either way.

use indra_crypto::{cloak, shared_secret, Id, Identity};
use indra_fec::Packet;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::peers::PeerDirectory;

/// Split `message` per `config` and frame every resulting shard as a
/// `Packet` keyed for `next_hop`. All shards share `id` so the
/// receiving end can reassemble them (§4.6); `id` also doubles as the
/// correlation key a reply travels back under.
pub fn build_packets(
    message: &[u8],
    id: Id,
    config: &EngineConfig,
    own_identity: &Identity,
    peers: &PeerDirectory,
    next_hop: &str,
) -> Result<Vec<Vec<u8>>> {
    let hop_identity = peers
        .get(next_hop)
        .ok_or_else(|| EngineError::NoMatchingService(0))?;
    let key = shared_secret(&own_identity.private, &hop_identity)?;
    let to_cloak = cloak(&hop_identity);

    let shards = indra_fec::split(message, config.segment_size, config.parity_ratio)?;
    let mut packets = Vec::with_capacity(shards.len());
    for shard in shards {
        let packet = Packet {
            from_pub: own_identity.public,
            to_cloak,
            iv: random_iv(),
            id,
            seq: shard.seq,
            length: message.len() as u32,
            parity: config.parity_ratio,
            data: shard.data,
        };
        packets.push(packet.encode(&key)?);
    }
    Ok(packets)
}

fn random_iv() -> indra_crypto::Iv {
    use rand::rngs::OsRng;
    use rand::RngCore;
    let mut iv = [0u8; indra_crypto::IV_LEN];
    OsRng.fill_bytes(&mut iv);
    iv
}
