//! The packet frame: a fixed clear header, an ECDH-encrypted body
//! header, and a payload shard.
//!
//! ```text
//! [4 B check][33 B from-pub][8 B cloaked-to][16 B IV]   clear
//! [8 B id][2 B seq][4 B length][1 B parity][data...]    encrypted
//! ```
//! `check` is the first four bytes of `SHA-256` over everything that
//! follows it, so a corrupted or misdirected frame is rejected before
//! attempting to decrypt.

use indra_crypto::{encipher, hash, CloakedKey, Id, Iv, PublicKey, CLOAK_LEN, ID_LEN, IV_LEN, PUBLIC_KEY_LEN};
use indra_splice::Splice;

use crate::error::{FecError, Result};

const CHECK_LEN: usize = 4;
pub const CLEAR_OVERHEAD: usize = CHECK_LEN + PUBLIC_KEY_LEN + CLOAK_LEN + IV_LEN;
pub const CIPHER_OVERHEAD: usize = ID_LEN + 2 + 4 + 1;
/// Total non-payload bytes in every packet; `S - OVERHEAD` is the
/// data a single shard carries.
pub const OVERHEAD: usize = CLEAR_OVERHEAD + CIPHER_OVERHEAD;

#[derive(Debug, Clone)]
pub struct Packet {
    pub from_pub: PublicKey,
    pub to_cloak: CloakedKey,
    pub iv: Iv,
    pub id: Id,
    pub seq: u16,
    /// Total length of the message this packet is one shard of.
    pub length: u32,
    pub parity: u8,
    pub data: Vec<u8>,
}

impl Packet {
    pub fn encode(&self, key: &[u8; 32]) -> Result<Vec<u8>> {
        let mut body = Splice::with_capacity(CIPHER_OVERHEAD + self.data.len());
        body.write_id(&self.id)?;
        body.write_u16(self.seq)?;
        body.write_u32(self.length)?;
        body.write_u8(self.parity)?;
        body.write_raw(&self.data)?;
        let mut body_bytes = body.into_bytes();
        encipher(key, &self.iv, &mut body_bytes);

        let mut rest = Splice::with_capacity(PUBLIC_KEY_LEN + CLOAK_LEN + IV_LEN + body_bytes.len());
        rest.write_pubkey(&self.from_pub)?;
        rest.write_cloaked(&self.to_cloak)?;
        rest.write_iv(&self.iv)?;
        rest.write_raw(&body_bytes)?;
        let rest_bytes = rest.into_bytes();
        let digest = hash(&rest_bytes);

        let mut out = Splice::with_capacity(CHECK_LEN + rest_bytes.len());
        out.write_raw(&digest[..CHECK_LEN])?;
        out.write_raw(&rest_bytes)?;
        Ok(out.into_bytes())
    }

    /// Read the clear header without decrypting, so a receiver can
    /// pick the right key before paying for a decrypt.
    pub fn peek_header(bytes: &[u8]) -> Result<(PublicKey, CloakedKey, Iv)> {
        let mut s = Splice::from_slice(bytes);
        let _check = s.read_raw(CHECK_LEN)?;
        let from_pub = s.read_pubkey()?;
        let to_cloak = s.read_cloaked()?;
        let iv = s.read_iv()?;
        Ok((from_pub, to_cloak, iv))
    }

    pub fn decode(bytes: &[u8], key: &[u8; 32]) -> Result<Self> {
        let mut s = Splice::from_slice(bytes);
        let check = s.read_raw(CHECK_LEN)?;
        let rest = s.remaining_slice().to_vec();
        let digest = hash(&rest);
        if digest[..CHECK_LEN] != check[..] {
            return Err(FecError::ChecksumMismatch);
        }
        let from_pub = s.read_pubkey()?;
        let to_cloak = s.read_cloaked()?;
        let iv = s.read_iv()?;
        let mut body = s.take_to_end();
        encipher(key, &iv, &mut body);

        let mut b = Splice::from_bytes(body);
        let id = b.read_id()?;
        let seq = b.read_u16()?;
        let length = b.read_u32()?;
        let parity = b.read_u8()?;
        let data = b.take_to_end();
        Ok(Self {
            from_pub,
            to_cloak,
            iv,
            id,
            seq,
            length,
            parity,
            data,
        })
    }
}

/// All packets of one message must agree on `id`, `length`, `parity`.
pub fn validate_common_fields(packets: &[Packet]) -> Result<()> {
    let first = match packets.first() {
        Some(p) => p,
        None => return Err(FecError::EmptyPackets),
    };
    for p in packets {
        if p.id != first.id {
            return Err(FecError::Mismatch { field: "id" });
        }
        if p.length != first.length {
            return Err(FecError::Mismatch { field: "length" });
        }
        if p.parity != first.parity {
            return Err(FecError::Mismatch { field: "parity" });
        }
    }
    Ok(())
}
