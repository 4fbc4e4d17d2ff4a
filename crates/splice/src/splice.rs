//! The cursor-carrying byte buffer and its typed field readers/writers.
//!
//! A `Splice` is a single owned buffer plus a cursor. The same type
//! serves both directions: for encoding, callers pre-size the buffer
//! to the layer's exact `len()` and write fields in order; for
//! decoding, callers wrap the received bytes and read fields in the
//! same order. Every write/read advances the cursor by exactly the
//! field's on-wire width, so nested encoders compose without any
//! length bookkeeping at the call site.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

use indra_crypto::{CloakedKey, Id, Iv, PrivateKey, PublicKey, Signature, CLOAK_LEN, ID_LEN, IV_LEN, PRIVATE_KEY_LEN, PUBLIC_KEY_LEN, SIGNATURE_LEN};

use crate::error::{Result, SpliceError};

pub const MAGIC_LEN: usize = 4;
pub type Magic = [u8; MAGIC_LEN];

/// A 4/16-byte IP address plus a 16-bit port, as carried on the wire:
/// 1-byte family tag, then the address, then the big-endian port.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrPort {
    V4(Ipv4Addr, u16),
    V6(Ipv6Addr, u16),
}

impl AddrPort {
    const FAMILY_V4: u8 = 4;
    const FAMILY_V6: u8 = 6;

    pub fn ip(&self) -> IpAddr {
        match self {
            AddrPort::V4(addr, _) => IpAddr::V4(*addr),
            AddrPort::V6(addr, _) => IpAddr::V6(*addr),
        }
    }

    pub fn port(&self) -> u16 {
        match self {
            AddrPort::V4(_, port) | AddrPort::V6(_, port) => *port,
        }
    }

    fn on_wire_len(&self) -> usize {
        match self {
            AddrPort::V4(..) => 1 + 4 + 2,
            AddrPort::V6(..) => 1 + 16 + 2,
        }
    }
}

pub struct Splice {
    buf: Vec<u8>,
    cursor: usize,
}

impl Splice {
    /// A write-mode buffer pre-sized to the exact number of bytes the
    /// caller is about to encode.
    pub fn with_capacity(len: usize) -> Self {
        Self {
            buf: vec![0u8; len],
            cursor: 0,
        }
    }

    /// A read-mode buffer wrapping already-received bytes.
    pub fn from_bytes(data: Vec<u8>) -> Self {
        Self { buf: data, cursor: 0 }
    }

    pub fn from_slice(data: &[u8]) -> Self {
        Self::from_bytes(data.to_vec())
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.cursor
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// True once the cursor has consumed every byte — the "decode
    /// consumes exactly its length" chain invariant.
    pub fn is_exhausted(&self) -> bool {
        self.cursor == self.buf.len()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn remaining_slice(&self) -> &[u8] {
        &self.buf[self.cursor..]
    }

    /// Consume and return every remaining byte, advancing the cursor
    /// to the end. Used by layers whose trailing content (e.g. an
    /// inline routing header) has no explicit length prefix because it
    /// always fills the rest of the splice.
    pub fn take_to_end(&mut self) -> Vec<u8> {
        let rest = self.buf[self.cursor..].to_vec();
        self.cursor = self.buf.len();
        rest
    }

    fn require_write(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(SpliceError::BufferTooSmall {
                needed: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn require_read(&self, n: usize) -> Result<()> {
        if self.remaining() < n {
            return Err(SpliceError::Truncated {
                needed: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        self.require_write(bytes.len())?;
        let end = self.cursor + bytes.len();
        self.buf[self.cursor..end].copy_from_slice(bytes);
        self.cursor = end;
        Ok(())
    }

    fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        self.require_read(n)?;
        let start = self.cursor;
        self.cursor += n;
        Ok(&self.buf[start..self.cursor])
    }

    // -- magic --------------------------------------------------------

    pub fn write_magic(&mut self, magic: &Magic) -> Result<&mut Self> {
        self.write_bytes(magic)?;
        Ok(self)
    }

    pub fn read_magic(&mut self) -> Result<Magic> {
        let mut m = [0u8; MAGIC_LEN];
        m.copy_from_slice(self.read_bytes(MAGIC_LEN)?);
        Ok(m)
    }

    /// Read the magic without advancing the cursor, for registry
    /// dispatch that decides *which* decoder to hand the splice to.
    pub fn peek_magic(&self) -> Result<Magic> {
        self.require_read(MAGIC_LEN)?;
        let mut m = [0u8; MAGIC_LEN];
        m.copy_from_slice(&self.buf[self.cursor..self.cursor + MAGIC_LEN]);
        Ok(m)
    }

    pub fn expect_magic(&mut self, expected: &Magic) -> Result<()> {
        let got = self.read_magic()?;
        if &got != expected {
            return Err(SpliceError::BadMagic {
                expected: *expected,
                got,
            });
        }
        Ok(())
    }

    // -- fixed-width integers, big-endian -----------------------------

    pub fn write_u8(&mut self, v: u8) -> Result<&mut Self> {
        self.write_bytes(&[v])?;
        Ok(self)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn write_u16(&mut self, v: u16) -> Result<&mut Self> {
        self.write_bytes(&v.to_be_bytes())?;
        Ok(self)
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let b = self.read_bytes(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn write_u32(&mut self, v: u32) -> Result<&mut Self> {
        self.write_bytes(&v.to_be_bytes())?;
        Ok(self)
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn write_u64(&mut self, v: u64) -> Result<&mut Self> {
        self.write_bytes(&v.to_be_bytes())?;
        Ok(self)
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        let mut arr = [0u8; 8];
        arr.copy_from_slice(b);
        Ok(u64::from_be_bytes(arr))
    }

    // -- domain fixed-width types --------------------------------------

    pub fn write_id(&mut self, id: &Id) -> Result<&mut Self> {
        self.write_bytes(id)?;
        Ok(self)
    }

    pub fn read_id(&mut self) -> Result<Id> {
        let mut id = [0u8; ID_LEN];
        id.copy_from_slice(self.read_bytes(ID_LEN)?);
        Ok(id)
    }

    pub fn write_iv(&mut self, iv: &Iv) -> Result<&mut Self> {
        self.write_bytes(iv)?;
        Ok(self)
    }

    pub fn read_iv(&mut self) -> Result<Iv> {
        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(self.read_bytes(IV_LEN)?);
        Ok(iv)
    }

    pub fn write_iv_triple(&mut self, ivs: &[Iv; 3]) -> Result<&mut Self> {
        for iv in ivs {
            self.write_iv(iv)?;
        }
        Ok(self)
    }

    pub fn read_iv_triple(&mut self) -> Result<[Iv; 3]> {
        Ok([self.read_iv()?, self.read_iv()?, self.read_iv()?])
    }

    pub fn write_hash(&mut self, hash: &[u8; 32]) -> Result<&mut Self> {
        self.write_bytes(hash)?;
        Ok(self)
    }

    pub fn read_hash(&mut self) -> Result<[u8; 32]> {
        let mut hash = [0u8; 32];
        hash.copy_from_slice(self.read_bytes(32)?);
        Ok(hash)
    }

    pub fn write_hash_triple(&mut self, hashes: &[[u8; 32]; 3]) -> Result<&mut Self> {
        for h in hashes {
            self.write_hash(h)?;
        }
        Ok(self)
    }

    pub fn read_hash_triple(&mut self) -> Result<[[u8; 32]; 3]> {
        Ok([self.read_hash()?, self.read_hash()?, self.read_hash()?])
    }

    pub fn write_pubkey(&mut self, key: &PublicKey) -> Result<&mut Self> {
        self.write_bytes(&key.to_bytes())?;
        Ok(self)
    }

    pub fn read_pubkey(&mut self) -> Result<PublicKey> {
        let mut bytes = [0u8; PUBLIC_KEY_LEN];
        bytes.copy_from_slice(self.read_bytes(PUBLIC_KEY_LEN)?);
        PublicKey::from_bytes(&bytes).map_err(|e| SpliceError::InvalidKey(e.to_string()))
    }

    pub fn write_prvkey(&mut self, key: &PrivateKey) -> Result<&mut Self> {
        self.write_bytes(&key.to_bytes())?;
        Ok(self)
    }

    pub fn read_prvkey(&mut self) -> Result<PrivateKey> {
        let mut bytes = [0u8; PRIVATE_KEY_LEN];
        bytes.copy_from_slice(self.read_bytes(PRIVATE_KEY_LEN)?);
        PrivateKey::from_bytes(&bytes).map_err(|e| SpliceError::InvalidKey(e.to_string()))
    }

    pub fn write_signature(&mut self, sig: &Signature) -> Result<&mut Self> {
        self.write_bytes(sig)?;
        Ok(self)
    }

    pub fn read_signature(&mut self) -> Result<Signature> {
        let mut sig = [0u8; SIGNATURE_LEN];
        sig.copy_from_slice(self.read_bytes(SIGNATURE_LEN)?);
        Ok(sig)
    }

    pub fn write_cloaked(&mut self, tag: &CloakedKey) -> Result<&mut Self> {
        self.write_bytes(tag)?;
        Ok(self)
    }

    pub fn read_cloaked(&mut self) -> Result<CloakedKey> {
        let mut tag = [0u8; CLOAK_LEN];
        tag.copy_from_slice(self.read_bytes(CLOAK_LEN)?);
        Ok(tag)
    }

    // -- duration / time: u64 nanoseconds ------------------------------

    pub fn write_duration(&mut self, d: Duration) -> Result<&mut Self> {
        self.write_u64(d.as_nanos() as u64)?;
        Ok(self)
    }

    pub fn read_duration(&mut self) -> Result<Duration> {
        Ok(Duration::from_nanos(self.read_u64()?))
    }

    // -- addr-port: 1 B family + 4/16 B addr + 2 B port ----------------

    pub fn write_addr_port(&mut self, addr: &AddrPort) -> Result<&mut Self> {
        self.require_write(addr.on_wire_len())?;
        match addr {
            AddrPort::V4(ip, port) => {
                self.write_u8(AddrPort::FAMILY_V4)?;
                self.write_bytes(&ip.octets())?;
                self.write_u16(*port)?;
            }
            AddrPort::V6(ip, port) => {
                self.write_u8(AddrPort::FAMILY_V6)?;
                self.write_bytes(&ip.octets())?;
                self.write_u16(*port)?;
            }
        }
        Ok(self)
    }

    pub fn read_addr_port(&mut self) -> Result<AddrPort> {
        let family = self.read_u8()?;
        match family {
            AddrPort::FAMILY_V4 => {
                let mut octets = [0u8; 4];
                octets.copy_from_slice(self.read_bytes(4)?);
                let port = self.read_u16()?;
                Ok(AddrPort::V4(Ipv4Addr::from(octets), port))
            }
            AddrPort::FAMILY_V6 => {
                let mut octets = [0u8; 16];
                octets.copy_from_slice(self.read_bytes(16)?);
                let port = self.read_u16()?;
                Ok(AddrPort::V6(Ipv6Addr::from(octets), port))
            }
            other => Err(SpliceError::InvalidAddrFamily(other)),
        }
    }

    // -- length-prefixed fields -----------------------------------------

    /// `u16` length + bytes — used for multiaddr strings.
    pub fn write_multiaddr(&mut self, addr: &str) -> Result<&mut Self> {
        let bytes = addr.as_bytes();
        let len: u16 = bytes
            .len()
            .try_into()
            .map_err(|_| SpliceError::BufferTooSmall { needed: bytes.len(), remaining: u16::MAX as usize })?;
        self.write_u16(len)?;
        self.write_bytes(bytes)?;
        Ok(self)
    }

    pub fn read_multiaddr(&mut self) -> Result<String> {
        let len = self.read_u16()? as usize;
        let bytes = self.read_bytes(len)?.to_vec();
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// `u32` length + bytes — the general variable-length byte field.
    pub fn write_var_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        let len: u32 = bytes
            .len()
            .try_into()
            .map_err(|_| SpliceError::BufferTooSmall { needed: bytes.len(), remaining: u32::MAX as usize })?;
        self.write_u32(len)?;
        self.write_bytes(bytes)?;
        Ok(self)
    }

    pub fn read_var_bytes(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.read_bytes(len)?.to_vec())
    }

    // -- raw, unframed bytes ---------------------------------------------

    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<&mut Self> {
        self.write_bytes(bytes)?;
        Ok(self)
    }

    pub fn read_raw(&mut self, n: usize) -> Result<Vec<u8>> {
        Ok(self.read_bytes(n)?.to_vec())
    }

    /// A mutable view onto the next `n` unread bytes, for in-place
    /// stream-cipher XOR over a region whose boundaries are already
    /// known (e.g. the encrypted remainder of a Crypt layer).
    pub fn raw_mut(&mut self, n: usize) -> Result<&mut [u8]> {
        self.require_read(n)?;
        let start = self.cursor;
        self.cursor += n;
        Ok(&mut self.buf[start..self.cursor])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indra_crypto::Identity;

    #[test]
    fn u32_roundtrips_big_endian() {
        let mut s = Splice::with_capacity(4);
        s.write_u32(0x0102_0304).unwrap();
        assert_eq!(s.as_slice(), &[0x01, 0x02, 0x03, 0x04]);

        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_u32().unwrap(), 0x0102_0304);
        assert!(r.is_exhausted());
    }

    #[test]
    fn write_fails_with_buffer_too_small() {
        let mut s = Splice::with_capacity(2);
        assert!(matches!(
            s.write_u32(1),
            Err(SpliceError::BufferTooSmall { .. })
        ));
    }

    #[test]
    fn read_fails_with_truncated() {
        let mut s = Splice::from_bytes(vec![0u8; 2]);
        assert!(matches!(s.read_u32(), Err(SpliceError::Truncated { .. })));
    }

    #[test]
    fn magic_mismatch_is_reported() {
        let mut s = Splice::from_bytes(b"XXXX".to_vec());
        assert!(matches!(
            s.expect_magic(b"cryp"),
            Err(SpliceError::BadMagic { .. })
        ));
    }

    #[test]
    fn pubkey_roundtrips() {
        let id = Identity::generate();
        let mut s = Splice::with_capacity(PUBLIC_KEY_LEN);
        s.write_pubkey(&id.public).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_pubkey().unwrap(), id.public);
    }

    #[test]
    fn addr_port_v4_roundtrips() {
        let addr = AddrPort::V4(Ipv4Addr::new(127, 0, 0, 1), 9000);
        let mut s = Splice::with_capacity(addr.on_wire_len());
        s.write_addr_port(&addr).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_addr_port().unwrap(), addr);
    }

    #[test]
    fn var_bytes_roundtrip() {
        let payload = b"hello indra".to_vec();
        let mut s = Splice::with_capacity(4 + payload.len());
        s.write_var_bytes(&payload).unwrap();
        let mut r = Splice::from_bytes(s.into_bytes());
        assert_eq!(r.read_var_bytes().unwrap(), payload);
    }

    #[test]
    fn take_to_end_consumes_remainder() {
        let mut s = Splice::from_bytes(vec![1, 2, 3, 4, 5]);
        s.read_u8().unwrap();
        let rest = s.take_to_end();
        assert_eq!(rest, vec![2, 3, 4, 5]);
        assert!(s.is_exhausted());
    }
}
