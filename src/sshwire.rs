//! SSH wire format reading/writing.
//! Used in conjunction with [`sunset_sshwire_derive`] and the [`packet`](crate::packets) format
//! definitions.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::vec::Vec;
use core::fmt::{self, Debug};

use ascii::{AsAsciiStr, AsciiChar, AsciiStr};

/// A generic destination for serializing, used similarly to `serde::Serializer`
pub trait SSHSink {
    fn push(&mut self, v: &[u8]) -> WireResult<()>;
}

/// A generic source for a packet, used similarly to `serde::Deserializer`
pub trait SSHSource<'de> {
    fn take(&mut self, len: usize) -> WireResult<&'de [u8]>;
    fn pos(&self) -> usize;
}

/// Encodes the type in SSH wire format
pub trait SSHEncode {
    fn enc<S>(&self, s: &mut S) -> WireResult<()> where S: SSHSink;
}

/// Decodes `struct`s from SSH wire format
pub trait SSHDecode<'de>: Sized {
    fn dec<S>(s: &mut S) -> WireResult<Self> where S: SSHSource<'de>;
}

/// A subset of [`Error`] for `SSHEncode` and `SSHDecode`.
#[derive(Debug)]
pub enum WireError {
    NoRoom,

    RanOut,

    BadName,

    /// A negative mpint
    BadNumber,

    SSHProtoError,

    UnknownPacket { number: u8 },
}

impl From<WireError> for Error {
    fn from(w: WireError) -> Self {
        match w {
            WireError::NoRoom => Error::NoRoom,
            WireError::RanOut => Error::RanOut,
            WireError::BadName => Error::BadName,
            WireError::BadNumber => Error::BadNumber,
            WireError::SSHProtoError => Error::WrongPacketLength,
            WireError::UnknownPacket { number } => Error::UnknownPacket { number },
        }
    }
}

pub type WireResult<T> = core::result::Result<T, WireError>;

///////////////////////////////////////////////

/// Decodes a `T` from the whole of `b`.
///
/// Trailing bytes fail with [`Error::WrongPacketLength`].
pub fn read_ssh<'a, T: SSHDecode<'a>>(b: &'a [u8]) -> Result<T> {
    let mut s = DecodeBytes { input: b, pos: 0 };
    let t = T::dec(&mut s)?;
    if s.pos() != b.len() {
        trace!("{} trailing bytes after {} consumed", b.len() - s.pos(), s.pos());
        return Err(Error::WrongPacketLength);
    }
    Ok(t)
}

/// Decodes a `T` from the start of `b`, ignoring any following bytes.
pub fn read_ssh_prefix<'a, T: SSHDecode<'a>>(b: &'a [u8]) -> Result<T> {
    let mut s = DecodeBytes { input: b, pos: 0 };
    Ok(T::dec(&mut s)?)
}

/// Serializes `value` into a newly allocated buffer of the exact length.
pub fn write_ssh_vec<T>(value: &T) -> Result<Vec<u8>>
where
    T: SSHEncode,
{
    let len = length_enc(value)? as usize;
    let mut s = EncodeVec { target: Vec::with_capacity(len) };
    value.enc(&mut s)?;
    debug_assert_eq!(s.target.len(), len);
    Ok(s.target)
}

/// Returns `WireError::NoRoom` if larger than `u32`
fn length_enc<T>(value: &T) -> WireResult<u32>
where
    T: SSHEncode,
{
    let mut s = EncodeLen { pos: 0 };
    value.enc(&mut s)?;
    s.pos.try_into().map_err(|_| WireError::NoRoom)
}

struct EncodeVec {
    target: Vec<u8>,
}

impl SSHSink for EncodeVec {
    fn push(&mut self, v: &[u8]) -> WireResult<()> {
        self.target.extend_from_slice(v);
        Ok(())
    }
}

struct EncodeLen {
    pos: usize,
}

impl SSHSink for EncodeLen {
    fn push(&mut self, v: &[u8]) -> WireResult<()> {
        self.pos += v.len();
        Ok(())
    }
}

struct DecodeBytes<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'de> SSHSource<'de> for DecodeBytes<'de> {
    fn take(&mut self, len: usize) -> WireResult<&'de [u8]> {
        if len > self.input.len() {
            return Err(WireError::RanOut);
        }
        let t;
        (t, self.input) = self.input.split_at(len);
        self.pos += len;
        Ok(t)
    }

    fn pos(&self) -> usize {
        self.pos
    }
}

/// Hashes a slice to be treated as a mpint. Has u32 length prefix
/// and an extra 0x00 byte if the MSB is set.
///
/// Redundant leading zero bytes of `m` are skipped first, so a magnitude that
/// already carries its sign padding hashes identically.
pub fn hash_mpint(hash_ctx: &mut dyn digest::DynDigest, m: &[u8]) {
    let m = strip_zeros(m);
    let pad = mpint_pad(m);
    let l = m.len() as u32 + pad as u32;
    hash_ctx.update(&l.to_be_bytes());
    if pad {
        hash_ctx.update(&[0x00]);
    }
    hash_ctx.update(m);
}

/// Hashes a `u32` length prefix followed by the bytes of `v`.
pub fn hash_string(hash_ctx: &mut dyn digest::DynDigest, v: &[u8]) {
    hash_ctx.update(&(v.len() as u32).to_be_bytes());
    hash_ctx.update(v);
}

fn strip_zeros(m: &[u8]) -> &[u8] {
    let z = m.iter().take_while(|b| **b == 0).count();
    &m[z..]
}

fn mpint_pad(m: &[u8]) -> bool {
    m.first().map_or(false, |b| b & 0x80 != 0)
}

///////////////////////////////////////////////

/// A SSH style binary string. Serialized as `u32` length followed by the bytes
/// of the slice.
#[derive(Clone,PartialEq)]
pub struct BinString<'a>(pub &'a [u8]);

impl<'a> AsRef<[u8]> for BinString<'a> {
    fn as_ref(&self) -> &'a [u8] {
        self.0
    }
}

impl<'a> Debug for BinString<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BinString(len={})", self.0.len())
    }
}

impl SSHEncode for BinString<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        (self.0.len() as u32).enc(s)?;
        self.0.enc(s)
    }
}

impl<'de> SSHDecode<'de> for BinString<'de> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let len = u32::dec(s)? as usize;
        Ok(BinString(s.take(len)?))
    }
}

/// A non-negative multiple precision integer, RFC4251 `mpint`.
///
/// Holds the big-endian magnitude. Encoding writes the minimal two's
/// complement form: leading zero bytes are dropped and a single `0x00`
/// is prepended when the most significant bit is set. Decoding
/// rejects negative values and returns the magnitude without sign padding.
#[derive(Clone, PartialEq)]
pub struct MPInt<'a>(pub &'a [u8]);

impl<'a> MPInt<'a> {
    /// The magnitude with no leading zero bytes
    pub fn magnitude(&self) -> &'a [u8] {
        strip_zeros(self.0)
    }

    /// Number of significant bits
    pub fn bits(&self) -> u64 {
        let m = self.magnitude();
        match m.first() {
            Some(b) => (m.len() as u64 - 1) * 8 + (8 - b.leading_zeros() as u64),
            None => 0,
        }
    }
}

impl<'a> Debug for MPInt<'a> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MPInt(bits={})", self.bits())
    }
}

impl SSHEncode for MPInt<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        let m = self.magnitude();
        let pad = mpint_pad(m);
        (m.len() as u32 + pad as u32).enc(s)?;
        if pad {
            0u8.enc(s)?;
        }
        m.enc(s)
    }
}

impl<'de> SSHDecode<'de> for MPInt<'de> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let b = BinString::dec(s)?;
        if mpint_pad(b.0) {
            trace!("negative mpint");
            return Err(WireError::BadNumber)
        }
        Ok(MPInt(strip_zeros(b.0)))
    }
}

///////////////////////////////////////////////

impl SSHEncode for u8 {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        s.push(&[*self])
    }
}

impl SSHEncode for u32 {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        s.push(&self.to_be_bytes())
    }
}

// no length prefix
impl SSHEncode for &[u8] {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        // data
        s.push(self)
    }
}

impl SSHEncode for &str {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        let v = self.as_bytes();
        // length prefix
        (v.len() as u32).enc(s)?;
        s.push(v)
    }
}

// #[inline] seems to decrease code size somehow

impl<'de> SSHDecode<'de> for u8 {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let t = s.take(core::mem::size_of::<u8>())?;
        Ok(t[0])
    }
}

impl<'de> SSHDecode<'de> for u32 {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let t = s.take(core::mem::size_of::<u32>())?;
        let t: [u8; 4] = t.try_into().map_err(|_| WireError::RanOut)?;
        Ok(u32::from_be_bytes(t))
    }
}

/// Decodes a SSH name string. Must be ASCII
/// without control characters. RFC4251 section 6.
pub fn try_as_ascii<'a>(t: &'a [u8]) -> WireResult<&'a AsciiStr> {
    let n = t.as_ascii_str().map_err(|_| WireError::BadName)?;
    if n.chars().any(|ch| ch.is_ascii_control() || ch == AsciiChar::DEL) {
        return Err(WireError::BadName);
    }
    Ok(n)
}

pub fn try_as_ascii_str<'a>(t: &'a [u8]) -> WireResult<&'a str> {
    try_as_ascii(t).map(AsciiStr::as_str)
}

impl<'de: 'a, 'a> SSHDecode<'de> for &'a str {
    #[inline]
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let len = u32::dec(s)?;
        let t = s.take(len as usize)?;
        try_as_ascii_str(t)
    }
}
