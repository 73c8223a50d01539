//! SSH group exchange packets.
//!
//! A [`Packet`] can be encoded/decoded to the
//! SSH Binary Packet Protocol payload using [`sshwire`].
//! Group exchange messages are described in
//! [RFC4419](https://tools.ietf.org/html/rfc4419) section 5.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::vec::Vec;

use sunset_sshwire_derive::*;

use crate::*;
use sshwire::{BinString, MPInt};
use sshwire::{SSHEncode, SSHDecode, SSHSource, SSHSink, WireResult, WireError};

pub const SSH_LENGTH_SIZE: usize = 4;
pub const SSH_PAYLOAD_START: usize = SSH_LENGTH_SIZE + 1;
const SSH_MIN_PADLEN: usize = 4;
const SSH_MIN_PACKET_SIZE: usize = 16;
// cleartext framing
const SSH_CLEAR_BLOCK: usize = 8;

/// Client's preferred group sizes in bits.
#[derive(Debug, Clone, PartialEq, SSHEncode, SSHDecode)]
pub struct KexDHGexRequest {
    pub min: u32,
    pub preferred: u32,
    pub max: u32,
}

/// Server's chosen safe prime and generator
#[derive(Debug, SSHEncode, SSHDecode)]
pub struct KexDHGexGroup<'a> {
    pub p: MPInt<'a>,
    pub g: MPInt<'a>,
}

#[derive(Debug, SSHEncode, SSHDecode)]
pub struct KexDHGexInit<'a> {
    pub e: MPInt<'a>,
}

#[derive(Debug, SSHEncode, SSHDecode)]
pub struct KexDHGexReply<'a> {
    /// Host key blob, opaque here. Starts with a key type name string.
    pub k_s: BinString<'a>,
    pub f: MPInt<'a>,
    /// Signature blob over the exchange hash
    pub sig: BinString<'a>,
}

/// Returns the payload of an unencrypted SSH binary packet.
///
/// `buf` is a whole frame: `u32` packet length, padding length byte,
/// payload, then padding. No MAC.
pub fn payload_from_frame(buf: &[u8]) -> Result<&[u8]> {
    if buf.len() < SSH_PAYLOAD_START {
        return Err(Error::RanOut);
    }
    let (len, rest) = buf.split_at(SSH_LENGTH_SIZE);
    let len: [u8; SSH_LENGTH_SIZE] = len.try_into().trap()?;
    let len = u32::from_be_bytes(len) as usize;
    if len != rest.len() {
        debug!("Frame length {len} doesn't match {} bytes", rest.len());
        return Err(Error::WrongPacketLength);
    }

    let padlen = rest[0] as usize;
    if padlen < SSH_MIN_PADLEN {
        debug!("Packet padding too short");
        return Err(Error::WrongPacketLength);
    }

    let payload_len = len.checked_sub(1 + padlen).ok_or_else(|| {
        debug!("Bad padding length");
        Error::WrongPacketLength
    })?;

    Ok(&buf[SSH_PAYLOAD_START..SSH_PAYLOAD_START + payload_len])
}

/// Wraps `payload` in an unencrypted SSH binary packet frame.
///
/// Padding is zeroes, there is no cipher to hide it from.
pub fn frame_payload(payload: &[u8]) -> Result<Vec<u8>> {
    let len = SSH_LENGTH_SIZE + 1 + payload.len();
    // round padding length upwards so that len is a multiple of block size
    let mut padlen = SSH_CLEAR_BLOCK - len % SSH_CLEAR_BLOCK;
    if padlen < SSH_MIN_PADLEN {
        padlen += SSH_CLEAR_BLOCK
    }
    if len + padlen < SSH_MIN_PACKET_SIZE {
        padlen += SSH_CLEAR_BLOCK;
    }
    let total = len + padlen;
    let plen: u32 = (total - SSH_LENGTH_SIZE).try_into().map_err(|_| Error::NoRoom)?;

    let mut buf = Vec::with_capacity(total);
    buf.extend_from_slice(&plen.to_be_bytes());
    buf.push(padlen as u8);
    buf.extend_from_slice(payload);
    buf.resize(total, 0);
    Ok(buf)
}

/// We have repeated `match` statements for the various packet types, use a macro
macro_rules! messagetypes {
    (
        $( ( $message_num:literal,
            $SpecificPacketVariant:ident,
            $SpecificPacketType:ty,
            $SSH_MESSAGE_NAME:ident
            ),
             )*
    ) => {


#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
#[allow(non_camel_case_types)]
pub enum MessageNumber {
    // variants are eg
    // SSH_MSG_KEX_DH_GEX_GROUP = 31,
    $(
    $SSH_MESSAGE_NAME = $message_num,
    )*
}

impl TryFrom<u8> for MessageNumber {
    type Error = Error;
    fn try_from(v: u8) -> Result<Self> {
        match v {
            // eg
            // 31 = Ok(MessageNumber::SSH_MSG_KEX_DH_GEX_GROUP)
            $(
            $message_num => Ok(MessageNumber::$SSH_MESSAGE_NAME),
            )*
            _ => {
                Err(Error::UnknownPacket { number: v })
            }
        }
    }
}

impl SSHEncode for Packet<'_> {
    fn enc<S>(&self, s: &mut S) -> WireResult<()>
    where S: SSHSink {
        let t = self.message_num() as u8;
        t.enc(s)?;
        match self {
            // eg
            // Packet::KexDHGexGroup(p) => {
            // ...
            $(
            Packet::$SpecificPacketVariant(p) => {
                p.enc(s)?
            }
            )*
        };
        Ok(())
    }
}

impl<'de: 'a, 'a> SSHDecode<'de> for Packet<'a> {
    fn dec<S>(s: &mut S) -> WireResult<Self>
    where S: SSHSource<'de> {
        let msg_num = u8::dec(s)?;
        let ty = MessageNumber::try_from(msg_num);
        let ty = match ty {
            Ok(t) => t,
            Err(_) => return Err(WireError::UnknownPacket { number: msg_num })
        };

        // Decode based on the message number
        let p = match ty {
            // eg
            // MessageNumber::SSH_MSG_KEX_DH_GEX_GROUP => Packet::KexDHGexGroup(
            // ...
            $(
            MessageNumber::$SSH_MESSAGE_NAME => Packet::$SpecificPacketVariant(SSHDecode::dec(s)?),
            )*
        };
        Ok(p)
    }
}

/// Top level group exchange packet enum
#[derive(Debug)]
pub enum Packet<'a> {
    // eg KexDHGexGroup(KexDHGexGroup<'a>),
    $(
    $SpecificPacketVariant($SpecificPacketType),
    )*
}

impl<'a> Packet<'a> {
    pub fn message_num(&self) -> MessageNumber {
        match self {
            // eg
            // Packet::KexDHGexGroup() => {
            // ..
            $(
            Packet::$SpecificPacketVariant(_) => {
                MessageNumber::$SSH_MESSAGE_NAME
            }
            )*
        }
    }
}

$(
impl<'a> From<$SpecificPacketType> for Packet<'a> {
    fn from(s: $SpecificPacketType) -> Packet<'a> {
        Packet::$SpecificPacketVariant(s)
    }
}
)*

} } // macro

messagetypes![
// 30 is SSH_MSG_KEX_DH_GEX_REQUEST_OLD, not sent or accepted
(31, KexDHGexGroup, KexDHGexGroup<'a>, SSH_MSG_KEX_DH_GEX_GROUP),
(32, KexDHGexInit, KexDHGexInit<'a>, SSH_MSG_KEX_DH_GEX_INIT),
(33, KexDHGexReply, KexDHGexReply<'a>, SSH_MSG_KEX_DH_GEX_REPLY),
(34, KexDHGexRequest, KexDHGexRequest, SSH_MSG_KEX_DH_GEX_REQUEST),
];
