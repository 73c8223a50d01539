//! Key exchange driving interface, exchange hash and outputs.
//!
//! A session layer drives any [`KeyExchange`] the same way: [`init()`](KeyExchange::init)
//! once, then [`next()`](KeyExchange::next) for each inbound key exchange message
//! until it returns [`KexStep::Done`] or [`KexStep::Failed`].

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;

use digest::DynDigest;
use pretty_hex::PrettyHex;
use zeroize::Zeroizing;

use crate::*;
use hash::HashFactory;
use packets::Packet;
use sshwire::{hash_mpint, hash_string, write_ssh_vec};

/// Large enough for a SHA-512 exchange hash
pub const MAX_SESSID: usize = 64;
pub type SessId = heapless::Vec<u8, MAX_SESSID>;

/// Session identifiers hashed into the exchange hash.
///
/// Version strings exclude CR and LF. KEXINIT payloads include the
/// message number.
#[derive(Debug, Clone, Copy)]
pub struct KexIdent<'a> {
    /// Client version string
    pub v_c: &'a [u8],
    /// Server version string
    pub v_s: &'a [u8],
    /// Client's `SSH_MSG_KEXINIT` payload
    pub i_c: &'a [u8],
    /// Server's `SSH_MSG_KEXINIT` payload
    pub i_s: &'a [u8],
}

/// Receives outbound message payloads.
///
/// Each payload is a complete message starting with the message number,
/// ready for the transport's binary packet framing.
pub trait KexSend {
    fn send(&mut self, payload: Vec<u8>) -> Result<()>;
}

impl KexSend for Vec<Vec<u8>> {
    fn send(&mut self, payload: Vec<u8>) -> Result<()> {
        self.push(payload);
        Ok(())
    }
}

/// Serializes and sends a packet
pub(crate) fn send_packet(s: &mut dyn KexSend, p: &Packet) -> Result<()> {
    let b = write_ssh_vec(p)?;
    trace!("send {:?} {:?}", p.message_num(), b.hex_dump());
    s.send(b)
}

/// Progress of a key exchange. Only ever moves forwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KexState {
    /// `init()` hasn't been called
    Idle,
    AwaitingGroup,
    AwaitingReply,
    /// Finished, successfully or not
    Terminal,
}

/// The result of handling one inbound message
#[derive(Debug)]
pub enum KexStep {
    /// A message was accepted and possibly a reply sent
    Continue,
    /// The exchange completed and the host key signature verified
    Done(KexOutput),
    /// The exchange failed. The connection should be closed.
    Failed(Error),
}

impl KexStep {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, KexStep::Continue)
    }
}

pub trait KeyExchange {
    /// Starts the exchange, sending the first message.
    ///
    /// Fails before sending anything if the configuration is invalid.
    fn init(&mut self, ident: &KexIdent, s: &mut dyn KexSend) -> Result<()>;

    /// Handles one inbound message payload, starting with its message number.
    ///
    /// Never returns an error directly, a bad message gives [`KexStep::Failed`].
    fn next(&mut self, payload: &[u8], s: &mut dyn KexSend) -> KexStep;

    fn state(&self) -> KexState;
}

/// Accumulates the exchange hash `H`.
///
/// Fields are added in protocol order by the caller; this only knows
/// the encodings.
pub struct KexHash {
    hash_ctx: Box<dyn DynDigest>,
}

impl fmt::Debug for KexHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KexHash")
            .field("output_size", &self.hash_ctx.output_size())
            .finish_non_exhaustive()
    }
}

impl KexHash {
    /// Starts a hash with the version strings and KEXINIT payloads,
    /// RFC4253 section 8.
    ///
    /// Fails with [`Error::UnknownMethod`] if the hash output doesn't fit a [`SessId`].
    pub fn new(factory: HashFactory, ident: &KexIdent) -> Result<Self> {
        let mut kh = KexHash { hash_ctx: factory() };
        if kh.hash_ctx.output_size() > MAX_SESSID {
            debug!("Hash output {} too long", kh.hash_ctx.output_size());
            return Err(Error::UnknownMethod { kind: "hash" });
        }
        kh.hash_string(ident.v_c);
        kh.hash_string(ident.v_s);
        kh.hash_string(ident.i_c);
        kh.hash_string(ident.i_s);
        Ok(kh)
    }

    /// Hashes a slice, with added u32 length prefix.
    pub fn hash_string(&mut self, v: &[u8]) {
        hash_string(self.hash_ctx.as_mut(), v)
    }

    pub fn hash_u32(&mut self, v: u32) {
        self.hash_ctx.update(&v.to_be_bytes())
    }

    /// Hashes a big-endian magnitude as a mpint
    pub fn hash_mpint(&mut self, m: &[u8]) {
        hash_mpint(self.hash_ctx.as_mut(), m)
    }

    /// Completes the hash with `k`, which is already mpint encoded.
    pub fn finish(mut self, k: &[u8]) -> Result<SessId> {
        self.hash_ctx.update(k);
        let mut h = SessId::new();
        h.resize_default(self.hash_ctx.output_size())
            .map_err(|_| Error::UnknownMethod { kind: "hash" })?;
        // resets the state that has absorbed K
        self.hash_ctx.finalize_into_reset(&mut h).trap()?;
        Ok(h)
    }
}

/// Encodes a big-endian magnitude as a mpint, including length prefix.
pub(crate) fn mpint_encode(m: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    Ok(Zeroizing::new(write_ssh_vec(&sshwire::MPInt(m))?))
}

/// The result of a successful key exchange.
///
/// Holds the shared secret, which is cleared on drop. Digest contexts
/// that absorb `K` only exist during [`compute_key()`](Self::compute_key)
/// and are reset before they are dropped.
pub struct KexOutput {
    /// `H` for this exchange. The first is the session id.
    h: SessId,
    /// `K`, mpint encoded
    k: Zeroizing<Vec<u8>>,
    /// The server's `K_S` host key blob
    host_key: Vec<u8>,
    hash: HashFactory,
}

impl fmt::Debug for KexOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KexOutput")
            .field("h", &self.h.hex_dump())
            .finish_non_exhaustive()
    }
}

impl KexOutput {
    /// `k` is mpint encoded.
    pub fn new(factory: HashFactory, kex_hash: KexHash, k: Zeroizing<Vec<u8>>,
        host_key: &[u8]) -> Result<Self> {
        let h = kex_hash.finish(&k)?;
        Ok(KexOutput { h, k, host_key: host_key.to_vec(), hash: factory })
    }

    /// The exchange hash `H`
    pub fn h(&self) -> &SessId {
        &self.h
    }

    /// The shared secret `K` in mpint encoding, as used for key derivation
    pub fn k(&self) -> &[u8] {
        &self.k
    }

    /// The server's host key blob.
    ///
    /// This hasn't been checked against any list of trusted keys,
    /// the caller must do that.
    pub fn host_key(&self) -> &[u8] {
        &self.host_key
    }

    /// `HASH(K || H || parts)` into `out`, which is the hash output size.
    fn hash_kh(&self, parts: &[&[u8]], out: &mut [u8]) -> Result<()> {
        let mut hash_ctx = (self.hash)();
        hash_ctx.update(&self.k);
        hash_ctx.update(&self.h);
        for p in parts {
            hash_ctx.update(p);
        }
        hash_ctx.finalize_into_reset(out).trap()
    }

    /// RFC4253 7.2. `K1 = HASH(K || H || "A" || session_id)` etc
    ///
    /// Fills all of `out`, extending with `K2 = HASH(K || H || K1)` and so on.
    pub fn compute_key(&self, letter: char, out: &mut [u8], sess_id: &[u8]) -> Result<()> {
        if !letter.is_ascii_uppercase() {
            return Err(Error::msg("Bad key letter"));
        }

        let letter = [letter as u8];
        let mut w = Zeroizing::new(vec![0u8; self.h.len()]);
        self.hash_kh(&[&letter[..], sess_id], &mut w)?;
        let l = w.len().min(out.len());
        out[..l].copy_from_slice(&w[..l]);

        let mut filled = l;
        while filled < out.len() {
            // K(n+1) = HASH(K || H || K1 || ... || Kn)
            self.hash_kh(&[&out[..filled]], &mut w)?;
            let l = w.len().min(out.len() - filled);
            out[filled..filled + l].copy_from_slice(&w[..l]);
            filled += l;
        }
        Ok(())
    }
}
