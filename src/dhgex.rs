//! Diffie-Hellman group exchange, client side.
//!
//! [RFC4419](https://tools.ietf.org/html/rfc4419). The client requests a
//! group size range, the server picks a safe prime `p` and generator `g`,
//! then a normal Diffie-Hellman exchange follows in that group.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;
use alloc::vec::Vec;
use core::fmt;
use core::mem;

use crate::*;
use config::{GexSizes, KexConfig};
use dh::DiffieHellman;
use hash::HashFactory;
use kex::{mpint_encode, send_packet, KexHash, KexIdent, KexOutput, KexSend, KexState, KexStep, KeyExchange};
use packets::{KexDHGexGroup, KexDHGexInit, KexDHGexReply, KexDHGexRequest, MessageNumber, Packet};
use registry::Registry;
use sshwire::{read_ssh, MPInt};

/// Resolved methods, held from `init()` until the reply
struct Pending {
    sizes: GexSizes,
    hash: HashFactory,
    kex_hash: KexHash,
    dh: Box<dyn DiffieHellman>,
}

/// Group and our public value, needed for the exchange hash
struct Group {
    pending: Pending,
    p: Vec<u8>,
    g: Vec<u8>,
    e: Vec<u8>,
}

enum GexState {
    Idle,
    AwaitingGroup(Pending),
    AwaitingReply(Group),
    Terminal,
}

/// A client `diffie-hellman-group-exchange-*` key exchange.
///
/// One instance performs a single exchange. Dropping it at any point
/// clears the Diffie-Hellman private value.
pub struct DhGex {
    conf: KexConfig,
    registry: Registry,
    state: GexState,
}

impl fmt::Debug for DhGex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DhGex")
            .field("conf", &self.conf)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl DhGex {
    /// Uses the built in methods from [`Registry::default()`]
    pub fn new(conf: KexConfig) -> Self {
        Self::with_registry(conf, Registry::default())
    }

    pub fn with_registry(conf: KexConfig, registry: Registry) -> Self {
        Self { conf, registry, state: GexState::Idle }
    }

    /// Checks the message number before decoding the message
    fn expect_packet<'a>(payload: &'a [u8], expected: MessageNumber) -> Result<Packet<'a>> {
        let got = *payload.first().ok_or(Error::RanOut)?;
        if got != expected as u8 {
            error!("Received message {got}, expecting {expected:?}");
            return Err(Error::UnexpectedMessage { expected: expected as u8, got });
        }
        read_ssh(payload)
    }

    fn handle_group(&mut self, mut pending: Pending, payload: &[u8], s: &mut dyn KexSend) -> Result<()> {
        let group = match Self::expect_packet(payload, MessageNumber::SSH_MSG_KEX_DH_GEX_GROUP)? {
            Packet::KexDHGexGroup(g) => g,
            _ => return Error::bug_msg("wrong packet"),
        };
        let KexDHGexGroup { p, g } = group;

        // Before any DH work, rejects weak groups
        let bits = p.bits();
        let sizes = pending.sizes;
        if !sizes.allows(bits) {
            warn!("Server sent {bits} bit group, requested {}..={}", sizes.min(), sizes.max());
            return Err(Error::BadGroupBits { bits, min: sizes.min(), max: sizes.max() });
        }
        debug!("Received {bits} bit group");

        pending.dh.set_group(p.magnitude(), g.magnitude())?;
        let e = pending.dh.public()?.to_vec();

        send_packet(s, &KexDHGexInit { e: MPInt(&e) }.into())?;
        debug!("SSH_MSG_KEX_DH_GEX_INIT sent");
        debug!("expecting SSH_MSG_KEX_DH_GEX_REPLY");

        self.state = GexState::AwaitingReply(Group {
            pending,
            p: p.magnitude().to_vec(),
            g: g.magnitude().to_vec(),
            e,
        });
        Ok(())
    }

    fn handle_reply(&self, group: Group, payload: &[u8]) -> Result<KexOutput> {
        let reply = match Self::expect_packet(payload, MessageNumber::SSH_MSG_KEX_DH_GEX_REPLY)? {
            Packet::KexDHGexReply(r) => r,
            _ => return Error::bug_msg("wrong packet"),
        };
        let KexDHGexReply { k_s, f, sig } = reply;
        let Group { pending, p, g, e } = group;
        let Pending { sizes, hash, mut kex_hash, mut dh } = pending;

        dh.set_peer(f.magnitude())?;
        let k = dh.shared_secret()?;
        drop(dh);
        let k = mpint_encode(&k)?;

        kex_hash.hash_string(k_s.0);
        kex_hash.hash_u32(sizes.min());
        kex_hash.hash_u32(sizes.preferred());
        kex_hash.hash_u32(sizes.max());
        kex_hash.hash_mpint(&p);
        kex_hash.hash_mpint(&g);
        kex_hash.hash_mpint(&e);
        kex_hash.hash_mpint(f.magnitude());
        let out = KexOutput::new(hash, kex_hash, k, k_s.0)?;

        let key_type = sign::key_type_name(k_s.0)?;
        let verifier = self.registry.verifier(key_type)?;
        if !verifier.verify(k_s.0, sig.0, out.h()) {
            warn!("Bad {key_type} host key signature");
            return Err(Error::BadSig);
        }
        debug!("Key exchange complete, {key_type} host key signature verified");
        Ok(out)
    }

    fn step(&mut self, payload: &[u8], s: &mut dyn KexSend) -> Result<Option<KexOutput>> {
        match mem::replace(&mut self.state, GexState::Terminal) {
            GexState::AwaitingGroup(pending) => {
                self.handle_group(pending, payload, s)?;
                Ok(None)
            }
            GexState::AwaitingReply(group) => self.handle_reply(group, payload).map(Some),
            GexState::Idle | GexState::Terminal => {
                debug!("Not expecting a key exchange message");
                Err(Error::PacketWrong)
            }
        }
    }
}

impl KeyExchange for DhGex {
    fn init(&mut self, ident: &KexIdent, s: &mut dyn KexSend) -> Result<()> {
        if !matches!(self.state, GexState::Idle) {
            return Err(Error::PacketWrong);
        }

        let hash = self.registry.hash_factory(&self.conf.hash)?;
        let dh = self.registry.dh(&self.conf.dh)?;
        let sizes = self.conf.sizes()?;
        let kex_hash = KexHash::new(hash, ident)?;

        let req = KexDHGexRequest {
            min: sizes.min(),
            preferred: sizes.preferred(),
            max: sizes.max(),
        };
        send_packet(s, &req.into())?;
        debug!("SSH_MSG_KEX_DH_GEX_REQUEST({}<{}<{}) sent",
            sizes.min(), sizes.preferred(), sizes.max());
        debug!("expecting SSH_MSG_KEX_DH_GEX_GROUP");

        self.state = GexState::AwaitingGroup(Pending { sizes, hash, kex_hash, dh });
        Ok(())
    }

    fn next(&mut self, payload: &[u8], s: &mut dyn KexSend) -> KexStep {
        match self.step(payload, s) {
            Ok(None) => KexStep::Continue,
            Ok(Some(out)) => KexStep::Done(out),
            Err(e) => {
                // secrets are dropped along with the old state
                self.state = GexState::Terminal;
                info!("Group exchange failed: {e}");
                KexStep::Failed(e)
            }
        }
    }

    fn state(&self) -> KexState {
        match self.state {
            GexState::Idle => KexState::Idle,
            GexState::AwaitingGroup(_) => KexState::AwaitingGroup,
            GexState::AwaitingReply(_) => KexState::AwaitingReply,
            GexState::Terminal => KexState::Terminal,
        }
    }
}
