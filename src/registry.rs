//! Method lookup by name.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;
use alloc::vec::Vec;

use crate::*;
use dh::{DhFactory, DiffieHellman, ModpDh};
use hash::{HashFactory, BUILTIN_HASHES};
use sign::{Ed25519Verifier, HostKeyVerifier, VerifierFactory};
use sshnames::*;

/// Maps method names to hash, Diffie-Hellman and host key verifier
/// implementations.
///
/// [`Registry::default()`] has the built in methods. Methods added later
/// replace earlier ones of the same name.
#[derive(Clone)]
pub struct Registry {
    hashes: Vec<(&'static str, HashFactory)>,
    dhs: Vec<(&'static str, DhFactory)>,
    verifiers: Vec<(&'static str, VerifierFactory)>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut r = Self::empty();
        for h in BUILTIN_HASHES {
            r = r.with_hash(h.name(), h.factory());
        }
        r = r.with_dh(DH_NAME_MODP, ModpDh::boxed)
            .with_verifier(SSH_NAME_ED25519, Ed25519Verifier::boxed);
        #[cfg(feature = "rsa")]
        {
            r = r.with_verifier(SSH_NAME_RSA, sign::RsaVerifier::boxed);
        }
        #[cfg(feature = "p256")]
        {
            r = r.with_verifier(SSH_NAME_ECDSA_NISTP256, sign::EcdsaP256Verifier::boxed);
        }
        r
    }
}

fn names<T>(v: &[(&'static str, T)]) -> Vec<&'static str> {
    v.iter().map(|(n, _)| *n).collect()
}

impl core::fmt::Debug for Registry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Registry")
            .field("hashes", &names(&self.hashes))
            .field("dhs", &names(&self.dhs))
            .field("verifiers", &names(&self.verifiers))
            .finish()
    }
}

fn find<T: Copy>(v: &[(&'static str, T)], name: &str) -> Option<T> {
    v.iter().rev().find(|(n, _)| *n == name).map(|(_, f)| *f)
}

impl Registry {
    /// A registry with no methods
    pub fn empty() -> Self {
        Self {
            hashes: Vec::new(),
            dhs: Vec::new(),
            verifiers: Vec::new(),
        }
    }

    pub fn with_hash(mut self, name: &'static str, f: HashFactory) -> Self {
        self.hashes.push((name, f));
        self
    }

    pub fn with_dh(mut self, name: &'static str, f: DhFactory) -> Self {
        self.dhs.push((name, f));
        self
    }

    /// `name` is a host key type such as `ssh-ed25519`
    pub fn with_verifier(mut self, name: &'static str, f: VerifierFactory) -> Self {
        self.verifiers.push((name, f));
        self
    }

    pub fn hash_factory(&self, name: &str) -> Result<HashFactory> {
        find(&self.hashes, name).ok_or_else(|| {
            debug!("No hash {name}");
            Error::UnknownMethod { kind: "hash" }
        })
    }

    /// Returns a new Diffie-Hellman instance
    pub fn dh(&self, name: &str) -> Result<Box<dyn DiffieHellman>> {
        let f = find(&self.dhs, name).ok_or_else(|| {
            debug!("No DH {name}");
            Error::UnknownMethod { kind: "dh" }
        })?;
        Ok(f())
    }

    /// Returns a verifier for a host key type
    pub fn verifier(&self, key_type: &str) -> Result<Box<dyn HostKeyVerifier>> {
        let f = find(&self.verifiers, key_type).ok_or_else(|| {
            info!("Unsupported host key type {key_type}");
            Error::UnknownHostKey
        })?;
        Ok(f())
    }
}
