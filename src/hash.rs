//! Hash methods for the exchange hash.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::boxed::Box;
use core::fmt;

use digest::{Digest, DynDigest};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::sshnames::*;

/// Creates a fresh hash context
pub type HashFactory = fn() -> Box<dyn DynDigest>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgo {
    Sha1,
    Sha256,
    Sha384,
    Sha512,
}

/// Built in methods, in registration order
pub(crate) const BUILTIN_HASHES: &[HashAlgo] =
    &[HashAlgo::Sha1, HashAlgo::Sha256, HashAlgo::Sha384, HashAlgo::Sha512];

impl HashAlgo {
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            HASH_NAME_SHA1 => Ok(HashAlgo::Sha1),
            HASH_NAME_SHA256 => Ok(HashAlgo::Sha256),
            HASH_NAME_SHA384 => Ok(HashAlgo::Sha384),
            HASH_NAME_SHA512 => Ok(HashAlgo::Sha512),
            _ => Err(Error::UnknownMethod { kind: "hash" }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            HashAlgo::Sha1 => HASH_NAME_SHA1,
            HashAlgo::Sha256 => HASH_NAME_SHA256,
            HashAlgo::Sha384 => HASH_NAME_SHA384,
            HashAlgo::Sha512 => HASH_NAME_SHA512,
        }
    }

    pub fn factory(&self) -> HashFactory {
        match self {
            HashAlgo::Sha1 => new_ctx::<Sha1>,
            HashAlgo::Sha256 => new_ctx::<Sha256>,
            HashAlgo::Sha384 => new_ctx::<Sha384>,
            HashAlgo::Sha512 => new_ctx::<Sha512>,
        }
    }

    pub fn output_size(&self) -> usize {
        match self {
            HashAlgo::Sha1 => <Sha1 as Digest>::output_size(),
            HashAlgo::Sha256 => <Sha256 as Digest>::output_size(),
            HashAlgo::Sha384 => <Sha384 as Digest>::output_size(),
            HashAlgo::Sha512 => <Sha512 as Digest>::output_size(),
        }
    }
}

fn new_ctx<D: Digest + DynDigest + 'static>() -> Box<dyn DynDigest> {
    Box::new(D::new())
}

impl fmt::Display for HashAlgo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
