//! Key exchange configuration.
//!
//! Everything is passed explicitly, names are resolved against a
//! [`Registry`](crate::Registry) when the exchange starts.

#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

use alloc::string::{String, ToString};

use crate::sshnames::*;

/// Group sizes in bits requested from the server.
///
/// Always satisfies `1 <= min <= preferred <= max`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GexSizes {
    min: u32,
    preferred: u32,
    max: u32,
}

impl GexSizes {
    pub fn new(min: u32, preferred: u32, max: u32) -> Result<Self> {
        if min == 0 || preferred < min || preferred > max {
            debug!("Rejecting group sizes {min} {preferred} {max}");
            return Err(Error::BadGroupSizes { min, preferred, max });
        }
        Ok(Self { min, preferred, max })
    }

    pub fn min(&self) -> u32 {
        self.min
    }

    pub fn preferred(&self) -> u32 {
        self.preferred
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Whether a group of `bits` size is acceptable
    pub fn allows(&self, bits: u64) -> bool {
        (self.min as u64..=self.max as u64).contains(&bits)
    }
}

/// Settings for one group exchange.
///
/// `hash` and `dh` are method names, see [`sshnames`](crate::sshnames).
/// Sizes are checked by [`GexSizes::new()`] when the exchange is initialised.
#[derive(Debug, Clone)]
pub struct KexConfig {
    pub hash: String,
    pub dh: String,
    pub min: u32,
    pub preferred: u32,
    pub max: u32,
}

impl KexConfig {
    pub fn new(hash: &str, dh: &str, min: u32, preferred: u32, max: u32) -> Self {
        Self {
            hash: hash.to_string(),
            dh: dh.to_string(),
            min,
            preferred,
            max,
        }
    }

    /// Configuration for a negotiated kex method name such as
    /// `diffie-hellman-group-exchange-sha256`.
    pub fn for_kex(kex: &str, dh: &str, min: u32, preferred: u32, max: u32) -> Result<Self> {
        let hash = match kex {
            SSH_NAME_DHGEX_SHA256 => HASH_NAME_SHA256,
            SSH_NAME_DHGEX_SHA1 => HASH_NAME_SHA1,
            SSH_NAME_DHGEX_SHA384 => HASH_NAME_SHA384,
            SSH_NAME_DHGEX_SHA512 => HASH_NAME_SHA512,
            _ => return Err(Error::UnknownMethod { kind: "kex" }),
        };
        Ok(Self::new(hash, dh, min, preferred, max))
    }

    /// Reads named settings from `lookup`.
    ///
    /// The settings are `hash`, `dh`, `dhgex_min`, `dhgex_preferred` and
    /// `dhgex_max`. All must be present, sizes must parse as integers.
    pub fn from_settings<'s, F>(lookup: F) -> Result<Self>
    where F: Fn(&str) -> Option<&'s str>
    {
        let get = |name: &'static str| {
            lookup(name).ok_or(Error::MissingSetting { name })
        };
        let num = |name: &'static str| -> Result<u32> {
            get(name)?.trim().parse().map_err(|_| Error::BadSetting { name })
        };

        Ok(Self {
            hash: get(SETTING_HASH)?.to_string(),
            dh: get(SETTING_DH)?.to_string(),
            min: num(SETTING_DHGEX_MIN)?,
            preferred: num(SETTING_DHGEX_PREFERRED)?,
            max: num(SETTING_DHGEX_MAX)?,
        })
    }

    pub fn sizes(&self) -> Result<GexSizes> {
        GexSizes::new(self.min, self.preferred, self.max)
    }
}
