//! SSH client Diffie-Hellman group exchange,
//! `diffie-hellman-group-exchange-sha256` and `-sha1`, also the
//! `-sha384@ssh.com` and `-sha512@ssh.com` variants.
//!
//! [`DhGex`] is driven by a session layer through the [`KeyExchange`] trait.
//! It doesn't perform any I/O, inbound payloads are passed to
//! [`next()`](KeyExchange::next) and outbound payloads are handed to a [`KexSend`].

// Tests use std as it's easier
#![cfg_attr(not(any(feature = "std", test)), no_std)]

#![forbid(unsafe_code)]

// avoids headscratching
#![deny(unused_must_use)]

#[macro_use]
extern crate alloc;

pub mod sshwire;
pub mod packets;
pub mod sshnames;
pub mod config;
pub mod error;
pub mod random;

pub mod hash;
pub mod dh;
pub mod sign;
pub mod registry;
pub mod kex;
mod dhgex;

mod kexlog;

pub use error::{Error, ErrorKind, Result};
pub use config::{GexSizes, KexConfig};
pub use registry::Registry;
pub use kex::{KexIdent, KexOutput, KexSend, KexState, KexStep, KeyExchange, SessId};
pub use dhgex::DhGex;
pub use packets::payload_from_frame;
