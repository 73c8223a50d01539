#[allow(unused_imports)]
use {
    crate::error::{Error, Result, TrapBug},
    log::{debug, error, info, log, trace, warn},
};

/// Fills `buf` from the operating system RNG.
///
/// Used for ephemeral Diffie-Hellman exponents.
pub fn fill_random(buf: &mut [u8]) -> Result<(), Error> {
    getrandom::getrandom(buf)
    .map_err(|e| {
        warn!("getrandom failed: {e}");
        Error::msg("RNG failed")
    })
}
