#[allow(unused_imports)]
use log::{debug, error, info, log, trace, warn};

use core::fmt::Arguments;

use snafu::prelude::*;

/// The key exchange error type.
#[non_exhaustive]
#[derive(Snafu, Debug)]
#[snafu(context(suffix(false)))]
#[snafu(visibility(pub))]
pub enum Error {
    /// Output buffer ran out of room
    NoRoom,

    /// Input buffer ran out
    RanOut,

    /// Not a valid SSH ASCII string
    BadName,

    /// Key exchange value out of range, or group parameters unusable.
    BadKex,

    /// Signature is incorrect
    BadSig,

    /// Negative or otherwise invalid mpint
    BadNumber,

    /// Received a key with invalid structure, or too large.
    BadKeyFormat,

    /// SSH packet contents doesn't match length
    WrongPacketLength,

    /// Received a message when none is expected, such as after the
    /// exchange has completed.
    PacketWrong,

    #[snafu(display("Expected message {expected}, received {got}"))]
    UnexpectedMessage { expected: u8, got: u8 },

    #[snafu(display("Group size {bits} bits outside requested range {min}..={max}"))]
    BadGroupBits { bits: u64, min: u32, max: u32 },

    #[snafu(display("Unknown packet type {number}"))]
    UnknownPacket { number: u8 },

    /// An unknown method name was configured or received, for a hash,
    /// Diffie-Hellman implementation or host key type.
    #[snafu(display("Unknown {kind} method"))]
    UnknownMethod { kind: &'static str },

    /// Unsupported host key type
    UnknownHostKey,

    #[snafu(display("Setting {name} is missing"))]
    MissingSetting { name: &'static str },

    #[snafu(display("Setting {name} is invalid"))]
    BadSetting { name: &'static str },

    #[snafu(display("Invalid group exchange sizes min={min} preferred={preferred} max={max}"))]
    BadGroupSizes { min: u32, preferred: u32, max: u32 },

    #[snafu(display("{msg}"))]
    Custom { msg: &'static str },

    // This state should not be reached, previous logic should have prevented it.
    // Create this using [`Error::bug()`] or [`.trap()`](TrapBug::trap).
    /// Program bug
    Bug,
}

/// How a caller should treat an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad local configuration. The handshake never starts.
    Configuration,
    /// The peer sent something malformed or out of range. Disconnect.
    Protocol,
    /// The host key signature over the exchange hash failed. Disconnect.
    Signature,
    /// Local failure such as the RNG, or a program bug.
    Internal,
}

impl Error {
    pub fn msg(m: &'static str) -> Error {
        Error::Custom { msg: m }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::UnknownMethod { .. }
            | Error::MissingSetting { .. }
            | Error::BadSetting { .. }
            | Error::BadGroupSizes { .. } => ErrorKind::Configuration,

            Error::RanOut
            | Error::BadName
            | Error::BadKex
            | Error::BadNumber
            | Error::BadKeyFormat
            | Error::WrongPacketLength
            | Error::PacketWrong
            | Error::UnexpectedMessage { .. }
            | Error::BadGroupBits { .. }
            | Error::UnknownPacket { .. }
            | Error::UnknownHostKey => ErrorKind::Protocol,

            Error::BadSig => ErrorKind::Signature,

            Error::NoRoom | Error::Custom { .. } | Error::Bug => ErrorKind::Internal,
        }
    }

    #[cold]
    #[track_caller]
    /// Panics in debug builds, returns [`Error::Bug`] in release.
    pub fn bug() -> Error {
        // Easier to track the source of errors in development,
        // but release builds shouldn't panic.
        if cfg!(debug_assertions) {
            panic!("Hit a bug");
        } else {
            Error::Bug
        }
    }

    /// Like [`bug()`](Error::bug) but with a message
    ///
    /// The message can be used instead of a code comment, is logged at `trace` level.
    #[cold]
    pub fn bug_fmt(args: Arguments) -> Error {
        if cfg!(debug_assertions) {
            panic!("Hit a bug: {args}");
        } else {
            trace!("Hit a bug: {args}");
            Error::Bug
        }
    }

    #[cold]
    pub fn bug_msg<T>(msg: &str) -> Result<T, Error> {
        Err(Self::bug_fmt(format_args!("{}", msg)))
    }

    #[cold]
    pub fn bug_err_msg(msg: &str) -> Error {
        Self::bug_fmt(format_args!("{}", msg))
    }
}

/// A key exchange specific Result type.
pub type Result<T, E = Error> = core::result::Result<T, E>;

pub trait TrapBug<T> {
    /// `.trap()` should be used like `.unwrap()`, in situations
    /// never expected to fail. Instead it calls [`Error::bug()`].
    /// (or debug builds may panic)
    fn trap(self) -> Result<T, Error>;
}

impl<T, E> TrapBug<T> for Result<T, E> {
    fn trap(self) -> Result<T, Error> {
        // call directly so that Location::caller() works
        if let Ok(i) = self {
            Ok(i)
        } else {
            Err(Error::bug())
        }
    }
}

impl<T> TrapBug<T> for Option<T> {
    #[track_caller]
    fn trap(self) -> Result<T, Error> {
        if let Some(i) = self {
            Ok(i)
        } else {
            Err(Error::bug())
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use crate::error::*;

    #[test]
    fn kinds() {
        assert_eq!(Error::BadSig.kind(), ErrorKind::Signature);
        assert_eq!(
            Error::BadGroupSizes { min: 3, preferred: 2, max: 1 }.kind(),
            ErrorKind::Configuration
        );
        assert_eq!(
            Error::UnexpectedMessage { expected: 31, got: 33 }.kind(),
            ErrorKind::Protocol
        );
        assert_eq!(Error::UnknownHostKey.kind(), ErrorKind::Protocol);
        assert_eq!(Error::msg("RNG failed").kind(), ErrorKind::Internal);
    }

    #[test]
    fn display() {
        let e = Error::BadGroupBits { bits: 512, min: 1024, max: 8192 };
        assert_eq!(
            format!("{e}"),
            "Group size 512 bits outside requested range 1024..=8192"
        );
    }

    #[test]
    fn trap_ok() {
        let r: Result<u8, ()> = Ok(3);
        assert_eq!(r.trap().unwrap(), 3);
        assert_eq!(Some(4u8).trap().unwrap(), 4);
    }
}
