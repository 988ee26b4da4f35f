// Licensed under the Apache-2.0 license

use core::fmt;
use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource};

const ETIMEDOUT: i32 = 110;
const ENXIO: i32 = 6;
const EIO: i32 = 5;
const EPROTO: i32 = 71;
const EAGAIN: i32 = 11;
const ENODEV: i32 = 19;

/// Failure of a bit-banged transfer.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Error {
    /// SCL was held low past the stretch deadline.
    Timeout,
    /// No target acknowledged the address, retries exhausted.
    NoDevice,
    /// Data NAK, short transfer, or a failed repeated 10-bit address code.
    Io,
    /// Invalid length byte in a length-prefixed read.
    Protocol,
    /// The transfer could not be started (pre-transfer hook refused, or the
    /// request does not fit the controller).
    Resource,
    /// Lines do not behave like an idle open-drain bus.
    BusFault,
}

impl Error {
    /// Negative errno equivalent, as returned by kernel `master_xfer`.
    #[must_use]
    pub fn errno(self) -> i32 {
        -match self {
            Error::Timeout => ETIMEDOUT,
            Error::NoDevice => ENXIO,
            Error::Io => EIO,
            Error::Protocol => EPROTO,
            Error::Resource => EAGAIN,
            Error::BusFault => ENODEV,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            Error::Timeout => "SCL stretch timeout",
            Error::NoDevice => "no device acknowledged address",
            Error::Io => "I/O error",
            Error::Protocol => "invalid block length",
            Error::Resource => "bus unavailable",
            Error::BusFault => "bus fault",
        };
        f.write_str(msg)
    }
}

impl embedded_hal::i2c::Error for Error {
    fn kind(&self) -> ErrorKind {
        match self {
            Error::NoDevice => ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address),
            Error::Timeout | Error::Io | Error::BusFault => ErrorKind::Bus,
            Error::Protocol | Error::Resource => ErrorKind::Other,
        }
    }
}
