//! Library error types.

use std::fmt;

/// An ordkey Result, normally returning an ordkey [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An ordkey error. Covers decoding failures, out-of-range values, misuse of
/// the range iterator, and errors surfaced from an underlying engine.
#[derive(Clone, Debug, PartialEq)]
pub enum Error {
    /// A kind tag byte that isn't in the element tag table.
    BadKind(u8),
    /// An element body ended before its encoding said it would.
    Truncated {
        /// What step of the decoding we were on when it failed.
        step: &'static str,
        /// How many bytes the step needed.
        expected: usize,
        /// How many bytes actually remained.
        actual: usize,
    },
    /// A Text element body didn't decode as UTF-8.
    BadUtf8(std::str::Utf8Error),
    /// A key exceeded the 65 535 byte limit.
    KeyTooLong {
        /// The offending encoded length.
        actual: usize,
    },
    /// A raw byte string didn't start with the required prefix.
    PrefixMismatch,
    /// A hex string didn't parse as hex-encoded key bytes.
    BadHex(String),
    /// A value fell outside the representable range: an integer beyond
    /// ±(2⁶⁴−1), a UTC offset beyond ±16 hours, or a degenerate bound.
    OutOfRange(String),
    /// A key element index or slice went past the end of the key.
    IndexOutOfRange {
        /// The requested element index.
        index: usize,
        /// The key's element count.
        len: usize,
    },
    /// A range iterator was advanced before `forward()` or `reverse()` chose
    /// a direction.
    NoDirection,
    /// The underlying engine cursor failed.
    Engine(String),
    /// A physical key pulled during iteration failed to decode. Carries the
    /// raw physical key bytes to aid diagnosis.
    BadRecord {
        /// The physical key bytes as the engine yielded them.
        key: Vec<u8>,
        /// The decode failure.
        source: Box<Error>,
    },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::BadKind(kind) => write!(f, "bad kind {}; key corrupt?", kind),
            Error::Truncated {
                step,
                expected,
                actual,
            } => write!(
                f,
                "expected {} bytes but only {} remain on step [{}]",
                expected, actual, step
            ),
            Error::BadUtf8(ref err) => write!(f, "text element is not UTF-8: {}", err),
            Error::KeyTooLong { actual } => write!(
                f,
                "key is {} bytes, maximum allowed is {}",
                actual,
                crate::MAX_KEY_LEN
            ),
            Error::PrefixMismatch => write!(f, "raw bytes do not start with the given prefix"),
            Error::BadHex(ref msg) => write!(f, "bad hex key: {}", msg),
            Error::OutOfRange(ref msg) => write!(f, "value out of range: {}", msg),
            Error::IndexOutOfRange { index, len } => write!(
                f,
                "element index {} out of range for key of {} elements",
                index, len
            ),
            Error::NoDirection => write!(
                f,
                "iterator advanced before forward() or reverse() was called"
            ),
            Error::Engine(ref msg) => write!(f, "engine error: {}", msg),
            Error::BadRecord {
                ref key,
                ref source,
            } => write!(
                f,
                "bad record for physical key {}: {}",
                hex::encode(key),
                source
            ),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match *self {
            Error::BadUtf8(ref err) => Some(err),
            Error::BadRecord { ref source, .. } => Some(source),
            _ => None,
        }
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(e: std::str::Utf8Error) -> Self {
        Self::BadUtf8(e)
    }
}
