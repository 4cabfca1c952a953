//! Crate-wide error and result types.

use std::fmt;
use std::io;

/// Result alias used throughout the analyzer.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the analyzer can produce. Every one of them is terminal:
/// continuing past corrupt input would only yield meaningless candidates.
#[derive(Debug)]
pub enum Error {
    /// A character outside `[0-9a-fA-F]` appeared in a hex field.
    BadHexDigit(char),
    /// A hex field did not have exactly 32 characters.
    BadLength(usize),
    /// An input line did not hold two or three hex fields (1-based line
    /// number).
    MalformedRecord(usize),
    /// Brute force was requested but a line carried no plaintext field.
    MissingPlaintext(usize),
    /// The block cipher failed its known-answer self-test.
    SelfTest,
    /// A runtime resource could not be set up (e.g. the worker pool).
    Resource(String),
    /// An underlying I/O operation failed.
    Io(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BadHexDigit(c) => write!(f, "invalid hex digit {c:?}"),
            Error::BadLength(n) => write!(f, "hex field of {n} characters, expected 32"),
            Error::MalformedRecord(n) => write!(f, "line {n}: expected 2 or 3 hex fields"),
            Error::MissingPlaintext(n) => write!(f, "line {n}: brute force needs a plaintext field"),
            Error::SelfTest => write!(f, "AES-128 self-test failed"),
            Error::Resource(msg) => write!(f, "resource error: {msg}"),
            Error::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let Error::Io(e) = self {
            Some(e)
        } else {
            None
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Error::Io(e)
    }
}
