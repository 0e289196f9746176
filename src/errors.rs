//! Error taxonomy for the storage engine.
//!
//! Storage-level errors (§7) are meant to be fatal: `main` prints them and
//! exits non-zero. Input-level errors are handled separately by the
//! statement parser and never constructed here.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    Io(std::io::Error),
    /// Corrupt or out-of-bounds on-disk state: wrong file length, bad node
    /// tag, a page index beyond the pager's capacity.
    Storage(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Storage(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

/// Shorthand for building a tagged, formatted `Error`.
///
/// `err!(Storage, "page {} out of bounds", n)` ==
/// `Error::Storage(format!("page {} out of bounds", n))`.
macro_rules! err {
    ($variant:ident, $($arg:tt)*) => {
        crate::errors::Error::$variant(format!($($arg)*))
    };
}

pub(crate) use err;
