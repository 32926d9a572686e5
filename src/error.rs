//! Error model shared by the indexer, the sidecar codec, and the reader.
//!
//! The set is closed and payload-free: every failure in the build and read
//! paths collapses to one of these kinds, and the [`Display`] phrasings are
//! stable so the CLI can print them verbatim.

use std::fmt;
use std::io;

/// Failure kinds for index construction, sidecar I/O, and extraction.
///
/// Success is represented by `Ok(..)`; there is no `Success` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A failure that fits no other kind.
    Unknown,
    /// A file could not be opened.
    Open,
    /// Reading from a file failed.
    Read,
    /// Writing to a file failed.
    Write,
    /// The compressed stream (or a sidecar payload) is malformed.
    Data,
    /// An allocation inside the decoder failed.
    OutOfMemory,
    /// The sidecar was built under conditions this reader cannot honor
    /// (magic mismatch or offset-width mismatch).
    Incompatible,
    /// The zlib layer reported a failure not covered by the kinds above.
    Zlib,
}

impl Error {
    /// Stable one-line description, used verbatim by the CLI.
    pub fn message(&self) -> &'static str {
        match self {
            Error::Unknown => "unknown error",
            Error::Open => "failed to open the file",
            Error::Read => "failed to read the file",
            Error::Write => "failed to write the file",
            Error::Data => "the compressed data is corrupted",
            Error::OutOfMemory => "out of memory",
            Error::Incompatible => "the index file is incompatible with this build",
            Error::Zlib => "zlib error",
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

impl std::error::Error for Error {}

/// Allows [`crate::reader::GzSeekFile`] to implement [`io::Read`] without
/// inventing a second error currency.
impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        let kind = match e {
            Error::Open => io::ErrorKind::NotFound,
            Error::OutOfMemory => io::ErrorKind::OutOfMemory,
            Error::Data | Error::Incompatible => io::ErrorKind::InvalidData,
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_are_stable() {
        assert_eq!(Error::Data.message(), "the compressed data is corrupted");
        assert_eq!(
            Error::Incompatible.message(),
            "the index file is incompatible with this build"
        );
        assert_eq!(Error::Zlib.to_string(), "zlib error");
    }

    #[test]
    fn io_error_conversion_keeps_kind() {
        let e: io::Error = Error::Data.into();
        assert_eq!(e.kind(), io::ErrorKind::InvalidData);
        let e: io::Error = Error::OutOfMemory.into();
        assert_eq!(e.kind(), io::ErrorKind::OutOfMemory);
    }
}
