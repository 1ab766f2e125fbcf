//! # Charset Translator - Streaming Character Encoding Translation
//!
//! Translates a byte stream in one named character encoding into a byte
//! stream in another, strictly: malformed source bytes and characters the
//! target cannot represent are errors, never silently replaced.
//!
//! ## Features
//!
//! - **Strict decoding and encoding** with distinct error categories
//! - **Numeric character references** (`&#8364;`) for characters the target
//!   encoding cannot represent, when explicitly enabled
//! - **Streaming** over any [`std::io::Read`] / [`std::io::Write`] pair with a
//!   configurable chunk size that never affects the output
//! - **Reusable** translators that compare and hash by translation semantics
//!
//! ## Quick Start
//!
//! ```rust
//! use charset_translator::Translator;
//!
//! let mut translator = Translator::new("UTF-8", "ISO-8859-1").unwrap();
//! translator.set_reference_substitution(true);
//!
//! let latin1 = translator.translate_bytes("$, \u{a5}, \u{20ac}".as_bytes()).unwrap();
//! assert_eq!(latin1, b"$, \xA5, &#8364;");
//! ```

#![deny(missing_docs)]

use std::io;

use thiserror::Error;

pub mod charset;
mod codec;
pub mod config;
mod session;
mod substitution;
mod translator;

pub use charset::{Charset, CodecLookup, Registry};
pub use config::TranslatorConfig;
pub use session::CharSink;
pub use substitution::numeric_reference;
pub use translator::{DEFAULT_BUFFER_SIZE, Translation, Translator};

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a translator or translating
#[derive(Debug, Error)]
pub enum Error {
    /// An argument was absent, empty or out of range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The encoding name is legal but not known to the registry
    #[error("unknown encoding: {0}")]
    UnknownEncoding(String),

    /// The encoding name contains characters no encoding name may contain
    #[error("illegal encoding name: {0:?}")]
    InvalidEncodingName(String),

    /// Source bytes are not a valid encoding of any character
    #[error("malformed {encoding} input: {length} byte(s) at offset {offset}")]
    MalformedInput {
        /// Canonical name of the source encoding
        encoding: &'static str,
        /// Byte offset in the source stream where the bad sequence starts
        offset: u64,
        /// Length of the bad sequence in bytes
        length: usize,
    },

    /// A decoded character has no representation in the target encoding
    #[error("character {character:?} at position {position} cannot be encoded in {encoding}")]
    UnmappableCharacter {
        /// Canonical name of the target encoding
        encoding: &'static str,
        /// The offending character
        character: char,
        /// Index of the character in the decoded stream
        position: u64,
    },

    /// Reading the source stream failed
    #[error("failed to read source: {0}")]
    ReadFailure(#[source] io::Error),

    /// Writing or flushing the sink failed
    #[error("failed to write target: {0}")]
    WriteFailure(#[source] io::Error),
}

impl Error {
    /// Whether this is an I/O failure caused by the caller interrupting the
    /// underlying stream.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Error::ReadFailure(err) | Error::WriteFailure(err) => {
                err.kind() == io::ErrorKind::Interrupted
            }
            _ => false,
        }
    }

    /// Whether the failure came from the data itself rather than from I/O or
    /// configuration.
    pub fn is_data_error(&self) -> bool {
        matches!(
            self,
            Error::MalformedInput { .. } | Error::UnmappableCharacter { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quick_start_pair() {
        let translator = Translator::new("windows-1252", "UTF-8").unwrap();

        // Euro and trademark in Windows-1252
        let output = translator.translate_bytes(&[0x80, 0x99]).unwrap();
        assert_eq!(std::str::from_utf8(&output).unwrap(), "\u{20ac}\u{2122}");
    }

    #[test]
    fn test_cancelled_only_for_interrupted_io() {
        let interrupted = Error::ReadFailure(io::Error::from(io::ErrorKind::Interrupted));
        assert!(interrupted.is_cancelled());

        let broken = Error::WriteFailure(io::Error::from(io::ErrorKind::BrokenPipe));
        assert!(!broken.is_cancelled());

        let unknown = Error::UnknownEncoding("x-nope".to_string());
        assert!(!unknown.is_cancelled());
        assert!(!unknown.is_data_error());
    }

    #[test]
    fn test_error_messages() {
        let err = Error::MalformedInput {
            encoding: "US-ASCII",
            offset: 7,
            length: 1,
        };
        assert_eq!(
            err.to_string(),
            "malformed US-ASCII input: 1 byte(s) at offset 7"
        );
        assert!(err.is_data_error());

        let err = Error::UnmappableCharacter {
            encoding: "ISO-8859-1",
            character: '\u{20ac}',
            position: 3,
        };
        assert_eq!(
            err.to_string(),
            "character '€' at position 3 cannot be encoded in ISO-8859-1"
        );
    }
}
