//! The [`Translator`]: a source/target charset pair plus the `translate`
//! operation.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};

use serde::Serialize;

use crate::charset::{CodecLookup, Registry};
use crate::session::{CharSink, DecodeCursor, EncodeCursor};
use crate::substitution::ReferenceScanner;
use crate::{Charset, Error, Result};

/// Default number of characters decoded per chunk
pub const DEFAULT_BUFFER_SIZE: usize = 4096;

/// Translates byte streams from one character encoding to another.
///
/// Decoding and encoding are strict: malformed source bytes fail with
/// [`Error::MalformedInput`] and characters the target cannot represent fail
/// with [`Error::UnmappableCharacter`], unless reference substitution is on,
/// in which case they are written as `&#<decimal>;`.
///
/// Every call to [`translate`](Self::translate) starts from fresh codec
/// state, so a translator can be reused, shared between threads, and used as
/// a map key. Equality and hashing consider the two charsets and the
/// substitution flag; the buffer size only affects performance.
#[derive(Debug, Clone)]
pub struct Translator {
    source: Charset,
    target: Charset,
    reference_substitution: bool,
    buffer_size: usize,
}

/// Summary of a completed translation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Translation {
    /// Bytes read from the source
    pub bytes_read: u64,
    /// Bytes written to the sink
    pub bytes_written: u64,
    /// Characters decoded from the source
    pub characters: u64,
    /// Characters replaced by numeric references
    pub substitutions: u64,
}

impl Translator {
    /// Create a translator between two named encodings using the default
    /// [`Registry`].
    pub fn new(source: &str, target: &str) -> Result<Self> {
        Self::with_lookup(source, target, &Registry)
    }

    /// Create a translator resolving both names through `lookup`.
    pub fn with_lookup<L: CodecLookup + ?Sized>(
        source: &str,
        target: &str,
        lookup: &L,
    ) -> Result<Self> {
        let source = lookup.lookup(source)?;
        let target = lookup.lookup(target)?;
        Ok(Self::from_charsets(source, target))
    }

    /// Create a translator from already resolved charsets
    pub fn from_charsets(source: Charset, target: Charset) -> Self {
        Self {
            source,
            target,
            reference_substitution: false,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    /// Get source encoding
    pub fn source(&self) -> Charset {
        self.source
    }

    /// Get target encoding
    pub fn target(&self) -> Charset {
        self.target
    }

    /// Whether unmappable characters are written as numeric references
    pub fn uses_reference_substitution(&self) -> bool {
        self.reference_substitution
    }

    /// Enable or disable numeric character reference substitution.
    pub fn set_reference_substitution(&mut self, enabled: bool) -> &mut Self {
        self.reference_substitution = enabled;
        self
    }

    /// Builder form of [`set_reference_substitution`](Self::set_reference_substitution).
    pub fn with_reference_substitution(mut self, enabled: bool) -> Self {
        self.reference_substitution = enabled;
        self
    }

    /// Maximum number of characters decoded per chunk
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Set the chunk size in characters. Fails with
    /// [`Error::InvalidArgument`] when `size` is zero.
    pub fn set_buffer_size(&mut self, size: usize) -> Result<&mut Self> {
        if size < 1 {
            return Err(Error::InvalidArgument(
                "buffer size must be >= 1".to_string(),
            ));
        }
        self.buffer_size = size;
        Ok(self)
    }

    /// Builder form of [`set_buffer_size`](Self::set_buffer_size).
    pub fn with_buffer_size(mut self, size: usize) -> Result<Self> {
        self.set_buffer_size(size)?;
        Ok(self)
    }

    /// Translate everything readable from `source` into `sink`, then flush
    /// `sink`. Neither stream is closed.
    ///
    /// On failure the sink may already hold a prefix of the output.
    pub fn translate<R, W>(&self, source: &mut R, sink: &mut W) -> Result<Translation>
    where
        R: Read + ?Sized,
        W: Write + ?Sized,
    {
        log::debug!(
            "translating {} (buffer size {}, references {})",
            self,
            self.buffer_size,
            self.reference_substitution
        );

        let mut decoder = DecodeCursor::new(source, self.source);
        let mut encoder = EncodeCursor::new(sink, self.target);
        let mut scanner = self
            .reference_substitution
            .then(|| ReferenceScanner::new(self.target));

        let mut chunk = String::with_capacity(self.buffer_size.min(DEFAULT_BUFFER_SIZE));
        let mut characters = 0;
        loop {
            let count = decoder.next_chunk(&mut chunk, self.buffer_size)?;
            if count == 0 {
                break;
            }
            characters += count as u64;

            match scanner.as_mut() {
                Some(scanner) => scanner.scan(&chunk, &mut encoder)?,
                None => encoder.write_str(&chunk)?,
            }
        }

        let translation = Translation {
            bytes_read: decoder.bytes_read(),
            bytes_written: encoder.finish()?,
            characters,
            substitutions: scanner.map_or(0, |scanner| scanner.substitutions()),
        };
        log::debug!(
            "translated {}: {} bytes -> {} bytes, {} substitutions",
            self,
            translation.bytes_read,
            translation.bytes_written,
            translation.substitutions
        );
        Ok(translation)
    }

    /// Translate an in-memory buffer
    pub fn translate_bytes(&self, input: &[u8]) -> Result<Vec<u8>> {
        let mut source = input;
        let mut output = Vec::with_capacity(input.len());
        self.translate(&mut source, &mut output)?;
        Ok(output)
    }
}

impl PartialEq for Translator {
    fn eq(&self, other: &Self) -> bool {
        self.source == other.source
            && self.target == other.target
            && self.reference_substitution == other.reference_substitution
    }
}

impl Eq for Translator {}

impl Hash for Translator {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.source.hash(state);
        self.target.hash(state);
        self.reference_substitution.hash(state);
    }
}

impl fmt::Display for Translator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.source, self.target)
    }
}
