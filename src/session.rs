//! Per-call translation state: a decode cursor pulling characters out of the
//! source stream and an encode cursor pushing bytes into the sink.

use std::io::{self, Read, Write};

use crate::codec::{Decoder, Encoder};
use crate::{Charset, Error, Result};

/// Bytes requested from the source per read
const READ_BLOCK: usize = 8 * 1024;

/// Destination for decoded text on its way to the target encoding
pub trait CharSink {
    /// Write `text`; an empty string is a no-op.
    fn write_str(&mut self, text: &str) -> Result<()>;
}

impl CharSink for String {
    fn write_str(&mut self, text: &str) -> Result<()> {
        self.push_str(text);
        Ok(())
    }
}

pub(crate) struct DecodeCursor<'a, R: Read + ?Sized> {
    reader: &'a mut R,
    charset: Charset,
    decoder: Decoder,
    block: Vec<u8>,
    /// Decoded text not yet handed out; `pending[taken..]` is unread
    pending: String,
    taken: usize,
    bytes_read: u64,
    eof: bool,
}

impl<'a, R: Read + ?Sized> DecodeCursor<'a, R> {
    pub fn new(reader: &'a mut R, charset: Charset) -> Self {
        Self {
            reader,
            charset,
            decoder: charset.new_decoder(),
            block: vec![0; READ_BLOCK],
            pending: String::new(),
            taken: 0,
            bytes_read: 0,
            eof: false,
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    /// Replace `chunk` with the next `limit` characters or fewer, returning
    /// how many were read. Zero means the source is exhausted.
    pub fn next_chunk(&mut self, chunk: &mut String, limit: usize) -> Result<usize> {
        chunk.clear();
        let mut count = 0;
        loop {
            let rest = &self.pending[self.taken..];
            let mut end = rest.len();
            for (index, _) in rest.char_indices() {
                if count == limit {
                    end = index;
                    break;
                }
                count += 1;
            }
            chunk.push_str(&rest[..end]);
            self.taken += end;

            if count == limit {
                return Ok(count);
            }
            self.pending.clear();
            self.taken = 0;
            if self.eof {
                return Ok(count);
            }
            self.fill()?;
        }
    }

    fn fill(&mut self) -> Result<()> {
        let read = self.reader.read(&mut self.block).map_err(Error::ReadFailure)?;
        let last = read == 0;
        self.eof = last;

        let start = self.bytes_read;
        self.bytes_read += read as u64;
        self.decoder
            .decode(&self.block[..read], &mut self.pending, last)
            .map_err(|fault| Error::MalformedInput {
                encoding: self.charset.name(),
                offset: start + fault.at as u64,
                length: fault.len,
            })
    }
}

pub(crate) struct EncodeCursor<'a, W: Write + ?Sized> {
    writer: &'a mut W,
    charset: Charset,
    encoder: Encoder,
    out: Vec<u8>,
    chars_written: u64,
    bytes_written: u64,
}

impl<'a, W: Write + ?Sized> EncodeCursor<'a, W> {
    pub fn new(writer: &'a mut W, charset: Charset) -> Self {
        Self {
            writer,
            charset,
            encoder: charset.new_encoder(),
            out: Vec::new(),
            chars_written: 0,
            bytes_written: 0,
        }
    }

    fn encode(&mut self, text: &str, last: bool) -> Result<()> {
        self.out.clear();
        if let Err(fault) = self.encoder.encode(text, &mut self.out, last) {
            return Err(Error::UnmappableCharacter {
                encoding: self.charset.name(),
                character: fault.character,
                position: self.chars_written + text[..fault.at].chars().count() as u64,
            });
        }
        self.chars_written += text.chars().count() as u64;

        self.write_out()
    }

    /// Hand `out` to the sink. Unlike `write_all`, an interrupted write is
    /// reported rather than retried, so a cancelled sink ends the call.
    fn write_out(&mut self) -> Result<()> {
        let mut pending = &self.out[..];
        while !pending.is_empty() {
            match self.writer.write(pending) {
                Ok(0) => return Err(Error::WriteFailure(io::ErrorKind::WriteZero.into())),
                Ok(n) => pending = &pending[n..],
                Err(err) => return Err(Error::WriteFailure(err)),
            }
        }
        self.bytes_written += self.out.len() as u64;
        Ok(())
    }

    /// Bring the encoder back to its initial state and flush the sink,
    /// returning the number of bytes written.
    pub fn finish(mut self) -> Result<u64> {
        self.encode("", true)?;
        self.writer.flush().map_err(Error::WriteFailure)?;
        Ok(self.bytes_written)
    }
}

impl<W: Write + ?Sized> CharSink for EncodeCursor<'_, W> {
    fn write_str(&mut self, text: &str) -> Result<()> {
        if text.is_empty() {
            return Ok(());
        }
        self.encode(text, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out one byte per read
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            match self.0.split_first() {
                Some((&byte, rest)) if !buf.is_empty() => {
                    buf[0] = byte;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    fn chunks(reader: &mut dyn Read, charset: Charset, limit: usize) -> Vec<String> {
        let mut cursor = DecodeCursor::new(reader, charset);
        let mut chunk = String::new();
        let mut chunks = Vec::new();
        while cursor.next_chunk(&mut chunk, limit).unwrap() > 0 {
            chunks.push(chunk.clone());
        }
        chunks
    }

    #[test]
    fn test_chunks_hold_at_most_limit_characters() {
        let mut source = "a\u{a5}\u{20ac}\u{1f600}b".as_bytes();
        let utf8 = Charset::for_name("UTF-8").unwrap();
        assert_eq!(
            chunks(&mut source, utf8, 2),
            ["a\u{a5}", "\u{20ac}\u{1f600}", "b"]
        );
    }

    #[test]
    fn test_chunks_across_single_byte_reads() {
        let bytes = "x\u{20ac}y".as_bytes();
        let utf8 = Charset::for_name("UTF-8").unwrap();
        assert_eq!(chunks(&mut Trickle(bytes), utf8, 4096), ["x\u{20ac}y"]);
        assert_eq!(chunks(&mut Trickle(bytes), utf8, 1), ["x", "\u{20ac}", "y"]);
    }

    #[test]
    fn test_empty_source_yields_no_chunks() {
        let mut source: &[u8] = &[];
        assert!(chunks(&mut source, Charset::Latin1, 16).is_empty());
    }

    #[test]
    fn test_malformed_offset_is_absolute() {
        let mut source = Trickle(b"abc\x80");
        let mut cursor = DecodeCursor::new(&mut source, Charset::UsAscii);
        let mut chunk = String::new();
        let err = loop {
            match cursor.next_chunk(&mut chunk, 8) {
                Ok(0) => panic!("expected malformed input"),
                Ok(_) => continue,
                Err(err) => break err,
            }
        };
        assert!(matches!(
            err,
            Error::MalformedInput {
                encoding: "US-ASCII",
                offset: 3,
                length: 1
            }
        ));
    }

    #[test]
    fn test_encode_cursor_counts_positions_across_writes() {
        let mut sink = Vec::new();
        let mut cursor = EncodeCursor::new(&mut sink, Charset::Latin1);
        cursor.write_str("ab").unwrap();
        cursor.write_str("").unwrap();
        let err = cursor.write_str("c\u{20ac}").unwrap_err();
        assert!(matches!(
            err,
            Error::UnmappableCharacter {
                character: '\u{20ac}',
                position: 3,
                ..
            }
        ));
    }

    /// Accepts one byte per write, then refuses more once `limit` is reached
    struct Narrow {
        data: Vec<u8>,
        limit: usize,
    }

    impl Write for Narrow {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.data.len() == self.limit || buf.is_empty() {
                return Ok(0);
            }
            self.data.push(buf[0]);
            Ok(1)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_short_writes_are_continued() {
        let mut sink = Narrow {
            data: Vec::new(),
            limit: usize::MAX,
        };
        let mut cursor = EncodeCursor::new(&mut sink, Charset::Latin1);
        cursor.write_str("caf\u{e9}").unwrap();
        assert_eq!(cursor.finish().unwrap(), 4);
        assert_eq!(sink.data, b"caf\xE9");
    }

    #[test]
    fn test_zero_length_write_fails() {
        let mut sink = Narrow {
            data: Vec::new(),
            limit: 2,
        };
        let mut cursor = EncodeCursor::new(&mut sink, Charset::Latin1);
        let err = cursor.write_str("abc").unwrap_err();
        match err {
            Error::WriteFailure(io_err) => assert_eq!(io_err.kind(), io::ErrorKind::WriteZero),
            other => panic!("expected write failure, got {other:?}"),
        }
        assert_eq!(sink.data, b"ab");
    }

    #[test]
    fn test_finish_flushes() {
        let mut sink = std::io::BufWriter::new(Vec::new());
        let mut cursor = EncodeCursor::new(&mut sink, Charset::Latin1);
        cursor.write_str("\u{e9}t\u{e9}").unwrap();
        assert_eq!(cursor.finish().unwrap(), 3);
        assert_eq!(sink.get_ref().as_slice(), b"\xE9t\xE9");
    }
}
