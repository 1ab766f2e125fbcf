//! Numeric character reference substitution.
//!
//! Characters the target encoding cannot represent are replaced by their
//! decimal reference (`&#8364;`). Representability is tested on a probe
//! encoder of its own so the encoder that emits bytes is never disturbed.

use crate::codec::Encoder;
use crate::session::CharSink;
use crate::{Charset, Result};

/// Decimal numeric character reference for `c`, e.g. `&#8364;` for the euro
/// sign. Supplementary characters produce a single reference.
pub fn numeric_reference(c: char) -> String {
    format!("&#{};", u32::from(c))
}

pub(crate) struct ReferenceScanner {
    probe: Encoder,
    substitutions: u64,
}

impl ReferenceScanner {
    pub fn new(target: Charset) -> Self {
        Self {
            probe: target.new_encoder(),
            substitutions: 0,
        }
    }

    pub fn substitutions(&self) -> u64 {
        self.substitutions
    }

    /// Write `chunk` to `sink`, replacing every character the target cannot
    /// represent with its numeric reference.
    pub fn scan<S: CharSink + ?Sized>(&mut self, chunk: &str, sink: &mut S) -> Result<()> {
        let mut run_start = 0;
        for (index, c) in chunk.char_indices() {
            if self.probe.can_encode(c) {
                continue;
            }
            if run_start < index {
                sink.write_str(&chunk[run_start..index])?;
            }

            let reference = numeric_reference(c);
            log::trace!("substituting {} for U+{:04X}", reference, u32::from(c));
            sink.write_str(&reference)?;
            self.substitutions += 1;

            run_start = index + c.len_utf8();
        }

        if run_start < chunk.len() {
            sink.write_str(&chunk[run_start..])?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every write separately
    #[derive(Default)]
    struct Writes(Vec<String>);

    impl CharSink for Writes {
        fn write_str(&mut self, text: &str) -> Result<()> {
            self.0.push(text.to_string());
            Ok(())
        }
    }

    fn scan(target: Charset, chunk: &str) -> Vec<String> {
        let mut sink = Writes::default();
        ReferenceScanner::new(target).scan(chunk, &mut sink).unwrap();
        sink.0
    }

    #[test]
    fn test_numeric_reference() {
        assert_eq!(numeric_reference('\u{20ac}'), "&#8364;");
        assert_eq!(numeric_reference('A'), "&#65;");
        assert_eq!(numeric_reference('\u{1f600}'), "&#128512;");
    }

    #[test]
    fn test_trailing_run_written_when_last_char_mappable() {
        assert_eq!(
            scan(Charset::Latin1, "\u{20ac}=EUR"),
            ["&#8364;", "=EUR"]
        );
    }

    #[test]
    fn test_no_trailing_write_when_last_char_unmappable() {
        assert_eq!(
            scan(Charset::Latin1, "EUR \u{20ac}"),
            ["EUR ", "&#8364;"]
        );
    }

    #[test]
    fn test_adjacent_unmappable_characters_skip_empty_runs() {
        assert_eq!(
            scan(Charset::UsAscii, "\u{a5}\u{20ac}x"),
            ["&#165;", "&#8364;", "x"]
        );
    }

    #[test]
    fn test_fully_mappable_chunk_is_one_write() {
        assert_eq!(scan(Charset::Latin1, "caf\u{e9}"), ["caf\u{e9}"]);
        assert!(scan(Charset::Latin1, "").is_empty());
    }

    #[test]
    fn test_supplementary_character_is_one_reference() {
        assert_eq!(
            scan(Charset::Latin1, "a\u{1f600}b"),
            ["a", "&#128512;", "b"]
        );
    }

    #[test]
    fn test_counts_substitutions() {
        let mut scanner = ReferenceScanner::new(Charset::UsAscii);
        let mut out = String::new();
        scanner.scan("\u{a5}1", &mut out).unwrap();
        scanner.scan("\u{20ac}2", &mut out).unwrap();
        assert_eq!(out, "&#165;1&#8364;2");
        assert_eq!(scanner.substitutions(), 2);
    }
}
