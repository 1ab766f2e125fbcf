//! Strict decoders and encoders for every [`Charset`](crate::Charset).
//!
//! Decoders accept input split at arbitrary byte boundaries; a multi-byte
//! sequence may straddle two calls. Nothing is ever replaced: invalid input
//! and unencodable characters come back as faults for the caller to report.

use encoding_rs::{DecoderResult, EncoderResult};

/// A malformed byte sequence found while decoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct DecodeFault {
    /// Index into the current input where the sequence starts. Sequences
    /// begun in an earlier call are reported at 0.
    pub at: usize,
    /// Length of the sequence in bytes
    pub len: usize,
}

/// A character that the target encoding cannot represent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct EncodeFault {
    pub character: char,
    /// Byte index of the character in the input `str`
    pub at: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Endian {
    Little,
    Big,
}

impl Endian {
    fn unit(self, bytes: [u8; 2]) -> u16 {
        match self {
            Endian::Little => u16::from_le_bytes(bytes),
            Endian::Big => u16::from_be_bytes(bytes),
        }
    }

    fn bytes(self, unit: u16) -> [u8; 2] {
        match self {
            Endian::Little => unit.to_le_bytes(),
            Endian::Big => unit.to_be_bytes(),
        }
    }
}

pub(crate) enum Decoder {
    Ascii,
    Latin1,
    Utf16(Utf16Decoder),
    Web(encoding_rs::Decoder),
    /// Single-byte Windows code page; bytes the code page leaves undefined
    /// are malformed instead of decoding to C1 controls.
    Windows(encoding_rs::Decoder),
}

impl Decoder {
    /// Decode all of `src` into `dst`. With `last` set, an incomplete
    /// trailing sequence is malformed.
    pub fn decode(&mut self, src: &[u8], dst: &mut String, last: bool) -> Result<(), DecodeFault> {
        match self {
            Decoder::Ascii => {
                let valid = src.iter().position(|b| !b.is_ascii()).unwrap_or(src.len());
                dst.extend(src[..valid].iter().map(|&b| char::from(b)));
                if valid < src.len() {
                    return Err(DecodeFault { at: valid, len: 1 });
                }
                Ok(())
            }
            Decoder::Latin1 => {
                dst.extend(src.iter().map(|&b| char::from(b)));
                Ok(())
            }
            Decoder::Utf16(decoder) => decoder.decode(src, dst, last),
            Decoder::Web(decoder) => decode_web(decoder, src, dst, last),
            Decoder::Windows(decoder) => {
                let start = dst.len();
                let decoded = decode_web(decoder, src, dst, last);
                // One byte per character, so the character index is the byte index
                let undefined = dst[start..]
                    .char_indices()
                    .enumerate()
                    .find(|(_, (_, c))| is_c1_control(*c));
                if let Some((at, (offset, _))) = undefined {
                    dst.truncate(start + offset);
                    return Err(DecodeFault { at, len: 1 });
                }
                decoded
            }
        }
    }
}

fn is_c1_control(c: char) -> bool {
    matches!(c, '\u{80}'..='\u{9f}')
}

fn decode_web(
    decoder: &mut encoding_rs::Decoder,
    src: &[u8],
    dst: &mut String,
    last: bool,
) -> Result<(), DecodeFault> {
    let mut total = 0;
    loop {
        let remaining = src.len() - total;
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(remaining)
            .unwrap_or(remaining.saturating_mul(3));
        dst.reserve(needed.max(4));

        let (result, read) = decoder.decode_to_string_without_replacement(&src[total..], dst, last);
        total += read;
        match result {
            DecoderResult::InputEmpty => return Ok(()),
            DecoderResult::OutputFull => continue,
            DecoderResult::Malformed(bad, extra) => {
                let (bad, extra) = (usize::from(bad), usize::from(extra));
                return Err(DecodeFault {
                    at: total.saturating_sub(bad + extra),
                    len: bad,
                });
            }
        }
    }
}

/// UTF-16 decoder carrying half-read code units and unpaired high
/// surrogates across calls.
pub(crate) struct Utf16Decoder {
    /// `None` until a byte order mark has been looked for
    endian: Option<Endian>,
    lead: Option<u8>,
    high: Option<u16>,
}

impl Utf16Decoder {
    /// Sniffs and strips a byte order mark, defaulting to big-endian.
    pub fn sniffing() -> Self {
        Self {
            endian: None,
            lead: None,
            high: None,
        }
    }

    pub fn fixed(endian: Endian) -> Self {
        Self {
            endian: Some(endian),
            lead: None,
            high: None,
        }
    }

    fn decode(&mut self, src: &[u8], dst: &mut String, last: bool) -> Result<(), DecodeFault> {
        dst.reserve(src.len() / 2 * 3);
        for (i, &byte) in src.iter().enumerate() {
            let Some(lead) = self.lead.take() else {
                self.lead = Some(byte);
                continue;
            };
            let pair = [lead, byte];

            let endian = match self.endian {
                Some(endian) => endian,
                None => {
                    let sniffed = match pair {
                        [0xFE, 0xFF] => Some(Endian::Big),
                        [0xFF, 0xFE] => Some(Endian::Little),
                        _ => None,
                    };
                    self.endian = Some(sniffed.unwrap_or(Endian::Big));
                    if sniffed.is_some() {
                        continue;
                    }
                    Endian::Big
                }
            };

            let unit = endian.unit(pair);
            if let Err(back) = self.push_unit(unit, dst) {
                return Err(DecodeFault {
                    at: (i + 1).saturating_sub(back),
                    len: 2,
                });
            }
        }

        if last && (self.lead.is_some() || self.high.is_some()) {
            let len = usize::from(self.lead.is_some()) + if self.high.is_some() { 2 } else { 0 };
            return Err(DecodeFault {
                at: src.len().saturating_sub(len),
                len,
            });
        }
        Ok(())
    }

    /// On failure, returns how many bytes before the end of `unit` the
    /// unpaired surrogate starts.
    fn push_unit(&mut self, unit: u16, dst: &mut String) -> Result<(), usize> {
        match (self.high.take(), unit) {
            (None, 0xD800..=0xDBFF) => {
                self.high = Some(unit);
                Ok(())
            }
            (None, 0xDC00..=0xDFFF) => Err(2),
            (None, _) => {
                dst.extend(char::from_u32(u32::from(unit)));
                Ok(())
            }
            (Some(high), 0xDC00..=0xDFFF) => {
                let scalar =
                    0x10000 + ((u32::from(high) - 0xD800) << 10) + (u32::from(unit) - 0xDC00);
                dst.extend(char::from_u32(scalar));
                Ok(())
            }
            // Only the earlier high surrogate is unpaired
            (Some(_), _) => Err(4),
        }
    }
}

pub(crate) enum Encoder {
    Ascii,
    Latin1,
    Utf16 { endian: Endian, bom_pending: bool },
    Web(encoding_rs::Encoder),
    /// Single-byte Windows code page; C1 controls are unmappable.
    Windows(encoding_rs::Encoder),
}

impl Encoder {
    /// Encode all of `src` onto `dst`. With `last` set, stateful encodings
    /// return to their initial state.
    pub fn encode(&mut self, src: &str, dst: &mut Vec<u8>, last: bool) -> Result<(), EncodeFault> {
        match self {
            Encoder::Ascii => encode_bytes(src, dst, 0x7F),
            Encoder::Latin1 => encode_bytes(src, dst, 0xFF),
            Encoder::Utf16 {
                endian,
                bom_pending,
            } => {
                if src.is_empty() {
                    return Ok(());
                }
                dst.reserve(src.len() * 2 + 2);
                if std::mem::take(bom_pending) {
                    dst.extend_from_slice(&endian.bytes(0xFEFF));
                }
                let mut units = [0u16; 2];
                for c in src.chars() {
                    for &unit in c.encode_utf16(&mut units).iter() {
                        dst.extend_from_slice(&endian.bytes(unit));
                    }
                }
                Ok(())
            }
            Encoder::Web(encoder) => encode_web(encoder, src, dst, last),
            Encoder::Windows(encoder) => match src.char_indices().find(|&(_, c)| is_c1_control(c)) {
                Some((at, character)) => {
                    encode_web(encoder, &src[..at], dst, false)?;
                    Err(EncodeFault { character, at })
                }
                None => encode_web(encoder, src, dst, last),
            },
        }
    }

    /// Check whether `c` can be represented. Only meaningful on an encoder
    /// whose output is thrown away.
    pub fn can_encode(&mut self, c: char) -> bool {
        match self {
            Encoder::Ascii => c.is_ascii(),
            Encoder::Latin1 => u32::from(c) <= 0xFF,
            Encoder::Utf16 { .. } => true,
            Encoder::Windows(_) if is_c1_control(c) => false,
            Encoder::Web(encoder) | Encoder::Windows(encoder) => {
                let mut utf8 = [0u8; 4];
                let mut scratch = [0u8; 16];
                let (result, _, _) = encoder.encode_from_utf8_without_replacement(
                    c.encode_utf8(&mut utf8),
                    &mut scratch,
                    false,
                );
                !matches!(result, EncoderResult::Unmappable(_))
            }
        }
    }
}

fn encode_bytes(src: &str, dst: &mut Vec<u8>, max: u32) -> Result<(), EncodeFault> {
    dst.reserve(src.len());
    for (at, c) in src.char_indices() {
        let scalar = u32::from(c);
        if scalar > max {
            return Err(EncodeFault { character: c, at });
        }
        dst.push(scalar as u8);
    }
    Ok(())
}

fn encode_web(
    encoder: &mut encoding_rs::Encoder,
    src: &str,
    dst: &mut Vec<u8>,
    last: bool,
) -> Result<(), EncodeFault> {
    let mut total = 0;
    loop {
        let remaining = src.len() - total;
        let needed = encoder
            .max_buffer_length_from_utf8_without_replacement(remaining)
            .unwrap_or(remaining.saturating_mul(4));
        dst.reserve(needed.max(8));

        let (result, read) =
            encoder.encode_from_utf8_to_vec_without_replacement(&src[total..], dst, last);
        total += read;
        match result {
            EncoderResult::InputEmpty => return Ok(()),
            EncoderResult::OutputFull => continue,
            EncoderResult::Unmappable(character) => {
                return Err(EncodeFault {
                    character,
                    at: total - character.len_utf8(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Charset;

    fn decode_all(charset: Charset, pieces: &[&[u8]]) -> Result<String, DecodeFault> {
        let mut decoder = charset.new_decoder();
        let mut out = String::new();
        for piece in pieces {
            decoder.decode(piece, &mut out, false)?;
        }
        decoder.decode(&[], &mut out, true)?;
        Ok(out)
    }

    fn encode_all(charset: Charset, text: &str) -> Result<Vec<u8>, EncodeFault> {
        let mut encoder = charset.new_encoder();
        let mut out = Vec::new();
        encoder.encode(text, &mut out, false)?;
        encoder.encode("", &mut out, true)?;
        Ok(out)
    }

    #[test]
    fn test_ascii_rejects_high_bytes() {
        let fault = decode_all(Charset::UsAscii, &[b"ab\xC2\xA5"]).unwrap_err();
        assert_eq!(fault, DecodeFault { at: 2, len: 1 });
    }

    #[test]
    fn test_latin1_decodes_every_byte() {
        let bytes: Vec<u8> = (0..=255).collect();
        let text = decode_all(Charset::Latin1, &[&bytes]).unwrap();
        assert_eq!(text.chars().count(), 256);
        assert_eq!(text.chars().last(), Some('\u{ff}'));
    }

    #[test]
    fn test_shift_jis_split_mid_character() {
        let sjis = Charset::for_name("Shift_JIS").unwrap();
        // "日本語" with every character split across two reads
        let text = decode_all(sjis, &[&[0x93], &[0xFA, 0x96], &[0x7B, 0x8C], &[0xEA]]).unwrap();
        assert_eq!(text, "日本語");
    }

    #[test]
    fn test_truncated_utf8_is_malformed_at_end() {
        let utf8 = Charset::for_name("UTF-8").unwrap();
        assert!(decode_all(utf8, &[b"ok\xE2\x82"]).is_err());
    }

    #[test]
    fn test_utf16_endianness() {
        // "Hi" in UTF-16LE and UTF-16BE
        let le = decode_all(Charset::Utf16Le, &[&[0x48, 0x00, 0x69, 0x00]]).unwrap();
        let be = decode_all(Charset::Utf16Be, &[&[0x00, 0x48, 0x00, 0x69]]).unwrap();
        assert_eq!(le, "Hi");
        assert_eq!(be, "Hi");

        assert_eq!(encode_all(Charset::Utf16Le, "Hi").unwrap(), [0x48, 0x00, 0x69, 0x00]);
        assert_eq!(encode_all(Charset::Utf16Be, "Hi").unwrap(), [0x00, 0x48, 0x00, 0x69]);
    }

    #[test]
    fn test_utf16_bom_sniffing() {
        let le = decode_all(Charset::Utf16, &[&[0xFF, 0xFE, 0x48, 0x00]]).unwrap();
        assert_eq!(le, "H");
        let be = decode_all(Charset::Utf16, &[&[0xFE], &[0xFF, 0x00, 0x48]]).unwrap();
        assert_eq!(be, "H");
        let unmarked = decode_all(Charset::Utf16, &[&[0x00, 0x48]]).unwrap();
        assert_eq!(unmarked, "H");

        // Fixed-order decoders keep U+FEFF as a character
        let kept = decode_all(Charset::Utf16Le, &[&[0xFF, 0xFE, 0x48, 0x00]]).unwrap();
        assert_eq!(kept, "\u{feff}H");
    }

    #[test]
    fn test_utf16_surrogate_pairs() {
        // U+1F600 split between reads
        let text = decode_all(Charset::Utf16Be, &[&[0xD8, 0x3D, 0xDE], &[0x00]]).unwrap();
        assert_eq!(text, "\u{1f600}");
        assert_eq!(
            encode_all(Charset::Utf16Be, "\u{1f600}").unwrap(),
            [0xD8, 0x3D, 0xDE, 0x00]
        );
    }

    #[test]
    fn test_utf16_malformed() {
        // Lone low surrogate
        assert!(decode_all(Charset::Utf16Be, &[&[0xDC, 0x00]]).is_err());
        // High surrogate followed by a non-surrogate: only the surrogate is bad
        assert_eq!(
            decode_all(Charset::Utf16Be, &[&[0x00, 0x41, 0xD8, 0x3D, 0x00, 0x41]]).unwrap_err(),
            DecodeFault { at: 2, len: 2 }
        );
        assert_eq!(
            decode_all(Charset::Utf16Be, &[&[0xDC, 0x00]]).unwrap_err(),
            DecodeFault { at: 0, len: 2 }
        );
        // Dangling byte at end of input
        assert!(decode_all(Charset::Utf16Be, &[&[0x00, 0x41, 0x00]]).is_err());
    }

    #[test]
    fn test_utf16_writes_bom_once() {
        let mut encoder = Charset::Utf16.new_encoder();
        let mut out = Vec::new();
        encoder.encode("A", &mut out, false).unwrap();
        encoder.encode("B", &mut out, false).unwrap();
        assert_eq!(out, [0xFE, 0xFF, 0x00, 0x41, 0x00, 0x42]);

        assert!(encode_all(Charset::Utf16, "").unwrap().is_empty());
    }

    #[test]
    fn test_unmappable_reports_character_and_offset() {
        let fault = encode_all(Charset::Latin1, "a\u{a5}\u{20ac}").unwrap_err();
        assert_eq!(fault.character, '\u{20ac}');
        assert_eq!(fault.at, 3);

        let win1252 = Charset::for_name("windows-1252").unwrap();
        let fault = encode_all(win1252, "ok \u{3042}").unwrap_err();
        assert_eq!(fault.character, '\u{3042}');
        assert_eq!(fault.at, 3);
    }

    #[test]
    fn test_windows_undefined_bytes_are_malformed() {
        let win1252 = Charset::for_name("windows-1252").unwrap();
        assert_eq!(decode_all(win1252, &[b"\x80 ok"]).unwrap(), "\u{20ac} ok");
        for byte in [0x81, 0x8D, 0x8F, 0x90, 0x9D] {
            let fault = decode_all(win1252, &[&[b'a', b'\xE9', byte, b'b']]).unwrap_err();
            assert_eq!(fault, DecodeFault { at: 2, len: 1 }, "byte {byte:#04X}");
        }

        let fault = encode_all(win1252, "a\u{e9}\u{81}").unwrap_err();
        assert_eq!(fault.character, '\u{81}');
        assert_eq!(fault.at, 3);

        // ISO-8859 code pages define the C1 range
        let latin2 = Charset::for_name("ISO-8859-2").unwrap();
        assert_eq!(decode_all(latin2, &[b"\x81"]).unwrap(), "\u{81}");
    }

    #[test]
    fn test_iso_2022_jp_returns_to_ascii_on_last() {
        let jis = Charset::for_name("ISO-2022-JP").unwrap();
        let out = encode_all(jis, "日本").unwrap();
        assert_eq!(
            out,
            [0x1B, 0x24, 0x42, 0x46, 0x7C, 0x4B, 0x5C, 0x1B, 0x28, 0x42]
        );
    }

    #[test]
    fn test_can_encode() {
        let mut latin1 = Charset::Latin1.new_encoder();
        assert!(latin1.can_encode('\u{a5}'));
        assert!(!latin1.can_encode('\u{20ac}'));

        let mut win1252 = Charset::for_name("windows-1252").unwrap().new_encoder();
        assert!(win1252.can_encode('\u{20ac}'));
        assert!(!win1252.can_encode('\u{3042}'));
        assert!(!win1252.can_encode('\u{8d}'));

        let mut utf16 = Charset::Utf16.new_encoder();
        assert!(utf16.can_encode('\u{1f600}'));
    }
}
