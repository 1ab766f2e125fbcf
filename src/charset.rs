//! Encoding registry: resolves encoding names to [`Charset`]s.
//!
//! ISO-8859-1, US-ASCII and the UTF-16 family are handled natively so that
//! their names mean what they say (the web platform treats `ISO-8859-1` as
//! windows-1252 and never encodes UTF-16). Every other label is resolved
//! through `encoding_rs`.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use crate::codec::{Decoder, Encoder, Endian, Utf16Decoder};
use crate::{Error, Result};

/// A resolved character encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Charset {
    /// US-ASCII (7-bit, 0-127)
    UsAscii,
    /// ISO-8859-1 (Latin-1), every byte maps to U+0000..U+00FF
    Latin1,
    /// UTF-16 with byte order mark: sniffed on decode, big-endian BOM written on encode
    Utf16,
    /// UTF-16LE without BOM handling
    Utf16Le,
    /// UTF-16BE without BOM handling
    Utf16Be,
    /// Any other encoding provided by `encoding_rs`
    Web(&'static encoding_rs::Encoding),
}

impl Charset {
    /// Resolve a name through the default [`Registry`].
    pub fn for_name(name: &str) -> Result<Self> {
        Registry.lookup(name)
    }

    /// Get the canonical name of this encoding
    pub fn name(self) -> &'static str {
        match self {
            Charset::UsAscii => "US-ASCII",
            Charset::Latin1 => "ISO-8859-1",
            Charset::Utf16 => "UTF-16",
            Charset::Utf16Le => "UTF-16LE",
            Charset::Utf16Be => "UTF-16BE",
            Charset::Web(encoding) => encoding.name(),
        }
    }

    /// Check if this encoding is ASCII-compatible (ASCII bytes 0-127 have same meaning)
    pub fn is_ascii_compatible(self) -> bool {
        match self {
            Charset::UsAscii | Charset::Latin1 => true,
            Charset::Utf16 | Charset::Utf16Le | Charset::Utf16Be => false,
            Charset::Web(encoding) => encoding.is_ascii_compatible(),
        }
    }

    /// Check if every Unicode scalar value can be encoded
    pub fn is_unicode(self) -> bool {
        match self {
            Charset::Utf16 | Charset::Utf16Le | Charset::Utf16Be => true,
            Charset::Web(encoding) => {
                encoding == encoding_rs::UTF_8 || encoding == encoding_rs::GB18030
            }
            _ => false,
        }
    }

    /// Get the byte order mark (BOM) this encoding writes, if any
    pub fn bom(self) -> Option<&'static [u8]> {
        match self {
            Charset::Utf16 => Some(&[0xFE, 0xFF]),
            _ => None,
        }
    }

    pub(crate) fn new_decoder(self) -> Decoder {
        match self {
            Charset::UsAscii => Decoder::Ascii,
            Charset::Latin1 => Decoder::Latin1,
            Charset::Utf16 => Decoder::Utf16(Utf16Decoder::sniffing()),
            Charset::Utf16Le => Decoder::Utf16(Utf16Decoder::fixed(Endian::Little)),
            Charset::Utf16Be => Decoder::Utf16(Utf16Decoder::fixed(Endian::Big)),
            Charset::Web(encoding) if is_windows_code_page(encoding) => {
                Decoder::Windows(encoding.new_decoder_without_bom_handling())
            }
            Charset::Web(encoding) => Decoder::Web(encoding.new_decoder_without_bom_handling()),
        }
    }

    pub(crate) fn new_encoder(self) -> Encoder {
        match self {
            Charset::UsAscii => Encoder::Ascii,
            Charset::Latin1 => Encoder::Latin1,
            Charset::Utf16 => Encoder::Utf16 {
                endian: Endian::Big,
                bom_pending: true,
            },
            Charset::Utf16Le => Encoder::Utf16 {
                endian: Endian::Little,
                bom_pending: false,
            },
            Charset::Utf16Be => Encoder::Utf16 {
                endian: Endian::Big,
                bom_pending: false,
            },
            Charset::Web(encoding) if is_windows_code_page(encoding) => {
                Encoder::Windows(encoding.new_encoder())
            }
            Charset::Web(encoding) => Encoder::Web(encoding.new_encoder()),
        }
    }
}

/// windows-874 and windows-1250..1258, whose web tables fill undefined
/// positions with C1 controls
fn is_windows_code_page(encoding: &'static encoding_rs::Encoding) -> bool {
    encoding.name().starts_with("windows-")
}

// Equal charsets always share a canonical name.
impl Hash for Charset {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Charset::for_name(s)
    }
}

/// Resolves encoding names to charsets
pub trait CodecLookup {
    /// Resolve `name`, failing with [`Error::InvalidArgument`] for an empty
    /// name, [`Error::InvalidEncodingName`] for an illegal one and
    /// [`Error::UnknownEncoding`] for one that is legal but not supported.
    fn lookup(&self, name: &str) -> Result<Charset>;
}

/// The default registry
#[derive(Debug, Clone, Copy, Default)]
pub struct Registry;

impl Registry {
    /// Every charset this registry can resolve, one entry per encoding.
    pub fn available() -> Vec<Charset> {
        use encoding_rs::*;

        let mut charsets = vec![
            Charset::UsAscii,
            Charset::Latin1,
            Charset::Utf16,
            Charset::Utf16Le,
            Charset::Utf16Be,
        ];
        charsets.extend(
            [
                UTF_8,
                IBM866,
                ISO_8859_2,
                ISO_8859_3,
                ISO_8859_4,
                ISO_8859_5,
                ISO_8859_6,
                ISO_8859_7,
                ISO_8859_8,
                ISO_8859_8_I,
                ISO_8859_10,
                ISO_8859_13,
                ISO_8859_14,
                ISO_8859_15,
                ISO_8859_16,
                KOI8_R,
                KOI8_U,
                MACINTOSH,
                WINDOWS_874,
                WINDOWS_1250,
                WINDOWS_1251,
                WINDOWS_1252,
                WINDOWS_1253,
                WINDOWS_1254,
                WINDOWS_1255,
                WINDOWS_1256,
                WINDOWS_1257,
                WINDOWS_1258,
                X_MAC_CYRILLIC,
                GBK,
                GB18030,
                BIG5,
                EUC_JP,
                ISO_2022_JP,
                SHIFT_JIS,
                EUC_KR,
                X_USER_DEFINED,
            ]
            .into_iter()
            .map(Charset::Web),
        );
        charsets
    }
}

impl CodecLookup for Registry {
    fn lookup(&self, name: &str) -> Result<Charset> {
        validate_name(name)?;

        let native = match name.to_ascii_lowercase().as_str() {
            "us-ascii" | "ascii" | "us" | "iso646-us" | "ansi_x3.4-1968" | "cp367" | "ibm367"
            | "csascii" | "646" => Some(Charset::UsAscii),
            "iso-8859-1" | "iso8859-1" | "iso8859_1" | "iso88591" | "iso_8859-1"
            | "iso_8859-1:1987" | "8859_1" | "latin1" | "l1" | "cp819" | "ibm819"
            | "iso-ir-100" | "csisolatin1" => Some(Charset::Latin1),
            "utf-16" | "utf16" | "utf_16" => Some(Charset::Utf16),
            "utf-16le" | "utf16le" | "utf_16le" | "x-utf-16le" | "unicodelittleunmarked" => {
                Some(Charset::Utf16Le)
            }
            "utf-16be" | "utf16be" | "utf_16be" | "x-utf-16be" | "unicodebigunmarked" => {
                Some(Charset::Utf16Be)
            }
            _ => None,
        };
        if let Some(charset) = native {
            return Ok(charset);
        }

        match encoding_rs::Encoding::for_label_no_replacement(name.as_bytes()) {
            Some(encoding) if encoding == encoding_rs::UTF_16LE => Ok(Charset::Utf16Le),
            Some(encoding) if encoding == encoding_rs::UTF_16BE => Ok(Charset::Utf16Be),
            Some(encoding) => Ok(Charset::Web(encoding)),
            None => Err(Error::UnknownEncoding(name.to_string())),
        }
    }
}

/// Check the syntax of an encoding name: a leading ASCII letter or digit
/// followed by letters, digits, `-`, `+`, `:`, `_` and `.`.
fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(Error::InvalidArgument(
            "encoding name must not be empty".to_string(),
        ));
    };

    let legal = first.is_ascii_alphanumeric()
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '+' | ':' | '_' | '.'));
    if legal {
        Ok(())
    } else {
        Err(Error::InvalidEncodingName(name.to_string()))
    }
}
