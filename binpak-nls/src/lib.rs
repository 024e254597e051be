use encoding_rs::{Encoding as RsEncoding, GB18030, SHIFT_JIS, UTF_16BE, UTF_16LE, UTF_8};
use std::borrow::Cow;
use std::str::FromStr;

pub trait TextDecoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;

    /// Decode C-style string: stop at the first NUL unit.
    fn decode_cstr<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Encoding {
    #[default]
    Utf8,
    ShiftJis,
    /// Treat GBK as GB18030 (superset). This is robust for legacy CN game assets.
    Gbk,
    Gb18030,
    Utf16Le,
    Utf16Be,
}

impl Encoding {
    #[inline]
    pub fn as_encoding_rs(self) -> &'static RsEncoding {
        match self {
            Encoding::Utf8 => UTF_8,
            Encoding::ShiftJis => SHIFT_JIS,
            Encoding::Gbk => GB18030,
            Encoding::Gb18030 => GB18030,
            Encoding::Utf16Le => UTF_16LE,
            Encoding::Utf16Be => UTF_16BE,
        }
    }

    /// Size in bytes of one code unit (and of the NUL terminator).
    #[inline]
    pub fn unit_width(self) -> usize {
        match self {
            Encoding::Utf16Le | Encoding::Utf16Be => 2,
            _ => 1,
        }
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utf8" | "utf-8" => Ok(Encoding::Utf8),
            "sjis" | "shiftjis" | "shift_jis" | "shift-jis" => Ok(Encoding::ShiftJis),
            "gbk" => Ok(Encoding::Gbk),
            "gb18030" => Ok(Encoding::Gb18030),
            "utf16" | "utf-16" | "utf16le" | "utf-16le" => Ok(Encoding::Utf16Le),
            "utf16be" | "utf-16be" => Ok(Encoding::Utf16Be),
            other => Err(format!("unsupported encoding: {other}")),
        }
    }
}

/// Returns the byte length of a NUL-terminated string starting at `bytes[0]`,
/// excluding the terminator. `None` if no terminator is found.
pub fn terminated_len(bytes: &[u8], enc: Encoding) -> Option<usize> {
    match enc.unit_width() {
        2 => bytes
            .chunks_exact(2)
            .position(|u| u == [0, 0])
            .map(|units| units * 2),
        _ => bytes.iter().position(|&b| b == 0),
    }
}

/// A simple decoder bound to one encoding.
#[derive(Debug, Clone, Copy)]
pub struct Decoder {
    enc: Encoding,
}

impl Decoder {
    #[inline]
    pub fn new(enc: Encoding) -> Self {
        Self { enc }
    }

    #[inline]
    pub fn encoding(&self) -> Encoding {
        self.enc
    }

    /// Encode a Rust string to bytes using the selected encoding.
    /// Returns `None` if a character is not representable.
    pub fn encode<'a>(&self, s: &'a str) -> Option<Cow<'a, [u8]>> {
        match self.enc {
            // encoding_rs only encodes *to* UTF-8 for the UTF-16 labels.
            Encoding::Utf16Le => Some(Cow::Owned(
                s.encode_utf16().flat_map(u16::to_le_bytes).collect(),
            )),
            Encoding::Utf16Be => Some(Cow::Owned(
                s.encode_utf16().flat_map(u16::to_be_bytes).collect(),
            )),
            _ => {
                let (cow, _, had_errors) = self.enc.as_encoding_rs().encode(s);
                if had_errors {
                    None
                } else {
                    Some(cow)
                }
            }
        }
    }

    /// Same as encode(), but always returns an owned Vec<u8>.
    pub fn encode_owned(&self, s: &str) -> Option<Vec<u8>> {
        self.encode(s).map(Cow::into_owned)
    }

    /// Encode and append a NUL terminator of the encoding's unit width.
    pub fn encode_cstr(&self, s: &str) -> Option<Vec<u8>> {
        let mut out = self.encode_owned(s)?;
        out.extend(std::iter::repeat(0).take(self.enc.unit_width()));
        Some(out)
    }
}

impl TextDecoder for Decoder {
    fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        match self.enc {
            Encoding::Utf8 => match std::str::from_utf8(bytes) {
                Ok(s) => Cow::Borrowed(s),
                Err(_) => Cow::Owned(String::from_utf8_lossy(bytes).into_owned()),
            },
            Encoding::Utf16Le | Encoding::Utf16Be => {
                let (cow, had_errors) = self
                    .enc
                    .as_encoding_rs()
                    .decode_without_bom_handling(bytes);
                if had_errors {
                    log::warn!("{:?} decode error", self.enc);
                }
                cow
            }
            Encoding::ShiftJis | Encoding::Gbk | Encoding::Gb18030 => {
                let enc = self.enc.as_encoding_rs();
                let (cow, _, had_errors) = enc.decode(bytes);
                if had_errors {
                    log::warn!("{:?} decode error", self.enc);
                }
                cow
            }
        }
    }

    fn decode_cstr<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let end = terminated_len(bytes, self.enc).unwrap_or(bytes.len() & !(self.enc.unit_width() - 1));
        self.decode(&bytes[..end])
    }
}

/// A convenience default.
impl Default for Decoder {
    fn default() -> Self {
        Self::new(Encoding::Utf8)
    }
}
