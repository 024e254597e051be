use binrw::Endian;
use binpak_nls::{Decoder, Encoding};

use super::{align_up, utf16_for, Scalar};
use crate::error::{Error, Result};

/// Append-only byte sink with absolute back-patching.
///
/// Sequential writes always land at the end of the buffer; `write_at` patches
/// bytes that were already emitted and never moves the cursor.
#[derive(Debug, Clone)]
pub struct ByteWriter {
    buf: Vec<u8>,
    endian: Endian,
}

impl ByteWriter {
    pub fn new(endian: Endian) -> Self {
        Self {
            buf: Vec::new(),
            endian,
        }
    }

    pub fn with_capacity(capacity: usize, endian: Endian) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
            endian,
        }
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn write<T: Scalar>(&mut self, value: T) {
        let start = self.buf.len();
        self.buf.resize(start + T::WIDTH, 0);
        value.encode(&mut self.buf[start..], self.endian);
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn write_zeros(&mut self, len: usize) {
        self.buf.resize(self.buf.len() + len, 0);
    }

    /// Overwrite already-emitted bytes at `offset`.
    pub fn write_at<T: Scalar>(&mut self, offset: usize, value: T) -> Result<()> {
        let len = self.buf.len();
        let slot = offset
            .checked_add(T::WIDTH)
            .and_then(|end| self.buf.get_mut(offset..end))
            .ok_or_else(|| Error::bounds(offset, T::WIDTH, len))?;
        value.encode(slot, self.endian);
        Ok(())
    }

    /// Zero-fill up to the next multiple of `alignment`.
    pub fn pad(&mut self, alignment: usize) {
        let target = align_up(self.buf.len(), alignment);
        self.buf.resize(target, 0);
    }

    /// Write `text` into a `len`-byte field, NUL padded.
    pub fn write_fixed_str(&mut self, text: &str, len: usize, enc: Encoding) -> Result<()> {
        let encoded = Decoder::new(enc)
            .encode(text)
            .ok_or_else(|| Error::Unencodable(text.to_string()))?;
        if encoded.len() > len {
            return Err(Error::StringTooLong {
                text: text.to_string(),
                needed: encoded.len(),
                capacity: len,
            });
        }
        self.write_bytes(&encoded);
        self.write_zeros(len - encoded.len());
        Ok(())
    }

    pub fn write_cstr(&mut self, text: &str, enc: Encoding) -> Result<()> {
        let encoded = Decoder::new(enc)
            .encode_cstr(text)
            .ok_or_else(|| Error::Unencodable(text.to_string()))?;
        self.write_bytes(&encoded);
        Ok(())
    }

    /// NUL-terminated UTF-16 in the writer's byte order.
    pub fn write_utf16z(&mut self, text: &str) -> Result<()> {
        self.write_cstr(text, utf16_for(self.endian))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_at_does_not_move_cursor() {
        let mut w = ByteWriter::new(Endian::Little);
        w.write::<u32>(0);
        w.write::<u16>(0xBEEF);
        w.write_at::<u32>(0, 0xDEAD_BEEF).unwrap();
        assert_eq!(w.position(), 6);
        assert_eq!(w.as_slice(), &[0xEF, 0xBE, 0xAD, 0xDE, 0xEF, 0xBE]);
        assert!(w.write_at::<u32>(4, 1).is_err());
    }

    #[test]
    fn pad_fills_with_zero() {
        let mut w = ByteWriter::new(Endian::Big);
        w.write::<u8>(0xFF);
        w.pad(4);
        assert_eq!(w.as_slice(), &[0xFF, 0, 0, 0]);
        w.pad(4);
        w.pad(0);
        w.pad(1);
        assert_eq!(w.position(), 4);
    }

    #[test]
    fn fixed_str_is_padded_and_bounded() {
        let mut w = ByteWriter::new(Endian::Little);
        w.write_fixed_str("AB", 4, Encoding::ShiftJis).unwrap();
        assert_eq!(w.as_slice(), b"AB\0\0");
        assert!(matches!(
            w.write_fixed_str("TOOLONG", 4, Encoding::Utf8),
            Err(Error::StringTooLong { needed: 7, capacity: 4, .. })
        ));
    }

    #[test]
    fn utf16_follows_byte_order() {
        let mut w = ByteWriter::new(Endian::Big);
        w.write_utf16z("A").unwrap();
        assert_eq!(w.into_inner(), vec![0, b'A', 0, 0]);
    }
}
