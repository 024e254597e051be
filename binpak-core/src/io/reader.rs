use binrw::Endian;
use binpak_nls::{Decoder, Encoding, TextDecoder};

use super::{align_up, ByteView, Scalar};
use crate::error::{Error, Result};

/// Sequential cursor over a borrowed buffer.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    view: ByteView<'a>,
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            view: ByteView::new(data, endian),
            pos: 0,
        }
    }

    /// The random-access side of the same buffer.
    #[inline]
    pub fn view(&self) -> ByteView<'a> {
        self.view
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.view.endian()
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.pos
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.view.len().saturating_sub(self.pos)
    }

    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.view.len() {
            return Err(Error::bounds(pos, 0, self.view.len()));
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.read_bytes(len).map(|_| ())
    }

    pub fn read<T: Scalar>(&mut self) -> Result<T> {
        let v = self.view.read_at(self.pos)?;
        self.pos += T::WIDTH;
        Ok(v)
    }

    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let raw = self.view.bytes(self.pos, len)?;
        self.pos += len;
        Ok(raw)
    }

    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    /// Read a value and fail with a format violation unless it equals `expected`.
    pub fn assert_value<T: Scalar>(&mut self, field: &str, expected: T) -> Result<T> {
        let position = self.pos;
        let actual = self.read::<T>()?;
        if actual != expected {
            return Err(Error::FormatViolation {
                field: field.to_string(),
                position,
                expected: expected.to_string(),
                actual: actual.to_string(),
            });
        }
        Ok(actual)
    }

    pub fn assert_bytes(&mut self, field: &str, expected: &[u8]) -> Result<()> {
        let position = self.pos;
        let actual = self.read_bytes(expected.len())?;
        if actual != expected {
            return Err(Error::FormatViolation {
                field: field.to_string(),
                position,
                expected: format!("{expected:02X?}"),
                actual: format!("{actual:02X?}"),
            });
        }
        Ok(())
    }

    /// Read a `len`-byte string field; the text ends at the first NUL.
    pub fn read_fixed_str(&mut self, len: usize, enc: Encoding) -> Result<String> {
        let raw = self.read_bytes(len)?;
        Ok(Decoder::new(enc).decode_cstr(raw).into_owned())
    }

    /// Absolute UTF-16 read; the cursor does not move.
    pub fn read_utf16z_at(&self, base: usize, offset: usize) -> Result<String> {
        self.view.utf16z_at(base, offset)
    }

    /// Skip to the next multiple of `alignment`.
    pub fn pad(&mut self, alignment: usize) -> Result<()> {
        let target = align_up(self.pos, alignment);
        self.seek(target)
    }
}
