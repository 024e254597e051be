use binrw::Endian;
use binpak_nls::{terminated_len, Decoder, Encoding, TextDecoder};

use super::{utf16_for, Scalar};
use crate::error::{Error, Result};

/// Stateless random access over a borrowed buffer.
///
/// Every read names its absolute offset, so a `ByteView` can be copied freely
/// alongside a [`ByteReader`](super::ByteReader) without either disturbing the
/// other's position.
#[derive(Debug, Clone, Copy)]
pub struct ByteView<'a> {
    data: &'a [u8],
    endian: Endian,
}

impl<'a> ByteView<'a> {
    #[inline]
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self { data, endian }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn endian(&self) -> Endian {
        self.endian
    }

    #[inline]
    pub fn as_slice(&self) -> &'a [u8] {
        self.data
    }

    /// Borrow `len` bytes at `offset`.
    pub fn bytes(&self, offset: usize, len: usize) -> Result<&'a [u8]> {
        offset
            .checked_add(len)
            .and_then(|end| self.data.get(offset..end))
            .ok_or_else(|| Error::bounds(offset, len, self.data.len()))
    }

    pub fn read_at<T: Scalar>(&self, offset: usize) -> Result<T> {
        let raw = self.bytes(offset, T::WIDTH)?;
        Ok(T::decode(raw, self.endian))
    }

    /// Like [`read_at`](Self::read_at) but never fails; for sniffers.
    pub fn peek<T: Scalar>(&self, offset: usize) -> Option<T> {
        self.read_at(offset).ok()
    }

    /// Bytes of the NUL-terminated string at `offset`, terminator excluded.
    pub fn cstr_bytes_at(&self, offset: usize, enc: Encoding) -> Result<&'a [u8]> {
        let tail = self
            .data
            .get(offset..)
            .ok_or_else(|| Error::bounds(offset, enc.unit_width(), self.data.len()))?;
        let len = terminated_len(tail, enc).ok_or(Error::Unterminated(offset))?;
        Ok(&tail[..len])
    }

    pub fn cstr_at(&self, offset: usize, enc: Encoding) -> Result<String> {
        let raw = self.cstr_bytes_at(offset, enc)?;
        Ok(Decoder::new(enc).decode(raw).into_owned())
    }

    /// Read a NUL-terminated UTF-16 string located `offset` bytes after `base`.
    ///
    /// The code unit order follows the view's byte order.
    pub fn utf16z_at(&self, base: usize, offset: usize) -> Result<String> {
        let pos = base
            .checked_add(offset)
            .ok_or_else(|| Error::bounds(base, offset, self.data.len()))?;
        self.cstr_at(pos, utf16_for(self.endian))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absolute_reads_check_bounds() {
        let data = [1u8, 0, 0, 0, 2, 0];
        let view = ByteView::new(&data, Endian::Little);
        assert_eq!(view.read_at::<u32>(0).unwrap(), 1);
        assert_eq!(view.read_at::<u16>(4).unwrap(), 2);
        assert!(matches!(
            view.read_at::<u32>(4),
            Err(Error::Bounds { offset: 4, len: 4, buffer_len: 6 })
        ));
        assert!(view.bytes(usize::MAX, 2).is_err());
        assert_eq!(view.peek::<u32>(3), None);
    }

    #[test]
    fn utf16_relative_to_base() {
        let mut data = vec![0xAA; 4];
        data.extend_from_slice(&[b'h', 0, b'i', 0, 0, 0]);
        let view = ByteView::new(&data, Endian::Little);
        assert_eq!(view.utf16z_at(2, 2).unwrap(), "hi");
    }

    #[test]
    fn missing_terminator_is_an_error() {
        let data = [b'a', 0, b'b'];
        let view = ByteView::new(&data, Endian::Little);
        assert!(matches!(view.utf16z_at(0, 0), Err(Error::Unterminated(0))));
        assert_eq!(view.cstr_at(0, Encoding::Utf8).unwrap(), "a");
    }
}
