//! Byte cursor I/O.
//!
//! Reading is split into two capabilities over the same buffer: a stateless
//! [`ByteView`] for absolute offsets and a sequential [`ByteReader`]. Writing
//! goes through [`ByteWriter`], which can patch bytes it already emitted.

mod reader;
mod scalar;
mod view;
mod writer;

pub use reader::ByteReader;
pub use scalar::Scalar;
pub use view::ByteView;
pub use writer::ByteWriter;

use binrw::Endian;
use binpak_nls::Encoding;

/// Round `pos` up to a multiple of `alignment`. 0 and 1 mean "no alignment".
#[inline]
pub fn align_up(pos: usize, alignment: usize) -> usize {
    if alignment <= 1 {
        pos
    } else {
        pos.div_ceil(alignment) * alignment
    }
}

#[inline]
pub(crate) fn utf16_for(endian: Endian) -> Encoding {
    match endian {
        Endian::Little => Encoding::Utf16Le,
        Endian::Big => Encoding::Utf16Be,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn align_up_handles_degenerate_alignments() {
        assert_eq!(align_up(67, 0), 67);
        assert_eq!(align_up(67, 1), 67);
        assert_eq!(align_up(67, 16), 80);
        assert_eq!(align_up(64, 16), 64);
        assert_eq!(align_up(1, 0x800), 0x800);
        assert_eq!(align_up(0, 8), 0);
    }
}
