use std::fmt;

use binrw::Endian;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

mod sealed {
    pub trait Sealed {}
}

/// A fixed-width primitive that can be read from and written to a byte buffer
/// in either byte order.
///
/// The set of implementors is closed.
pub trait Scalar: sealed::Sealed + Copy + PartialEq + fmt::Debug + fmt::Display {
    const WIDTH: usize;

    /// `bytes` must be exactly `WIDTH` long.
    fn decode(bytes: &[u8], endian: Endian) -> Self;

    /// `out` must be exactly `WIDTH` long.
    fn encode(self, out: &mut [u8], endian: Endian);
}

macro_rules! impl_scalar {
    ($ty:ty, $read:ident, $write:ident) => {
        impl sealed::Sealed for $ty {}

        impl Scalar for $ty {
            const WIDTH: usize = std::mem::size_of::<$ty>();

            #[inline]
            fn decode(bytes: &[u8], endian: Endian) -> Self {
                match endian {
                    Endian::Little => LittleEndian::$read(bytes),
                    Endian::Big => BigEndian::$read(bytes),
                }
            }

            #[inline]
            fn encode(self, out: &mut [u8], endian: Endian) {
                match endian {
                    Endian::Little => LittleEndian::$write(out, self),
                    Endian::Big => BigEndian::$write(out, self),
                }
            }
        }
    };
}

impl sealed::Sealed for u8 {}
impl sealed::Sealed for i8 {}

impl Scalar for u8 {
    const WIDTH: usize = 1;

    #[inline]
    fn decode(bytes: &[u8], _endian: Endian) -> Self {
        bytes[0]
    }

    #[inline]
    fn encode(self, out: &mut [u8], _endian: Endian) {
        out[0] = self;
    }
}

impl Scalar for i8 {
    const WIDTH: usize = 1;

    #[inline]
    fn decode(bytes: &[u8], _endian: Endian) -> Self {
        bytes[0] as i8
    }

    #[inline]
    fn encode(self, out: &mut [u8], _endian: Endian) {
        out[0] = self as u8;
    }
}

impl_scalar!(u16, read_u16, write_u16);
impl_scalar!(i16, read_i16, write_i16);
impl_scalar!(u32, read_u32, write_u32);
impl_scalar!(i32, read_i32, write_i32);
impl_scalar!(u64, read_u64, write_u64);
impl_scalar!(i64, read_i64, write_i64);
impl_scalar!(f32, read_f32, write_f32);
impl_scalar!(f64, read_f64, write_f64);
