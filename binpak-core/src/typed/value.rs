use std::fmt;

use super::{FieldType, Variant};
use crate::error::{Error, Result};
use crate::io::{ByteReader, ByteWriter};

/// A field value whose representation always matches its [`FieldType`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Value {
    S8(i8),
    U8(u8),
    S16(i16),
    U16(u16),
    S32(i32),
    U32(u32),
    F32(f32),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::S8(_) => FieldType::S8,
            Value::U8(_) => FieldType::U8,
            Value::S16(_) => FieldType::S16,
            Value::U16(_) => FieldType::U16,
            Value::S32(_) => FieldType::S32,
            Value::U32(_) => FieldType::U32,
            Value::F32(_) => FieldType::F32,
        }
    }

    pub fn as_f64(&self) -> f64 {
        match *self {
            Value::S8(v) => v as f64,
            Value::U8(v) => v as f64,
            Value::S16(v) => v as f64,
            Value::U16(v) => v as f64,
            Value::S32(v) => v as f64,
            Value::U32(v) => v as f64,
            Value::F32(v) => v as f64,
        }
    }

    /// Convert an arbitrary input into a value of type `ty`.
    ///
    /// `field` only names the target in error messages.
    pub fn convert(ty: FieldType, input: &Variant, field: &str) -> Result<Value> {
        let fail = || Error::Conversion {
            field: field.to_string(),
            value: input.to_string(),
            target: ty.name(),
        };

        match input {
            Variant::Nil => Err(Error::NullAssignment(field.to_string())),
            Variant::Bool(b) => Self::from_i64(ty, *b as i64).ok_or_else(fail),
            Variant::Int(i) => Self::from_i64(ty, *i).ok_or_else(fail),
            Variant::Float(f) => Self::from_f64(ty, *f).ok_or_else(fail),
            Variant::Str(s) => {
                let s = s.trim();
                if let Ok(i) = s.parse::<i64>() {
                    Self::from_i64(ty, i).ok_or_else(fail)
                } else if let Ok(f) = s.parse::<f64>() {
                    Self::from_f64(ty, f).ok_or_else(fail)
                } else {
                    Err(fail())
                }
            }
        }
    }

    fn from_i64(ty: FieldType, v: i64) -> Option<Value> {
        Some(match ty {
            FieldType::S8 => Value::S8(i8::try_from(v).ok()?),
            FieldType::U8 => Value::U8(u8::try_from(v).ok()?),
            FieldType::S16 => Value::S16(i16::try_from(v).ok()?),
            FieldType::U16 => Value::U16(u16::try_from(v).ok()?),
            FieldType::S32 => Value::S32(i32::try_from(v).ok()?),
            FieldType::U32 => Value::U32(u32::try_from(v).ok()?),
            // integers past 2^24 would be rounded
            FieldType::F32 => {
                let f = v as f32;
                if f as i128 != v as i128 {
                    return None;
                }
                Value::F32(f)
            }
        })
    }

    fn from_f64(ty: FieldType, v: f64) -> Option<Value> {
        if ty == FieldType::F32 {
            // NaN and infinities pass through; finite values must stay finite
            if v.is_finite() && (v as f32).is_infinite() {
                return None;
            }
            return Some(Value::F32(v as f32));
        }

        let (min, max) = ty.int_range()?;
        if !v.is_finite() || v.fract() != 0.0 || v < min as f64 || v > max as f64 {
            return None;
        }
        Self::from_i64(ty, v as i64)
    }

    pub fn read(reader: &mut ByteReader<'_>, ty: FieldType) -> Result<Value> {
        Ok(match ty {
            FieldType::S8 => Value::S8(reader.read()?),
            FieldType::U8 => Value::U8(reader.read()?),
            FieldType::S16 => Value::S16(reader.read()?),
            FieldType::U16 => Value::U16(reader.read()?),
            FieldType::S32 => Value::S32(reader.read()?),
            FieldType::U32 => Value::U32(reader.read()?),
            FieldType::F32 => Value::F32(reader.read()?),
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) {
        match *self {
            Value::S8(v) => writer.write(v),
            Value::U8(v) => writer.write(v),
            Value::S16(v) => writer.write(v),
            Value::U16(v) => writer.write(v),
            Value::S32(v) => writer.write(v),
            Value::U32(v) => writer.write(v),
            Value::F32(v) => writer.write(v),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::S8(v) => write!(f, "{}", v),
            Value::U8(v) => write!(f, "{}", v),
            Value::S16(v) => write!(f, "{}", v),
            Value::U16(v) => write!(f, "{}", v),
            Value::S32(v) => write!(f, "{}", v),
            Value::U32(v) => write!(f, "{}", v),
            Value::F32(v) => write!(f, "{}", v),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use binrw::Endian;

    #[test]
    fn u8_rejects_overflow_instead_of_wrapping() {
        assert!(matches!(
            Value::convert(FieldType::U8, &Variant::Int(300), "f"),
            Err(Error::Conversion { target: "u8", .. })
        ));
        assert_eq!(
            Value::convert(FieldType::U8, &Variant::Int(255), "f").unwrap(),
            Value::U8(255)
        );
        assert!(Value::convert(FieldType::U8, &Variant::Int(-1), "f").is_err());
    }

    #[test]
    fn nil_is_rejected() {
        assert!(matches!(
            Value::convert(FieldType::S32, &Variant::Nil, "hp"),
            Err(Error::NullAssignment(name)) if name == "hp"
        ));
    }

    #[test]
    fn floats_into_integers_must_be_integral() {
        assert_eq!(
            Value::convert(FieldType::S16, &Variant::Float(-12.0), "f").unwrap(),
            Value::S16(-12)
        );
        assert!(Value::convert(FieldType::S16, &Variant::Float(1.5), "f").is_err());
        assert!(Value::convert(FieldType::U32, &Variant::Float(f64::NAN), "f").is_err());
        assert!(Value::convert(FieldType::U32, &Variant::Float(4294967296.0), "f").is_err());
    }

    #[test]
    fn f32_accepts_ints_and_rejects_finite_overflow() {
        assert_eq!(
            Value::convert(FieldType::F32, &Variant::Int(3), "f").unwrap(),
            Value::F32(3.0)
        );
        assert!(Value::convert(FieldType::F32, &Variant::Float(1e300), "f").is_err());
        assert_eq!(
            Value::convert(FieldType::F32, &Variant::Int(16_777_216), "f").unwrap(),
            Value::F32(16_777_216.0)
        );
        assert!(matches!(
            Value::convert(FieldType::F32, &Variant::Int(16_777_217), "f"),
            Err(Error::Conversion { target: "f32", .. })
        ));
        assert!(matches!(
            Value::convert(FieldType::F32, &Variant::Float(f64::INFINITY), "f"),
            Ok(Value::F32(v)) if v.is_infinite()
        ));
    }

    #[test]
    fn strings_and_bools() {
        assert_eq!(
            Value::convert(FieldType::U16, &Variant::from(" 42 "), "f").unwrap(),
            Value::U16(42)
        );
        assert_eq!(
            Value::convert(FieldType::F32, &Variant::from("0.25"), "f").unwrap(),
            Value::F32(0.25)
        );
        assert!(Value::convert(FieldType::U16, &Variant::from("lots"), "f").is_err());
        assert_eq!(
            Value::convert(FieldType::S8, &Variant::Bool(true), "f").unwrap(),
            Value::S8(1)
        );
    }

    #[test]
    fn binary_width_follows_type() {
        let mut w = ByteWriter::new(Endian::Little);
        Value::S8(-1).write(&mut w);
        Value::U16(0x0102).write(&mut w);
        Value::F32(1.0).write(&mut w);
        let bytes = w.into_inner();
        assert_eq!(bytes, vec![0xFF, 0x02, 0x01, 0x00, 0x00, 0x80, 0x3F]);

        let mut r = ByteReader::new(&bytes, Endian::Little);
        assert_eq!(Value::read(&mut r, FieldType::S8).unwrap(), Value::S8(-1));
        assert_eq!(Value::read(&mut r, FieldType::U16).unwrap(), Value::U16(0x0102));
        assert_eq!(Value::read(&mut r, FieldType::F32).unwrap(), Value::F32(1.0));
    }
}
