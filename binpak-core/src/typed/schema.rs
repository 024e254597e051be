use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

use super::Value;
use crate::error::{Error, Result};

/// Binary type of one schema field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    S8,
    U8,
    S16,
    U16,
    S32,
    U32,
    F32,
}

impl FieldType {
    #[inline]
    pub fn width(self) -> usize {
        match self {
            FieldType::S8 | FieldType::U8 => 1,
            FieldType::S16 | FieldType::U16 => 2,
            FieldType::S32 | FieldType::U32 | FieldType::F32 => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldType::S8 => "s8",
            FieldType::U8 => "u8",
            FieldType::S16 => "s16",
            FieldType::U16 => "u16",
            FieldType::S32 => "s32",
            FieldType::U32 => "u32",
            FieldType::F32 => "f32",
        }
    }

    /// Inclusive integer range, `None` for floats.
    pub fn int_range(self) -> Option<(i64, i64)> {
        match self {
            FieldType::S8 => Some((i8::MIN as i64, i8::MAX as i64)),
            FieldType::U8 => Some((0, u8::MAX as i64)),
            FieldType::S16 => Some((i16::MIN as i64, i16::MAX as i64)),
            FieldType::U16 => Some((0, u16::MAX as i64)),
            FieldType::S32 => Some((i32::MIN as i64, i32::MAX as i64)),
            FieldType::U32 => Some((0, u32::MAX as i64)),
            FieldType::F32 => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

impl FromStr for FieldType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "s8" | "i8" => Ok(FieldType::S8),
            "u8" => Ok(FieldType::U8),
            "s16" | "i16" => Ok(FieldType::S16),
            "u16" => Ok(FieldType::U16),
            "s32" | "i32" => Ok(FieldType::S32),
            "u32" => Ok(FieldType::U32),
            "f32" => Ok(FieldType::F32),
            _ => Err(Error::UnsupportedType(s.to_string())),
        }
    }
}

/// One field of a schema, with its editor metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDescriptor {
    pub name: String,
    pub field_type: FieldType,
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub increment: Option<f64>,
    pub description: String,
    pub format: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            default: 0.0,
            min: None,
            max: None,
            increment: None,
            description: String::new(),
            format: None,
        }
    }

    pub fn with_default(mut self, default: f64) -> Self {
        self.default = default;
        self
    }

    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.field_type.width()
    }

    /// Whether `value` lies in the editor's `[min, max]` range.
    ///
    /// Advisory only: assignment never enforces it.
    pub fn check_editor_range(&self, value: &Value) -> bool {
        let v = value.as_f64();
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }
}

/// An ordered list of field descriptors.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub name: String,
    fields: Vec<FieldDescriptor>,
}

#[derive(Deserialize)]
struct SchemaDoc {
    name: String,
    #[serde(default)]
    fields: Vec<FieldDoc>,
}

#[derive(Deserialize)]
struct FieldDoc {
    name: String,
    #[serde(rename = "type")]
    ty: String,
    #[serde(default)]
    default: f64,
    min: Option<f64>,
    max: Option<f64>,
    increment: Option<f64>,
    #[serde(default)]
    description: String,
    format: Option<String>,
}

impl Schema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            fields,
        }
    }

    /// Parse a YAML schema document.
    pub fn from_yaml(text: &str) -> Result<Self> {
        let doc: SchemaDoc = serde_yaml::from_str(text)?;
        let fields = doc
            .fields
            .into_iter()
            .map(|f| {
                Ok(FieldDescriptor {
                    field_type: f.ty.parse()?,
                    name: f.name,
                    default: f.default,
                    min: f.min,
                    max: f.max,
                    increment: f.increment,
                    description: f.description,
                    format: f.format,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(doc.name, fields))
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Total byte width of one serialized table.
    pub fn width(&self) -> usize {
        self.fields.iter().map(FieldDescriptor::width).sum()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}
