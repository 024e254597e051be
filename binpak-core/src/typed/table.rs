use binrw::Endian;

use super::{FieldDescriptor, Schema, Value, Variant};
use crate::error::{Error, Result};
use crate::io::{ByteReader, ByteWriter};

/// One value bound to the descriptor that types it.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedField<'s> {
    descriptor: &'s FieldDescriptor,
    value: Value,
}

impl<'s> TypedField<'s> {
    pub fn descriptor(&self) -> &'s FieldDescriptor {
        self.descriptor
    }

    pub fn name(&self) -> &'s str {
        &self.descriptor.name
    }

    pub fn value(&self) -> Value {
        self.value
    }

    /// Assign through conversion into the descriptor's type.
    pub fn set(&mut self, input: impl Into<Variant>) -> Result<()> {
        self.value = Value::convert(self.descriptor.field_type, &input.into(), &self.descriptor.name)?;
        Ok(())
    }

    fn default_for(descriptor: &'s FieldDescriptor) -> Result<Self> {
        let value = Value::convert(
            descriptor.field_type,
            &Variant::Float(descriptor.default),
            &descriptor.name,
        )?;
        Ok(Self { descriptor, value })
    }
}

/// A flat value table typed by an external [`Schema`].
///
/// Built from raw bytes, the table keeps a private copy of them untouched
/// until a schema whose total width matches exactly is applied.
#[derive(Debug, Clone)]
pub struct ValueTable<'s> {
    endian: Endian,
    raw: Vec<u8>,
    schema: Option<&'s Schema>,
    fields: Vec<TypedField<'s>>,
}

impl<'s> ValueTable<'s> {
    pub fn from_bytes(data: &[u8], endian: Endian) -> Self {
        Self {
            endian,
            raw: data.to_vec(),
            schema: None,
            fields: Vec::new(),
        }
    }

    /// Every field at its descriptor default.
    pub fn with_defaults(schema: &'s Schema, endian: Endian) -> Result<Self> {
        let fields = Self::defaults(schema)?;
        let mut table = Self {
            endian,
            raw: Vec::new(),
            schema: Some(schema),
            fields,
        };
        table.raw = table.to_bytes();
        Ok(table)
    }

    fn defaults(schema: &'s Schema) -> Result<Vec<TypedField<'s>>> {
        schema.fields().iter().map(TypedField::default_for).collect()
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn schema(&self) -> Option<&'s Schema> {
        self.schema
    }

    pub fn is_typed(&self) -> bool {
        self.schema.is_some()
    }

    /// The bytes the table was built from.
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    pub fn fields(&self) -> &[TypedField<'s>] {
        &self.fields
    }

    pub fn get(&self, index: usize) -> Option<&TypedField<'s>> {
        self.fields.get(index)
    }

    pub fn field(&self, name: &str) -> Option<&TypedField<'s>> {
        self.fields.iter().find(|f| f.name() == name)
    }

    pub fn set(&mut self, index: usize, input: impl Into<Variant>) -> Result<()> {
        let len = self.fields.len();
        self.fields
            .get_mut(index)
            .ok_or(Error::FieldIndex { index, len })?
            .set(input)
    }

    pub fn set_by_name(&mut self, name: &str, input: impl Into<Variant>) -> Result<()> {
        self.fields
            .iter_mut()
            .find(|f| f.name() == name)
            .ok_or_else(|| Error::UnknownField(name.to_string()))?
            .set(input)
    }

    /// Put every bound field back to its default. No-op for an untyped table.
    pub fn reset(&mut self) -> Result<()> {
        if let Some(schema) = self.schema {
            self.fields = Self::defaults(schema)?;
        }
        Ok(())
    }

    /// Interpret the current bytes with `schema`.
    ///
    /// The byte length must equal the schema's total width exactly. On any
    /// failure the table is left as it was.
    pub fn apply_schema(&mut self, schema: &'s Schema) -> Result<()> {
        let source = self.to_bytes();
        let expected = schema.width();
        if source.len() != expected {
            return Err(Error::SchemaMismatch {
                schema: schema.name.clone(),
                expected,
                actual: source.len(),
            });
        }

        let mut reader = ByteReader::new(&source, self.endian);
        let fields = schema
            .fields()
            .iter()
            .map(|descriptor| {
                Ok(TypedField {
                    descriptor,
                    value: Value::read(&mut reader, descriptor.field_type)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("applied schema `{}` ({} fields)", schema.name, fields.len());
        self.schema = Some(schema);
        self.fields = fields;
        Ok(())
    }

    /// Try `candidates` in order; the first schema that applies wins.
    ///
    /// Width mismatches move on to the next candidate; any other error is
    /// returned.
    pub fn apply_first(&mut self, candidates: &'s [Schema]) -> Result<Option<usize>> {
        for (i, schema) in candidates.iter().enumerate() {
            match self.apply_schema(schema) {
                Ok(()) => return Ok(Some(i)),
                Err(e) if e.is_recoverable() => {
                    log::trace!("{}", e);
                }
                Err(e) => return Err(e),
            }
        }
        Ok(None)
    }

    /// Serialized fields, or the untouched raw bytes when no schema is bound.
    pub fn to_bytes(&self) -> Vec<u8> {
        if self.schema.is_none() {
            return self.raw.clone();
        }
        let width = self.fields.iter().map(|f| f.descriptor.width()).sum();
        let mut writer = ByteWriter::with_capacity(width, self.endian);
        for field in &self.fields {
            field.value.write(&mut writer);
        }
        writer.into_inner()
    }
}
