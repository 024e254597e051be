use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("format violation in `{field}` at 0x{position:X}: expected {expected}, found {actual}")]
    FormatViolation {
        field: String,
        position: usize,
        expected: String,
        actual: String,
    },

    #[error("out of bounds: offset=0x{offset:X}, len=0x{len:X}, buffer_len=0x{buffer_len:X}")]
    Bounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    #[error("schema `{schema}` does not apply: expects {expected} bytes, buffer has {actual}")]
    SchemaMismatch {
        schema: String,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported field type: {0}")]
    UnsupportedType(String),

    #[error("write finished with unfilled reservations: {}", .0.join(", "))]
    UnfilledReservation(Vec<String>),

    #[error("reservation `{0}` is already pending")]
    DuplicateReservation(String),

    #[error("no pending reservation named `{0}`")]
    UnknownReservation(String),

    #[error("value {value} does not fit the {width}-byte slot `{name}`")]
    SlotOverflow { name: String, width: usize, value: u64 },

    #[error("invalid slot width {0} (expected 1, 2, 4 or 8)")]
    SlotWidth(usize),

    #[error("cannot convert {value} to {target} for field `{field}`")]
    Conversion {
        field: String,
        value: String,
        target: &'static str,
    },

    #[error("null assignment to field `{0}`")]
    NullAssignment(String),

    #[error("no field named `{0}`")]
    UnknownField(String),

    #[error("field index {index} out of range (field count {len})")]
    FieldIndex { index: usize, len: usize },

    #[error("string {text:?} needs {needed} bytes, field holds {capacity}")]
    StringTooLong {
        text: String,
        needed: usize,
        capacity: usize,
    },

    #[error("string {0:?} cannot be represented in the target encoding")]
    Unencodable(String),

    #[error("unterminated string at 0x{0:X}")]
    Unterminated(usize),

    #[error("value {value} exceeds the {field} field")]
    FieldOverflow { field: &'static str, value: u64 },

    #[error("binary decode error: {0}")]
    Binrw(#[from] binrw::Error),

    #[error("schema document: {0}")]
    SchemaDocument(#[from] serde_yaml::Error),
}

impl Error {
    /// Only a schema width mismatch is expected to be retried with another candidate.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Error::SchemaMismatch { .. })
    }

    pub(crate) fn bounds(offset: usize, len: usize, buffer_len: usize) -> Self {
        Error::Bounds {
            offset,
            len,
            buffer_len,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
