//! Flat binary value tables described by an external schema.

mod schema;
mod table;
mod value;
mod variant;

pub use schema::{FieldDescriptor, FieldType, Schema};
pub use table::{TypedField, ValueTable};
pub use value::Value;
pub use variant::Variant;
