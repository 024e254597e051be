//! Reading and writing of offset-linked binary containers.
//!
//! This mostly includes byte-level cursors, the name-keyed offset ledger used
//! for back-patching, format sniffing, and the concrete container formats.

#![allow(clippy::uninlined_format_args)]

pub mod error;
pub mod format;
pub mod io;
pub mod ledger;
pub mod sniff;
pub mod typed;

// re-export for convenience
pub use binrw::Endian;
pub use error::{Error, Result};
