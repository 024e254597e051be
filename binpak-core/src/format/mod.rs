pub mod archive;
pub mod record;
