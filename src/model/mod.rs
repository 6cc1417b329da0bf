pub mod fields;
pub mod source;
pub mod target;
