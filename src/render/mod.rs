//! Rendering of result records.

mod json;

pub use json::{to_json, JsonFormat};
