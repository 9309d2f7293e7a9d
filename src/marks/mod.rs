//! Marks extraction after login and its output.

pub mod export;
pub mod extract;

pub use export::{export_to_json, write_summary};
pub use extract::{extract_marks, MarkRecord};
