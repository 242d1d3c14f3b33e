//! Upstream source access: HTTP client, positional payload decoding, and
//! reference-page extraction.

pub mod client;
pub mod field_map;
pub mod reference;

pub use client::{Backoff, SourceClient};
pub use field_map::{FieldMapper, FieldValue, split_sections};
pub use reference::ReferencePage;
