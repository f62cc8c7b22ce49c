//! Serializer field types: choice relations, base64-encoded file payloads
//! and writable method-backed fields.

pub mod base64_file;
pub mod choice;
pub mod method_field;

pub use base64_file::{Base64FileField, DecodedFile};
pub use choice::RelationChoiceField;
pub use method_field::{MethodFieldHost, WritableMethodField};
