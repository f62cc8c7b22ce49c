//! File payloads carried inline as base64 data URLs.
//!
//! The wire contract: writes accept `{"data": "data:<mime>;base64,<...>",
//! "name": "..."}` with `name` optional, reads produce `{"url": <string or
//! null>}`. When no data is supplied at all the field is skipped rather
//! than failing, so callers can PATCH around it.

use crate::error::NestedError;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use uuid::Uuid;

/// A decoded file ready for the host's storage layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedFile {
	pub name: String,
	pub content: Vec<u8>,
}

/// Field type for base64-encoded file payloads.
#[derive(Debug, Clone, Default)]
pub struct Base64FileField;

impl Base64FileField {
	pub fn new() -> Self {
		Self
	}

	/// Decode a write payload into a [`DecodedFile`].
	///
	/// Returns `Ok(None)`, meaning skip the field, when the payload carries
	/// no `data` entry. A present but malformed data URL is
	/// [`NestedError::MalformedPayload`]. When `name` is omitted a random
	/// 12-character name is generated and the extension is derived from
	/// the declared mimetype (`.bin` when the mimetype is unknown).
	pub fn to_internal_value(&self, data: &Value) -> Result<Option<DecodedFile>, NestedError> {
		let object = match data.as_object() {
			Some(object) => object,
			None => return Ok(None),
		};
		let encoded = match object.get("data").and_then(Value::as_str) {
			Some(encoded) if !encoded.is_empty() => encoded,
			_ => return Ok(None),
		};

		if !encoded.contains("data:") || !encoded.contains(";base64,") {
			return Err(NestedError::MalformedPayload(
				"expected 'data:<mimetype>;base64,<content>'".into(),
			));
		}
		let (header, body) = match encoded.split_once(";base64,") {
			Some(parts) => parts,
			None => {
				return Err(NestedError::MalformedPayload(
					"expected 'data:<mimetype>;base64,<content>'".into(),
				));
			}
		};

		let content = STANDARD
			.decode(body)
			.map_err(|err| NestedError::MalformedPayload(err.to_string()))?;

		let name = match object.get("name").and_then(Value::as_str) {
			Some(name) if !name.is_empty() => name.to_string(),
			_ => {
				let stem = Uuid::new_v4().simple().to_string();
				let mimetype = header.trim_start_matches("data:");
				let extension = mime_guess::get_mime_extensions_str(mimetype)
					.and_then(|extensions| extensions.first().copied())
					.unwrap_or("bin");
				format!("{}.{}", &stem[..12], extension)
			}
		};

		Ok(Some(DecodedFile { name, content }))
	}

	/// Read representation: `{"url": <string>}` for a stored file path,
	/// `{"url": null}` when nothing is stored.
	pub fn to_representation(&self, value: &Value) -> Value {
		match value.as_str() {
			Some(path) if !path.is_empty() => {
				let url = if path.starts_with('/') {
					path.to_string()
				} else {
					format!("/media/{}", path)
				};
				json!({ "url": url })
			}
			_ => json!({ "url": null }),
		}
	}
}
