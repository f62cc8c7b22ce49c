//! Dynamic field selection for representations.
//!
//! Prunes which fields appear in serialized output, driven by `fields`
//! (keep only these) and `exclude` (drop these) specifications. Dotted
//! specs reach into nested representations: `"profile.birth_date"` keeps
//! (or drops) one field of the nested `profile` object, and selections
//! recurse through arrays of objects element-wise.

use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};

/// A `fields`/`exclude` specification applied to representation trees.
///
/// # Examples
///
/// ```
/// use nested_serializers::dynamic::FieldSelection;
/// use serde_json::json;
///
/// let mut value = json!({
///     "id": 1,
///     "name": "Ada",
///     "profile": {"birth_date": "1815-12-10", "bio": "mathematician"}
/// });
///
/// FieldSelection::new()
///     .with_fields(vec!["id".into(), "profile.birth_date".into()])
///     .apply(&mut value);
///
/// assert_eq!(value, json!({"id": 1, "profile": {"birth_date": "1815-12-10"}}));
/// ```
#[derive(Debug, Clone, Default)]
pub struct FieldSelection {
	fields: Option<Vec<String>>,
	exclude: Vec<String>,
}

impl FieldSelection {
	pub fn new() -> Self {
		Self::default()
	}

	/// Keep only the named fields. A dotted spec implies its prefix.
	pub fn with_fields(mut self, fields: Vec<String>) -> Self {
		self.fields = Some(fields);
		self
	}

	/// Drop the named fields. Exclusion wins over selection.
	pub fn with_exclude(mut self, exclude: Vec<String>) -> Self {
		self.exclude = exclude;
		self
	}

	/// Whether a top-level field survives this selection.
	pub fn is_field_included(&self, name: &str) -> bool {
		if self.exclude.iter().any(|spec| spec == name) {
			return false;
		}
		match &self.fields {
			Some(fields) => fields
				.iter()
				.any(|spec| spec == name || spec.split('.').next() == Some(name)),
			None => true,
		}
	}

	/// Prune `value` in place according to this selection.
	pub fn apply(&self, value: &mut Value) {
		match value {
			Value::Array(items) => {
				for item in items {
					self.apply(item);
				}
			}
			Value::Object(object) => self.apply_object(object),
			_ => {}
		}
	}

	fn apply_object(&self, object: &mut Map<String, Value>) {
		let mut direct_fields: Option<HashSet<&str>> = None;
		let mut nested_fields: HashMap<&str, Vec<String>> = HashMap::new();
		if let Some(fields) = &self.fields {
			let mut direct = HashSet::new();
			for spec in fields {
				match spec.split_once('.') {
					Some((head, rest)) => {
						nested_fields.entry(head).or_default().push(rest.to_string());
					}
					None => {
						direct.insert(spec.as_str());
					}
				}
			}
			direct_fields = Some(direct);
		}

		let mut direct_exclude: HashSet<&str> = HashSet::new();
		let mut nested_exclude: HashMap<&str, Vec<String>> = HashMap::new();
		for spec in &self.exclude {
			match spec.split_once('.') {
				Some((head, rest)) => {
					nested_exclude.entry(head).or_default().push(rest.to_string());
				}
				None => {
					direct_exclude.insert(spec.as_str());
				}
			}
		}

		let keys: Vec<String> = object.keys().cloned().collect();
		for key in keys {
			let selected = match &direct_fields {
				Some(direct) => {
					direct.contains(key.as_str()) || nested_fields.contains_key(key.as_str())
				}
				None => true,
			};
			if !selected || direct_exclude.contains(key.as_str()) {
				object.remove(&key);
			}
		}

		for (key, subfields) in nested_fields {
			if let Some(child) = object.get_mut(key) {
				FieldSelection {
					fields: Some(subfields),
					exclude: nested_exclude.remove(key).unwrap_or_default(),
				}
				.apply(child);
			}
		}
		for (key, subexclude) in nested_exclude {
			if let Some(child) = object.get_mut(key) {
				FieldSelection {
					fields: None,
					exclude: subexclude,
				}
				.apply(child);
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	#[test]
	fn test_fields_keeps_only_named() {
		let mut value = json!({"id": 1, "title": "book", "secret": "x"});
		FieldSelection::new()
			.with_fields(vec!["id".into(), "title".into()])
			.apply(&mut value);
		assert_eq!(value, json!({"id": 1, "title": "book"}));
	}

	#[test]
	fn test_exclude_drops_named() {
		let mut value = json!({"id": 1, "title": "book", "secret": "x"});
		FieldSelection::new()
			.with_exclude(vec!["secret".into()])
			.apply(&mut value);
		assert_eq!(value, json!({"id": 1, "title": "book"}));
	}

	#[test]
	fn test_exclude_wins_over_fields() {
		let mut value = json!({"id": 1, "title": "book"});
		FieldSelection::new()
			.with_fields(vec!["id".into(), "title".into()])
			.with_exclude(vec!["title".into()])
			.apply(&mut value);
		assert_eq!(value, json!({"id": 1}));
	}

	#[test]
	fn test_dotted_fields_recurse() {
		let mut value = json!({
			"id": 1,
			"profile": {"birth_date": "2023-02-16", "bio": "hi"},
			"title": "x"
		});
		FieldSelection::new()
			.with_fields(vec!["id".into(), "profile.birth_date".into()])
			.apply(&mut value);
		assert_eq!(
			value,
			json!({"id": 1, "profile": {"birth_date": "2023-02-16"}})
		);
	}

	#[test]
	fn test_dotted_exclude_recurses_through_arrays() {
		let mut value = json!({
			"id": 1,
			"addresses": [
				{"id": 10, "city": "Natal", "state": "RN"},
				{"id": 11, "city": "Recife", "state": "PE"}
			]
		});
		FieldSelection::new()
			.with_exclude(vec!["addresses.state".into()])
			.apply(&mut value);
		assert_eq!(
			value,
			json!({
				"id": 1,
				"addresses": [
					{"id": 10, "city": "Natal"},
					{"id": 11, "city": "Recife"}
				]
			})
		);
	}

	#[test]
	fn test_dotted_fields_and_exclude_combine() {
		let mut value = json!({
			"id": 1,
			"profile": {"birth_date": "2023-02-16", "bio": "hi", "city": "Natal"}
		});
		FieldSelection::new()
			.with_fields(vec![
				"id".into(),
				"profile.birth_date".into(),
				"profile.bio".into(),
			])
			.with_exclude(vec!["profile.bio".into()])
			.apply(&mut value);
		assert_eq!(
			value,
			json!({"id": 1, "profile": {"birth_date": "2023-02-16"}})
		);
	}

	#[test]
	fn test_is_field_included() {
		let selection = FieldSelection::new()
			.with_fields(vec!["id".into(), "profile.birth_date".into()])
			.with_exclude(vec!["title".into()]);
		assert!(selection.is_field_included("id"));
		assert!(selection.is_field_included("profile"));
		assert!(!selection.is_field_included("title"));
		assert!(!selection.is_field_included("secret"));
	}
}
