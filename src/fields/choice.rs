//! Choice-relation field: a reference to an existing related record that a
//! caller may attach or detach but never create or modify.

use crate::error::NestedError;
use crate::serializer::RecordSerializer;
use crate::store::RecordStore;
use serde_json::Value;

/// Serializes a full nested representation of the referenced record on
/// read; on write resolves only an existing-record reference, by
/// identifier lookup. No field of the referenced record is ever written
/// through this type.
#[derive(Debug, Clone)]
pub struct RelationChoiceField {
	serializer: RecordSerializer,
	allow_null: bool,
}

impl RelationChoiceField {
	/// `serializer` is the representation schema of the related table.
	pub fn new(serializer: RecordSerializer) -> Self {
		Self {
			serializer,
			allow_null: false,
		}
	}

	/// Accept a null payload on write (meaning: detach the relation).
	pub fn allow_null(mut self) -> Self {
		self.allow_null = true;
		self
	}

	fn pk_field(&self) -> &str {
		&self.serializer.schema().pk_field
	}

	fn table(&self) -> &str {
		&self.serializer.schema().table
	}

	/// Full nested representation of one reference. The reference may be a
	/// loaded instance or a bare identifier; identifiers are looked up.
	pub async fn to_representation(
		&self,
		store: &dyn RecordStore,
		reference: &Value,
	) -> Result<Value, NestedError> {
		if reference.is_null() {
			return Ok(Value::Null);
		}
		let instance = match reference {
			Value::Object(_) => reference.clone(),
			id => store
				.find(self.table(), id)
				.await?
				.ok_or_else(|| NestedError::not_found(self.table(), id))?,
		};
		Ok(self.serializer.to_representation(&instance))
	}

	/// Representation of a collection of references.
	pub async fn to_representation_many(
		&self,
		store: &dyn RecordStore,
		references: &[Value],
	) -> Result<Value, NestedError> {
		let mut out = Vec::with_capacity(references.len());
		for reference in references {
			out.push(self.to_representation(store, reference).await?);
		}
		Ok(Value::Array(out))
	}

	/// Resolve one write payload, either a full nested object or a primitive
	/// identifier, to the existing record it references.
	pub async fn to_internal_value(
		&self,
		store: &dyn RecordStore,
		data: &Value,
	) -> Result<Value, NestedError> {
		if data.is_null() {
			return if self.allow_null {
				Ok(Value::Null)
			} else {
				Err(NestedError::validation(self.table(), "this field may not be null"))
			};
		}
		let id = match data {
			Value::Object(object) => object.get(self.pk_field()).cloned().ok_or_else(|| {
				NestedError::validation(
					self.table(),
					format!("reference payload is missing '{}'", self.pk_field()),
				)
			})?,
			primitive => primitive.clone(),
		};
		store
			.find(self.table(), &id)
			.await?
			.ok_or_else(|| NestedError::not_found(self.table(), &id))
	}

	/// Resolve a list of write payloads element-wise.
	pub async fn to_internal_value_many(
		&self,
		store: &dyn RecordStore,
		data: &Value,
	) -> Result<Value, NestedError> {
		let items = data.as_array().ok_or_else(|| {
			NestedError::validation(self.table(), "expected a list of references")
		})?;
		let mut resolved = Vec::with_capacity(items.len());
		for item in items {
			resolved.push(self.to_internal_value(store, item).await?);
		}
		Ok(Value::Array(resolved))
	}
}
