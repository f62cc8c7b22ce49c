//! Schema-driven record serializer and the save capability traits.

use crate::error::NestedError;
use crate::schema::ModelSchema;
use crate::store::RecordStore;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Validates payloads against one declared schema and persists records
/// through a [`RecordStore`].
///
/// Validation is pure: every call re-checks the payload from scratch, so a
/// serializer can be reused across strategies without carrying state
/// between saves.
#[derive(Debug, Clone)]
pub struct RecordSerializer {
	schema: Arc<ModelSchema>,
}

impl RecordSerializer {
	pub fn new(schema: Arc<ModelSchema>) -> Self {
		Self { schema }
	}

	pub fn schema(&self) -> &ModelSchema {
		&self.schema
	}

	/// Validate a write payload against the declared columns.
	///
	/// The primary key and read-only columns are accepted but dropped from
	/// the output (callers address records by key separately). Declared
	/// relation fields pass through untouched; the save pipeline carves
	/// them out before anything reaches the store. Unknown keys fail.
	/// Required columns are enforced only on create (`instance` is
	/// `None`); updates are partial.
	pub fn validate(
		&self,
		data: &Value,
		instance: Option<&Value>,
	) -> Result<Map<String, Value>, NestedError> {
		let object = data.as_object().ok_or_else(|| {
			NestedError::validation(&self.schema.table, "expected a JSON object payload")
		})?;

		let mut validated = Map::new();
		for (key, value) in object {
			if *key == self.schema.pk_field {
				continue;
			}
			if self.schema.get_relation(key).is_some() {
				validated.insert(key.clone(), value.clone());
				continue;
			}
			match self.schema.get_field(key) {
				Some(field) if field.read_only => {}
				Some(field) => {
					field.check(value)?;
					validated.insert(key.clone(), value.clone());
				}
				None => {
					return Err(NestedError::validation(
						key,
						format!("unknown field for '{}'", self.schema.table),
					));
				}
			}
		}

		if instance.is_none() {
			for field in &self.schema.fields {
				if field.required && !validated.contains_key(&field.name) {
					return Err(NestedError::validation(&field.name, "this field is required"));
				}
			}
		}

		Ok(validated)
	}

	/// Project a persisted record into its representation: the primary key
	/// plus every declared column.
	pub fn to_representation(&self, instance: &Value) -> Value {
		let mut out = Map::new();
		if let Some(pk) = instance.get(&self.schema.pk_field) {
			out.insert(self.schema.pk_field.clone(), pk.clone());
		}
		for field in &self.schema.fields {
			let value = instance.get(&field.name).cloned().unwrap_or(Value::Null);
			out.insert(field.name.clone(), value);
		}
		Value::Object(out)
	}

	/// Persist one record: update when `instance` is set, insert
	/// otherwise. Columns in `extra` (a forced parent foreign key, for
	/// instance) override the validated payload.
	pub async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		mut validated: Map<String, Value>,
		extra: &Map<String, Value>,
	) -> Result<Value, NestedError> {
		for (key, value) in extra {
			validated.insert(key.clone(), value.clone());
		}

		let existing_id = instance
			.and_then(|i| i.get(&self.schema.pk_field))
			.filter(|id| !id.is_null())
			.cloned();

		let saved = match existing_id {
			Some(id) => {
				tracing::debug!(table = %self.schema.table, id = %id, "updating record");
				store
					.update(&self.schema.table, &id, Value::Object(validated))
					.await?
			}
			None => {
				tracing::debug!(table = %self.schema.table, "inserting record");
				store.insert(&self.schema.table, Value::Object(validated)).await?
			}
		};
		Ok(saved)
	}
}

/// The validate/save surface a nested field's child records are driven
/// through.
///
/// [`RecordSerializer`] is the plain implementation; a
/// [`NestedSave`](crate::nesting::NestedSave) pipeline implements it too,
/// so a child may carry writable nested fields of its own.
#[async_trait]
pub trait ChildSerializer: Send + Sync {
	/// Validate one child payload against the child's own schema.
	fn validate(
		&self,
		data: &Value,
		instance: Option<&Value>,
	) -> Result<Map<String, Value>, NestedError>;

	/// Persist one child record, updating `instance` when present.
	/// Columns in `extra` (typically the parent's foreign key) override
	/// the validated payload.
	async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		validated: Map<String, Value>,
		extra: &Map<String, Value>,
	) -> Result<Value, NestedError>;
}

#[async_trait]
impl ChildSerializer for RecordSerializer {
	fn validate(
		&self,
		data: &Value,
		instance: Option<&Value>,
	) -> Result<Map<String, Value>, NestedError> {
		RecordSerializer::validate(self, data, instance)
	}

	async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		validated: Map<String, Value>,
		extra: &Map<String, Value>,
	) -> Result<Value, NestedError> {
		RecordSerializer::save(self, store, instance, validated, extra).await
	}
}

/// The native persist capability: the one operation the save pipeline
/// wraps instead of monkey-patching a serializer's save method.
#[async_trait]
pub trait NativePersist: Send + Sync {
	/// Write the parent's own row and return it as persisted.
	async fn persist(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		data: Map<String, Value>,
	) -> Result<Value, NestedError>;
}

/// Default native persist: insert-or-update by the instance's primary key.
pub struct ModelPersist {
	schema: Arc<ModelSchema>,
}

impl ModelPersist {
	pub fn new(schema: Arc<ModelSchema>) -> Self {
		Self { schema }
	}
}

#[async_trait]
impl NativePersist for ModelPersist {
	async fn persist(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		data: Map<String, Value>,
	) -> Result<Value, NestedError> {
		let existing_id = instance
			.and_then(|i| i.get(&self.schema.pk_field))
			.filter(|id| !id.is_null())
			.cloned();
		let saved = match existing_id {
			Some(id) => store.update(&self.schema.table, &id, Value::Object(data)).await?,
			None => store.insert(&self.schema.table, Value::Object(data)).await?,
		};
		Ok(saved)
	}
}

/// Optional post-save capability. When the parent save spec carries one,
/// the pipeline invokes it with the persisted parent after every nested
/// write has landed, and its return value becomes the final result.
#[async_trait]
pub trait SaveHook: Send + Sync {
	async fn after_save(
		&self,
		store: &dyn RecordStore,
		instance: Value,
		created: bool,
	) -> Result<Value, NestedError>;
}
