//! Save orchestration.
//!
//! The two pipelines here are the explicit rendition of "wrap the
//! serializer's save": each takes the validated parent data, carves the
//! designated nested fields out of it, and runs pre-save strategies, the
//! parent save, post-save strategies and the optional hook between one
//! begin/commit pair. Any failure rolls the whole scope back; no partial
//! state survives.

use super::strategies::{
	foreign_key_pre_save, one_to_one_pre_save, reverse_foreign_key_post_save,
	reverse_one_to_one_post_save,
};
use super::{RelationshipKind, classify};
use crate::error::{NestedError, StoreError};
use crate::schema::{ModelSchema, RelationDef};
use crate::serializer::{ChildSerializer, ModelPersist, NativePersist, RecordSerializer, SaveHook};
use crate::store::{ManyToManyManager, RecordStore};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;

struct FieldSpec<'a> {
	kind: RelationshipKind,
	relation: &'a RelationDef,
	child: &'a dyn ChildSerializer,
	payload: Value,
}

/// Orchestrates a parent save together with writable nested children.
///
/// Designated fields are consumed from the *raw* input payload rather than
/// the validated parent data: nested validation is deferred to the
/// per-relationship strategy, which runs each child through its own
/// serializer. Many-to-many fields are not writable through this pipeline;
/// route them through [`ChoiceSave`].
pub struct NestedSave {
	schema: Arc<ModelSchema>,
	serializer: RecordSerializer,
	fields: Vec<String>,
	children: HashMap<String, Arc<dyn ChildSerializer>>,
	persist: Arc<dyn NativePersist>,
	hook: Option<Arc<dyn SaveHook>>,
}

impl NestedSave {
	pub fn new(schema: Arc<ModelSchema>) -> Self {
		let persist = Arc::new(ModelPersist::new(schema.clone()));
		let serializer = RecordSerializer::new(schema.clone());
		Self {
			schema,
			serializer,
			fields: Vec::new(),
			children: HashMap::new(),
			persist,
			hook: None,
		}
	}

	/// Designate a nested field, supplying the serializer for its child
	/// records. A [`NestedSave`] works here too, for children that carry
	/// nested fields of their own.
	pub fn nested_field(
		mut self,
		name: impl Into<String>,
		child: impl ChildSerializer + 'static,
	) -> Self {
		let name = name.into();
		self.children.insert(name.clone(), Arc::new(child));
		self.fields.push(name);
		self
	}

	/// Replace the native persist capability (default: insert-or-update
	/// on the parent's own table).
	pub fn with_persist(mut self, persist: Arc<dyn NativePersist>) -> Self {
		self.persist = persist;
		self
	}

	/// Attach the optional post-save hook.
	pub fn with_hook(mut self, hook: Arc<dyn SaveHook>) -> Self {
		self.hook = Some(hook);
		self
	}

	/// Run the full nested save inside one atomic transaction.
	///
	/// `instance` is the existing parent for an update, `None` for a
	/// create. `validated_data` is the parent's validated payload;
	/// `initial_data` is the raw input the nested payloads are read from.
	pub async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<Value>,
		mut validated_data: Map<String, Value>,
		initial_data: &Map<String, Value>,
	) -> Result<Value, NestedError> {
		let mut pre_specs = Vec::new();
		let mut post_specs = Vec::new();
		for name in &self.fields {
			if validated_data.remove(name).is_none() {
				continue;
			}
			let kind = classify(&self.schema, name)?;
			let relation = self.relation(name)?;
			let child = self
				.children
				.get(name)
				.map(Arc::as_ref)
				.ok_or_else(|| {
					NestedError::validation(name, "no child serializer registered for this field")
				})?;
			let payload = initial_data.get(name).cloned().unwrap_or(Value::Null);
			let spec = FieldSpec {
				kind,
				relation,
				child,
				payload,
			};
			if kind.is_pre_save() {
				pre_specs.push(spec);
			} else if kind.is_post_save() {
				post_specs.push(spec);
			} else {
				return Err(NestedError::UnhandledKind {
					kind: kind.as_str(),
				});
			}
		}

		tracing::debug!(
			table = %self.schema.table,
			pre = pre_specs.len(),
			post = post_specs.len(),
			"starting nested save"
		);

		store.begin().await?;
		match self
			.run(store, instance, validated_data, &pre_specs, &post_specs)
			.await
		{
			Ok(parent) => {
				store.commit().await?;
				Ok(parent)
			}
			Err(err) => {
				if let Err(rollback_err) = store.rollback().await {
					tracing::error!(error = %rollback_err, "rollback failed");
				}
				Err(err)
			}
		}
	}

	async fn run(
		&self,
		store: &dyn RecordStore,
		instance: Option<Value>,
		mut data: Map<String, Value>,
		pre_specs: &[FieldSpec<'_>],
		post_specs: &[FieldSpec<'_>],
	) -> Result<Value, NestedError> {
		let created = instance.is_none();

		for spec in pre_specs {
			let payload = (!spec.payload.is_null()).then_some(&spec.payload);
			let child_instance = match spec.kind {
				RelationshipKind::ForeignKey => {
					foreign_key_pre_save(store, spec.child, spec.relation, instance.as_ref(), payload)
						.await?
				}
				RelationshipKind::OneToOne => {
					one_to_one_pre_save(store, spec.child, spec.relation, instance.as_ref(), payload)
						.await?
				}
				kind => {
					return Err(NestedError::UnhandledKind {
						kind: kind.as_str(),
					});
				}
			};
			let fk_value = child_instance
				.as_ref()
				.and_then(|child| child.get(&spec.relation.related_pk_field))
				.cloned()
				.unwrap_or(Value::Null);
			data.insert(spec.relation.fk_field.clone(), fk_value);
		}

		let parent = self.persist.persist(store, instance.as_ref(), data).await?;
		let parent_id = parent
			.get(&self.schema.pk_field)
			.filter(|id| !id.is_null())
			.cloned()
			.ok_or_else(|| {
				StoreError::Backend("persist returned a record without a primary key".into())
			})?;

		for spec in post_specs {
			match spec.kind {
				RelationshipKind::ReverseOneToOne => {
					let payload = (!spec.payload.is_null()).then_some(&spec.payload);
					reverse_one_to_one_post_save(store, spec.child, spec.relation, &parent_id, payload)
						.await?;
				}
				RelationshipKind::ReverseForeignKey => {
					reverse_foreign_key_post_save(
						store,
						spec.child,
						spec.relation,
						&parent_id,
						&spec.payload,
					)
					.await?;
				}
				kind => {
					return Err(NestedError::UnhandledKind {
						kind: kind.as_str(),
					});
				}
			}
		}

		// Related writes may leave the in-memory parent stale; re-read it
		// before anyone else sees it.
		let mut parent = if post_specs.is_empty() {
			parent
		} else {
			store
				.find(&self.schema.table, &parent_id)
				.await?
				.unwrap_or(parent)
		};

		if let Some(hook) = &self.hook {
			parent = hook.after_save(store, parent, created).await?;
		}

		Ok(parent)
	}

	fn relation(&self, name: &str) -> Result<&RelationDef, NestedError> {
		self.schema
			.get_relation(name)
			.ok_or_else(|| NestedError::UnsupportedRelationship {
				table: self.schema.table.clone(),
				field: name.to_string(),
			})
	}
}

/// A nested pipeline can itself serve as the child of another nested
/// field: validation goes through the parent schema, and saving runs the
/// full pipeline in a nested transaction scope.
#[async_trait]
impl ChildSerializer for NestedSave {
	fn validate(
		&self,
		data: &Value,
		instance: Option<&Value>,
	) -> Result<Map<String, Value>, NestedError> {
		self.serializer.validate(data, instance)
	}

	async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<&Value>,
		mut validated: Map<String, Value>,
		extra: &Map<String, Value>,
	) -> Result<Value, NestedError> {
		for (key, value) in extra {
			validated.insert(key.clone(), value.clone());
		}
		// Relation payloads pass through validation untouched, so the
		// validated map doubles as the raw input for the inner pipeline.
		let initial = validated.clone();
		NestedSave::save(self, store, instance.cloned(), validated, &initial).await
	}
}

/// Orchestrates a parent save with attach-only choice relations.
///
/// Designated fields must already hold *resolved* related instances in the
/// validated data (the work of
/// [`RelationChoiceField`](crate::fields::RelationChoiceField)). Single
/// references become the parent's foreign key column; many-to-many
/// references replace the full junction set after the parent persists. The
/// referenced records themselves are never written.
pub struct ChoiceSave {
	schema: Arc<ModelSchema>,
	fields: Vec<String>,
	persist: Arc<dyn NativePersist>,
}

impl ChoiceSave {
	pub fn new(schema: Arc<ModelSchema>) -> Self {
		let persist = Arc::new(ModelPersist::new(schema.clone()));
		Self {
			schema,
			fields: Vec::new(),
			persist,
		}
	}

	/// Designate a choice-relation field.
	pub fn choice_field(mut self, name: impl Into<String>) -> Self {
		self.fields.push(name.into());
		self
	}

	/// Replace the native persist capability.
	pub fn with_persist(mut self, persist: Arc<dyn NativePersist>) -> Self {
		self.persist = persist;
		self
	}

	/// Persist the parent and its choice relations inside one atomic
	/// transaction.
	pub async fn save(
		&self,
		store: &dyn RecordStore,
		instance: Option<Value>,
		mut validated_data: Map<String, Value>,
	) -> Result<Value, NestedError> {
		let mut junction_sets: Vec<(&RelationDef, Vec<Value>)> = Vec::new();
		for name in &self.fields {
			let Some(resolved) = validated_data.remove(name) else {
				continue;
			};
			let kind = classify(&self.schema, name)?;
			let relation = self.schema.get_relation(name).ok_or_else(|| {
				NestedError::UnsupportedRelationship {
					table: self.schema.table.clone(),
					field: name.clone(),
				}
			})?;
			match kind {
				RelationshipKind::ForeignKey | RelationshipKind::OneToOne => {
					let fk_value = match &resolved {
						Value::Null => Value::Null,
						reference => reference
							.get(&relation.related_pk_field)
							.cloned()
							.ok_or_else(|| {
								NestedError::validation(
									name,
									"resolved reference is missing its primary key",
								)
							})?,
					};
					validated_data.insert(relation.fk_field.clone(), fk_value);
				}
				RelationshipKind::ManyToMany => {
					let items = resolved.as_array().ok_or_else(|| {
						NestedError::validation(name, "expected a list of resolved references")
					})?;
					let ids = items
						.iter()
						.map(|reference| {
							reference
								.get(&relation.related_pk_field)
								.cloned()
								.ok_or_else(|| {
									NestedError::validation(
										name,
										"resolved reference is missing its primary key",
									)
								})
						})
						.collect::<Result<Vec<_>, _>>()?;
					junction_sets.push((relation, ids));
				}
				kind => {
					return Err(NestedError::UnhandledKind {
						kind: kind.as_str(),
					});
				}
			}
		}

		store.begin().await?;
		match self.run(store, instance, validated_data, &junction_sets).await {
			Ok(parent) => {
				store.commit().await?;
				Ok(parent)
			}
			Err(err) => {
				if let Err(rollback_err) = store.rollback().await {
					tracing::error!(error = %rollback_err, "rollback failed");
				}
				Err(err)
			}
		}
	}

	async fn run(
		&self,
		store: &dyn RecordStore,
		instance: Option<Value>,
		data: Map<String, Value>,
		junction_sets: &[(&RelationDef, Vec<Value>)],
	) -> Result<Value, NestedError> {
		let parent = self.persist.persist(store, instance.as_ref(), data).await?;

		if !junction_sets.is_empty() {
			let parent_id = parent
				.get(&self.schema.pk_field)
				.filter(|id| !id.is_null())
				.cloned()
				.ok_or_else(|| {
					StoreError::Backend("persist returned a record without a primary key".into())
				})?;
			for (relation, target_ids) in junction_sets {
				let manager = ManyToManyManager::for_relation(relation).ok_or_else(|| {
					NestedError::UnsupportedRelationship {
						table: self.schema.table.clone(),
						field: relation.field_name.clone(),
					}
				})?;
				manager.set(store, &parent_id, target_ids).await?;
			}
		}

		Ok(parent)
	}
}
