//! Per-kind save strategies.
//!
//! Pre-save strategies handle relations whose foreign key column lives on
//! the parent row: the child must exist (or be gone) before the parent row
//! is written, and the strategy's return value becomes the parent's column
//! value. Post-save strategies handle the reverse relations, which can only
//! be written once the parent's primary key exists.

use crate::error::NestedError;
use crate::schema::RelationDef;
use crate::serializer::ChildSerializer;
use crate::store::RecordStore;
use serde_json::{Map, Value};

/// The child currently referenced by the parent's foreign key column, if
/// any.
async fn current_child(
	store: &dyn RecordStore,
	relation: &RelationDef,
	parent_instance: Option<&Value>,
) -> Result<Option<Value>, NestedError> {
	let child_id = parent_instance
		.and_then(|parent| parent.get(&relation.fk_field))
		.filter(|id| !id.is_null());
	match child_id {
		Some(id) => Ok(store.find(&relation.related_table, id).await?),
		None => Ok(None),
	}
}

/// Pre-save for a plain foreign key: upsert the child when a payload is
/// present; on a null payload the relation is merely detached and the
/// child record is left intact, since other rows may reference it.
pub async fn foreign_key_pre_save(
	store: &dyn RecordStore,
	child: &dyn ChildSerializer,
	relation: &RelationDef,
	parent_instance: Option<&Value>,
	payload: Option<&Value>,
) -> Result<Option<Value>, NestedError> {
	let existing = current_child(store, relation, parent_instance).await?;
	match payload {
		Some(data) => {
			let validated = child.validate(data, existing.as_ref())?;
			let saved = child.save(store, existing.as_ref(), validated, &Map::new()).await?;
			Ok(Some(saved))
		}
		None => {
			tracing::debug!(field = %relation.field_name, "detaching foreign key child");
			Ok(None)
		}
	}
}

/// Pre-save for an exclusive one-to-one: like the foreign key strategy,
/// except a null payload deletes the existing child outright: the parent
/// is the only holder of the relation.
pub async fn one_to_one_pre_save(
	store: &dyn RecordStore,
	child: &dyn ChildSerializer,
	relation: &RelationDef,
	parent_instance: Option<&Value>,
	payload: Option<&Value>,
) -> Result<Option<Value>, NestedError> {
	let existing = current_child(store, relation, parent_instance).await?;
	match payload {
		Some(data) => {
			let validated = child.validate(data, existing.as_ref())?;
			let saved = child.save(store, existing.as_ref(), validated, &Map::new()).await?;
			Ok(Some(saved))
		}
		None => {
			if let Some(existing) = existing {
				if let Some(id) = existing.get(&relation.related_pk_field) {
					tracing::debug!(field = %relation.field_name, "deleting one-to-one child");
					store.delete(&relation.related_table, id).await?;
				}
			}
			Ok(None)
		}
	}
}

/// Post-save for a reverse one-to-one: upsert the single child with its
/// foreign key column forced to the parent, creating it when none is
/// attached. A null payload deletes the existing child, mirroring the
/// exclusive-ownership rule of the owning side.
pub async fn reverse_one_to_one_post_save(
	store: &dyn RecordStore,
	child: &dyn ChildSerializer,
	relation: &RelationDef,
	parent_id: &Value,
	payload: Option<&Value>,
) -> Result<(), NestedError> {
	let existing = store
		.find_by(&relation.related_table, &relation.fk_field, parent_id)
		.await?
		.into_iter()
		.next();

	match payload {
		Some(data) => {
			let validated = child.validate(data, existing.as_ref())?;
			let mut extra = Map::new();
			extra.insert(relation.fk_field.clone(), parent_id.clone());
			child.save(store, existing.as_ref(), validated, &extra).await?;
		}
		None => {
			if let Some(existing) = existing {
				if let Some(id) = existing.get(&relation.related_pk_field) {
					tracing::debug!(field = %relation.field_name, "deleting reverse one-to-one child");
					store.delete(&relation.related_table, id).await?;
				}
			}
		}
	}
	Ok(())
}

/// Post-save for a reverse foreign key: the relation is plural, so the
/// incoming list is reconciled against the parent's existing children.
pub async fn reverse_foreign_key_post_save(
	store: &dyn RecordStore,
	child: &dyn ChildSerializer,
	relation: &RelationDef,
	parent_id: &Value,
	payload: &Value,
) -> Result<(), NestedError> {
	let items = payload.as_array().ok_or_else(|| {
		NestedError::validation(&relation.field_name, "expected a list of child payloads")
	})?;
	super::reconcile::reconcile_children(store, child, relation, parent_id, items).await?;
	Ok(())
}
