//! Nested-list reconciliation.
//!
//! Makes a parent's stored child collection match an incoming payload list
//! exactly: matching identifiers are updated, identifier-less payloads are
//! created, and existing children missing from the list are deleted.

use crate::error::NestedError;
use crate::schema::RelationDef;
use crate::serializer::ChildSerializer;
use crate::store::RecordStore;
use indexmap::IndexMap;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Reconcile the parent's existing children (rows whose `fk_field` equals
/// `parent_id`) with the incoming payload list. Returns the children as
/// persisted, in payload order.
///
/// Every payload is keyed by its own identifier when present, else by a
/// fresh temporary key, so several new children in one request are each
/// visited exactly once. Create and update flow through one code path with
/// the parent's foreign key forced onto the child. Omission means
/// deletion: afterwards the set of persisted children equals exactly the
/// set described by the payload list.
pub async fn reconcile_children(
	store: &dyn RecordStore,
	child: &dyn ChildSerializer,
	relation: &RelationDef,
	parent_id: &Value,
	payloads: &[Value],
) -> Result<Vec<Value>, NestedError> {
	let existing = store
		.find_by(&relation.related_table, &relation.fk_field, parent_id)
		.await?;

	let mut existing_by_id: IndexMap<String, Value> = IndexMap::new();
	for record in existing {
		if let Some(id) = record.get(&relation.related_pk_field) {
			existing_by_id.insert(id.to_string(), record);
		}
	}

	let mut incoming: IndexMap<String, Value> = IndexMap::new();
	for payload in payloads {
		let key = payload
			.get(&relation.related_pk_field)
			.filter(|id| !id.is_null())
			.map(|id| id.to_string())
			.unwrap_or_else(|| format!("new-{}", Uuid::new_v4().simple()));
		incoming.insert(key, payload.clone());
	}

	tracing::debug!(
		table = %relation.related_table,
		existing = existing_by_id.len(),
		incoming = incoming.len(),
		"reconciling nested list"
	);

	let mut saved = Vec::with_capacity(incoming.len());
	for (key, data) in &incoming {
		let current = existing_by_id.get(key);
		let validated = child.validate(data, current)?;
		let mut extra = Map::new();
		extra.insert(relation.fk_field.clone(), parent_id.clone());
		saved.push(child.save(store, current, validated, &extra).await?);
	}

	for (key, record) in &existing_by_id {
		if !incoming.contains_key(key) {
			if let Some(id) = record.get(&relation.related_pk_field) {
				store.delete(&relation.related_table, id).await?;
			}
		}
	}

	Ok(saved)
}
