//! Record persistence and transaction seam.
//!
//! The host framework owns the actual connection layer; this crate talks to
//! it through [`RecordStore`], a small capability trait covering the record
//! operations the save strategies need plus a begin/commit/rollback
//! transaction scope. Records travel as JSON objects keyed by column name.

use crate::error::{NestedError, StoreError};
use crate::schema::{FkOwner, RelationDef};
use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

/// Persistence capability the nested save pipeline runs against.
///
/// Implementations decide how tables, rows and transactions map onto the
/// backing store. `update` merges the supplied columns into the existing
/// row; it does not replace the row wholesale.
#[async_trait]
pub trait RecordStore: Send + Sync {
	/// Fetch one record by primary key, or `None` when it does not exist.
	async fn find(&self, table: &str, id: &Value) -> Result<Option<Value>, StoreError>;

	/// Insert a record, assigning its primary key. Returns the persisted
	/// record including the assigned key.
	async fn insert(&self, table: &str, data: Value) -> Result<Value, StoreError>;

	/// Merge the supplied columns into the record with this primary key.
	/// Returns the record as persisted.
	async fn update(&self, table: &str, id: &Value, data: Value) -> Result<Value, StoreError>;

	/// Delete one record by primary key.
	async fn delete(&self, table: &str, id: &Value) -> Result<(), StoreError>;

	/// All records in `table` whose `field` column equals `value`.
	async fn find_by(
		&self,
		table: &str,
		field: &str,
		value: &Value,
	) -> Result<Vec<Value>, StoreError>;

	/// Open a transaction scope on this store.
	async fn begin(&self) -> Result<(), StoreError>;

	/// Commit the current transaction scope.
	async fn commit(&self) -> Result<(), StoreError>;

	/// Roll the current transaction scope back, discarding every write
	/// made since [`begin`](RecordStore::begin).
	async fn rollback(&self) -> Result<(), StoreError>;
}

/// Execute a closure inside one all-or-nothing transaction.
///
/// Begins a scope, runs the closure, commits on `Ok` and rolls back on
/// `Err`. The rollback itself is best-effort: the original error is what
/// propagates.
pub async fn atomic<'a, T, F>(store: &'a dyn RecordStore, f: F) -> Result<T, NestedError>
where
	F: FnOnce(&'a dyn RecordStore) -> BoxFuture<'a, Result<T, NestedError>>,
{
	store.begin().await?;
	match f(store).await {
		Ok(value) => {
			store.commit().await?;
			Ok(value)
		}
		Err(err) => {
			if let Err(rollback_err) = store.rollback().await {
				tracing::error!(error = %rollback_err, "rollback failed");
			}
			Err(err)
		}
	}
}

/// Junction-table maintenance for many-to-many relations.
///
/// Junction rows are ordinary records with a synthetic `"id"` primary key
/// and one column per side, so everything here goes through the plain
/// [`RecordStore`] operations; a SQL-backed store may map them onto a bare
/// two-column junction table internally.
#[derive(Debug, Clone)]
pub struct ManyToManyManager {
	pub junction_table: String,
	pub source_fk: String,
	pub target_fk: String,
}

impl ManyToManyManager {
	pub fn new(
		junction_table: impl Into<String>,
		source_fk: impl Into<String>,
		target_fk: impl Into<String>,
	) -> Self {
		Self {
			junction_table: junction_table.into(),
			source_fk: source_fk.into(),
			target_fk: target_fk.into(),
		}
	}

	/// Build a manager from a declared junction relation, or `None` when
	/// the relation is not junction-owned.
	pub fn for_relation(relation: &RelationDef) -> Option<Self> {
		match &relation.owner {
			FkOwner::Junction {
				table,
				source_fk,
				target_fk,
			} => Some(Self::new(table.clone(), source_fk.clone(), target_fk.clone())),
			_ => None,
		}
	}

	/// Identifiers of every target currently linked to `source_id`.
	pub async fn linked_ids(
		&self,
		store: &dyn RecordStore,
		source_id: &Value,
	) -> Result<Vec<Value>, StoreError> {
		let rows = store
			.find_by(&self.junction_table, &self.source_fk, source_id)
			.await?;
		Ok(rows
			.iter()
			.filter_map(|row| row.get(&self.target_fk).cloned())
			.collect())
	}

	/// Create junction rows linking `source_id` to each target.
	pub async fn add_bulk(
		&self,
		store: &dyn RecordStore,
		source_id: &Value,
		target_ids: &[Value],
	) -> Result<(), StoreError> {
		for target_id in target_ids {
			let mut row = serde_json::Map::new();
			row.insert(self.source_fk.clone(), source_id.clone());
			row.insert(self.target_fk.clone(), target_id.clone());
			store.insert(&self.junction_table, Value::Object(row)).await?;
		}
		Ok(())
	}

	/// Delete every junction row for `source_id`.
	pub async fn clear(
		&self,
		store: &dyn RecordStore,
		source_id: &Value,
	) -> Result<(), StoreError> {
		let rows = store
			.find_by(&self.junction_table, &self.source_fk, source_id)
			.await?;
		for row in rows {
			if let Some(row_id) = row.get("id") {
				store.delete(&self.junction_table, row_id).await?;
			}
		}
		Ok(())
	}

	/// Replace the full relation set: every prior association is removed
	/// before the new targets are linked.
	pub async fn set(
		&self,
		store: &dyn RecordStore,
		source_id: &Value,
		target_ids: &[Value],
	) -> Result<(), StoreError> {
		tracing::debug!(
			junction = %self.junction_table,
			count = target_ids.len(),
			"replacing relation set"
		);
		self.clear(store, source_id).await?;
		self.add_bulk(store, source_id, target_ids).await
	}
}
