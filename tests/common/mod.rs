//! Shared test fixtures: a snapshot-transactional in-memory store and the
//! model schemas the integration tests run against.

use async_trait::async_trait;
use nested_serializers::error::StoreError;
use nested_serializers::schema::{FieldDef, FieldKind, ModelSchema, RelationDef};
use nested_serializers::store::RecordStore;
use parking_lot::Mutex;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;

type Tables = BTreeMap<String, BTreeMap<i64, Value>>;

#[derive(Default)]
struct StoreState {
	tables: Tables,
	next_id: i64,
	snapshots: Vec<(Tables, i64)>,
}

/// In-memory [`RecordStore`] with snapshot-based transaction scopes.
/// Nested scopes stack, mirroring savepoint semantics.
#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<StoreState>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Insert a row outside any transaction scope.
	pub fn seed(&self, table: &str, data: Value) -> Value {
		let mut state = self.state.lock();
		insert_row(&mut state, table, data)
	}

	pub fn count(&self, table: &str) -> usize {
		self.state
			.lock()
			.tables
			.get(table)
			.map(|rows| rows.len())
			.unwrap_or(0)
	}

	pub fn get(&self, table: &str, id: &Value) -> Option<Value> {
		let state = self.state.lock();
		let key = id.as_i64()?;
		state.tables.get(table).and_then(|rows| rows.get(&key)).cloned()
	}

	pub fn ids(&self, table: &str) -> Vec<i64> {
		self.state
			.lock()
			.tables
			.get(table)
			.map(|rows| rows.keys().copied().collect())
			.unwrap_or_default()
	}
}

fn insert_row(state: &mut StoreState, table: &str, data: Value) -> Value {
	state.next_id += 1;
	let id = state.next_id;
	let mut row = data.as_object().cloned().unwrap_or_default();
	row.insert("id".to_string(), json!(id));
	let row = Value::Object(row);
	state
		.tables
		.entry(table.to_string())
		.or_default()
		.insert(id, row.clone());
	row
}

#[async_trait]
impl RecordStore for MemoryStore {
	async fn find(&self, table: &str, id: &Value) -> Result<Option<Value>, StoreError> {
		let state = self.state.lock();
		let Some(key) = id.as_i64() else {
			return Ok(None);
		};
		Ok(state.tables.get(table).and_then(|rows| rows.get(&key)).cloned())
	}

	async fn insert(&self, table: &str, data: Value) -> Result<Value, StoreError> {
		let mut state = self.state.lock();
		Ok(insert_row(&mut state, table, data))
	}

	async fn update(&self, table: &str, id: &Value, data: Value) -> Result<Value, StoreError> {
		let mut state = self.state.lock();
		let key = id
			.as_i64()
			.ok_or_else(|| StoreError::Backend(format!("non-integer id {}", id)))?;
		let row = state
			.tables
			.get_mut(table)
			.and_then(|rows| rows.get_mut(&key))
			.ok_or_else(|| StoreError::Backend(format!("no '{}' row with id {}", table, key)))?;
		if let (Some(row), Some(data)) = (row.as_object_mut(), data.as_object()) {
			for (column, value) in data {
				row.insert(column.clone(), value.clone());
			}
		}
		Ok(row.clone())
	}

	async fn delete(&self, table: &str, id: &Value) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		if let Some(key) = id.as_i64() {
			if let Some(rows) = state.tables.get_mut(table) {
				rows.remove(&key);
			}
		}
		Ok(())
	}

	async fn find_by(
		&self,
		table: &str,
		field: &str,
		value: &Value,
	) -> Result<Vec<Value>, StoreError> {
		let state = self.state.lock();
		Ok(state
			.tables
			.get(table)
			.map(|rows| {
				rows.values()
					.filter(|row| row.get(field) == Some(value))
					.cloned()
					.collect()
			})
			.unwrap_or_default())
	}

	async fn begin(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		let snapshot = (state.tables.clone(), state.next_id);
		state.snapshots.push(snapshot);
		Ok(())
	}

	async fn commit(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
		Ok(())
	}

	async fn rollback(&self) -> Result<(), StoreError> {
		let mut state = self.state.lock();
		let (tables, next_id) = state.snapshots.pop().ok_or(StoreError::NoTransaction)?;
		state.tables = tables;
		state.next_id = next_id;
		Ok(())
	}
}

pub fn id_of(record: &Value) -> Value {
	record["id"].clone()
}

pub fn profile_schema() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("profiles")
			.field(FieldDef::new("birth_date", FieldKind::Date).required())
			.relation(RelationDef::reverse_foreign_key("addresses", "addresses", "profile_id"))
			.relation(RelationDef::reverse_one_to_one("author", "authors", "profile_id")),
	)
}

pub fn address_schema() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("addresses")
			.field(FieldDef::new("city", FieldKind::Text).required())
			.field(FieldDef::new("state", FieldKind::Text).required())
			.field(FieldDef::new("street", FieldKind::Text).required())
			.field(FieldDef::new("number", FieldKind::Text).required())
			.field(FieldDef::new("neighborhood", FieldKind::Text).required())
			.relation(RelationDef::foreign_key("profile", "profiles", "profile_id")),
	)
}

pub fn author_schema() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("authors")
			.field(FieldDef::new("name", FieldKind::Text).required())
			.relation(RelationDef::one_to_one("profile", "profiles", "profile_id")),
	)
}

pub fn category_schema() -> Arc<ModelSchema> {
	Arc::new(ModelSchema::new("categories").field(FieldDef::new("name", FieldKind::Text).required()))
}

pub fn book_schema() -> Arc<ModelSchema> {
	Arc::new(
		ModelSchema::new("books")
			.field(FieldDef::new("title", FieldKind::Text).required())
			.relation(RelationDef::foreign_key("category", "categories", "category_id"))
			.relation(RelationDef::many_to_many(
				"authors",
				"authors",
				"book_authors",
				"book_id",
				"author_id",
			)),
	)
}

/// Build an address payload with every required column set.
pub fn address_payload(suffix: &str) -> Value {
	json!({
		"city": format!("city{}", suffix),
		"state": format!("state{}", suffix),
		"street": format!("street{}", suffix),
		"number": format!("number{}", suffix),
		"neighborhood": format!("neighborhood{}", suffix),
	})
}
