//! Declared model schemas.
//!
//! The host framework knows its models through runtime introspection; this
//! crate asks for the same facts as a table declared once at startup: the
//! plain columns a record carries plus the physical shape of every relation
//! reachable from it (which side owns the foreign key column, and whether
//! the relation is singular). Relationship classification reads nothing
//! else.

use crate::error::NestedError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Primitive kinds a declared column can validate against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
	Integer,
	Float,
	Text,
	Bool,
	/// ISO-8601 calendar date, e.g. `"2023-02-16"`.
	Date,
	/// Any JSON value; no type check beyond presence.
	Json,
}

/// One plain column on a model.
#[derive(Debug, Clone)]
pub struct FieldDef {
	pub name: String,
	pub kind: FieldKind,
	pub required: bool,
	pub read_only: bool,
}

impl FieldDef {
	pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
		Self {
			name: name.into(),
			kind,
			required: false,
			read_only: false,
		}
	}

	/// Mark the column as required on create.
	pub fn required(mut self) -> Self {
		self.required = true;
		self
	}

	/// Mark the column as read-only; write payloads silently drop it.
	pub fn read_only(mut self) -> Self {
		self.read_only = true;
		self
	}

	/// Check one payload value against the declared kind. Null always
	/// passes; absence is handled by the required-field pass.
	pub fn check(&self, value: &Value) -> Result<(), NestedError> {
		if value.is_null() {
			return Ok(());
		}
		let ok = match self.kind {
			FieldKind::Integer => value.as_i64().is_some(),
			FieldKind::Float => value.as_f64().is_some(),
			FieldKind::Text => value.is_string(),
			FieldKind::Bool => value.is_boolean(),
			FieldKind::Date => value
				.as_str()
				.map(|s| chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok())
				.unwrap_or(false),
			FieldKind::Json => true,
		};
		if ok {
			Ok(())
		} else {
			Err(NestedError::validation(
				&self.name,
				format!("expected a {:?} value", self.kind),
			))
		}
	}
}

/// Which side of a relation physically owns the foreign key column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FkOwner {
	/// The parent row stores the column (foreign key / one-to-one).
	Parent,
	/// The child row stores the column pointing back at the parent.
	Child,
	/// A junction table stores one column for each side.
	Junction {
		table: String,
		source_fk: String,
		target_fk: String,
	},
}

/// Physical declaration of one relation reachable from a parent model.
///
/// The classifier derives the relationship kind from `owner` and
/// `singular` alone; everything else here tells the strategies where the
/// involved columns live.
#[derive(Debug, Clone)]
pub struct RelationDef {
	/// Serializer field name that carries the nested data.
	pub field_name: String,
	pub related_table: String,
	pub owner: FkOwner,
	/// Foreign key column name on the owning side. Unused for junction
	/// relations, whose columns are named in [`FkOwner::Junction`].
	pub fk_field: String,
	pub singular: bool,
	/// Primary key column of the related table.
	pub related_pk_field: String,
}

impl RelationDef {
	/// A foreign key column on the parent row.
	pub fn foreign_key(
		field_name: impl Into<String>,
		related_table: impl Into<String>,
		fk_field: impl Into<String>,
	) -> Self {
		Self {
			field_name: field_name.into(),
			related_table: related_table.into(),
			owner: FkOwner::Parent,
			fk_field: fk_field.into(),
			singular: false,
			related_pk_field: "id".into(),
		}
	}

	/// A unique foreign key column on the parent row.
	pub fn one_to_one(
		field_name: impl Into<String>,
		related_table: impl Into<String>,
		fk_field: impl Into<String>,
	) -> Self {
		Self {
			singular: true,
			..Self::foreign_key(field_name, related_table, fk_field)
		}
	}

	/// A plural reverse relation: the child rows store `fk_field`.
	pub fn reverse_foreign_key(
		field_name: impl Into<String>,
		related_table: impl Into<String>,
		fk_field: impl Into<String>,
	) -> Self {
		Self {
			field_name: field_name.into(),
			related_table: related_table.into(),
			owner: FkOwner::Child,
			fk_field: fk_field.into(),
			singular: false,
			related_pk_field: "id".into(),
		}
	}

	/// A singular reverse relation: at most one child row stores
	/// `fk_field`, uniquely.
	pub fn reverse_one_to_one(
		field_name: impl Into<String>,
		related_table: impl Into<String>,
		fk_field: impl Into<String>,
	) -> Self {
		Self {
			singular: true,
			..Self::reverse_foreign_key(field_name, related_table, fk_field)
		}
	}

	/// A many-to-many relation through a junction table.
	pub fn many_to_many(
		field_name: impl Into<String>,
		related_table: impl Into<String>,
		junction_table: impl Into<String>,
		source_fk: impl Into<String>,
		target_fk: impl Into<String>,
	) -> Self {
		Self {
			field_name: field_name.into(),
			related_table: related_table.into(),
			owner: FkOwner::Junction {
				table: junction_table.into(),
				source_fk: source_fk.into(),
				target_fk: target_fk.into(),
			},
			fk_field: String::new(),
			singular: false,
			related_pk_field: "id".into(),
		}
	}

	/// Override the related table's primary key column (default `"id"`).
	pub fn related_pk(mut self, name: impl Into<String>) -> Self {
		self.related_pk_field = name.into();
		self
	}
}

/// Declared schema for one model: its table, primary key, plain columns
/// and relations.
///
/// # Examples
///
/// ```
/// use nested_serializers::schema::{FieldDef, FieldKind, ModelSchema, RelationDef};
///
/// let schema = ModelSchema::new("addresses")
///     .field(FieldDef::new("city", FieldKind::Text).required())
///     .field(FieldDef::new("street", FieldKind::Text))
///     .relation(RelationDef::foreign_key("profile", "profiles", "profile_id"));
///
/// assert!(schema.get_field("city").is_some());
/// assert!(schema.get_relation("profile").is_some());
/// assert!(schema.get_relation("city").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ModelSchema {
	pub table: String,
	pub pk_field: String,
	pub fields: Vec<FieldDef>,
	pub relations: Vec<RelationDef>,
}

impl ModelSchema {
	pub fn new(table: impl Into<String>) -> Self {
		Self {
			table: table.into(),
			pk_field: "id".into(),
			fields: Vec::new(),
			relations: Vec::new(),
		}
	}

	/// Override the primary key column (default `"id"`).
	pub fn pk(mut self, name: impl Into<String>) -> Self {
		self.pk_field = name.into();
		self
	}

	pub fn field(mut self, field: FieldDef) -> Self {
		self.fields.push(field);
		self
	}

	pub fn relation(mut self, relation: RelationDef) -> Self {
		self.relations.push(relation);
		self
	}

	pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn get_relation(&self, name: &str) -> Option<&RelationDef> {
		self.relations.iter().find(|r| r.field_name == name)
	}
}
