//! Nested persistence: relationship classification, per-kind save
//! strategies, list reconciliation and the save orchestrators.

pub mod reconcile;
pub mod save;
pub mod strategies;

pub use reconcile::reconcile_children;
pub use save::{ChoiceSave, NestedSave};

use crate::error::NestedError;
use crate::schema::{FkOwner, ModelSchema};
use serde::{Deserialize, Serialize};

/// The kind of relationship between a parent model and one of its nested
/// fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelationshipKind {
	OneToOne,
	ReverseOneToOne,
	ForeignKey,
	ReverseForeignKey,
	ManyToMany,
}

impl RelationshipKind {
	pub fn as_str(&self) -> &'static str {
		match self {
			RelationshipKind::OneToOne => "one_to_one",
			RelationshipKind::ReverseOneToOne => "reverse_one_to_one",
			RelationshipKind::ForeignKey => "foreign_key",
			RelationshipKind::ReverseForeignKey => "reverse_foreign_key",
			RelationshipKind::ManyToMany => "many_to_many",
		}
	}

	/// True for the kinds whose foreign key column lives on the parent
	/// row, which must therefore be written before the parent.
	pub fn is_pre_save(&self) -> bool {
		matches!(self, RelationshipKind::OneToOne | RelationshipKind::ForeignKey)
	}

	/// True for the kinds whose foreign key column lives on the child
	/// row, which can only be written once the parent's key exists.
	pub fn is_post_save(&self) -> bool {
		matches!(
			self,
			RelationshipKind::ReverseOneToOne | RelationshipKind::ReverseForeignKey
		)
	}
}

/// Classify a declared field into one of the five relationship kinds.
///
/// The kind is a pure function of how the foreign key is physically
/// declared: which side owns the column, and whether the relation is
/// singular. A field that is not a declared relation fails with
/// [`NestedError::UnsupportedRelationship`].
///
/// # Examples
///
/// ```
/// use nested_serializers::nesting::{classify, RelationshipKind};
/// use nested_serializers::schema::{ModelSchema, RelationDef};
///
/// let schema = ModelSchema::new("profiles")
///     .relation(RelationDef::reverse_foreign_key("addresses", "addresses", "profile_id"));
///
/// let kind = classify(&schema, "addresses").unwrap();
/// assert_eq!(kind, RelationshipKind::ReverseForeignKey);
/// assert!(classify(&schema, "birth_date").is_err());
/// ```
pub fn classify(schema: &ModelSchema, field_name: &str) -> Result<RelationshipKind, NestedError> {
	let relation = schema.get_relation(field_name).ok_or_else(|| {
		NestedError::UnsupportedRelationship {
			table: schema.table.clone(),
			field: field_name.to_string(),
		}
	})?;
	Ok(match (&relation.owner, relation.singular) {
		(FkOwner::Parent, true) => RelationshipKind::OneToOne,
		(FkOwner::Parent, false) => RelationshipKind::ForeignKey,
		(FkOwner::Child, true) => RelationshipKind::ReverseOneToOne,
		(FkOwner::Child, false) => RelationshipKind::ReverseForeignKey,
		(FkOwner::Junction { .. }, _) => RelationshipKind::ManyToMany,
	})
}
