//! Writable nested serializer helpers.
//!
//! Extends a serializer layer so that nested object graphs (a parent
//! record together with its related records) can be read and written
//! through a single save call. Five relationship kinds are supported:
//! one-to-one, reverse one-to-one, foreign key, reverse foreign key, and
//! many-to-many "choice" relations (attach-only, never creating or
//! updating the referenced record).
//!
//! The host framework plugs in through three seams: a declared
//! [`ModelSchema`] per entity (replacing runtime model introspection), the
//! [`RecordStore`] persistence/transaction capability, and the optional
//! [`NativePersist`]/[`SaveHook`] capabilities around the parent save. The
//! [`NestedSave`] and [`ChoiceSave`] pipelines then run
//! extract, pre-save, parent save, post-save and the optional hook inside one
//! atomic transaction: any failure anywhere rolls back every write.

pub mod dynamic;
pub mod error;
pub mod fields;
pub mod nesting;
pub mod schema;
pub mod serializer;
pub mod store;

pub use dynamic::FieldSelection;
pub use error::{NestedError, StoreError};
pub use fields::{
	Base64FileField, DecodedFile, MethodFieldHost, RelationChoiceField, WritableMethodField,
};
pub use nesting::{ChoiceSave, NestedSave, RelationshipKind, classify, reconcile_children};
pub use schema::{FieldDef, FieldKind, FkOwner, ModelSchema, RelationDef};
pub use serializer::{ChildSerializer, ModelPersist, NativePersist, RecordSerializer, SaveHook};
pub use store::{ManyToManyManager, RecordStore, atomic};
