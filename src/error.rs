//! Error types for nested serialization and persistence.

use serde_json::Value;
use thiserror::Error;

/// Failure raised by a [`RecordStore`](crate::store::RecordStore)
/// implementation.
#[derive(Debug, Error)]
pub enum StoreError {
	/// The store has no table/collection with this name.
	#[error("unknown table '{0}'")]
	UnknownTable(String),

	/// A commit or rollback was issued outside a transaction scope.
	#[error("no active transaction")]
	NoTransaction,

	/// Backend-specific failure, carried as a message.
	#[error("{0}")]
	Backend(String),
}

/// Errors surfaced by classification, validation and save orchestration.
///
/// Nothing is retried internally: every error aborts the enclosing
/// transaction and propagates to the caller unchanged.
#[derive(Debug, Error)]
pub enum NestedError {
	/// Classification could not map the field onto one of the five
	/// recognised relationship kinds.
	#[error("field '{field}' on '{table}' is not a supported relationship")]
	UnsupportedRelationship { table: String, field: String },

	/// A parent or child payload failed schema validation.
	#[error("validation failed for '{field}': {message}")]
	Validation { field: String, message: String },

	/// A choice-relation reference did not resolve to an existing record.
	#[error("no '{table}' record with id {id}")]
	NotFound { table: String, id: Value },

	/// A base64 file payload was missing the expected markers or could
	/// not be decoded.
	#[error("malformed encoded payload: {0}")]
	MalformedPayload(String),

	/// The relationship kind is recognised but not handled by the
	/// pipeline it was routed through.
	#[error("relationship kind '{kind}' is not handled by this save pipeline")]
	UnhandledKind { kind: &'static str },

	/// A method-backed field named a method its host does not provide.
	#[error("method '{0}' is not provided by the host serializer")]
	MethodNotBound(String),

	#[error(transparent)]
	Store(#[from] StoreError),
}

impl NestedError {
	/// Create a validation error for one field.
	pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self::Validation {
			field: field.into(),
			message: message.into(),
		}
	}

	/// Create a not-found error for a missed identifier lookup.
	pub fn not_found(table: impl Into<String>, id: &Value) -> Self {
		Self::NotFound {
			table: table.into(),
			id: id.clone(),
		}
	}

	/// Check whether this error is a validation failure.
	pub fn is_validation(&self) -> bool {
		matches!(self, NestedError::Validation { .. })
	}
}
