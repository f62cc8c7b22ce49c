//! Writable method-backed fields.
//!
//! A method field delegates both directions to named accessor methods on
//! the containing serializer: `get_<field>` computes the representation,
//! `save_<field>` turns a write payload into the value stored on the
//! instance. The host exposes those methods through [`MethodFieldHost`]
//! rather than by reflection, so a missing method is an explicit error.

use crate::error::NestedError;
use serde_json::Value;

/// Capability trait for serializers that back method fields.
///
/// Both methods return `None` when the named method is not provided,
/// which the field reports as [`NestedError::MethodNotBound`].
pub trait MethodFieldHost {
	/// Compute the representation value of `method_name` for `instance`.
	fn compute_method(&self, method_name: &str, instance: &Value) -> Option<Value>;

	/// Apply a write payload through `method_name`, returning the value to
	/// set on the instance.
	fn save_method(&self, method_name: &str, data: &Value) -> Option<Value>;
}

/// A read/write field backed by a pair of host methods.
#[derive(Debug, Clone, Default)]
pub struct WritableMethodField {
	method_name: Option<String>,
	save_method_name: Option<String>,
}

impl WritableMethodField {
	pub fn new() -> Self {
		Self::default()
	}

	/// Override the getter name (default `get_<field>`).
	pub fn with_method_name(mut self, name: impl Into<String>) -> Self {
		self.method_name = Some(name.into());
		self
	}

	/// Override the saver name (default `save_<field>`).
	pub fn with_save_method_name(mut self, name: impl Into<String>) -> Self {
		self.save_method_name = Some(name.into());
		self
	}

	/// Bind the field to its name on the containing serializer, filling
	/// in the conventional method names where none were given.
	pub fn bind(mut self, field_name: &str) -> Self {
		if self.method_name.is_none() {
			self.method_name = Some(format!("get_{}", field_name));
		}
		if self.save_method_name.is_none() {
			self.save_method_name = Some(format!("save_{}", field_name));
		}
		self
	}

	pub fn method_name(&self) -> Option<&str> {
		self.method_name.as_deref()
	}

	pub fn save_method_name(&self) -> Option<&str> {
		self.save_method_name.as_deref()
	}

	pub fn to_representation(
		&self,
		host: &dyn MethodFieldHost,
		instance: &Value,
	) -> Result<Value, NestedError> {
		let name = self
			.method_name
			.as_deref()
			.ok_or_else(|| NestedError::MethodNotBound("<unbound>".into()))?;
		host.compute_method(name, instance)
			.ok_or_else(|| NestedError::MethodNotBound(name.to_string()))
	}

	pub fn to_internal_value(
		&self,
		host: &dyn MethodFieldHost,
		data: &Value,
	) -> Result<Value, NestedError> {
		let name = self
			.save_method_name
			.as_deref()
			.ok_or_else(|| NestedError::MethodNotBound("<unbound>".into()))?;
		host.save_method(name, data)
			.ok_or_else(|| NestedError::MethodNotBound(name.to_string()))
	}
}
