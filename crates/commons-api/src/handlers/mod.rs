//! Route handlers, one module per resource.
//!
//! Handlers are generic over the store and translate HTTP verbs into
//! aggregate loads and closure-based mutations; domain rules themselves live
//! in `commons-core`.

pub mod accounts;
pub mod calendar;
pub mod chats;
pub mod content;
pub mod discussions;
pub mod opportunities;

use serde::de::DeserializeOwned;

use crate::error::{ApiError, FieldError};

/// Collects field-level validation failures; empty means the payload passed.
#[derive(Default)]
pub struct Validator {
  errors: Vec<FieldError>,
}

impl Validator {
  /// Record a failure against `field` unless `ok` holds.
  pub fn require(&mut self, field: &str, ok: bool, message: &str) {
    if !ok {
      self.errors.push(FieldError::new(field, message));
    }
  }

  pub fn finish(self) -> Result<(), ApiError> {
    if self.errors.is_empty() {
      Ok(())
    } else {
      Err(ApiError::Validation(self.errors))
    }
  }
}

/// Parse a serde-tagged enum from its wire string (e.g. `"document"` →
/// `ContentKind::Document`).
pub(crate) fn parse_enum<T: DeserializeOwned>(value: &str) -> Option<T> {
  serde_json::from_value(serde_json::Value::String(value.to_owned())).ok()
}

pub(crate) fn non_empty(value: &str) -> bool {
  !value.trim().is_empty()
}
