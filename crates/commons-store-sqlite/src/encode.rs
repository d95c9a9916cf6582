//! Encoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 strings, UUIDs as hyphenated lowercase
//! strings, and aggregates as compact JSON.

use chrono::{DateTime, Utc};
use commons_core::user::UserRole;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use crate::Result;

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_role(role: UserRole) -> &'static str {
  match role {
    UserRole::Student => "student",
    UserRole::Faculty => "faculty",
    UserRole::Admin => "admin",
  }
}

pub fn encode_doc<T: Serialize>(value: &T) -> Result<String> {
  Ok(serde_json::to_string(value)?)
}

pub fn decode_doc<T: DeserializeOwned>(doc: &str) -> Result<T> {
  Ok(serde_json::from_str(doc)?)
}
