//! SQLite backend for the Campus Commons portal store.
//!
//! Each document collection is a table holding the aggregate serialized as
//! JSON, plus the columns needed for lookup and uniqueness. Wraps
//! [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime — which also serializes every
//! read-modify-write mutation, as the [`commons_core::store::PortalStore`]
//! contract requires.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
