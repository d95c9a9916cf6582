//! The `PortalStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g.
//! `commons-store-sqlite`). The HTTP layer depends on this abstraction, not
//! on any concrete backend.
//!
//! Aggregates are mutated through the closure-taking `update_*` methods: the
//! backend loads the document, runs the closure against it, and persists the
//! result as one serialized unit. A closure that returns a domain error
//! leaves the stored document untouched.

use std::future::Future;

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::{
  calendar::{CalendarEvent, EventCategory, EventKind},
  chat::ChatRoom,
  content::ContentItem,
  discussion::{Discussion, DiscussionCategory},
  opportunity::{Opportunity, OpportunityKind, OpportunityStatus},
  user::{NewUser, User},
};

// ─── Errors ──────────────────────────────────────────────────────────────────

/// The outcome classification for store operations that can fail three ways:
/// the addressed aggregate is missing, a domain rule rejected the mutation,
/// or the backend itself failed.
#[derive(Debug, Error)]
pub enum StoreError<E: std::error::Error + 'static> {
  #[error("not found")]
  NotFound,

  #[error(transparent)]
  Domain(#[from] crate::Error),

  #[error(transparent)]
  Backend(E),
}

impl<E: std::error::Error + 'static> StoreError<E> {
  pub fn backend(error: E) -> Self {
    Self::Backend(error)
  }
}

// ─── Query types ─────────────────────────────────────────────────────────────

/// Filters for [`PortalStore::list_opportunities`].
#[derive(Debug, Clone, Default)]
pub struct OpportunityFilter {
  pub kind:    Option<OpportunityKind>,
  pub status:  Option<OpportunityStatus>,
  pub program: Option<String>,
  pub branch:  Option<String>,
}

/// Filters for [`PortalStore::list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
  pub starts_after: Option<DateTime<Utc>>,
  pub ends_before:  Option<DateTime<Utc>>,
  pub kind:         Option<EventKind>,
  pub category:     Option<EventCategory>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a portal storage backend.
///
/// Every aggregate is stored and loaded as one unit. Backends must execute
/// each `update_*` closure and the enrollment-number assignment in
/// [`create_user`](Self::create_user) without interleaving other writes to
/// the same collection, so the read-modify-write sequences the domain relies
/// on (enrollment counter, capacity and duplicate checks, reaction
/// replacement, the last-admin guard) cannot lose updates.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait PortalStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Users ─────────────────────────────────────────────────────────────

  /// Persist a new account. The store assigns the id and timestamps, and
  /// derives the enrollment number for students. A duplicate email is
  /// rejected as [`crate::Error::EmailTaken`].
  fn create_user(
    &self,
    new: NewUser,
  ) -> impl Future<Output = Result<User, StoreError<Self::Error>>> + Send + '_;

  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn find_user_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  fn find_user_by_google_id<'a>(
    &'a self,
    google_id: &'a str,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + 'a;

  /// Run `mutate` against the stored account and persist the result.
  fn update_user<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut User) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;

  // ── Content ───────────────────────────────────────────────────────────

  fn create_content(
    &self,
    item: ContentItem,
  ) -> impl Future<Output = Result<ContentItem, Self::Error>> + Send + '_;

  fn get_content(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ContentItem>, Self::Error>> + Send + '_;

  /// All content, newest first.
  fn list_content(
    &self,
  ) -> impl Future<Output = Result<Vec<ContentItem>, Self::Error>> + Send + '_;

  fn update_content<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut ContentItem) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;

  /// Delete an item, returning the removed document so the caller can clean
  /// up its backing file.
  fn delete_content(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ContentItem>, Self::Error>> + Send + '_;

  // ── Discussions ───────────────────────────────────────────────────────

  fn create_discussion(
    &self,
    discussion: Discussion,
  ) -> impl Future<Output = Result<Discussion, Self::Error>> + Send + '_;

  fn get_discussion(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Discussion>, Self::Error>> + Send + '_;

  /// Discussions, newest first, optionally narrowed to one category.
  fn list_discussions(
    &self,
    category: Option<DiscussionCategory>,
  ) -> impl Future<Output = Result<Vec<Discussion>, Self::Error>> + Send + '_;

  fn update_discussion<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut Discussion) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;

  /// Delete a discussion and, with it, its embedded comments.
  fn delete_discussion(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Opportunities ─────────────────────────────────────────────────────

  fn create_opportunity(
    &self,
    opportunity: Opportunity,
  ) -> impl Future<Output = Result<Opportunity, Self::Error>> + Send + '_;

  fn get_opportunity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Opportunity>, Self::Error>> + Send + '_;

  fn list_opportunities(
    &self,
    filter: OpportunityFilter,
  ) -> impl Future<Output = Result<Vec<Opportunity>, Self::Error>> + Send + '_;

  fn update_opportunity<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut Opportunity) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;

  fn delete_opportunity(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Calendar events ───────────────────────────────────────────────────

  fn create_event(
    &self,
    event: CalendarEvent,
  ) -> impl Future<Output = Result<CalendarEvent, Self::Error>> + Send + '_;

  fn get_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<CalendarEvent>, Self::Error>> + Send + '_;

  /// Events ordered by start time, optionally filtered.
  fn list_events(
    &self,
    filter: EventFilter,
  ) -> impl Future<Output = Result<Vec<CalendarEvent>, Self::Error>> + Send + '_;

  fn update_event<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut CalendarEvent) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;

  fn delete_event(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<bool, Self::Error>> + Send + '_;

  // ── Chat rooms ────────────────────────────────────────────────────────

  fn create_chat(
    &self,
    room: ChatRoom,
  ) -> impl Future<Output = Result<ChatRoom, Self::Error>> + Send + '_;

  fn get_chat(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ChatRoom>, Self::Error>> + Send + '_;

  /// All rooms with the soft-disable flag unset, newest first. Audience
  /// targeting is applied by the caller.
  fn list_active_chats(
    &self,
  ) -> impl Future<Output = Result<Vec<ChatRoom>, Self::Error>> + Send + '_;

  fn update_chat<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> impl Future<Output = Result<T, StoreError<Self::Error>>> + Send + '_
  where
    F: FnOnce(&mut ChatRoom) -> crate::Result<T> + Send + 'static,
    T: Send + 'static;
}
