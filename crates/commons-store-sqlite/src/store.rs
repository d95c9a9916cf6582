//! [`SqliteStore`] — the SQLite implementation of [`PortalStore`].
//!
//! Every mutation runs inside a single `conn.call` closure on the
//! connection's dedicated thread, so read-modify-write sequences (the
//! enrollment counter, the capacity and duplicate-application checks, the
//! reaction replacement, the last-admin guard) are serialized and cannot
//! lose updates.

use std::path::Path;

use chrono::{Datelike as _, Utc};
use rusqlite::OptionalExtension as _;
use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use commons_core::{
  calendar::CalendarEvent,
  chat::ChatRoom,
  content::ContentItem,
  discussion::{Discussion, DiscussionCategory},
  opportunity::Opportunity,
  store::{EventFilter, OpportunityFilter, PortalStore, StoreError},
  user::{NewUser, SocialLinks, User, UserRole, enrollment_number, enrollment_prefix},
};

use crate::{
  Error, Result,
  encode::{decode_doc, encode_doc, encode_dt, encode_role, encode_uuid},
  schema::SCHEMA,
};

// ─── Mutation outcome ────────────────────────────────────────────────────────

/// What happened inside an update closure. Domain rejections and missing
/// documents are carried out of `conn.call` as values so they can be told
/// apart from backend failures.
enum Outcome<T> {
  Missing,
  Rejected(commons_core::Error),
  Json(serde_json::Error),
  Done(T),
}

fn resolve<T>(outcome: Outcome<T>) -> std::result::Result<T, StoreError<Error>> {
  match outcome {
    Outcome::Missing => Err(StoreError::NotFound),
    Outcome::Rejected(e) => Err(StoreError::Domain(e)),
    Outcome::Json(e) => Err(StoreError::Backend(Error::Json(e))),
    Outcome::Done(value) => Ok(value),
  }
}

fn is_unique_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A portal store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Generic document helpers ──────────────────────────────────────────

  /// Fetch a single `doc` column by key and decode it.
  async fn fetch_doc<T: DeserializeOwned>(
    &self,
    sql: &'static str,
    key: String,
  ) -> Result<Option<T>> {
    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(sql, rusqlite::params![key], |row| row.get(0))
            .optional()?,
        )
      })
      .await?;

    doc.as_deref().map(decode_doc).transpose()
  }

  /// Fetch every `doc` column returned by `sql` and decode them in order.
  async fn fetch_docs<T: DeserializeOwned>(&self, sql: &'static str) -> Result<Vec<T>> {
    let docs: Vec<String> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs.iter().map(|doc| decode_doc(doc)).collect()
  }

  /// Insert a freshly-built aggregate into a `(id, doc, created_at)` table.
  async fn insert_doc<T: Serialize>(
    &self,
    sql: &'static str,
    id: Uuid,
    value: &T,
    created_at: chrono::DateTime<Utc>,
  ) -> Result<()> {
    let id_str = encode_uuid(id);
    let doc = encode_doc(value)?;
    let at_str = encode_dt(created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(sql, rusqlite::params![id_str, doc, at_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Load an aggregate, run `mutate` against it, and persist the result —
  /// all on the connection thread. A rejected mutation writes nothing.
  async fn update_doc<D, F, T>(
    &self,
    table: &'static str,
    id_column: &'static str,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    D: Serialize + DeserializeOwned + 'static,
    F: FnOnce(&mut D) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let select = format!("SELECT doc FROM {table} WHERE {id_column} = ?1");
    let update = format!("UPDATE {table} SET doc = ?1 WHERE {id_column} = ?2");
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let doc: Option<String> = conn
          .query_row(&select, rusqlite::params![id_str], |row| row.get(0))
          .optional()?;
        let Some(doc) = doc else {
          return Ok(Outcome::Missing);
        };
        let mut value: D = match serde_json::from_str(&doc) {
          Ok(v) => v,
          Err(e) => return Ok(Outcome::Json(e)),
        };
        match mutate(&mut value) {
          Err(e) => Ok(Outcome::Rejected(e)),
          Ok(out) => {
            let encoded = match serde_json::to_string(&value) {
              Ok(s) => s,
              Err(e) => return Ok(Outcome::Json(e)),
            };
            conn.execute(&update, rusqlite::params![encoded, id_str])?;
            Ok(Outcome::Done(out))
          }
        }
      })
      .await
      .map_err(|e| StoreError::Backend(Error::Database(e)))?;

    resolve(outcome)
  }

  /// Delete a row by id, returning whether anything was removed.
  async fn delete_row(&self, sql: &'static str, id: Uuid) -> Result<bool> {
    let id_str = encode_uuid(id);
    let affected = self
      .conn
      .call(move |conn| Ok(conn.execute(sql, rusqlite::params![id_str])?))
      .await?;
    Ok(affected > 0)
  }
}

// ─── PortalStore impl ────────────────────────────────────────────────────────

impl PortalStore for SqliteStore {
  type Error = Error;

  // ── Users ─────────────────────────────────────────────────────────────

  async fn create_user(
    &self,
    new: NewUser,
  ) -> std::result::Result<User, StoreError<Error>> {
    let now = Utc::now();
    let user = User {
      user_id:           Uuid::new_v4(),
      name:              new.name,
      email:             new.email,
      google_id:         new.google_id,
      password_hash:     new.password_hash,
      role:              new.role,
      program:           new.program,
      branch:            new.branch,
      semester:          new.semester,
      enrollment_number: None,
      bio:               String::new(),
      profile_picture:   new.profile_picture,
      achievements:      Vec::new(),
      skills:            Vec::new(),
      social_links:      SocialLinks::default(),
      last_login:        now,
      created_at:        now,
    };

    let outcome = self
      .conn
      .call(move |conn| {
        let mut user = user;
        let tx = conn.transaction()?;

        // Enrollment sequence = count of numbers already issued with the
        // same year/program/branch prefix, plus one. COUNT and INSERT share
        // the transaction; concurrent registrations cannot interleave here.
        if user.role == UserRole::Student
          && let (Some(program), Some(branch)) = (&user.program, &user.branch)
        {
          let prefix = enrollment_prefix(now.year(), program, branch);
          let count: u32 = tx.query_row(
            "SELECT COUNT(*) FROM users WHERE enrollment_number LIKE ?1",
            rusqlite::params![format!("{prefix}%")],
            |row| row.get(0),
          )?;
          user.enrollment_number = Some(enrollment_number(&prefix, count + 1));
        }

        let doc = match serde_json::to_string(&user) {
          Ok(d) => d,
          Err(e) => return Ok(Outcome::Json(e)),
        };
        let inserted = tx.execute(
          "INSERT INTO users (user_id, email, google_id, enrollment_number, role, doc, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            encode_uuid(user.user_id),
            user.email,
            user.google_id,
            user.enrollment_number,
            encode_role(user.role),
            doc,
            encode_dt(user.created_at),
          ],
        );
        match inserted {
          Ok(_) => {}
          Err(e) if is_unique_violation(&e) => {
            return Ok(Outcome::Rejected(commons_core::Error::EmailTaken));
          }
          Err(e) => return Err(e.into()),
        }
        tx.commit()?;
        Ok(Outcome::Done(user))
      })
      .await
      .map_err(|e| StoreError::Backend(Error::Database(e)))?;

    resolve(outcome)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    self
      .fetch_doc("SELECT doc FROM users WHERE user_id = ?1", encode_uuid(id))
      .await
  }

  async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
    self
      .fetch_doc("SELECT doc FROM users WHERE email = ?1", email.to_owned())
      .await
  }

  async fn find_user_by_google_id(&self, google_id: &str) -> Result<Option<User>> {
    self
      .fetch_doc(
        "SELECT doc FROM users WHERE google_id = ?1",
        google_id.to_owned(),
      )
      .await
  }

  async fn update_user<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut User) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let doc: Option<String> = conn
          .query_row(
            "SELECT doc FROM users WHERE user_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(doc) = doc else {
          return Ok(Outcome::Missing);
        };
        let mut user: User = match serde_json::from_str(&doc) {
          Ok(u) => u,
          Err(e) => return Ok(Outcome::Json(e)),
        };
        match mutate(&mut user) {
          Err(e) => Ok(Outcome::Rejected(e)),
          Ok(out) => {
            let encoded = match serde_json::to_string(&user) {
              Ok(s) => s,
              Err(e) => return Ok(Outcome::Json(e)),
            };
            // The lookup columns shadow the document; refresh them together.
            let updated = conn.execute(
              "UPDATE users
               SET email = ?1, google_id = ?2, enrollment_number = ?3, role = ?4, doc = ?5
               WHERE user_id = ?6",
              rusqlite::params![
                user.email,
                user.google_id,
                user.enrollment_number,
                encode_role(user.role),
                encoded,
                id_str,
              ],
            );
            match updated {
              Ok(_) => Ok(Outcome::Done(out)),
              Err(e) if is_unique_violation(&e) => {
                Ok(Outcome::Rejected(commons_core::Error::EmailTaken))
              }
              Err(e) => Err(e.into()),
            }
          }
        }
      })
      .await
      .map_err(|e| StoreError::Backend(Error::Database(e)))?;

    resolve(outcome)
  }

  // ── Content ───────────────────────────────────────────────────────────

  async fn create_content(&self, item: ContentItem) -> Result<ContentItem> {
    self
      .insert_doc(
        "INSERT INTO content (content_id, doc, created_at) VALUES (?1, ?2, ?3)",
        item.content_id,
        &item,
        item.created_at,
      )
      .await?;
    Ok(item)
  }

  async fn get_content(&self, id: Uuid) -> Result<Option<ContentItem>> {
    self
      .fetch_doc(
        "SELECT doc FROM content WHERE content_id = ?1",
        encode_uuid(id),
      )
      .await
  }

  async fn list_content(&self) -> Result<Vec<ContentItem>> {
    self
      .fetch_docs("SELECT doc FROM content ORDER BY created_at DESC")
      .await
  }

  async fn update_content<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut ContentItem) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.update_doc("content", "content_id", id, mutate).await
  }

  async fn delete_content(&self, id: Uuid) -> Result<Option<ContentItem>> {
    let id_str = encode_uuid(id);
    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        let doc: Option<String> = conn
          .query_row(
            "SELECT doc FROM content WHERE content_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        if doc.is_some() {
          conn.execute(
            "DELETE FROM content WHERE content_id = ?1",
            rusqlite::params![id_str],
          )?;
        }
        Ok(doc)
      })
      .await?;

    doc.as_deref().map(decode_doc).transpose()
  }

  // ── Discussions ───────────────────────────────────────────────────────

  async fn create_discussion(&self, discussion: Discussion) -> Result<Discussion> {
    self
      .insert_doc(
        "INSERT INTO discussions (discussion_id, doc, created_at) VALUES (?1, ?2, ?3)",
        discussion.discussion_id,
        &discussion,
        discussion.created_at,
      )
      .await?;
    Ok(discussion)
  }

  async fn get_discussion(&self, id: Uuid) -> Result<Option<Discussion>> {
    self
      .fetch_doc(
        "SELECT doc FROM discussions WHERE discussion_id = ?1",
        encode_uuid(id),
      )
      .await
  }

  async fn list_discussions(
    &self,
    category: Option<DiscussionCategory>,
  ) -> Result<Vec<Discussion>> {
    let mut discussions: Vec<Discussion> = self
      .fetch_docs("SELECT doc FROM discussions ORDER BY created_at DESC")
      .await?;
    if let Some(category) = category {
      discussions.retain(|d| d.category == category);
    }
    Ok(discussions)
  }

  async fn update_discussion<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut Discussion) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.update_doc("discussions", "discussion_id", id, mutate).await
  }

  async fn delete_discussion(&self, id: Uuid) -> Result<bool> {
    self
      .delete_row("DELETE FROM discussions WHERE discussion_id = ?1", id)
      .await
  }

  // ── Opportunities ─────────────────────────────────────────────────────

  async fn create_opportunity(&self, opportunity: Opportunity) -> Result<Opportunity> {
    self
      .insert_doc(
        "INSERT INTO opportunities (opportunity_id, doc, created_at) VALUES (?1, ?2, ?3)",
        opportunity.opportunity_id,
        &opportunity,
        opportunity.created_at,
      )
      .await?;
    Ok(opportunity)
  }

  async fn get_opportunity(&self, id: Uuid) -> Result<Option<Opportunity>> {
    self
      .fetch_doc(
        "SELECT doc FROM opportunities WHERE opportunity_id = ?1",
        encode_uuid(id),
      )
      .await
  }

  async fn list_opportunities(
    &self,
    filter: OpportunityFilter,
  ) -> Result<Vec<Opportunity>> {
    let mut opportunities: Vec<Opportunity> = self
      .fetch_docs("SELECT doc FROM opportunities ORDER BY created_at DESC")
      .await?;
    if let Some(kind) = filter.kind {
      opportunities.retain(|o| o.kind == kind);
    }
    if let Some(status) = filter.status {
      opportunities.retain(|o| o.status == status);
    }
    if let Some(program) = filter.program {
      opportunities.retain(|o| o.program == program);
    }
    if let Some(branch) = filter.branch {
      opportunities.retain(|o| o.branch == branch);
    }
    Ok(opportunities)
  }

  async fn update_opportunity<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut Opportunity) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.update_doc("opportunities", "opportunity_id", id, mutate).await
  }

  async fn delete_opportunity(&self, id: Uuid) -> Result<bool> {
    self
      .delete_row("DELETE FROM opportunities WHERE opportunity_id = ?1", id)
      .await
  }

  // ── Calendar events ───────────────────────────────────────────────────

  async fn create_event(&self, event: CalendarEvent) -> Result<CalendarEvent> {
    self
      .insert_doc(
        "INSERT INTO events (event_id, doc, created_at) VALUES (?1, ?2, ?3)",
        event.event_id,
        &event,
        event.created_at,
      )
      .await?;
    Ok(event)
  }

  async fn get_event(&self, id: Uuid) -> Result<Option<CalendarEvent>> {
    self
      .fetch_doc("SELECT doc FROM events WHERE event_id = ?1", encode_uuid(id))
      .await
  }

  async fn list_events(&self, filter: EventFilter) -> Result<Vec<CalendarEvent>> {
    let mut events: Vec<CalendarEvent> =
      self.fetch_docs("SELECT doc FROM events").await?;
    if let Some(after) = filter.starts_after {
      events.retain(|e| e.starts_at >= after);
    }
    if let Some(before) = filter.ends_before {
      events.retain(|e| e.ends_at <= before);
    }
    if let Some(kind) = filter.kind {
      events.retain(|e| e.kind == kind);
    }
    if let Some(category) = filter.category {
      events.retain(|e| e.category == category);
    }
    events.sort_by_key(|e| e.starts_at);
    Ok(events)
  }

  async fn update_event<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut CalendarEvent) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    self.update_doc("events", "event_id", id, mutate).await
  }

  async fn delete_event(&self, id: Uuid) -> Result<bool> {
    self.delete_row("DELETE FROM events WHERE event_id = ?1", id).await
  }

  // ── Chat rooms ────────────────────────────────────────────────────────

  async fn create_chat(&self, room: ChatRoom) -> Result<ChatRoom> {
    let id_str = encode_uuid(room.chat_id);
    let doc = encode_doc(&room)?;
    let at_str = encode_dt(room.created_at);
    let is_active = room.is_active;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO chats (chat_id, is_active, doc, created_at) VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, is_active, doc, at_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(room)
  }

  async fn get_chat(&self, id: Uuid) -> Result<Option<ChatRoom>> {
    self
      .fetch_doc("SELECT doc FROM chats WHERE chat_id = ?1", encode_uuid(id))
      .await
  }

  async fn list_active_chats(&self) -> Result<Vec<ChatRoom>> {
    self
      .fetch_docs("SELECT doc FROM chats WHERE is_active = 1 ORDER BY created_at DESC")
      .await
  }

  async fn update_chat<F, T>(
    &self,
    id: Uuid,
    mutate: F,
  ) -> std::result::Result<T, StoreError<Error>>
  where
    F: FnOnce(&mut ChatRoom) -> commons_core::Result<T> + Send + 'static,
    T: Send + 'static,
  {
    let id_str = encode_uuid(id);

    let outcome = self
      .conn
      .call(move |conn| {
        let doc: Option<String> = conn
          .query_row(
            "SELECT doc FROM chats WHERE chat_id = ?1",
            rusqlite::params![id_str],
            |row| row.get(0),
          )
          .optional()?;
        let Some(doc) = doc else {
          return Ok(Outcome::Missing);
        };
        let mut room: ChatRoom = match serde_json::from_str(&doc) {
          Ok(r) => r,
          Err(e) => return Ok(Outcome::Json(e)),
        };
        match mutate(&mut room) {
          Err(e) => Ok(Outcome::Rejected(e)),
          Ok(out) => {
            let encoded = match serde_json::to_string(&room) {
              Ok(s) => s,
              Err(e) => return Ok(Outcome::Json(e)),
            };
            conn.execute(
              "UPDATE chats SET is_active = ?1, doc = ?2 WHERE chat_id = ?3",
              rusqlite::params![room.is_active, encoded, id_str],
            )?;
            Ok(Outcome::Done(out))
          }
        }
      })
      .await
      .map_err(|e| StoreError::Backend(Error::Database(e)))?;

    resolve(outcome)
  }
}
