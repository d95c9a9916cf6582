//! Calendar event handlers.

use axum::{
  Json, Router,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
  routing::get,
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  access::{self, Actor, Permission, Target},
  calendar::{CalendarEvent, EventCategory, EventKind, Recurrence},
  store::{EventFilter, PortalStore},
  user::UserRole,
};

use crate::{
  AppState,
  auth::{AuthUser, require_role},
  error::ApiError,
  handlers::{Validator, non_empty},
};

pub fn router<S>() -> Router<AppState<S>>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(list::<S>).post(create::<S>))
    .route("/{id}", get(get_one::<S>).put(update::<S>).delete(remove::<S>))
}

// ─── List & fetch ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub start_date: Option<DateTime<Utc>>,
  pub end_date:   Option<DateTime<Utc>>,
  #[serde(rename = "type")]
  pub kind:       Option<EventKind>,
  pub category:   Option<EventCategory>,
}

/// `GET /calendar[?start_date=&end_date=&type=&category=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<CalendarEvent>>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let events = state
    .store
    .list_events(EventFilter {
      starts_after: params.start_date,
      ends_before:  params.end_date,
      kind:         params.kind,
      category:     params.category,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(events))
}

/// `GET /calendar/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<CalendarEvent>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("event not found".into()))?;
  Ok(Json(event))
}

// ─── Create & edit ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateEventBody {
  pub title:       String,
  pub description: String,
  pub starts_at:   DateTime<Utc>,
  pub ends_at:     DateTime<Utc>,
  #[serde(rename = "type")]
  pub kind:        EventKind,
  pub category:    EventCategory,
  pub program:     Option<String>,
  pub branch:      Option<String>,
  pub semester:    Option<u8>,
  pub location:    Option<String>,
  pub recurrence:  Option<Recurrence>,
}

/// `POST /calendar` — faculty and admins only.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<CreateEventBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("title", non_empty(&body.title), "Title is required");
  v.require("description", non_empty(&body.description), "Description is required");
  v.require("ends_at", body.ends_at >= body.starts_at, "Event cannot end before it starts");
  if let Some(semester) = body.semester {
    v.require("semester", (1..=8).contains(&semester), "Semester must be between 1 and 8");
  }
  v.finish()?;

  let event = CalendarEvent {
    event_id:     Uuid::new_v4(),
    title:        body.title,
    description:  body.description,
    starts_at:    body.starts_at,
    ends_at:      body.ends_at,
    kind:         body.kind,
    category:     body.category,
    program:      body.program,
    branch:       body.branch,
    semester:     body.semester,
    location:     body.location,
    recurrence:   body.recurrence,
    organizer_id: user.user_id,
    created_at:   Utc::now(),
  };
  let event = state.store.create_event(event).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateEventBody {
  pub title:       Option<String>,
  pub description: Option<String>,
  pub starts_at:   Option<DateTime<Utc>>,
  pub ends_at:     Option<DateTime<Utc>>,
  #[serde(rename = "type")]
  pub kind:        Option<EventKind>,
  pub category:    Option<EventCategory>,
  pub program:     Option<String>,
  pub branch:      Option<String>,
  pub semester:    Option<u8>,
  pub location:    Option<String>,
  pub recurrence:  Option<Recurrence>,
}

/// `PUT /calendar/:id` — organizer or admin.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<UpdateEventBody>, JsonRejection>,
) -> Result<Json<CalendarEvent>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let Json(body) = body?;

  let mut v = Validator::default();
  if let Some(title) = body.title.as_deref() {
    v.require("title", non_empty(title), "Title cannot be empty");
  }
  if let Some(description) = body.description.as_deref() {
    v.require("description", non_empty(description), "Description cannot be empty");
  }
  v.finish()?;

  let actor = Actor::from(&user);
  let event = state
    .store
    .update_event(id, move |e| {
      access::check(&actor, Target::Event(e), Permission::Edit)?;
      if let Some(title) = body.title {
        e.title = title;
      }
      if let Some(description) = body.description {
        e.description = description;
      }
      if let Some(starts_at) = body.starts_at {
        e.starts_at = starts_at;
      }
      if let Some(ends_at) = body.ends_at {
        e.ends_at = ends_at;
      }
      if let Some(kind) = body.kind {
        e.kind = kind;
      }
      if let Some(category) = body.category {
        e.category = category;
      }
      if let Some(program) = body.program {
        e.program = Some(program);
      }
      if let Some(branch) = body.branch {
        e.branch = Some(branch);
      }
      if let Some(semester) = body.semester {
        e.semester = Some(semester);
      }
      if let Some(location) = body.location {
        e.location = Some(location);
      }
      if let Some(recurrence) = body.recurrence {
        e.recurrence = Some(recurrence);
      }
      Ok(e.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("event", e))?;
  Ok(Json(event))
}

/// `DELETE /calendar/:id` — organizer or admin.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let event = state
    .store
    .get_event(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("event not found".into()))?;

  let actor = Actor::from(&user);
  access::check(&actor, Target::Event(&event), Permission::Delete)?;

  state.store.delete_event(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "event deleted" })))
}
