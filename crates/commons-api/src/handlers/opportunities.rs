//! Opportunity handlers: postings and the application workflow.

use axum::{
  Json, Router,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
  routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  access::{self, Actor, Permission, Target},
  opportunity::{
    Opportunity, OpportunityKind, OpportunityStatus, ParticipantStatus,
  },
  store::{OpportunityFilter, PortalStore},
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
    .route("/{id}/apply", post(apply::<S>))
    .route("/{id}/participants/{user_id}", patch(set_participant_status::<S>))
}

// ─── List & fetch ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(rename = "type")]
  pub kind:    Option<OpportunityKind>,
  pub status:  Option<OpportunityStatus>,
  pub program: Option<String>,
  pub branch:  Option<String>,
}

/// `GET /opportunities[?type=&status=&program=&branch=]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Opportunity>>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let opportunities = state
    .store
    .list_opportunities(OpportunityFilter {
      kind:    params.kind,
      status:  params.status,
      program: params.program,
      branch:  params.branch,
    })
    .await
    .map_err(ApiError::store)?;
  Ok(Json(opportunities))
}

/// `GET /opportunities/:id`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let opportunity = state
    .store
    .get_opportunity(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("opportunity not found".into()))?;
  Ok(Json(opportunity))
}

// ─── Create & edit ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateOpportunityBody {
  pub title:            String,
  pub description:      String,
  #[serde(rename = "type")]
  pub kind:             OpportunityKind,
  pub program:          String,
  pub branch:           String,
  pub deadline:         DateTime<Utc>,
  #[serde(default)]
  pub requirements:     Vec<String>,
  pub location:         Option<String>,
  pub stipend:          Option<String>,
  pub duration:         Option<String>,
  pub max_participants: Option<u32>,
}

/// `POST /opportunities` — faculty and admins only.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<CreateOpportunityBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("title", non_empty(&body.title), "Title is required");
  v.require("description", non_empty(&body.description), "Description is required");
  v.require("program", non_empty(&body.program), "Program is required");
  v.require("branch", non_empty(&body.branch), "Branch is required");
  v.finish()?;

  let opportunity = Opportunity {
    opportunity_id:   Uuid::new_v4(),
    title:            body.title,
    description:      body.description,
    kind:             body.kind,
    program:          body.program,
    branch:           body.branch,
    deadline:         body.deadline,
    requirements:     body.requirements,
    location:         body.location,
    stipend:          body.stipend,
    duration:         body.duration,
    max_participants: body.max_participants,
    status:           OpportunityStatus::Open,
    organizer_id:     user.user_id,
    participants:     Vec::new(),
    created_at:       Utc::now(),
  };
  let opportunity = state
    .store
    .create_opportunity(opportunity)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(opportunity)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateOpportunityBody {
  pub title:            Option<String>,
  pub description:      Option<String>,
  #[serde(rename = "type")]
  pub kind:             Option<OpportunityKind>,
  pub program:          Option<String>,
  pub branch:           Option<String>,
  pub deadline:         Option<DateTime<Utc>>,
  pub requirements:     Option<Vec<String>>,
  pub location:         Option<String>,
  pub stipend:          Option<String>,
  pub duration:         Option<String>,
  pub max_participants: Option<u32>,
  pub status:           Option<OpportunityStatus>,
}

/// `PUT /opportunities/:id` — organizer or admin.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<UpdateOpportunityBody>, JsonRejection>,
) -> Result<Json<Opportunity>, ApiError>
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
  let opportunity = state
    .store
    .update_opportunity(id, move |o| {
      access::check(&actor, Target::Opportunity(o), Permission::Edit)?;
      if let Some(title) = body.title {
        o.title = title;
      }
      if let Some(description) = body.description {
        o.description = description;
      }
      if let Some(kind) = body.kind {
        o.kind = kind;
      }
      if let Some(program) = body.program {
        o.program = program;
      }
      if let Some(branch) = body.branch {
        o.branch = branch;
      }
      if let Some(deadline) = body.deadline {
        o.deadline = deadline;
      }
      if let Some(requirements) = body.requirements {
        o.requirements = requirements;
      }
      if let Some(location) = body.location {
        o.location = Some(location);
      }
      if let Some(stipend) = body.stipend {
        o.stipend = Some(stipend);
      }
      if let Some(duration) = body.duration {
        o.duration = Some(duration);
      }
      if let Some(max_participants) = body.max_participants {
        o.max_participants = Some(max_participants);
      }
      if let Some(status) = body.status {
        o.status = status;
      }
      Ok(o.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("opportunity", e))?;
  Ok(Json(opportunity))
}

/// `DELETE /opportunities/:id` — organizer or admin.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let opportunity = state
    .store
    .get_opportunity(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("opportunity not found".into()))?;

  let actor = Actor::from(&user);
  access::check(&actor, Target::Opportunity(&opportunity), Permission::Delete)?;

  state.store.delete_opportunity(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "opportunity deleted" })))
}

// ─── Applications ─────────────────────────────────────────────────────────────

/// `POST /opportunities/:id/apply` — conflict when closed, duplicate, or at
/// capacity.
pub async fn apply<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Opportunity>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let now = Utc::now();
  let opportunity = state
    .store
    .update_opportunity(id, move |o| {
      o.apply(user.user_id, now)?;
      Ok(o.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("opportunity", e))?;
  Ok(Json(opportunity))
}

#[derive(Debug, Deserialize)]
pub struct ParticipantStatusBody {
  pub status: ParticipantStatus,
}

/// `PATCH /opportunities/:id/participants/:user_id` — organizer or admin,
/// regardless of the posting's own status.
pub async fn set_participant_status<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, participant_id)): Path<(Uuid, Uuid)>,
  body: Result<Json<ParticipantStatusBody>, JsonRejection>,
) -> Result<Json<Opportunity>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  require_role(&user, &[UserRole::Admin, UserRole::Faculty])?;
  let Json(body) = body?;

  let actor = Actor::from(&user);
  let opportunity = state
    .store
    .update_opportunity(id, move |o| {
      access::check(&actor, Target::Opportunity(o), Permission::ManageParticipants)?;
      o.set_participant_status(participant_id, body.status)?;
      Ok(o.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("opportunity", e))?;
  Ok(Json(opportunity))
}
