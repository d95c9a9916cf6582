//! Chat room handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST`  | `/chats` | Creator becomes the sole admin |
//! | `GET`   | `/chats` | Rooms visible under the targeting rule |
//! | `GET`   | `/chats/:id` | Members only |
//! | `POST`  | `/chats/:id/join` \| `leave` | Leave blocked for the last admin |
//! | `POST`  | `/chats/:id/messages` | Announcements need an elevated role |
//! | `POST`  | `/chats/:id/messages/:message_id/reactions` | Replace semantics |
//! | `PATCH` | `/chats/:id/messages/:message_id/pin` | Elevated role |
//! | `PATCH` | `/chats/:id/members/:user_id` | Room admins change member roles |

use axum::{
  Json, Router,
  extract::{Path, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
  routing::{get, patch, post},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  access::Actor,
  chat::{
    ChatRoom, MemberRole, MessageDraft, MessageKind, ReactionKind, RoomCategory,
    RoomKind, Rule,
  },
  store::PortalStore,
};

use crate::{
  AppState,
  auth::AuthUser,
  error::ApiError,
  handlers::{Validator, non_empty},
};

pub fn router<S>() -> Router<AppState<S>>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", post(create::<S>).get(list::<S>))
    .route("/{id}", get(get_one::<S>))
    .route("/{id}/join", post(join::<S>))
    .route("/{id}/leave", post(leave::<S>))
    .route("/{id}/messages", post(post_message::<S>))
    .route("/{id}/messages/{message_id}/reactions", post(set_reaction::<S>))
    .route("/{id}/messages/{message_id}/pin", patch(toggle_pin::<S>))
    .route("/{id}/members/{user_id}", patch(set_member_role::<S>))
}

// ─── Create ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateRoomBody {
  pub name:        String,
  pub kind:        RoomKind,
  pub category:    RoomCategory,
  pub description: Option<String>,
  #[serde(default)]
  pub rules:       Vec<Rule>,
  pub program:     Option<String>,
  pub branch:      Option<String>,
  pub semester:    Option<u8>,
}

/// `POST /chats`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<CreateRoomBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  // Targeting fields widen with the category: a semester room needs all
  // three, a branch room the first two, a program room just the program.
  let needs_program = matches!(
    body.category,
    RoomCategory::Program | RoomCategory::Branch | RoomCategory::Semester
  );
  let needs_branch =
    matches!(body.category, RoomCategory::Branch | RoomCategory::Semester);
  let needs_semester = matches!(body.category, RoomCategory::Semester);

  let mut v = Validator::default();
  v.require("name", non_empty(&body.name), "Chat name is required");
  v.require(
    "program",
    !needs_program || body.program.as_deref().is_some_and(non_empty),
    "Program is required for this category",
  );
  v.require(
    "branch",
    !needs_branch || body.branch.as_deref().is_some_and(non_empty),
    "Branch is required for this category",
  );
  v.require(
    "semester",
    !needs_semester || body.semester.is_some(),
    "Semester is required for this category",
  );
  if let Some(semester) = body.semester {
    v.require(
      "semester",
      (1..=8).contains(&semester),
      "Semester must be between 1 and 8",
    );
  }
  v.finish()?;

  let room = ChatRoom::new(
    body.name,
    body.kind,
    body.category,
    body.description,
    body.rules,
    body.program,
    body.branch,
    body.semester,
    user.user_id,
    Utc::now(),
  );
  let room = state.store.create_chat(room).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(room)))
}

// ─── List & fetch ─────────────────────────────────────────────────────────────

/// `GET /chats` — active rooms visible to the caller.
pub async fn list<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
) -> Result<Json<Vec<ChatRoom>>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let mut rooms =
    state.store.list_active_chats().await.map_err(ApiError::store)?;
  rooms.retain(|room| room.is_visible_to(&user));
  Ok(Json(rooms))
}

/// `GET /chats/:id` — members only.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<ChatRoom>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let room = state
    .store
    .get_chat(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("chat room not found".into()))?;

  if !room.is_member(user.user_id) {
    return Err(ApiError::Forbidden(
      "not authorized to access this chat room".into(),
    ));
  }
  Ok(Json(room))
}

// ─── Membership ───────────────────────────────────────────────────────────────

/// `POST /chats/:id/join` — idempotent; targeting governs who may join.
pub async fn join<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<ChatRoom>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let now = Utc::now();
  let room = state
    .store
    .update_chat(id, move |room| {
      if !room.is_visible_to(&user) {
        return Err(commons_core::Error::NotEligible);
      }
      room.join(user.user_id, now);
      Ok(room.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;
  Ok(Json(room))
}

/// `POST /chats/:id/leave`
pub async fn leave<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  state
    .store
    .update_chat(id, move |room| room.leave(user.user_id))
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;
  Ok(Json(json!({ "message": "left the chat room" })))
}

#[derive(Debug, Deserialize)]
pub struct MemberRoleBody {
  pub role: MemberRole,
}

/// `PATCH /chats/:id/members/:user_id`
pub async fn set_member_role<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, member_id)): Path<(Uuid, Uuid)>,
  body: Result<Json<MemberRoleBody>, JsonRejection>,
) -> Result<Json<ChatRoom>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;
  let actor = Actor::from(&user);

  let room = state
    .store
    .update_chat(id, move |room| {
      room.set_member_role(&actor, member_id, body.role)?;
      Ok(room.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;
  Ok(Json(room))
}

// ─── Messages ─────────────────────────────────────────────────────────────────

fn default_message_kind() -> MessageKind { MessageKind::Text }

#[derive(Debug, Deserialize)]
pub struct MessageBody {
  pub content:         String,
  #[serde(default = "default_message_kind")]
  pub kind:            MessageKind,
  pub file_url:        Option<String>,
  #[serde(default)]
  pub tags:            Vec<String>,
  #[serde(default)]
  pub is_announcement: bool,
}

/// `POST /chats/:id/messages`
pub async fn post_message<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<MessageBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("content", non_empty(&body.content), "Message content is required");
  v.finish()?;

  let actor = Actor::from(&user);
  let draft = MessageDraft {
    content:         body.content,
    kind:            body.kind,
    file_url:        body.file_url,
    tags:            body.tags,
    is_announcement: body.is_announcement,
  };
  let now = Utc::now();

  let message = state
    .store
    .update_chat(id, move |room| {
      room.post_message(&actor, draft, now).map(|m| m.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;

  Ok((StatusCode::CREATED, Json(message)))
}

// ─── Reactions & pins ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ReactionBody {
  pub kind: ReactionKind,
}

/// `POST /chats/:id/messages/:message_id/reactions` — replace semantics.
pub async fn set_reaction<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, message_id)): Path<(Uuid, Uuid)>,
  body: Result<Json<ReactionBody>, JsonRejection>,
) -> Result<Json<commons_core::chat::Message>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;
  let now = Utc::now();

  let message = state
    .store
    .update_chat(id, move |room| {
      room
        .set_reaction(message_id, user.user_id, body.kind, now)
        .map(|m| m.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;
  Ok(Json(message))
}

/// `PATCH /chats/:id/messages/:message_id/pin`
pub async fn toggle_pin<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, message_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<commons_core::chat::Message>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let actor = Actor::from(&user);
  let message = state
    .store
    .update_chat(id, move |room| {
      room.toggle_pin(&actor, message_id).map(|m| m.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("chat room", e))?;
  Ok(Json(message))
}
