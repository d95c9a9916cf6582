//! Discussion handlers: threads, comments, and additive upvoting.

use axum::{
  Json, Router,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::IntoResponse,
  routing::{get, post, put},
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  access::{self, Actor, Permission, Target},
  discussion::{Discussion, DiscussionCategory},
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
    .route("/", get(list::<S>).post(create::<S>))
    .route("/{id}", get(get_one::<S>).put(update::<S>).delete(remove::<S>))
    .route("/{id}/upvote", post(upvote::<S>))
    .route("/{id}/comments", post(add_comment::<S>))
    .route(
      "/{id}/comments/{comment_id}",
      put(update_comment::<S>).delete(delete_comment::<S>),
    )
}

// ─── List & fetch ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub category: Option<DiscussionCategory>,
}

/// `GET /discussions[?category=<category>]`
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<Discussion>>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let discussions = state
    .store
    .list_discussions(params.category)
    .await
    .map_err(ApiError::store)?;
  Ok(Json(discussions))
}

/// `GET /discussions/:id` — also counts the view.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let discussion = state
    .store
    .update_discussion(id, |d| {
      d.views += 1;
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}

// ─── Create & edit ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateDiscussionBody {
  pub title:        String,
  pub content:      String,
  pub category:     DiscussionCategory,
  #[serde(default)]
  pub is_anonymous: bool,
  #[serde(default)]
  pub tags:         Vec<String>,
}

/// `POST /discussions`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<CreateDiscussionBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("title", non_empty(&body.title), "Title is required");
  v.require("content", non_empty(&body.content), "Content is required");
  v.finish()?;

  let discussion = Discussion::new(
    body.title,
    body.content,
    body.category,
    user.user_id,
    body.is_anonymous,
    body.tags,
    Utc::now(),
  );
  let discussion = state
    .store
    .create_discussion(discussion)
    .await
    .map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(discussion)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDiscussionBody {
  pub title:    Option<String>,
  pub content:  Option<String>,
  pub category: Option<DiscussionCategory>,
}

/// `PUT /discussions/:id` — author or admin.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<UpdateDiscussionBody>, JsonRejection>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  if let Some(title) = body.title.as_deref() {
    v.require("title", non_empty(title), "Title cannot be empty");
  }
  if let Some(content) = body.content.as_deref() {
    v.require("content", non_empty(content), "Content cannot be empty");
  }
  v.finish()?;

  let actor = Actor::from(&user);
  let now = Utc::now();
  let discussion = state
    .store
    .update_discussion(id, move |d| {
      access::check(&actor, Target::Discussion(d), Permission::Edit)?;
      if let Some(title) = body.title {
        d.title = title;
      }
      if let Some(content) = body.content {
        d.content = content;
      }
      if let Some(category) = body.category {
        d.category = category;
      }
      d.updated_at = now;
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}

/// `DELETE /discussions/:id` — author or admin; embedded comments go too.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let discussion = state
    .store
    .get_discussion(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("discussion not found".into()))?;

  let actor = Actor::from(&user);
  access::check(&actor, Target::Discussion(&discussion), Permission::Delete)?;

  state.store.delete_discussion(id).await.map_err(ApiError::store)?;
  Ok(Json(json!({ "message": "discussion deleted" })))
}

// ─── Upvotes ──────────────────────────────────────────────────────────────────

/// `POST /discussions/:id/upvote` — additive; there is no way back off the
/// upvote list.
pub async fn upvote<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let discussion = state
    .store
    .update_discussion(id, move |d| {
      d.upvote(user.user_id);
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}

// ─── Comments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CommentBody {
  pub content: String,
}

/// `POST /discussions/:id/comments`
pub async fn add_comment<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("content", non_empty(&body.content), "Comment content is required");
  v.finish()?;

  let now = Utc::now();
  let discussion = state
    .store
    .update_discussion(id, move |d| {
      d.add_comment(user.user_id, body.content, now);
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}

/// `PUT /discussions/:id/comments/:comment_id` — comment author or admin.
pub async fn update_comment<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, comment_id)): Path<(Uuid, Uuid)>,
  body: Result<Json<CommentBody>, JsonRejection>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("content", non_empty(&body.content), "Comment content is required");
  v.finish()?;

  let actor = Actor::from(&user);
  let now = Utc::now();
  let discussion = state
    .store
    .update_discussion(id, move |d| {
      let Some(comment) = d.comment_mut(comment_id) else {
        return Err(commons_core::Error::CommentNotFound(comment_id));
      };
      access::check(&actor, Target::Comment(comment), Permission::Edit)?;
      comment.content = body.content;
      comment.updated_at = now;
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}

/// `DELETE /discussions/:id/comments/:comment_id` — comment author or admin.
pub async fn delete_comment<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path((id, comment_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Discussion>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let actor = Actor::from(&user);
  let discussion = state
    .store
    .update_discussion(id, move |d| {
      let Some(index) =
        d.comments.iter().position(|c| c.comment_id == comment_id)
      else {
        return Err(commons_core::Error::CommentNotFound(comment_id));
      };
      access::check(&actor, Target::Comment(&d.comments[index]), Permission::Delete)?;
      d.comments.remove(index);
      Ok(d.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("discussion", e))?;
  Ok(Json(discussion))
}
