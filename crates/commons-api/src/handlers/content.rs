//! Content handlers: multipart upload, metadata edit, download, delete.
//!
//! Reads and downloads are public; mutations require the author or an
//! admin. The stored file lives under the configured uploads root and dies
//! with its item.

use std::path::Path as FsPath;

use axum::{
  Json, Router,
  body::Bytes,
  extract::{Multipart, Path, State, rejection::JsonRejection},
  http::{StatusCode, header},
  response::{IntoResponse, Response},
  routing::get,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  access::{self, Actor, Permission, Target},
  content::{ContentCategory, ContentItem, ContentKind},
  store::PortalStore,
};

use crate::{
  AppState,
  auth::AuthUser,
  error::{ApiError, FieldError},
  handlers::{Validator, non_empty, parse_enum},
};

pub fn router<S>() -> Router<AppState<S>>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/", get(list::<S>).post(create::<S>))
    .route("/{id}", get(get_one::<S>).put(update::<S>).delete(remove::<S>))
    .route("/{id}/download", get(download::<S>))
}

// ─── List & fetch ─────────────────────────────────────────────────────────────

/// `GET /content` — public, newest first.
pub async fn list<S>(
  State(state): State<AppState<S>>,
) -> Result<Json<Vec<ContentItem>>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let items = state.store.list_content().await.map_err(ApiError::store)?;
  Ok(Json(items))
}

/// `GET /content/:id` — public.
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<ContentItem>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let item = state
    .store
    .get_content(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("content not found".into()))?;
  Ok(Json(item))
}

// ─── Create (multipart) ───────────────────────────────────────────────────────

/// `POST /content` — multipart form: `title`, `description`, `type`,
/// `category`, optional `tags` (JSON array) and `file`.
pub async fn create<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let mut title = None;
  let mut description = None;
  let mut kind: Option<ContentKind> = None;
  let mut category: Option<ContentCategory> = None;
  let mut tags: Vec<String> = Vec::new();
  let mut file: Option<(String, Bytes)> = None;

  while let Some(field) = multipart.next_field().await? {
    match field.name().unwrap_or_default() {
      "title" => title = Some(field.text().await?),
      "description" => description = Some(field.text().await?),
      "type" => kind = parse_enum(&field.text().await?),
      "category" => category = parse_enum(&field.text().await?),
      "tags" => {
        tags = serde_json::from_str(&field.text().await?).map_err(|_| {
          ApiError::Validation(vec![FieldError::new(
            "tags",
            "Tags must be a JSON array of strings",
          )])
        })?;
      }
      "file" => {
        let name = field.file_name().unwrap_or("upload").to_owned();
        let data = field.bytes().await?;
        file = Some((name, data));
      }
      _ => {}
    }
  }

  let mut v = Validator::default();
  v.require(
    "title",
    title.as_deref().is_some_and(non_empty),
    "Title is required",
  );
  v.require(
    "description",
    description.as_deref().is_some_and(non_empty),
    "Description is required",
  );
  v.require("type", kind.is_some(), "Invalid content type");
  v.require("category", category.is_some(), "Invalid category");
  v.finish()?;

  let file_url = match file {
    Some((original_name, data)) => {
      Some(store_upload(&state, &original_name, &data).await?)
    }
    None => None,
  };

  let item = ContentItem::new(
    title.unwrap_or_default(),
    description.unwrap_or_default(),
    kind.unwrap_or(ContentKind::Document),
    category.unwrap_or(ContentCategory::Other),
    file_url,
    tags,
    user.user_id,
    Utc::now(),
  );
  let item = state.store.create_content(item).await.map_err(ApiError::store)?;
  Ok((StatusCode::CREATED, Json(item)))
}

/// Write an uploaded file under the uploads root with a fresh name, keeping
/// the original extension. Returns the `/uploads/...` reference.
async fn store_upload<S>(
  state: &AppState<S>,
  original_name: &str,
  data: &[u8],
) -> Result<String, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let extension = FsPath::new(original_name)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| format!(".{e}"))
    .unwrap_or_default();
  let stored = format!("{}{extension}", Uuid::new_v4());

  let dir = &state.config.uploads_dir;
  tokio::fs::create_dir_all(dir).await.map_err(ApiError::store)?;
  tokio::fs::write(dir.join(&stored), data).await.map_err(ApiError::store)?;
  Ok(format!("/uploads/{stored}"))
}

// ─── Download ─────────────────────────────────────────────────────────────────

/// `GET /content/:id/download` — public; counts the download and serves the
/// stored file as an attachment named after the item.
pub async fn download<S>(
  State(state): State<AppState<S>>,
  Path(id): Path<Uuid>,
) -> Result<Response, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let item = state
    .store
    .get_content(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("content not found".into()))?;

  let Some(file_url) = item.file_url.as_deref() else {
    return Err(ApiError::NotFound(
      "no file associated with this content".into(),
    ));
  };
  let stored = file_url.strip_prefix("/uploads/").unwrap_or(file_url);
  let path = state.config.uploads_dir.join(stored);
  let data = tokio::fs::read(&path)
    .await
    .map_err(|_| ApiError::NotFound("file not found on server".into()))?;

  state
    .store
    .update_content(id, |c| {
      c.downloads += 1;
      Ok(())
    })
    .await
    .map_err(|e| ApiError::from_store("content", e))?;

  let extension = FsPath::new(stored)
    .extension()
    .and_then(|e| e.to_str())
    .map(|e| format!(".{e}"))
    .unwrap_or_default();
  let disposition =
    format!("attachment; filename=\"{}{extension}\"", item.title);

  Ok(
    (
      [
        (header::CONTENT_TYPE, "application/octet-stream".to_owned()),
        (header::CONTENT_DISPOSITION, disposition),
      ],
      data,
    )
      .into_response(),
  )
}

// ─── Edit & delete ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateContentBody {
  pub title:       Option<String>,
  pub description: Option<String>,
  #[serde(rename = "type")]
  pub kind:        Option<ContentKind>,
  pub category:    Option<ContentCategory>,
  pub tags:        Option<Vec<String>>,
}

/// `PUT /content/:id` — metadata only; author or admin.
pub async fn update<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
  body: Result<Json<UpdateContentBody>, JsonRejection>,
) -> Result<Json<ContentItem>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
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
  let item = state
    .store
    .update_content(id, move |c| {
      access::check(&actor, Target::Content(c), Permission::Edit)?;
      if let Some(title) = body.title {
        c.title = title;
      }
      if let Some(description) = body.description {
        c.description = description;
      }
      if let Some(kind) = body.kind {
        c.kind = kind;
      }
      if let Some(category) = body.category {
        c.category = category;
      }
      if let Some(tags) = body.tags {
        c.tags = tags;
      }
      Ok(c.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("content", e))?;
  Ok(Json(item))
}

/// `DELETE /content/:id` — author or admin; removes the backing file.
pub async fn remove<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let item = state
    .store
    .get_content(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("content not found".into()))?;

  let actor = Actor::from(&user);
  access::check(&actor, Target::Content(&item), Permission::Delete)?;

  let removed = state.store.delete_content(id).await.map_err(ApiError::store)?;
  if let Some(file_url) = removed.and_then(|r| r.file_url) {
    let stored = file_url.strip_prefix("/uploads/").unwrap_or(&file_url);
    let _ = tokio::fs::remove_file(state.config.uploads_dir.join(stored)).await;
  }
  Ok(Json(json!({ "message": "content deleted" })))
}
