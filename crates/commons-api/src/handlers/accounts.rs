//! Account handlers: registration, login, the current-user surface, and
//! Google sign-in.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/auth/register` | Local credential; students get an enrollment number |
//! | `POST` | `/auth/login` | Issues a bearer token |
//! | `GET`  | `/auth/me` | The resolved current user |
//! | `PUT`  | `/auth/profile` | Partial profile update |
//! | `PUT`  | `/auth/password` | Rejected for federated accounts |
//! | `GET`  | `/auth/google` → `/auth/google/callback` | OAuth round trip |
//! | `GET`  | `/users/:id` | Public profile for reference resolution |

use axum::{
  Json, Router,
  extract::{Path, Query, State, rejection::JsonRejection},
  http::StatusCode,
  response::{IntoResponse, Redirect, Response},
  routing::{get, post, put},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use commons_core::{
  store::PortalStore,
  user::{Achievement, NewUser, Profile, Skill, SocialLinks, UserRole},
};

use crate::{
  AppState,
  auth::{self, AuthUser},
  error::ApiError,
  handlers::{Validator, non_empty},
  oauth::{self, GoogleConfig},
};

pub fn router<S>() -> Router<AppState<S>>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  Router::new()
    .route("/register", post(register::<S>))
    .route("/login", post(login::<S>))
    .route("/me", get(me))
    .route("/profile", put(update_profile::<S>))
    .route("/password", put(change_password::<S>))
    .route("/google", get(google_start::<S>))
    .route("/google/callback", get(google_callback::<S>))
}

// ─── Register ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:     String,
  pub email:    String,
  pub password: String,
  pub role:     UserRole,
  pub program:  Option<String>,
  pub branch:   Option<String>,
  pub semester: Option<u8>,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
  pub token: String,
  pub user:  Profile,
}

/// `POST /auth/register`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<RegisterBody>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require("name", non_empty(&body.name), "Name is required");
  v.require("email", body.email.contains('@'), "Please enter a valid email");
  v.require(
    "password",
    body.password.chars().count() >= 6,
    "Password must be at least 6 characters long",
  );
  if matches!(body.role, UserRole::Student | UserRole::Faculty) {
    v.require(
      "program",
      body.program.as_deref().is_some_and(non_empty),
      "Program is required",
    );
    v.require(
      "branch",
      body.branch.as_deref().is_some_and(non_empty),
      "Branch is required",
    );
  }
  if let Some(semester) = body.semester {
    v.require(
      "semester",
      (1..=8).contains(&semester),
      "Semester must be between 1 and 8",
    );
  }
  v.finish()?;

  let password_hash = auth::hash_password(&body.password)?;
  let user = state
    .store
    .create_user(NewUser {
      name:            body.name,
      email:           body.email,
      google_id:       None,
      password_hash:   Some(password_hash),
      role:            body.role,
      program:         body.program,
      branch:          body.branch,
      semester:        body.semester,
      profile_picture: None,
    })
    .await
    .map_err(|e| ApiError::from_store("user", e))?;

  let token = state.auth.issue(&user)?;
  Ok((
    StatusCode::CREATED,
    Json(TokenResponse { token, user: user.profile() }),
  ))
}

// ─── Login ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct LoginBody {
  pub email:    String,
  pub password: String,
}

/// `POST /auth/login` — unknown email and wrong password are deliberately
/// indistinguishable.
pub async fn login<S>(
  State(state): State<AppState<S>>,
  body: Result<Json<LoginBody>, JsonRejection>,
) -> Result<Json<TokenResponse>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let user = state
    .store
    .find_user_by_email(&body.email)
    .await
    .map_err(ApiError::store)?
    .ok_or(ApiError::InvalidCredentials)?;

  let Some(hash) = user.password_hash.as_deref() else {
    return Err(ApiError::InvalidCredentials);
  };
  if !auth::verify_password(&body.password, hash) {
    return Err(ApiError::InvalidCredentials);
  }

  let now = Utc::now();
  let user = state
    .store
    .update_user(user.user_id, move |u| {
      u.last_login = now;
      Ok(u.clone())
    })
    .await
    .map_err(|e| ApiError::from_store("user", e))?;

  let token = state.auth.issue(&user)?;
  Ok(Json(TokenResponse { token, user: user.profile() }))
}

// ─── Current user ─────────────────────────────────────────────────────────────

/// `GET /auth/me`
pub async fn me(AuthUser(user): AuthUser) -> Json<Profile> {
  Json(user.profile())
}

/// `GET /users/:id` — the public profile, for resolving author/organizer/
/// sender references client-side.
pub async fn get_user_profile<S>(
  State(state): State<AppState<S>>,
  _caller: AuthUser,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let user = state
    .store
    .get_user(id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id} not found")))?;
  Ok(Json(user.profile()))
}

// ─── Profile update ───────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct UpdateProfileBody {
  pub name:         Option<String>,
  pub program:      Option<String>,
  pub branch:       Option<String>,
  pub semester:     Option<u8>,
  pub bio:          Option<String>,
  pub achievements: Option<Vec<Achievement>>,
  pub skills:       Option<Vec<Skill>>,
  pub social_links: Option<SocialLinks>,
}

/// `PUT /auth/profile`
pub async fn update_profile<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<UpdateProfileBody>, JsonRejection>,
) -> Result<Json<Profile>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  if let Some(name) = body.name.as_deref() {
    v.require("name", non_empty(name), "Name cannot be empty");
  }
  if let Some(semester) = body.semester {
    v.require(
      "semester",
      (1..=8).contains(&semester),
      "Semester must be between 1 and 8",
    );
  }
  v.finish()?;

  let updated = state
    .store
    .update_user(user.user_id, move |u| {
      if let Some(name) = body.name {
        u.name = name;
      }
      if let Some(program) = body.program {
        u.program = Some(program);
      }
      if let Some(branch) = body.branch {
        u.branch = Some(branch);
      }
      if let Some(semester) = body.semester {
        u.semester = Some(semester);
      }
      if let Some(bio) = body.bio {
        u.bio = bio;
      }
      if let Some(achievements) = body.achievements {
        u.achievements = achievements;
      }
      if let Some(skills) = body.skills {
        u.skills = skills;
      }
      if let Some(social_links) = body.social_links {
        u.social_links = social_links;
      }
      Ok(u.profile())
    })
    .await
    .map_err(|e| ApiError::from_store("user", e))?;

  Ok(Json(updated))
}

// ─── Password change ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ChangePasswordBody {
  pub current_password: String,
  pub new_password:     String,
}

/// `PUT /auth/password`
pub async fn change_password<S>(
  State(state): State<AppState<S>>,
  AuthUser(user): AuthUser,
  body: Result<Json<ChangePasswordBody>, JsonRejection>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Json(body) = body?;

  let mut v = Validator::default();
  v.require(
    "new_password",
    body.new_password.chars().count() >= 6,
    "New password must be at least 6 characters long",
  );
  v.finish()?;

  let Some(hash) = user.password_hash.as_deref() else {
    return Err(commons_core::Error::FederatedCredential.into());
  };
  if !auth::verify_password(&body.current_password, hash) {
    return Err(ApiError::BadRequest("Current password is incorrect".into()));
  }

  let new_hash = auth::hash_password(&body.new_password)?;
  state
    .store
    .update_user(user.user_id, move |u| {
      u.password_hash = Some(new_hash);
      Ok(())
    })
    .await
    .map_err(|e| ApiError::from_store("user", e))?;

  Ok(Json(json!({ "message": "Password updated successfully" })))
}

// ─── Google sign-in ───────────────────────────────────────────────────────────

/// `GET /auth/google` — redirect to the consent page.
pub async fn google_start<S>(
  State(state): State<AppState<S>>,
) -> Result<Redirect, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let google = state
    .config
    .google
    .as_ref()
    .ok_or_else(|| ApiError::NotFound("google sign-in is not configured".into()))?;
  Ok(Redirect::temporary(&oauth::authorize_url(google)?))
}

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub code: Option<String>,
}

/// `GET /auth/google/callback` — complete the exchange and bounce back to
/// the frontend, carrying either a token or an error marker.
pub async fn google_callback<S>(
  State(state): State<AppState<S>>,
  Query(params): Query<CallbackParams>,
) -> Response
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let Some(google) = state.config.google.clone() else {
    return ApiError::NotFound("google sign-in is not configured".into())
      .into_response();
  };

  let result = match params.code.as_deref() {
    Some(code) => complete_sign_in(&state, &google, code).await,
    None => Err(ApiError::BadRequest("missing authorization code".into())),
  };

  match result {
    Ok(token) => Redirect::temporary(&format!(
      "{}/auth/google?token={token}",
      google.frontend_url
    ))
    .into_response(),
    Err(error) => {
      tracing::warn!("google sign-in failed: {error}");
      Redirect::temporary(&format!(
        "{}/login?error=google_auth_failed",
        google.frontend_url
      ))
      .into_response()
    }
  }
}

async fn complete_sign_in<S>(
  state: &AppState<S>,
  google: &GoogleConfig,
  code: &str,
) -> Result<String, ApiError>
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let profile = oauth::fetch_profile(&state.http, google, code).await?;
  let user = oauth::resolve_user(state.store.as_ref(), profile).await?;
  state.auth.issue(&user)
}
