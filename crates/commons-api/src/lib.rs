//! JSON REST API for the Campus Commons portal.
//!
//! Exposes an axum [`Router`] backed by any
//! [`commons_core::store::PortalStore`]. Identity is a bearer token resolved
//! by the [`auth::AuthUser`] extractor; all permission decisions go through
//! `commons_core::access`. The uploads root is served statically alongside
//! the API.

pub mod auth;
pub mod error;
pub mod handlers;
pub mod oauth;

pub use error::{ApiError, FieldError};

use std::{path::PathBuf, sync::Arc};

use axum::{Json, Router, routing::get};
use serde::Deserialize;
use tower_http::{services::ServeDir, trace::TraceLayer};

use commons_core::store::PortalStore;

use auth::AuthKeys;
use oauth::GoogleConfig;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub store_path:  PathBuf,
  pub uploads_dir: PathBuf,
  pub jwt_secret:  String,
  #[serde(default = "default_token_ttl_hours")]
  pub token_ttl_hours: i64,
  /// Google sign-in is disabled when absent.
  pub google:      Option<GoogleConfig>,
}

fn default_token_ttl_hours() -> i64 { 24 }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: PortalStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
  pub auth:   Arc<AuthKeys>,
  /// Used only for the OAuth exchange.
  pub http:   reqwest::Client,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised router for the portal API.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  let uploads = ServeDir::new(&state.config.uploads_dir);

  Router::new()
    .route("/api/health", get(health))
    .route("/api/users/{id}", get(handlers::accounts::get_user_profile::<S>))
    .nest("/api/auth",          handlers::accounts::router::<S>())
    .nest("/api/content",       handlers::content::router::<S>())
    .nest("/api/discussions",   handlers::discussions::router::<S>())
    .nest("/api/calendar",      handlers::calendar::router::<S>())
    .nest("/api/opportunities", handlers::opportunities::router::<S>())
    .nest("/api/chats",         handlers::chats::router::<S>())
    .nest_service("/uploads", uploads)
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
  Json(serde_json::json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests;
