//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every failure is terminal for its request and surfaces as structured
//! JSON: a `message`, plus a field-level `errors` list for validation
//! failures. Backend faults are logged and reported with a generic message.

use axum::{
  Json,
  extract::{multipart::MultipartError, rejection::JsonRejection},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use commons_core::store::StoreError;

/// One entry of a validation failure report.
#[derive(Debug, Clone, Serialize)]
pub struct FieldError {
  pub field:   String,
  pub message: String,
}

impl FieldError {
  pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
    Self { field: field.into(), message: message.into() }
  }
}

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("validation failed")]
  Validation(Vec<FieldError>),

  #[error("{0}")]
  BadRequest(String),

  #[error("authentication required")]
  Unauthorized,

  #[error("invalid credentials")]
  InvalidCredentials,

  #[error("{0}")]
  Forbidden(String),

  #[error("{0}")]
  NotFound(String),

  #[error("{0}")]
  Conflict(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
  /// Wrap a backend failure.
  pub fn store<E>(error: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(error))
  }

  /// Map a [`StoreError`], naming the aggregate for not-found messages.
  pub fn from_store<E>(label: &str, error: StoreError<E>) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match error {
      StoreError::NotFound => Self::NotFound(format!("{label} not found")),
      StoreError::Domain(domain) => domain.into(),
      StoreError::Backend(backend) => Self::Store(Box::new(backend)),
    }
  }
}

impl From<commons_core::Error> for ApiError {
  fn from(error: commons_core::Error) -> Self {
    use commons_core::Error as E;
    match error {
      E::EmailTaken
      | E::LastAdmin
      | E::NotOpen
      | E::AlreadyApplied
      | E::CapacityReached => Self::Conflict(error.to_string()),
      E::Denied(_) | E::NotAMember | E::NotEligible => {
        Self::Forbidden(error.to_string())
      }
      E::MessageNotFound(_)
      | E::MemberNotFound(_)
      | E::CommentNotFound(_)
      | E::ParticipantNotFound(_) => Self::NotFound(error.to_string()),
      E::FederatedCredential => Self::BadRequest(error.to_string()),
    }
  }
}

impl From<JsonRejection> for ApiError {
  fn from(rejection: JsonRejection) -> Self {
    Self::BadRequest(rejection.body_text())
  }
}

impl From<MultipartError> for ApiError {
  fn from(error: MultipartError) -> Self {
    Self::BadRequest(error.to_string())
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      Self::Validation(errors) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": "Validation failed", "errors": errors })),
      )
        .into_response(),
      Self::BadRequest(message) => {
        (StatusCode::BAD_REQUEST, Json(json!({ "message": message })))
          .into_response()
      }
      Self::Unauthorized | Self::InvalidCredentials => {
        let message = self.to_string();
        let mut res =
          (StatusCode::UNAUTHORIZED, Json(json!({ "message": message })))
            .into_response();
        res.headers_mut().insert(
          header::WWW_AUTHENTICATE,
          HeaderValue::from_static("Bearer"),
        );
        res
      }
      Self::Forbidden(message) => {
        (StatusCode::FORBIDDEN, Json(json!({ "message": message })))
          .into_response()
      }
      Self::NotFound(message) => {
        (StatusCode::NOT_FOUND, Json(json!({ "message": message })))
          .into_response()
      }
      Self::Conflict(message) => {
        (StatusCode::CONFLICT, Json(json!({ "message": message })))
          .into_response()
      }
      Self::Store(error) => {
        tracing::error!("store failure: {error}");
        (
          StatusCode::INTERNAL_SERVER_ERROR,
          Json(json!({ "message": "Server error" })),
        )
          .into_response()
      }
    }
  }
}
