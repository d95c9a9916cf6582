//! Bearer-token authentication: signing keys, the identity extractor, and
//! the argon2 credential helpers.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use commons_core::{
  store::PortalStore,
  user::{User, UserRole},
};

use crate::{AppState, error::ApiError};

// ─── Keys & claims ───────────────────────────────────────────────────────────

/// HS256 signing material and the token lifetime.
pub struct AuthKeys {
  encoding: EncodingKey,
  decoding: DecodingKey,
  ttl:      Duration,
}

/// The token payload: who, acting as what, until when.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
  pub sub:  Uuid,
  pub role: UserRole,
  pub iat:  i64,
  pub exp:  i64,
}

impl AuthKeys {
  pub fn new(secret: &str, ttl_hours: i64) -> Self {
    Self {
      encoding: EncodingKey::from_secret(secret.as_bytes()),
      decoding: DecodingKey::from_secret(secret.as_bytes()),
      ttl:      Duration::hours(ttl_hours),
    }
  }

  /// Issue a signed token for `user`.
  pub fn issue(&self, user: &User) -> Result<String, ApiError> {
    let now = Utc::now();
    let claims = Claims {
      sub:  user.user_id,
      role: user.role,
      iat:  now.timestamp(),
      exp:  (now + self.ttl).timestamp(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
      .map_err(ApiError::store)
  }

  /// Verify a token's signature and expiry.
  pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
    jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
      .map(|data| data.claims)
      .map_err(|_| ApiError::Unauthorized)
  }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)?
    .to_str()
    .ok()?
    .strip_prefix("Bearer ")
}

// ─── Extractor ───────────────────────────────────────────────────────────────

/// The resolved acting user. Present in a handler means the request carried
/// a valid bearer token for an account that still exists; the account is
/// re-read from the store so role and academic attributes are current.
pub struct AuthUser(pub User);

impl<S> FromRequestParts<AppState<S>> for AuthUser
where
  S: PortalStore + Clone + Send + Sync + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    let token = bearer_token(&parts.headers).ok_or(ApiError::Unauthorized)?;
    let claims = state.auth.verify(token)?;
    let user = state
      .store
      .get_user(claims.sub)
      .await
      .map_err(ApiError::store)?
      .ok_or(ApiError::Unauthorized)?;
    Ok(AuthUser(user))
  }
}

/// Fail with an authorization error unless the user's role is in `allowed`.
pub fn require_role(user: &User, allowed: &[UserRole]) -> Result<(), ApiError> {
  if allowed.contains(&user.role) {
    Ok(())
  } else {
    Err(ApiError::Forbidden("insufficient role for this action".into()))
  }
}

// ─── Credential hashing ──────────────────────────────────────────────────────

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| ApiError::Store(format!("argon2 error: {e}").into()))
}

/// Verify a password against a stored PHC string. An unparseable hash
/// verifies as false rather than erroring.
pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

// ─── Tests ───────────────────────────────────────────────────────────────────
