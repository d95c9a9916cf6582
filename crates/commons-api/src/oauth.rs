//! Google OAuth sign-in: the consent-page redirect, the code exchange, and
//! the profile-to-account resolution cascade.

use reqwest::Client;
use serde::Deserialize;

use commons_core::{
  store::PortalStore,
  user::{NewUser, User, UserRole},
};

use crate::error::ApiError;

const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
const USERINFO_ENDPOINT: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Google OAuth client settings. Sign-in is disabled when this section is
/// absent from the server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleConfig {
  pub client_id:     String,
  pub client_secret: String,
  /// This server's callback URL, as registered with Google.
  pub redirect_url:  String,
  /// Where to send the browser once the exchange completes.
  pub frontend_url:  String,
}

/// The consent-page URL the client is redirected to.
pub fn authorize_url(config: &GoogleConfig) -> Result<String, ApiError> {
  let url = reqwest::Url::parse_with_params(AUTH_ENDPOINT, &[
    ("client_id", config.client_id.as_str()),
    ("redirect_uri", config.redirect_url.as_str()),
    ("response_type", "code"),
    ("scope", "openid email profile"),
  ])
  .map_err(ApiError::store)?;
  Ok(url.into())
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
  access_token: String,
}

/// The subset of the userinfo document this portal consumes.
#[derive(Debug, Deserialize)]
pub struct GoogleProfile {
  pub id:      String,
  pub email:   String,
  pub name:    String,
  pub picture: Option<String>,
}

/// Exchange an authorization code for the signed-in user's profile.
pub async fn fetch_profile(
  http: &Client,
  config: &GoogleConfig,
  code: &str,
) -> Result<GoogleProfile, ApiError> {
  let token: TokenResponse = http
    .post(TOKEN_ENDPOINT)
    .form(&[
      ("code", code),
      ("client_id", config.client_id.as_str()),
      ("client_secret", config.client_secret.as_str()),
      ("redirect_uri", config.redirect_url.as_str()),
      ("grant_type", "authorization_code"),
    ])
    .send()
    .await
    .map_err(ApiError::store)?
    .error_for_status()
    .map_err(ApiError::store)?
    .json()
    .await
    .map_err(ApiError::store)?;

  http
    .get(USERINFO_ENDPOINT)
    .bearer_auth(&token.access_token)
    .send()
    .await
    .map_err(ApiError::store)?
    .error_for_status()
    .map_err(ApiError::store)?
    .json()
    .await
    .map_err(ApiError::store)
}

/// Resolve a Google profile to a portal account: match on the federated id;
/// else attach the id to an existing account with the same email; else
/// create a student account with unspecified academic attributes.
pub async fn resolve_user<S>(
  store: &S,
  profile: GoogleProfile,
) -> Result<User, ApiError>
where
  S: PortalStore,
{
  if let Some(user) = store
    .find_user_by_google_id(&profile.id)
    .await
    .map_err(ApiError::store)?
  {
    return Ok(user);
  }

  if let Some(user) = store
    .find_user_by_email(&profile.email)
    .await
    .map_err(ApiError::store)?
  {
    let google_id = profile.id;
    return store
      .update_user(user.user_id, move |u| {
        u.google_id = Some(google_id);
        Ok(u.clone())
      })
      .await
      .map_err(|e| ApiError::from_store("user", e));
  }

  store
    .create_user(NewUser {
      name:            profile.name,
      email:           profile.email,
      google_id:       Some(profile.id),
      password_hash:   None,
      role:            UserRole::Student,
      program:         Some("Not Specified".into()),
      branch:          Some("Not Specified".into()),
      semester:        None,
      profile_picture: profile.picture,
    })
    .await
    .map_err(|e| ApiError::from_store("user", e))
}
