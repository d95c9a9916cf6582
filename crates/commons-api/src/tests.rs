//! Integration tests driving the full router against an in-memory store.

use std::{path::PathBuf, sync::Arc};

use axum::{
  body::Body,
  http::{Request, StatusCode, header},
};
use chrono::{Datelike as _, Utc};
use serde_json::{Value, json};
use tower::ServiceExt as _;

use commons_store_sqlite::SqliteStore;

use crate::{AppState, ServerConfig, auth::AuthKeys, router};

// ─── Harness ─────────────────────────────────────────────────────────────────

async fn make_state() -> AppState<SqliteStore> {
  let store = SqliteStore::open_in_memory().await.unwrap();
  let uploads_dir =
    std::env::temp_dir().join(format!("commons-test-{}", uuid::Uuid::new_v4()));

  AppState {
    store:  Arc::new(store),
    config: Arc::new(ServerConfig {
      host: "127.0.0.1".to_string(),
      port: 0,
      store_path: PathBuf::from(":memory:"),
      uploads_dir,
      jwt_secret: "test-secret".to_string(),
      token_ttl_hours: 24,
      google: None,
    }),
    auth:   Arc::new(AuthKeys::new("test-secret", 24)),
    http:   reqwest::Client::new(),
  }
}

async fn send(
  state: &AppState<SqliteStore>,
  method: &str,
  uri: &str,
  token: Option<&str>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(token) = token {
    builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
  }
  let request = match body {
    Some(value) => builder
      .header(header::CONTENT_TYPE, "application/json")
      .body(Body::from(value.to_string()))
      .unwrap(),
    None => builder.body(Body::empty()).unwrap(),
  };

  let response = router(state.clone()).oneshot(request).await.unwrap();
  let status = response.status();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap_or(Value::Null)
  };
  (status, value)
}

/// Register an account and return `(token, user json)`.
async fn register(
  state: &AppState<SqliteStore>,
  email: &str,
  role: &str,
  program: &str,
  branch: &str,
  semester: u8,
) -> (String, Value) {
  let (status, body) = send(
    state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "Test User",
      "email": email,
      "password": "secret-password",
      "role": role,
      "program": program,
      "branch": branch,
      "semester": semester,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "register failed: {body}");
  (body["token"].as_str().unwrap().to_owned(), body["user"].clone())
}

async fn student(state: &AppState<SqliteStore>, email: &str) -> (String, Value) {
  register(state, email, "student", "B.Tech", "CSE", 3).await
}

async fn faculty(state: &AppState<SqliteStore>, email: &str) -> (String, Value) {
  register(state, email, "faculty", "B.Tech", "CSE", 1).await
}

/// Create an `all`-category room and return its id.
async fn create_room(state: &AppState<SqliteStore>, token: &str) -> String {
  let (status, body) = send(
    state,
    "POST",
    "/api/chats",
    Some(token),
    Some(json!({ "name": "general", "kind": "general", "category": "all" })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "room create failed: {body}");
  body["chat_id"].as_str().unwrap().to_owned()
}

// ─── Health & auth basics ────────────────────────────────────────────────────

#[tokio::test]
async fn health_is_public() {
  let state = make_state().await;
  let (status, body) = send(&state, "GET", "/api/health", None, None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn requests_without_a_token_are_rejected() {
  let state = make_state().await;
  let (status, _) = send(&state, "GET", "/api/chats", None, None).await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn google_sign_in_is_404_when_not_configured() {
  let state = make_state().await;
  let (status, _) = send(&state, "GET", "/api/auth/google", None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

// ─── Registration & login ────────────────────────────────────────────────────

#[tokio::test]
async fn register_assigns_sequential_enrollment_numbers() {
  let state = make_state().await;
  let prefix =
    commons_core::user::enrollment_prefix(Utc::now().year(), "B.Tech", "CSE");

  let (_, first) = student(&state, "a@example.edu").await;
  let (_, second) = student(&state, "b@example.edu").await;

  assert_eq!(
    first["enrollment_number"].as_str().unwrap(),
    format!("{prefix}0001")
  );
  assert_eq!(
    second["enrollment_number"].as_str().unwrap(),
    format!("{prefix}0002")
  );
}

#[tokio::test]
async fn duplicate_email_registration_is_a_conflict() {
  let state = make_state().await;
  student(&state, "dup@example.edu").await;

  let (status, _) = send(
    &state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "Other",
      "email": "dup@example.edu",
      "password": "secret-password",
      "role": "student",
      "program": "B.Tech",
      "branch": "CSE",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn register_reports_field_level_validation_errors() {
  let state = make_state().await;
  let (status, body) = send(
    &state,
    "POST",
    "/api/auth/register",
    None,
    Some(json!({
      "name": "No Program",
      "email": "np@example.edu",
      "password": "secret-password",
      "role": "student",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);

  let fields: Vec<&str> = body["errors"]
    .as_array()
    .unwrap()
    .iter()
    .map(|e| e["field"].as_str().unwrap())
    .collect();
  assert!(fields.contains(&"program"), "fields: {fields:?}");
  assert!(fields.contains(&"branch"), "fields: {fields:?}");
}

#[tokio::test]
async fn login_roundtrip_and_wrong_password() {
  let state = make_state().await;
  student(&state, "login@example.edu").await;

  let (status, body) = send(
    &state,
    "POST",
    "/api/auth/login",
    None,
    Some(json!({ "email": "login@example.edu", "password": "secret-password" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  let token = body["token"].as_str().unwrap();

  let (status, me) =
    send(&state, "GET", "/api/auth/me", Some(token), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(me["email"], "login@example.edu");

  let (status, _) = send(
    &state,
    "POST",
    "/api/auth/login",
    None,
    Some(json!({ "email": "login@example.edu", "password": "wrong" })),
  )
  .await;
  assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn responses_never_carry_a_password_hash() {
  let state = make_state().await;
  let (token, user) = student(&state, "hash@example.edu").await;
  assert!(user.get("password_hash").is_none());

  let (_, me) = send(&state, "GET", "/api/auth/me", Some(&token), None).await;
  assert!(me.get("password_hash").is_none());
}

// ─── Chat rooms ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn room_creator_is_the_sole_admin() {
  let state = make_state().await;
  let (token, user) = student(&state, "creator@example.edu").await;
  let room_id = create_room(&state, &token).await;

  let (status, room) =
    send(&state, "GET", &format!("/api/chats/{room_id}"), Some(&token), None)
      .await;
  assert_eq!(status, StatusCode::OK);

  let members = room["members"].as_array().unwrap();
  assert_eq!(members.len(), 1);
  assert_eq!(members[0]["user_id"], user["user_id"]);
  assert_eq!(members[0]["role"], "admin");
}

#[tokio::test]
async fn all_rooms_are_listed_for_any_user_and_branch_rooms_are_scoped() {
  let state = make_state().await;
  let (cse_token, _) = student(&state, "cse@example.edu").await;
  let (ece_token, _) =
    register(&state, "ece@example.edu", "student", "B.Tech", "ECE", 3).await;

  // An `all` room plus a branch-scoped B.Tech/CSE room.
  create_room(&state, &cse_token).await;
  let (status, _) = send(
    &state,
    "POST",
    "/api/chats",
    Some(&cse_token),
    Some(json!({
      "name": "cse-corner",
      "kind": "academic",
      "category": "branch",
      "program": "B.Tech",
      "branch": "CSE",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);

  let (_, cse_rooms) =
    send(&state, "GET", "/api/chats", Some(&cse_token), None).await;
  assert_eq!(cse_rooms.as_array().unwrap().len(), 2);

  let (_, ece_rooms) =
    send(&state, "GET", "/api/chats", Some(&ece_token), None).await;
  let names: Vec<&str> = ece_rooms
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["name"].as_str().unwrap())
    .collect();
  assert_eq!(names, vec!["general"]);
}

#[tokio::test]
async fn fetching_a_room_requires_membership() {
  let state = make_state().await;
  let (creator, _) = student(&state, "owner@example.edu").await;
  let (outsider, _) = student(&state, "outsider@example.edu").await;
  let room_id = create_room(&state, &creator).await;

  let (status, _) = send(
    &state,
    "GET",
    &format!("/api/chats/{room_id}"),
    Some(&outsider),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn join_is_idempotent() {
  let state = make_state().await;
  let (creator, _) = student(&state, "c@example.edu").await;
  let (joiner, _) = student(&state, "j@example.edu").await;
  let room_id = create_room(&state, &creator).await;

  let join_uri = format!("/api/chats/{room_id}/join");
  send(&state, "POST", &join_uri, Some(&joiner), None).await;
  let (status, room) = send(&state, "POST", &join_uri, Some(&joiner), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(room["members"].as_array().unwrap().len(), 2);
  assert_eq!(room["stats"]["active_members"], 2);
}

#[tokio::test]
async fn sole_admin_leave_is_a_conflict_until_another_admin_exists() {
  let state = make_state().await;
  let (creator, _) = student(&state, "sole@example.edu").await;
  let (other, other_user) = student(&state, "second@example.edu").await;
  let room_id = create_room(&state, &creator).await;

  send(&state, "POST", &format!("/api/chats/{room_id}/join"), Some(&other), None)
    .await;

  let leave_uri = format!("/api/chats/{room_id}/leave");
  let (status, _) = send(&state, "POST", &leave_uri, Some(&creator), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Promote the second member, then the original admin may leave.
  let member_id = other_user["user_id"].as_str().unwrap();
  let (status, _) = send(
    &state,
    "PATCH",
    &format!("/api/chats/{room_id}/members/{member_id}"),
    Some(&creator),
    Some(json!({ "role": "admin" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let (status, _) = send(&state, "POST", &leave_uri, Some(&creator), None).await;
  assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn announcements_require_an_elevated_member_role() {
  let state = make_state().await;
  let (creator, _) = student(&state, "mod@example.edu").await;
  let (member, member_user) = student(&state, "plain@example.edu").await;
  let room_id = create_room(&state, &creator).await;
  send(&state, "POST", &format!("/api/chats/{room_id}/join"), Some(&member), None)
    .await;

  let messages_uri = format!("/api/chats/{room_id}/messages");
  let announcement = json!({ "content": "exam moved", "is_announcement": true });

  let (status, _) =
    send(&state, "POST", &messages_uri, Some(&member), Some(announcement.clone()))
      .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let member_id = member_user["user_id"].as_str().unwrap();
  send(
    &state,
    "PATCH",
    &format!("/api/chats/{room_id}/members/{member_id}"),
    Some(&creator),
    Some(json!({ "role": "moderator" })),
  )
  .await;

  let (status, message) =
    send(&state, "POST", &messages_uri, Some(&member), Some(announcement)).await;
  assert_eq!(status, StatusCode::CREATED);
  assert_eq!(message["is_announcement"], true);
}

#[tokio::test]
async fn non_members_cannot_post() {
  let state = make_state().await;
  let (creator, _) = student(&state, "ownr@example.edu").await;
  let (outsider, _) = student(&state, "nope@example.edu").await;
  let room_id = create_room(&state, &creator).await;

  let (status, _) = send(
    &state,
    "POST",
    &format!("/api/chats/{room_id}/messages"),
    Some(&outsider),
    Some(json!({ "content": "hi" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn message_stats_match_the_message_list_length() {
  let state = make_state().await;
  let (token, _) = student(&state, "stats@example.edu").await;
  let room_id = create_room(&state, &token).await;

  for i in 0..3 {
    let (status, _) = send(
      &state,
      "POST",
      &format!("/api/chats/{room_id}/messages"),
      Some(&token),
      Some(json!({ "content": format!("message {i}") })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
  }

  let (_, room) =
    send(&state, "GET", &format!("/api/chats/{room_id}"), Some(&token), None)
      .await;
  assert_eq!(room["stats"]["total_messages"], 3);
  assert_eq!(room["messages"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn reacting_twice_replaces_the_previous_reaction() {
  let state = make_state().await;
  let (token, _) = student(&state, "react@example.edu").await;
  let room_id = create_room(&state, &token).await;

  let (_, message) = send(
    &state,
    "POST",
    &format!("/api/chats/{room_id}/messages"),
    Some(&token),
    Some(json!({ "content": "react to me" })),
  )
  .await;
  let message_id = message["message_id"].as_str().unwrap().to_owned();

  let reactions_uri =
    format!("/api/chats/{room_id}/messages/{message_id}/reactions");
  send(&state, "POST", &reactions_uri, Some(&token), Some(json!({ "kind": "like" })))
    .await;
  let (status, updated) = send(
    &state,
    "POST",
    &reactions_uri,
    Some(&token),
    Some(json!({ "kind": "insightful" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  let reactions = updated["reactions"].as_array().unwrap();
  assert_eq!(reactions.len(), 1);
  assert_eq!(reactions[0]["kind"], "insightful");
}

#[tokio::test]
async fn pinning_requires_an_elevated_role_and_toggles() {
  let state = make_state().await;
  let (creator, _) = student(&state, "pin@example.edu").await;
  let (member, _) = student(&state, "pinned-on@example.edu").await;
  let room_id = create_room(&state, &creator).await;
  send(&state, "POST", &format!("/api/chats/{room_id}/join"), Some(&member), None)
    .await;

  let (_, message) = send(
    &state,
    "POST",
    &format!("/api/chats/{room_id}/messages"),
    Some(&creator),
    Some(json!({ "content": "important" })),
  )
  .await;
  let message_id = message["message_id"].as_str().unwrap().to_owned();
  let pin_uri = format!("/api/chats/{room_id}/messages/{message_id}/pin");

  let (status, _) = send(&state, "PATCH", &pin_uri, Some(&member), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, pinned) = send(&state, "PATCH", &pin_uri, Some(&creator), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(pinned["is_pinned"], true);

  let (_, room) =
    send(&state, "GET", &format!("/api/chats/{room_id}"), Some(&creator), None)
      .await;
  assert_eq!(room["pinned_messages"].as_array().unwrap().len(), 1);

  let (_, unpinned) = send(&state, "PATCH", &pin_uri, Some(&creator), None).await;
  assert_eq!(unpinned["is_pinned"], false);
}

// ─── Opportunities ───────────────────────────────────────────────────────────

async fn create_opportunity(
  state: &AppState<SqliteStore>,
  token: &str,
  max_participants: Option<u32>,
) -> String {
  let (status, body) = send(
    state,
    "POST",
    "/api/opportunities",
    Some(token),
    Some(json!({
      "title": "summer internship",
      "description": "8 weeks",
      "type": "internship",
      "program": "B.Tech",
      "branch": "CSE",
      "deadline": "2031-05-01T00:00:00Z",
      "requirements": ["CGPA > 7"],
      "max_participants": max_participants,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "opportunity create failed: {body}");
  body["opportunity_id"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn students_cannot_post_opportunities() {
  let state = make_state().await;
  let (token, _) = student(&state, "s@example.edu").await;
  let (status, _) = send(
    &state,
    "POST",
    "/api/opportunities",
    Some(&token),
    Some(json!({
      "title": "t", "description": "d", "type": "job",
      "program": "B.Tech", "branch": "CSE",
      "deadline": "2031-05-01T00:00:00Z",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn apply_guards_duplicates_capacity_and_status() {
  let state = make_state().await;
  let (organizer, _) = faculty(&state, "org@example.edu").await;
  let (first, _) = student(&state, "one@example.edu").await;
  let (second, _) = student(&state, "two@example.edu").await;

  let id = create_opportunity(&state, &organizer, Some(1)).await;
  let apply_uri = format!("/api/opportunities/{id}/apply");

  let (status, body) = send(&state, "POST", &apply_uri, Some(&first), None).await;
  assert_eq!(status, StatusCode::OK, "first apply failed: {body}");
  assert_eq!(body["participants"].as_array().unwrap().len(), 1);
  assert_eq!(body["participants"][0]["status"], "applied");

  // Duplicate application.
  let (status, _) = send(&state, "POST", &apply_uri, Some(&first), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Capacity reached.
  let (status, _) = send(&state, "POST", &apply_uri, Some(&second), None).await;
  assert_eq!(status, StatusCode::CONFLICT);

  // Applying to a closed posting.
  let closed = create_opportunity(&state, &organizer, None).await;
  send(
    &state,
    "PUT",
    &format!("/api/opportunities/{closed}"),
    Some(&organizer),
    Some(json!({ "status": "closed" })),
  )
  .await;
  let (status, _) = send(
    &state,
    "POST",
    &format!("/api/opportunities/{closed}/apply"),
    Some(&second),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn participant_status_is_set_by_the_organizer_only() {
  let state = make_state().await;
  let (organizer, _) = faculty(&state, "boss@example.edu").await;
  let (bystander, _) = faculty(&state, "other@example.edu").await;
  let (applicant, applicant_user) = student(&state, "appl@example.edu").await;

  let id = create_opportunity(&state, &organizer, None).await;
  send(&state, "POST", &format!("/api/opportunities/{id}/apply"), Some(&applicant), None)
    .await;

  let participant_id = applicant_user["user_id"].as_str().unwrap();
  let status_uri = format!("/api/opportunities/{id}/participants/{participant_id}");

  let (status, _) = send(
    &state,
    "PATCH",
    &status_uri,
    Some(&bystander),
    Some(json!({ "status": "selected" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, body) = send(
    &state,
    "PATCH",
    &status_uri,
    Some(&organizer),
    Some(json!({ "status": "selected" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["participants"][0]["status"], "selected");
}

// ─── Discussions ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn discussion_views_count_and_upvotes_stay_unique() {
  let state = make_state().await;
  let (token, _) = student(&state, "disc@example.edu").await;

  let (status, discussion) = send(
    &state,
    "POST",
    "/api/discussions",
    Some(&token),
    Some(json!({
      "title": "exam schedule",
      "content": "when is the end-sem?",
      "category": "academic",
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED);
  let id = discussion["discussion_id"].as_str().unwrap().to_owned();

  let get_uri = format!("/api/discussions/{id}");
  send(&state, "GET", &get_uri, Some(&token), None).await;
  let (_, fetched) = send(&state, "GET", &get_uri, Some(&token), None).await;
  assert_eq!(fetched["views"], 2);

  let upvote_uri = format!("/api/discussions/{id}/upvote");
  send(&state, "POST", &upvote_uri, Some(&token), None).await;
  let (_, upvoted) = send(&state, "POST", &upvote_uri, Some(&token), None).await;
  assert_eq!(upvoted["upvotes"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn comments_are_editable_by_their_author_only() {
  let state = make_state().await;
  let (author, _) = student(&state, "author@example.edu").await;
  let (other, _) = student(&state, "intruder@example.edu").await;

  let (_, discussion) = send(
    &state,
    "POST",
    "/api/discussions",
    Some(&author),
    Some(json!({ "title": "t", "content": "c", "category": "general" })),
  )
  .await;
  let id = discussion["discussion_id"].as_str().unwrap().to_owned();

  let (_, with_comment) = send(
    &state,
    "POST",
    &format!("/api/discussions/{id}/comments"),
    Some(&author),
    Some(json!({ "content": "first" })),
  )
  .await;
  let comment_id =
    with_comment["comments"][0]["comment_id"].as_str().unwrap().to_owned();

  let comment_uri = format!("/api/discussions/{id}/comments/{comment_id}");
  let (status, _) = send(
    &state,
    "PUT",
    &comment_uri,
    Some(&other),
    Some(json!({ "content": "hijacked" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, updated) = send(
    &state,
    "PUT",
    &comment_uri,
    Some(&author),
    Some(json!({ "content": "edited" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["comments"][0]["content"], "edited");
}

// ─── Calendar ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn calendar_events_are_created_by_faculty_only() {
  let state = make_state().await;
  let (student_token, _) = student(&state, "cal-s@example.edu").await;
  let (faculty_token, _) = faculty(&state, "cal-f@example.edu").await;

  let event = json!({
    "title": "end-sem exams",
    "description": "all branches",
    "starts_at": "2031-05-01T09:00:00Z",
    "ends_at": "2031-05-10T17:00:00Z",
    "type": "exam",
    "category": "student",
  });

  let (status, _) = send(
    &state,
    "POST",
    "/api/calendar",
    Some(&student_token),
    Some(event.clone()),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, created) =
    send(&state, "POST", "/api/calendar", Some(&faculty_token), Some(event)).await;
  assert_eq!(status, StatusCode::CREATED);

  let id = created["event_id"].as_str().unwrap();
  let (status, fetched) = send(
    &state,
    "GET",
    &format!("/api/calendar/{id}"),
    Some(&student_token),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(fetched["title"], "end-sem exams");
}

// ─── Content ─────────────────────────────────────────────────────────────────

fn multipart_body(boundary: &str, fields: &[(&str, &str)]) -> String {
  let mut body = String::new();
  for (name, value) in fields {
    body.push_str(&format!(
      "--{boundary}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
    ));
  }
  body.push_str(&format!("--{boundary}--\r\n"));
  body
}

#[tokio::test]
async fn content_upload_without_file_and_public_listing() {
  let state = make_state().await;
  let (token, _) = student(&state, "upload@example.edu").await;

  let boundary = "commons-test-boundary";
  let body = multipart_body(boundary, &[
    ("title", "lecture notes"),
    ("description", "week 4"),
    ("type", "document"),
    ("category", "academic"),
    ("tags", r#"["cse", "notes"]"#),
  ]);

  let request = Request::builder()
    .method("POST")
    .uri("/api/content")
    .header(header::AUTHORIZATION, format!("Bearer {token}"))
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={boundary}"),
    )
    .body(Body::from(body))
    .unwrap();
  let response = router(state.clone()).oneshot(request).await.unwrap();
  assert_eq!(response.status(), StatusCode::CREATED);

  // Listing is public.
  let (status, items) = send(&state, "GET", "/api/content", None, None).await;
  assert_eq!(status, StatusCode::OK);
  let items = items.as_array().unwrap();
  assert_eq!(items.len(), 1);
  assert_eq!(items[0]["title"], "lecture notes");
  assert_eq!(items[0]["tags"].as_array().unwrap().len(), 2);

  // Downloading an item with no stored file is a 404.
  let id = items[0]["content_id"].as_str().unwrap();
  let (status, _) = send(
    &state,
    "GET",
    &format!("/api/content/{id}/download"),
    None,
    None,
  )
  .await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn content_edits_are_author_or_admin_only() {
  let state = make_state().await;
  let (author, _) = student(&state, "cauthor@example.edu").await;
  let (other, _) = student(&state, "cother@example.edu").await;

  let boundary = "commons-test-boundary";
  let body = multipart_body(boundary, &[
    ("title", "draft"),
    ("description", "v1"),
    ("type", "document"),
    ("category", "project"),
  ]);
  let request = Request::builder()
    .method("POST")
    .uri("/api/content")
    .header(header::AUTHORIZATION, format!("Bearer {author}"))
    .header(
      header::CONTENT_TYPE,
      format!("multipart/form-data; boundary={boundary}"),
    )
    .body(Body::from(body))
    .unwrap();
  let response = router(state.clone()).oneshot(request).await.unwrap();
  let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
  let created: Value = serde_json::from_slice(&bytes).unwrap();
  let id = created["content_id"].as_str().unwrap();

  let uri = format!("/api/content/{id}");
  let (status, _) = send(
    &state,
    "PUT",
    &uri,
    Some(&other),
    Some(json!({ "title": "hijacked" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, updated) = send(
    &state,
    "PUT",
    &uri,
    Some(&author),
    Some(json!({ "title": "final" })),
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(updated["title"], "final");
}
