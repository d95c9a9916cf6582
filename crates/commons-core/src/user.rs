//! User accounts — identity, credentials, roles, and academic attributes.
//!
//! A user is created either at registration (local credential) or at first
//! Google sign-in (federated id, no password hash). Student users receive a
//! derived enrollment number exactly once, at creation.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ─── Role ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
  Student,
  Faculty,
  Admin,
}

// ─── Profile extras ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
  Academic,
  Sports,
  Cultural,
  Technical,
  Other,
}

/// An accomplishment listed on a user's profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Achievement {
  pub title:           String,
  pub description:     Option<String>,
  pub date:            Option<NaiveDate>,
  pub category:        Option<AchievementCategory>,
  pub certificate_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
  Beginner,
  Intermediate,
  Advanced,
  Expert,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Skill {
  pub name:  String,
  pub level: SkillLevel,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialLinks {
  pub linkedin:  Option<String>,
  pub github:    Option<String>,
  pub portfolio: Option<String>,
}

// ─── User ────────────────────────────────────────────────────────────────────

/// A portal account. `password_hash` is present iff the account has no
/// federated id; it never leaves the store layer — API responses use
/// [`Profile`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
  pub user_id:           Uuid,
  pub name:              String,
  pub email:             String,
  pub google_id:         Option<String>,
  /// PHC string produced by argon2, e.g. `$argon2id$v=19$…`
  pub password_hash:     Option<String>,
  pub role:              UserRole,
  pub program:           Option<String>,
  pub branch:            Option<String>,
  /// 1 through 8.
  pub semester:          Option<u8>,
  /// Derived once at creation for students; see [`enrollment_number`].
  pub enrollment_number: Option<String>,
  pub bio:               String,
  pub profile_picture:   Option<String>,
  pub achievements:      Vec<Achievement>,
  pub skills:            Vec<Skill>,
  pub social_links:      SocialLinks,
  pub last_login:        DateTime<Utc>,
  pub created_at:        DateTime<Utc>,
}

impl User {
  /// The public view of this account, safe to serialize into responses.
  pub fn profile(&self) -> Profile {
    Profile {
      user_id:           self.user_id,
      name:              self.name.clone(),
      email:             self.email.clone(),
      role:              self.role,
      program:           self.program.clone(),
      branch:            self.branch.clone(),
      semester:          self.semester,
      enrollment_number: self.enrollment_number.clone(),
      bio:               self.bio.clone(),
      profile_picture:   self.profile_picture.clone(),
      achievements:      self.achievements.clone(),
      skills:            self.skills.clone(),
      social_links:      self.social_links.clone(),
      last_login:        self.last_login,
      created_at:        self.created_at,
    }
  }
}

/// Everything about a user except the credential material.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  pub user_id:           Uuid,
  pub name:              String,
  pub email:             String,
  pub role:              UserRole,
  pub program:           Option<String>,
  pub branch:            Option<String>,
  pub semester:          Option<u8>,
  pub enrollment_number: Option<String>,
  pub bio:               String,
  pub profile_picture:   Option<String>,
  pub achievements:      Vec<Achievement>,
  pub skills:            Vec<Skill>,
  pub social_links:      SocialLinks,
  pub last_login:        DateTime<Utc>,
  pub created_at:        DateTime<Utc>,
}

// ─── NewUser ─────────────────────────────────────────────────────────────────

/// Input to [`crate::store::PortalStore::create_user`]. The store assigns the
/// id, the timestamps, and (for students) the enrollment number.
#[derive(Debug, Clone)]
pub struct NewUser {
  pub name:            String,
  pub email:           String,
  pub google_id:       Option<String>,
  pub password_hash:   Option<String>,
  pub role:            UserRole,
  pub program:         Option<String>,
  pub branch:          Option<String>,
  pub semester:        Option<u8>,
  pub profile_picture: Option<String>,
}

// ─── Enrollment numbering ────────────────────────────────────────────────────

/// Two-letter program code: `B.Tech` → `BT`, `M.Tech` → `MT`, anything else
/// (doctoral and unspecified programs) → `PH`.
pub fn program_code(program: &str) -> &'static str {
  match program {
    "B.Tech" => "BT",
    "M.Tech" => "MT",
    _ => "PH",
  }
}

/// Two-letter branch code: the first two characters, uppercased.
pub fn branch_code(branch: &str) -> String {
  branch.chars().take(2).collect::<String>().to_uppercase()
}

/// The shared prefix of all enrollment numbers issued in `year` for a given
/// program and branch: `<2-digit year><program code><branch code>`.
pub fn enrollment_prefix(year: i32, program: &str, branch: &str) -> String {
  format!(
    "{:02}{}{}",
    year.rem_euclid(100),
    program_code(program),
    branch_code(branch)
  )
}

/// A full enrollment number: prefix plus a 4-digit sequence.
pub fn enrollment_number(prefix: &str, sequence: u32) -> String {
  format!("{prefix}{sequence:04}")
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn program_codes() {
    assert_eq!(program_code("B.Tech"), "BT");
    assert_eq!(program_code("M.Tech"), "MT");
    assert_eq!(program_code("PhD"), "PH");
    assert_eq!(program_code("Not Specified"), "PH");
  }

  #[test]
  fn branch_codes_take_first_two_uppercased() {
    assert_eq!(branch_code("CSE"), "CS");
    assert_eq!(branch_code("ECE"), "EC");
    assert_eq!(branch_code("me"), "ME");
  }

  #[test]
  fn first_student_gets_sequence_0001() {
    let prefix = enrollment_prefix(2026, "B.Tech", "CSE");
    assert_eq!(prefix, "26BTCS");
    assert_eq!(enrollment_number(&prefix, 1), "26BTCS0001");
  }

  #[test]
  fn sequence_is_zero_padded() {
    let prefix = enrollment_prefix(2024, "M.Tech", "ECE");
    assert_eq!(enrollment_number(&prefix, 42), "24MTEC0042");
    assert_eq!(enrollment_number(&prefix, 1234), "24MTEC1234");
  }
}
