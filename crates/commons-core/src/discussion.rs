//! Discussion threads with embedded comments and an additive upvote set.
//!
//! Comments are owned by their discussion and share its lifecycle. Upvoting
//! only ever adds the caller's id; there is deliberately no un-upvote
//! operation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionCategory {
  General,
  Academic,
  Technical,
  Other,
}

/// A comment embedded in a discussion, independently timestamped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
  pub comment_id: Uuid,
  pub author_id:  Uuid,
  pub content:    String,
  pub created_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discussion {
  pub discussion_id: Uuid,
  pub title:         String,
  pub content:       String,
  pub category:      DiscussionCategory,
  pub author_id:     Uuid,
  pub is_anonymous:  bool,
  pub tags:          Vec<String>,
  pub views:         u64,
  /// Ids of users who have upvoted. Uniqueness is the mutator's
  /// responsibility ([`Self::upvote`] checks before inserting).
  pub upvotes:       Vec<Uuid>,
  pub comments:      Vec<Comment>,
  pub created_at:    DateTime<Utc>,
  pub updated_at:    DateTime<Utc>,
}

impl Discussion {
  pub fn new(
    title: String,
    content: String,
    category: DiscussionCategory,
    author_id: Uuid,
    is_anonymous: bool,
    tags: Vec<String>,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      discussion_id: Uuid::new_v4(),
      title,
      content,
      category,
      author_id,
      is_anonymous,
      tags,
      views: 0,
      upvotes: Vec::new(),
      comments: Vec::new(),
      created_at: now,
      updated_at: now,
    }
  }

  /// Add `user_id` to the upvote set. Idempotent; there is no way back off
  /// the list.
  pub fn upvote(&mut self, user_id: Uuid) {
    if !self.upvotes.contains(&user_id) {
      self.upvotes.push(user_id);
    }
  }

  /// Append a comment and return a reference to it.
  pub fn add_comment(
    &mut self,
    author_id: Uuid,
    content: String,
    now: DateTime<Utc>,
  ) -> &Comment {
    self.comments.push(Comment {
      comment_id: Uuid::new_v4(),
      author_id,
      content,
      created_at: now,
      updated_at: now,
    });
    self.updated_at = now;
    self.comments.last().expect("just pushed")
  }

  pub fn comment(&self, comment_id: Uuid) -> Option<&Comment> {
    self.comments.iter().find(|c| c.comment_id == comment_id)
  }

  pub fn comment_mut(&mut self, comment_id: Uuid) -> Option<&mut Comment> {
    self.comments.iter_mut().find(|c| c.comment_id == comment_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn discussion() -> Discussion {
    Discussion::new(
      "exam schedule".into(),
      "when is the end-sem?".into(),
      DiscussionCategory::Academic,
      Uuid::new_v4(),
      false,
      vec![],
      Utc::now(),
    )
  }

  #[test]
  fn upvote_is_additive_and_idempotent() {
    let mut d = discussion();
    let voter = Uuid::new_v4();
    d.upvote(voter);
    d.upvote(voter);
    assert_eq!(d.upvotes, vec![voter]);
  }

  #[test]
  fn comments_are_independently_addressable() {
    let mut d = discussion();
    let author = Uuid::new_v4();
    let id = d.add_comment(author, "soon".into(), Utc::now()).comment_id;
    d.add_comment(author, "very soon".into(), Utc::now());
    assert_eq!(d.comments.len(), 2);
    assert_eq!(d.comment(id).unwrap().content, "soon");
  }
}
