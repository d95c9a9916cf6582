//! Shared content items — uploaded documents, media, and links.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
  Document,
  Video,
  Image,
  Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentCategory {
  Academic,
  Research,
  Project,
  Other,
}

/// A shared item. `file_url` is a path under the uploads root
/// (`/uploads/<name>`); deleting the item removes the backing file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentItem {
  pub content_id:  Uuid,
  pub title:       String,
  pub description: String,
  pub kind:        ContentKind,
  pub category:    ContentCategory,
  pub file_url:    Option<String>,
  pub tags:        Vec<String>,
  pub author_id:   Uuid,
  pub views:       u64,
  pub downloads:   u64,
  pub created_at:  DateTime<Utc>,
}

impl ContentItem {
  pub fn new(
    title: String,
    description: String,
    kind: ContentKind,
    category: ContentCategory,
    file_url: Option<String>,
    tags: Vec<String>,
    author_id: Uuid,
    now: DateTime<Utc>,
  ) -> Self {
    Self {
      content_id: Uuid::new_v4(),
      title,
      description,
      kind,
      category,
      file_url,
      tags,
      author_id,
      views: 0,
      downloads: 0,
      created_at: now,
    }
  }
}
