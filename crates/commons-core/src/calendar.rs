//! Calendar events with optional audience targeting and recurrence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Academic,
  Fest,
  Holiday,
  Exam,
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
  All,
  Student,
  Faculty,
  Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
  Daily,
  Weekly,
  Monthly,
  Yearly,
}

/// How an event repeats, and (optionally) until when.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recurrence {
  pub pattern: RecurrencePattern,
  pub until:   Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalendarEvent {
  pub event_id:     Uuid,
  pub title:        String,
  pub description:  String,
  pub starts_at:    DateTime<Utc>,
  pub ends_at:      DateTime<Utc>,
  pub kind:         EventKind,
  pub category:     EventCategory,
  pub program:      Option<String>,
  pub branch:       Option<String>,
  pub semester:     Option<u8>,
  pub location:     Option<String>,
  pub recurrence:   Option<Recurrence>,
  pub organizer_id: Uuid,
  pub created_at:   DateTime<Utc>,
}
