//! Chat rooms — the portal's richest aggregate.
//!
//! A room embeds its members, its messages (which embed their reactions), and
//! a pinned-message id list, plus a derived stats block. All mutation goes
//! through the owning room so the message/reaction/pin bookkeeping can never
//! drift: stats are recomputed from the full message list whenever it
//! changes, and the pinned-id list is kept in sync with the per-message flag.
//!
//! Two invariants are load-bearing:
//! - every room has at least one admin, from creation onward;
//! - a user holds at most one reaction per message (replace semantics).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  access::{self, Actor, Permission, Target},
  user::{User, UserRole},
};

// ─── Enumerations ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
  General,
  Academic,
  Project,
  Achievement,
  Resource,
  Mentorship,
}

/// Drives audience targeting; see [`ChatRoom::is_visible_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomCategory {
  All,
  Program,
  Branch,
  Semester,
  Faculty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
  Admin,
  Moderator,
  Member,
}

impl MemberRole {
  /// Admins and moderators may announce and pin.
  pub fn is_elevated(self) -> bool {
    matches!(self, Self::Admin | Self::Moderator)
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
  Text,
  Image,
  File,
  Achievement,
  Resource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReactionKind {
  Like,
  Insightful,
  Helpful,
  Motivating,
}

// ─── Embedded sub-documents ──────────────────────────────────────────────────

/// A room rule shown to prospective members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
  pub title:       String,
  pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
  pub user_id:     Uuid,
  pub role:        MemberRole,
  pub joined_at:   DateTime<Utc>,
  pub last_active: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
  pub user_id:    Uuid,
  pub kind:       ReactionKind,
  pub reacted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct MessageStats {
  pub views:  u64,
  pub shares: u64,
  pub saves:  u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
  pub message_id:      Uuid,
  pub sender_id:       Uuid,
  pub content:         String,
  pub kind:            MessageKind,
  pub file_url:        Option<String>,
  pub tags:            Vec<String>,
  pub reactions:       Vec<Reaction>,
  pub is_pinned:       bool,
  pub is_announcement: bool,
  pub stats:           MessageStats,
  pub sent_at:         DateTime<Utc>,
}

/// Caller-supplied message fields; the room assigns the id and timestamp.
#[derive(Debug, Clone)]
pub struct MessageDraft {
  pub content:         String,
  pub kind:            MessageKind,
  pub file_url:        Option<String>,
  pub tags:            Vec<String>,
  pub is_announcement: bool,
}

/// Derived counters, recomputed whenever the message or member list changes.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct RoomStats {
  pub total_messages:  u64,
  pub total_reactions: u64,
  pub active_members:  u64,
}

// ─── ChatRoom ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
  pub chat_id:         Uuid,
  pub name:            String,
  pub kind:            RoomKind,
  pub category:        RoomCategory,
  pub description:     Option<String>,
  pub rules:           Vec<Rule>,
  pub program:         Option<String>,
  pub branch:          Option<String>,
  pub semester:        Option<u8>,
  pub members:         Vec<Member>,
  pub messages:        Vec<Message>,
  pub pinned_messages: Vec<Uuid>,
  pub is_active:       bool,
  pub stats:           RoomStats,
  pub created_at:      DateTime<Utc>,
}

impl ChatRoom {
  /// Create a room with `creator` as its sole member, holding the admin
  /// role. This establishes the at-least-one-admin invariant.
  #[allow(clippy::too_many_arguments)]
  pub fn new(
    name: String,
    kind: RoomKind,
    category: RoomCategory,
    description: Option<String>,
    rules: Vec<Rule>,
    program: Option<String>,
    branch: Option<String>,
    semester: Option<u8>,
    creator: Uuid,
    now: DateTime<Utc>,
  ) -> Self {
    let mut room = Self {
      chat_id: Uuid::new_v4(),
      name,
      kind,
      category,
      description,
      rules,
      program,
      branch,
      semester,
      members: vec![Member {
        user_id:     creator,
        role:        MemberRole::Admin,
        joined_at:   now,
        last_active: now,
      }],
      messages: Vec::new(),
      pinned_messages: Vec::new(),
      is_active: true,
      stats: RoomStats::default(),
      created_at: now,
    };
    room.stats.active_members = room.members.len() as u64;
    room
  }

  // ── Lookup ────────────────────────────────────────────────────────────

  pub fn member(&self, user_id: Uuid) -> Option<&Member> {
    self.members.iter().find(|m| m.user_id == user_id)
  }

  pub fn is_member(&self, user_id: Uuid) -> bool {
    self.member(user_id).is_some()
  }

  pub fn message(&self, message_id: Uuid) -> Option<&Message> {
    self.messages.iter().find(|m| m.message_id == message_id)
  }

  fn admin_count(&self) -> usize {
    self
      .members
      .iter()
      .filter(|m| m.role == MemberRole::Admin)
      .count()
  }

  // ── Membership ────────────────────────────────────────────────────────

  /// Add `user_id` as a plain member. Adding an existing member is a no-op.
  pub fn join(&mut self, user_id: Uuid, now: DateTime<Utc>) {
    if !self.is_member(user_id) {
      self.members.push(Member {
        user_id,
        role: MemberRole::Member,
        joined_at: now,
        last_active: now,
      });
    }
    self.stats.active_members = self.members.len() as u64;
  }

  /// Remove `user_id` from the room. Rejected when it would leave the room
  /// without an admin; leaving a room one is not in is a no-op.
  pub fn leave(&mut self, user_id: Uuid) -> Result<()> {
    if let Some(member) = self.member(user_id)
      && member.role == MemberRole::Admin
      && self.admin_count() == 1
    {
      return Err(Error::LastAdmin);
    }
    self.members.retain(|m| m.user_id != user_id);
    self.stats.active_members = self.members.len() as u64;
    Ok(())
  }

  /// Change a member's role. Requires the acting user to hold the room-admin
  /// capability; demoting the last admin is rejected.
  pub fn set_member_role(
    &mut self,
    actor: &Actor,
    user_id: Uuid,
    role: MemberRole,
  ) -> Result<()> {
    access::check(actor, Target::Room(self), Permission::ManageMembers)?;
    let current = self
      .member(user_id)
      .ok_or(Error::MemberNotFound(user_id))?
      .role;
    if current == MemberRole::Admin
      && role != MemberRole::Admin
      && self.admin_count() == 1
    {
      return Err(Error::LastAdmin);
    }
    for m in &mut self.members {
      if m.user_id == user_id {
        m.role = role;
      }
    }
    Ok(())
  }

  // ── Messages ──────────────────────────────────────────────────────────

  /// Append a message from `actor`. Membership is required; the announcement
  /// flag additionally requires an elevated member role. Stats are
  /// recomputed from the full message list before returning.
  pub fn post_message(
    &mut self,
    actor: &Actor,
    draft: MessageDraft,
    now: DateTime<Utc>,
  ) -> Result<&Message> {
    access::check(actor, Target::Room(self), Permission::PostMessage)?;
    if draft.is_announcement {
      access::check(actor, Target::Room(self), Permission::Announce)?;
    }

    self.messages.push(Message {
      message_id:      Uuid::new_v4(),
      sender_id:       actor.user_id,
      content:         draft.content,
      kind:            draft.kind,
      file_url:        draft.file_url,
      tags:            draft.tags,
      reactions:       Vec::new(),
      is_pinned:       false,
      is_announcement: draft.is_announcement,
      stats:           MessageStats::default(),
      sent_at:         now,
    });
    for m in &mut self.members {
      if m.user_id == actor.user_id {
        m.last_active = now;
      }
    }
    self.recompute_message_stats();
    Ok(self.messages.last().expect("just pushed"))
  }

  /// Set `user_id`'s reaction on a message. Any previous reaction by the
  /// same user is removed first, so switching kinds is a remove-then-insert
  /// and the per-user uniqueness invariant holds.
  pub fn set_reaction(
    &mut self,
    message_id: Uuid,
    user_id: Uuid,
    kind: ReactionKind,
    now: DateTime<Utc>,
  ) -> Result<&Message> {
    let index = self
      .messages
      .iter()
      .position(|m| m.message_id == message_id)
      .ok_or(Error::MessageNotFound(message_id))?;

    let message = &mut self.messages[index];
    message.reactions.retain(|r| r.user_id != user_id);
    message.reactions.push(Reaction { user_id, kind, reacted_at: now });

    self.recompute_message_stats();
    Ok(&self.messages[index])
  }

  /// Toggle a message's pinned flag and synchronise the room-level pinned-id
  /// list. Requires an elevated member role.
  pub fn toggle_pin(&mut self, actor: &Actor, message_id: Uuid) -> Result<&Message> {
    access::check(actor, Target::Room(self), Permission::PinMessage)?;
    let index = self
      .messages
      .iter()
      .position(|m| m.message_id == message_id)
      .ok_or(Error::MessageNotFound(message_id))?;

    let pinned = {
      let message = &mut self.messages[index];
      message.is_pinned = !message.is_pinned;
      message.is_pinned
    };
    if pinned {
      if !self.pinned_messages.contains(&message_id) {
        self.pinned_messages.push(message_id);
      }
    } else {
      self.pinned_messages.retain(|id| *id != message_id);
    }
    Ok(&self.messages[index])
  }

  fn recompute_message_stats(&mut self) {
    self.stats.total_messages = self.messages.len() as u64;
    self.stats.total_reactions = self
      .messages
      .iter()
      .map(|m| m.reactions.len() as u64)
      .sum();
  }

  // ── Targeting ─────────────────────────────────────────────────────────

  /// Whether `user` may discover (and therefore join) this room.
  ///
  /// Faculty and admin accounts see every active room. For students the
  /// match widens with the category: a program room requires program
  /// equality, a branch room program+branch, a semester room
  /// program+branch+semester. Faculty-category rooms are invisible to
  /// students. Inactive rooms are invisible to everyone.
  pub fn is_visible_to(&self, user: &User) -> bool {
    if !self.is_active {
      return false;
    }
    if matches!(user.role, UserRole::Faculty | UserRole::Admin) {
      return true;
    }
    match self.category {
      RoomCategory::All => true,
      RoomCategory::Program => self.program_matches(user),
      RoomCategory::Branch => self.program_matches(user) && self.branch_matches(user),
      RoomCategory::Semester => {
        self.program_matches(user)
          && self.branch_matches(user)
          && self.semester_matches(user)
      }
      RoomCategory::Faculty => false,
    }
  }

  fn program_matches(&self, user: &User) -> bool {
    matches!((&self.program, &user.program), (Some(a), Some(b)) if a == b)
  }

  fn branch_matches(&self, user: &User) -> bool {
    matches!((&self.branch, &user.branch), (Some(a), Some(b)) if a == b)
  }

  fn semester_matches(&self, user: &User) -> bool {
    matches!((self.semester, user.semester), (Some(a), Some(b)) if a == b)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
