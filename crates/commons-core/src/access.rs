//! The consolidated capability check.
//!
//! Every permission decision in the portal funnels through [`check`] so the
//! rules live in one place: room-membership capabilities (post, announce,
//! pin, manage members), organizer-or-admin resources (opportunities,
//! events), and author-or-admin resources (content, discussions, comments).

use std::fmt;

use uuid::Uuid;

use crate::{
  Error, Result,
  calendar::CalendarEvent,
  chat::ChatRoom,
  content::ContentItem,
  discussion::{Comment, Discussion},
  opportunity::Opportunity,
  user::{User, UserRole},
};

/// The acting identity, reduced to what permission decisions need.
#[derive(Debug, Clone, Copy)]
pub struct Actor {
  pub user_id: Uuid,
  pub role:    UserRole,
}

impl From<&User> for Actor {
  fn from(user: &User) -> Self {
    Self { user_id: user.user_id, role: user.role }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
  PostMessage,
  Announce,
  PinMessage,
  ManageMembers,
  ManageParticipants,
  Edit,
  Delete,
}

impl fmt::Display for Permission {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let name = match self {
      Self::PostMessage => "post messages",
      Self::Announce => "make announcements",
      Self::PinMessage => "pin messages",
      Self::ManageMembers => "manage members",
      Self::ManageParticipants => "manage participants",
      Self::Edit => "edit this resource",
      Self::Delete => "delete this resource",
    };
    f.write_str(name)
  }
}

/// The resource a permission is checked against.
#[derive(Debug, Clone, Copy)]
pub enum Target<'a> {
  Room(&'a ChatRoom),
  Opportunity(&'a Opportunity),
  Event(&'a CalendarEvent),
  Discussion(&'a Discussion),
  Comment(&'a Comment),
  Content(&'a ContentItem),
}

/// Decide whether `actor` holds `permission` on `target`.
///
/// Room permissions flow from the actor's member role; a non-member fails
/// with the membership error rather than a role mismatch.
pub fn check(actor: &Actor, target: Target<'_>, permission: Permission) -> Result<()> {
  let allowed = match target {
    Target::Room(room) => {
      let Some(member) = room.member(actor.user_id) else {
        return Err(Error::NotAMember);
      };
      match permission {
        Permission::PostMessage => true,
        Permission::Announce | Permission::PinMessage => member.role.is_elevated(),
        Permission::ManageMembers => member.role == crate::chat::MemberRole::Admin,
        _ => false,
      }
    }
    Target::Opportunity(o) => {
      actor.role == UserRole::Admin || o.organizer_id == actor.user_id
    }
    Target::Event(e) => {
      actor.role == UserRole::Admin || e.organizer_id == actor.user_id
    }
    Target::Discussion(d) => {
      actor.role == UserRole::Admin || d.author_id == actor.user_id
    }
    Target::Comment(c) => {
      actor.role == UserRole::Admin || c.author_id == actor.user_id
    }
    Target::Content(c) => {
      actor.role == UserRole::Admin || c.author_id == actor.user_id
    }
  };

  if allowed { Ok(()) } else { Err(Error::Denied(permission)) }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use crate::opportunity::{OpportunityKind, OpportunityStatus};

  fn actor(role: UserRole) -> Actor {
    Actor { user_id: Uuid::new_v4(), role }
  }

  fn posting(organizer: Uuid) -> Opportunity {
    Opportunity {
      opportunity_id: Uuid::new_v4(),
      title: "t".into(),
      description: "d".into(),
      kind: OpportunityKind::Other,
      program: "B.Tech".into(),
      branch: "CSE".into(),
      deadline: Utc::now(),
      requirements: vec![],
      location: None,
      stipend: None,
      duration: None,
      max_participants: None,
      status: OpportunityStatus::Open,
      organizer_id: organizer,
      participants: vec![],
      created_at: Utc::now(),
    }
  }

  #[test]
  fn organizer_and_admin_manage_participants() {
    let organizer = actor(UserRole::Faculty);
    let o = posting(organizer.user_id);
    assert!(check(&organizer, Target::Opportunity(&o), Permission::ManageParticipants).is_ok());

    let admin = actor(UserRole::Admin);
    assert!(check(&admin, Target::Opportunity(&o), Permission::ManageParticipants).is_ok());

    let bystander = actor(UserRole::Faculty);
    assert!(check(&bystander, Target::Opportunity(&o), Permission::ManageParticipants).is_err());
  }
}
