//! Opportunity postings and the application workflow.
//!
//! Applying is guarded three ways: the posting must be open, the caller must
//! not already appear in the participant list, and the capacity bound (when
//! set) must not be reached. Per-participant status transitions are
//! independent of the posting's own open/closed status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityKind {
  Internship,
  Job,
  Workshop,
  Competition,
  Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpportunityStatus {
  Open,
  Closed,
  Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParticipantStatus {
  Applied,
  Selected,
  Rejected,
}

/// An application, embedded in the posting it applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
  pub user_id:    Uuid,
  pub status:     ParticipantStatus,
  pub applied_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Opportunity {
  pub opportunity_id:   Uuid,
  pub title:            String,
  pub description:      String,
  pub kind:             OpportunityKind,
  pub program:          String,
  pub branch:           String,
  pub deadline:         DateTime<Utc>,
  pub requirements:     Vec<String>,
  pub location:         Option<String>,
  pub stipend:          Option<String>,
  pub duration:         Option<String>,
  pub max_participants: Option<u32>,
  pub status:           OpportunityStatus,
  pub organizer_id:     Uuid,
  pub participants:     Vec<Participant>,
  pub created_at:       DateTime<Utc>,
}

impl Opportunity {
  pub fn participant(&self, user_id: Uuid) -> Option<&Participant> {
    self.participants.iter().find(|p| p.user_id == user_id)
  }

  /// Record an application from `user_id`, enforcing the open / duplicate /
  /// capacity guards.
  pub fn apply(&mut self, user_id: Uuid, now: DateTime<Utc>) -> Result<()> {
    if self.status != OpportunityStatus::Open {
      return Err(Error::NotOpen);
    }
    if self.participant(user_id).is_some() {
      return Err(Error::AlreadyApplied);
    }
    if let Some(max) = self.max_participants
      && self.participants.len() >= max as usize
    {
      return Err(Error::CapacityReached);
    }
    self.participants.push(Participant {
      user_id,
      status: ParticipantStatus::Applied,
      applied_at: now,
    });
    Ok(())
  }

  /// Set the status of an existing participant.
  pub fn set_participant_status(
    &mut self,
    user_id: Uuid,
    status: ParticipantStatus,
  ) -> Result<()> {
    let participant = self
      .participants
      .iter_mut()
      .find(|p| p.user_id == user_id)
      .ok_or(Error::ParticipantNotFound(user_id))?;
    participant.status = status;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn posting(max: Option<u32>) -> Opportunity {
    Opportunity {
      opportunity_id: Uuid::new_v4(),
      title: "summer internship".into(),
      description: "8 weeks".into(),
      kind: OpportunityKind::Internship,
      program: "B.Tech".into(),
      branch: "CSE".into(),
      deadline: Utc::now(),
      requirements: vec![],
      location: None,
      stipend: None,
      duration: None,
      max_participants: max,
      status: OpportunityStatus::Open,
      organizer_id: Uuid::new_v4(),
      participants: Vec::new(),
      created_at: Utc::now(),
    }
  }

  #[test]
  fn apply_records_participant_with_applied_status() {
    let mut o = posting(None);
    let user = Uuid::new_v4();
    o.apply(user, Utc::now()).unwrap();
    assert_eq!(o.participant(user).unwrap().status, ParticipantStatus::Applied);
  }

  #[test]
  fn duplicate_application_is_rejected() {
    let mut o = posting(None);
    let user = Uuid::new_v4();
    o.apply(user, Utc::now()).unwrap();
    assert!(matches!(o.apply(user, Utc::now()), Err(Error::AlreadyApplied)));
  }

  #[test]
  fn apply_at_capacity_is_rejected() {
    let mut o = posting(Some(1));
    o.apply(Uuid::new_v4(), Utc::now()).unwrap();
    assert!(matches!(
      o.apply(Uuid::new_v4(), Utc::now()),
      Err(Error::CapacityReached)
    ));
  }

  #[test]
  fn apply_to_closed_posting_is_rejected() {
    let mut o = posting(None);
    o.status = OpportunityStatus::Closed;
    assert!(matches!(o.apply(Uuid::new_v4(), Utc::now()), Err(Error::NotOpen)));
  }

  #[test]
  fn participant_status_transitions_are_independent_of_posting_status() {
    let mut o = posting(None);
    let user = Uuid::new_v4();
    o.apply(user, Utc::now()).unwrap();
    o.status = OpportunityStatus::Closed;
    o.set_participant_status(user, ParticipantStatus::Selected).unwrap();
    assert_eq!(
      o.participant(user).unwrap().status,
      ParticipantStatus::Selected
    );
  }
}
