//! Error types for `commons-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::access::Permission;

#[derive(Debug, Error)]
pub enum Error {
  #[error("email is already registered")]
  EmailTaken,

  #[error("not a member of this chat room")]
  NotAMember,

  #[error("cannot step down as the last admin; transfer the admin role first")]
  LastAdmin,

  #[error("this room is not open to your account")]
  NotEligible,

  #[error("message not found: {0}")]
  MessageNotFound(Uuid),

  #[error("member not found: {0}")]
  MemberNotFound(Uuid),

  #[error("comment not found: {0}")]
  CommentNotFound(Uuid),

  #[error("participant not found: {0}")]
  ParticipantNotFound(Uuid),

  #[error("opportunity is not open for applications")]
  NotOpen,

  #[error("already applied to this opportunity")]
  AlreadyApplied,

  #[error("maximum number of participants reached")]
  CapacityReached,

  #[error("password change is not available for federated accounts")]
  FederatedCredential,

  #[error("permission denied: {0}")]
  Denied(Permission),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
