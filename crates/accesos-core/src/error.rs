//! Error types for `accesos-core`.

use thiserror::Error;
use uuid::Uuid;

use crate::{
  role::{ActionKind, Role},
  status::RequestStatus,
};

#[derive(Debug, Error)]
pub enum Error {
  /// The actor's role (or ownership) does not permit the action.
  #[error("{role} may not {operation}")]
  Unauthorized { role: Role, operation: String },

  /// The action is not defined from the current status, whoever asks.
  #[error("cannot {action} a request in status {status}")]
  InvalidTransition {
    action: ActionKind,
    status: RequestStatus,
  },

  #[error("precondition failed: {0}")]
  PreconditionFailed(String),

  #[error("request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("line item {0} is not part of this request")]
  LineItemNotFound(Uuid),

  #[error("catalog entry not found: {0}")]
  SystemNotFound(Uuid),

  #[error("person not found: {0}")]
  PersonNotFound(String),

  /// Another writer committed the request after it was loaded.
  #[error("request {0} was modified concurrently; reload and retry")]
  StaleState(Uuid),

  #[error("unknown status: {0:?}")]
  UnknownStatus(String),
}

impl Error {
  pub fn is_not_found(&self) -> bool {
    matches!(
      self,
      Self::RequestNotFound(_)
        | Self::LineItemNotFound(_)
        | Self::SystemNotFound(_)
        | Self::PersonNotFound(_)
    )
  }

  pub(crate) fn precondition(msg: impl Into<String>) -> Self {
    Self::PreconditionFailed(msg.into())
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
