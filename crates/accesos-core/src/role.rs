//! Who acts on a request, and what they can ask for.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// The four offices that take part in the approval workflow.
///
/// Wire codes are the office names the existing front ends use.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
pub enum Role {
  /// Creates, edits, resubmits and annuls requests.
  #[serde(rename = "OGA")]
  #[strum(serialize = "OGA")]
  Requester,
  /// Claims incoming requests and drives them through processing.
  #[serde(rename = "USEI")]
  #[strum(serialize = "USEI")]
  Coordinator,
  /// Executes the per-system checklist.
  #[serde(rename = "ETIC")]
  #[strum(serialize = "ETIC")]
  Technician,
  /// Approves or observes requests awaiting validation.
  #[serde(rename = "JEFE_ETIC")]
  #[strum(serialize = "JEFE_ETIC")]
  Approver,
}

/// An authenticated caller: an account id plus the role it acts under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
  pub actor_id: Uuid,
  pub role:     Role,
}

impl Actor {
  pub fn new(actor_id: Uuid, role: Role) -> Self { Self { actor_id, role } }
}

/// Payload-free names for every operation the workflow evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
  Create,
  Edit,
  Start,
  SendToTechnical,
  ToggleLineItem,
  SendToValidate,
  Approve,
  Observe,
  Resubmit,
  Annul,
}

impl ActionKind {
  /// Actions only the owning requester may perform.
  pub fn is_requester_action(self) -> bool {
    matches!(self, Self::Create | Self::Edit | Self::Resubmit | Self::Annul)
  }
}
