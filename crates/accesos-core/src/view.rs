//! Read-only projections of requests per office.
//!
//! Each front end only shows the slice of the lifecycle it acts on: the
//! coordination inbox lists `PENDIENTE_*`, the technical queue lists
//! `EN_PROCESO_*` / `TECNICO_*`, and so on.

use serde::{Deserialize, Serialize};

use crate::{
  request::Request,
  role::{Actor, Role},
  status::{Phase, RequestStatus},
};

/// A named, role-specific list of requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestView {
  /// The requester's own requests, in every status.
  MyRequests,
  /// New requests waiting to be claimed.
  CoordinatorInbox,
  /// Everything still in flight.
  CoordinatorTracking,
  /// Requests being executed.
  TechnicianQueue,
  /// Requests waiting for approval.
  ApproverQueue,
  /// Approved requests.
  ApproverHistory,
}

impl RequestView {
  /// The role whose front end shows this view.
  pub fn audience(self) -> Role {
    match self {
      Self::MyRequests => Role::Requester,
      Self::CoordinatorInbox | Self::CoordinatorTracking => Role::Coordinator,
      Self::TechnicianQueue => Role::Technician,
      Self::ApproverQueue | Self::ApproverHistory => Role::Approver,
    }
  }

  /// The view a role lands on when it does not ask for one.
  pub fn default_for(role: Role) -> Self {
    match role {
      Role::Requester => Self::MyRequests,
      Role::Coordinator => Self::CoordinatorTracking,
      Role::Technician => Self::TechnicianQueue,
      Role::Approver => Self::ApproverQueue,
    }
  }

  pub fn includes(self, request: &Request, actor: &Actor) -> bool {
    let phase = request.status.phase();
    match self {
      Self::MyRequests => request.is_owned_by(actor),
      Self::CoordinatorInbox => phase == Phase::Pendiente,
      Self::CoordinatorTracking => !request.status.is_terminal(),
      Self::TechnicianQueue => {
        matches!(phase, Phase::EnProceso | Phase::Tecnico)
      }
      Self::ApproverQueue => phase == Phase::ParaValidar,
      Self::ApproverHistory => phase == Phase::Completado,
    }
  }
}

/// The human form of a status: the canonical string with spaces.
pub fn status_label(status: RequestStatus) -> String {
  status.to_string().replace('_', " ")
}

/// Whether `role` ever sees a request in `status`.
///
/// Every staff role can observe a request, so every staff role sees
/// `OBSERVADO`.
pub fn is_visible_to(status: RequestStatus, role: Role) -> bool {
  let phase = status.phase();
  match role {
    Role::Requester => true,
    Role::Coordinator => phase != Phase::Anulado,
    Role::Technician => {
      matches!(phase, Phase::EnProceso | Phase::Tecnico | Phase::Observado)
    }
    Role::Approver => matches!(
      phase,
      Phase::ParaValidar | Phase::Completado | Phase::Observado
    ),
  }
}

/// The status label shown to `role`, or `None` when that role's views never
/// include the request.
pub fn visible_status_label(request: &Request, role: Role) -> Option<String> {
  is_visible_to(request.status, role).then(|| status_label(request.status))
}
