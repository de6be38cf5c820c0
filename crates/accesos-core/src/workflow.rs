//! The request workflow engine.
//!
//! A pure state-transition function: given a request, an actor and an action,
//! it returns the next request plus any person side effect, or an error. It
//! performs no I/O. The caller loads the request beforehand and commits the
//! result afterwards.
//!
//! ```text
//! PENDIENTE_<k> → EN_PROCESO_<k> → [TECNICO_<k>] → PARA_VALIDAR_<k> → COMPLETADO_<k>
//!      any working state or PARA_VALIDAR_<k> → OBSERVADO → PENDIENTE_<k>
//!                       PENDIENTE_<k> | OBSERVADO → ANULADO
//! ```
//!
//! Every action is evaluated in the same order: is it defined from the current
//! status (`InvalidTransition`), may this actor perform it (`Unauthorized`),
//! do its preconditions hold (`PreconditionFailed`, `*NotFound`).

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogEntry,
  directory::{Person, PersonEffect},
  request::{NewRequest, Request, RequestEdit, build_line_items},
  role::{ActionKind, Actor, Role},
  status::{AttentionStatus, Phase, RequestKind, RequestStatus},
};

// ─── Configuration ───────────────────────────────────────────────────────────

/// Deployment choices the portal has historically varied on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
  /// Route requests through `TECNICO_<kind>` before validation.
  pub technical_stage:       bool,
  /// Which role confirms the checklist and sends a request to validation.
  pub send_to_validate_role: Role,
  /// Accept BAJA requests with no selected systems.
  pub allow_empty_baja:      bool,
}

impl Default for WorkflowConfig {
  fn default() -> Self {
    Self {
      technical_stage:       false,
      send_to_validate_role: Role::Coordinator,
      allow_empty_baja:      false,
    }
  }
}

impl WorkflowConfig {
  /// The variant with a separate technical-execution office.
  pub fn with_technical_stage() -> Self {
    Self {
      technical_stage: true,
      send_to_validate_role: Role::Technician,
      ..Self::default()
    }
  }
}

// ─── Actions ─────────────────────────────────────────────────────────────────

/// A state-transition command, as carried by the transport layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
  Start,
  SendToTechnical,
  ToggleLineItem {
    line_item_id: Uuid,
    status:       AttentionStatus,
  },
  SendToValidate,
  Approve,
  Observe {
    reason: String,
  },
  Resubmit,
  Annul,
}

impl Action {
  pub fn kind(&self) -> ActionKind {
    match self {
      Self::Start => ActionKind::Start,
      Self::SendToTechnical => ActionKind::SendToTechnical,
      Self::ToggleLineItem { .. } => ActionKind::ToggleLineItem,
      Self::SendToValidate => ActionKind::SendToValidate,
      Self::Approve => ActionKind::Approve,
      Self::Observe { .. } => ActionKind::Observe,
      Self::Resubmit => ActionKind::Resubmit,
      Self::Annul => ActionKind::Annul,
    }
  }
}

/// The result of a successful transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
  pub request: Request,
  /// Present only when an approval changes the personnel directory.
  pub effect:  Option<PersonEffect>,
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// The workflow engine for one configuration.
#[derive(Debug, Clone, Default)]
pub struct Workflow {
  config: WorkflowConfig,
}

impl Workflow {
  pub fn new(config: WorkflowConfig) -> Self { Self { config } }

  pub fn config(&self) -> &WorkflowConfig { &self.config }

  /// Build a new `PENDIENTE_<kind>` request.
  ///
  /// `catalog` must contain every selected system; `holder` is the target's
  /// current directory entry, when one exists.
  pub fn create_request(
    &self,
    actor: &Actor,
    input: NewRequest,
    catalog: &[CatalogEntry],
    holder: Option<&Person>,
  ) -> Result<Request> {
    if actor.role != Role::Requester {
      return Err(Error::Unauthorized {
        role:      actor.role,
        operation: ActionKind::Create.to_string(),
      });
    }
    let allow_empty =
      input.kind == RequestKind::Baja && self.config.allow_empty_baja;
    let items =
      build_line_items(input.kind, &input.items, catalog, holder, allow_empty)?;
    Request::new(actor.actor_id, input, items)
  }

  /// Apply a requester's correction. Status and kind are unchanged.
  pub fn edit_request(
    &self,
    request: &Request,
    actor: &Actor,
    edit: RequestEdit,
    catalog: &[CatalogEntry],
    holder: Option<&Person>,
  ) -> Result<Request> {
    self.check_defined(request, ActionKind::Edit)?;
    self.authorize(request, actor, ActionKind::Edit)?;

    let mut next = match edit.target {
      Some(target) => request.with_target(target)?,
      None => request.clone(),
    };
    if let Some(items) = edit.items {
      let allow_empty =
        request.kind == RequestKind::Baja && self.config.allow_empty_baja;
      next.line_items =
        build_line_items(request.kind, &items, catalog, holder, allow_empty)?;
    }
    if let Some(document) = edit.supporting_document {
      next.supporting_document = Some(document);
    }
    Ok(next)
  }

  /// Evaluate `action` against `request` as currently persisted.
  pub fn transition(
    &self,
    request: &Request,
    actor: &Actor,
    action: Action,
  ) -> Result<Transition> {
    let kind = action.kind();
    self.check_defined(request, kind)?;
    self.authorize(request, actor, kind)?;

    let mut next = request.clone();
    let mut effect = None;

    match action {
      Action::Start => next.status = RequestStatus::EnProceso(request.kind),
      Action::SendToTechnical => {
        next.status = RequestStatus::Tecnico(request.kind);
      }
      Action::ToggleLineItem {
        line_item_id,
        status,
      } => next = request.apply_line_item_update(line_item_id, status)?,
      Action::SendToValidate => {
        if !request.is_fully_completed() {
          return Err(Error::precondition(format!(
            "only {}% of line items are completed",
            request.completion_percentage()
          )));
        }
        next.status = RequestStatus::ParaValidar(request.kind);
      }
      Action::Approve => {
        next.status = RequestStatus::Completado(request.kind);
        effect = Some(PersonEffect::for_request(request));
      }
      Action::Observe { reason } => {
        let reason = reason.trim();
        if reason.is_empty() {
          return Err(Error::precondition("an observation needs a reason"));
        }
        next.status = RequestStatus::Observado;
        next.reason = Some(reason.to_owned());
      }
      Action::Resubmit => {
        next.status = RequestStatus::Pendiente(request.kind);
        next.reason = None;
      }
      Action::Annul => {
        next.status = RequestStatus::Anulado;
        next.reason = None;
      }
    }

    Ok(Transition {
      request: next,
      effect,
    })
  }

  /// Whether `action` is defined from the request's current status,
  /// regardless of who asks.
  pub fn is_defined(&self, status: RequestStatus, action: ActionKind) -> bool {
    let phase = status.phase();
    let working =
      matches!(phase, Phase::Pendiente | Phase::EnProceso | Phase::Tecnico);

    match action {
      ActionKind::Create => false,
      ActionKind::Edit | ActionKind::Annul => {
        matches!(phase, Phase::Pendiente | Phase::Observado)
      }
      ActionKind::Start => phase == Phase::Pendiente,
      ActionKind::SendToTechnical => {
        self.config.technical_stage && phase == Phase::EnProceso
      }
      ActionKind::ToggleLineItem => working,
      ActionKind::SendToValidate => {
        if self.config.technical_stage {
          phase == Phase::Tecnico
        } else {
          working
        }
      }
      ActionKind::Approve => phase == Phase::ParaValidar,
      ActionKind::Observe => working || phase == Phase::ParaValidar,
      ActionKind::Resubmit => phase == Phase::Observado,
    }
  }

  /// Whether `role` may perform `action` at all, ownership aside.
  pub fn permits(&self, role: Role, action: ActionKind) -> bool {
    match action {
      ActionKind::Create
      | ActionKind::Edit
      | ActionKind::Resubmit
      | ActionKind::Annul => role == Role::Requester,
      ActionKind::Start => role == Role::Coordinator,
      ActionKind::SendToTechnical | ActionKind::ToggleLineItem => {
        matches!(role, Role::Coordinator | Role::Technician)
      }
      ActionKind::SendToValidate => role == self.config.send_to_validate_role,
      ActionKind::Approve => role == Role::Approver,
      ActionKind::Observe => role != Role::Requester,
    }
  }

  fn check_defined(&self, request: &Request, action: ActionKind) -> Result<()> {
    if self.is_defined(request.status, action) {
      Ok(())
    } else {
      Err(Error::InvalidTransition {
        action,
        status: request.status,
      })
    }
  }

  fn authorize(
    &self,
    request: &Request,
    actor: &Actor,
    action: ActionKind,
  ) -> Result<()> {
    let owner_ok = !action.is_requester_action() || request.is_owned_by(actor);
    if self.permits(actor.role, action) && owner_ok {
      Ok(())
    } else {
      Err(Error::Unauthorized {
        role:      actor.role,
        operation: format!("{action} request {}", request.request_id),
      })
    }
  }
}
