//! The request aggregate: a request together with its ordered line items.
//!
//! Everything here is a pure function of plain data. Updates return a new
//! [`Request`]; the caller persists it.

use std::collections::{BTreeSet, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  catalog::CatalogEntry,
  directory::Person,
  role::{ActionKind, Actor, Role},
  status::{AttentionStatus, RequestKind, RequestStatus},
};

// ─── Target snapshot ─────────────────────────────────────────────────────────

/// The person a request is about, copied at creation time.
///
/// This is a snapshot rather than a reference so the request stays auditable
/// after the directory entry changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSubject {
  /// Directory id when the person already exists (BAJA, MODIFICACION).
  pub person_id:   Option<Uuid>,
  pub name:        String,
  pub document:    String,
  pub job_title:   String,
  pub office_id:   Uuid,
  pub office_name: Option<String>,
}

impl TargetSubject {
  /// Snapshot an existing directory entry.
  pub fn of_person(person: &Person, office_name: Option<String>) -> Self {
    Self {
      person_id: Some(person.person_id),
      name: person.name.clone(),
      document: person.document.clone(),
      job_title: person.job_title.clone(),
      office_id: person.office_id,
      office_name,
    }
  }

  /// Trim the free-text fields and reject a blank name or document.
  pub fn normalized(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    let document = self.document.trim().to_owned();
    if name.is_empty() {
      return Err(Error::precondition("target name must not be blank"));
    }
    if document.is_empty() {
      return Err(Error::precondition("target document must not be blank"));
    }
    Ok(Self {
      name,
      document,
      job_title: self.job_title.trim().to_owned(),
      ..self
    })
  }
}

// ─── Line items ──────────────────────────────────────────────────────────────

/// One catalog system attached to a request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
  pub line_item_id:    Uuid,
  pub system_id:       Uuid,
  /// Catalog display name at creation time; later renames do not apply.
  pub system_name:     String,
  pub requires_detail: bool,
  pub detail:          Option<String>,
  pub status:          AttentionStatus,
}

impl LineItem {
  pub fn is_completed(&self) -> bool {
    self.status == AttentionStatus::Completado
  }
}

/// A caller's selection of one catalog system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLineItem {
  pub system_id: Uuid,
  #[serde(default)]
  pub detail:    Option<String>,
}

impl NewLineItem {
  pub fn new(system_id: Uuid) -> Self {
    Self {
      system_id,
      detail: None,
    }
  }

  pub fn with_detail(system_id: Uuid, detail: impl Into<String>) -> Self {
    Self {
      system_id,
      detail: Some(detail.into()),
    }
  }
}

/// Turn a selection into line items, validated against the catalog and, when
/// known, against what the target already holds.
///
/// Items come back in catalog order, whatever order they were selected in.
pub(crate) fn build_line_items(
  kind: RequestKind,
  selection: &[NewLineItem],
  catalog: &[CatalogEntry],
  holder: Option<&Person>,
  allow_empty: bool,
) -> Result<Vec<LineItem>> {
  if selection.is_empty() && !allow_empty {
    return Err(Error::precondition(
      "a request needs at least one selected system",
    ));
  }

  let mut seen = HashSet::new();
  for item in selection {
    if !seen.insert(item.system_id) {
      return Err(Error::precondition(format!(
        "system {} is selected more than once",
        item.system_id
      )));
    }
  }

  let mut ordered: Vec<(usize, LineItem)> = Vec::with_capacity(selection.len());
  for item in selection {
    let (position, entry) = catalog
      .iter()
      .enumerate()
      .find(|(_, e)| e.system_id == item.system_id)
      .ok_or(Error::SystemNotFound(item.system_id))?;

    if !entry.enabled {
      return Err(Error::precondition(format!(
        "system {} is disabled",
        entry.code
      )));
    }
    if !entry.applies_to(kind) {
      return Err(Error::precondition(format!(
        "system {} cannot be requested on a {kind} request",
        entry.code
      )));
    }

    let detail = item
      .detail
      .as_deref()
      .map(str::trim)
      .filter(|d| !d.is_empty())
      .map(str::to_owned);
    if entry.requires_detail && detail.is_none() {
      return Err(Error::precondition(format!(
        "system {} requires a detail",
        entry.code
      )));
    }

    if let Some(holder) = holder {
      let held = holder.entitlements.contains(&entry.system_id);
      match kind {
        RequestKind::Baja if !held => {
          return Err(Error::precondition(format!(
            "{} does not hold system {}",
            holder.document, entry.code
          )));
        }
        RequestKind::Alta | RequestKind::Modificacion if held => {
          return Err(Error::precondition(format!(
            "{} already holds system {}",
            holder.document, entry.code
          )));
        }
        _ => {}
      }
    }

    ordered.push((position, LineItem {
      line_item_id: Uuid::new_v4(),
      system_id: entry.system_id,
      system_name: entry.name.clone(),
      requires_detail: entry.requires_detail,
      detail,
      status: AttentionStatus::Pendiente,
    }));
  }

  ordered.sort_by_key(|(position, _)| *position);
  Ok(ordered.into_iter().map(|(_, item)| item).collect())
}

// ─── Request ─────────────────────────────────────────────────────────────────

/// An access request and its line items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
  pub request_id:          Uuid,
  pub created_at:          DateTime<Utc>,
  /// Never changes after creation; selects the transition table.
  pub kind:                RequestKind,
  pub target:              TargetSubject,
  /// The account that created the request.
  pub requester_id:        Uuid,
  pub status:              RequestStatus,
  /// Present only while the status is `OBSERVADO`.
  pub reason:              Option<String>,
  /// Opaque reference into the document store.
  pub supporting_document: Option<String>,
  pub line_items:          Vec<LineItem>,
  /// Optimistic-concurrency token; bumped by the store on every commit.
  pub version:             u64,
}

/// Input to [`crate::workflow::Workflow::create_request`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRequest {
  pub kind:                RequestKind,
  pub target:              TargetSubject,
  pub items:               Vec<NewLineItem>,
  #[serde(default)]
  pub supporting_document: Option<String>,
}

/// A requester's correction to a pending or observed request. `None` fields
/// are left as they are.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestEdit {
  pub target:              Option<TargetSubject>,
  /// Replaces the whole selection; every resulting item starts pending.
  pub items:               Option<Vec<NewLineItem>>,
  pub supporting_document: Option<String>,
}

impl Request {
  pub(crate) fn new(
    requester_id: Uuid,
    input: NewRequest,
    line_items: Vec<LineItem>,
  ) -> Result<Self> {
    let target = input.target.normalized()?;
    Ok(Self {
      request_id: Uuid::new_v4(),
      created_at: Utc::now(),
      kind: input.kind,
      target,
      requester_id,
      status: RequestStatus::Pendiente(input.kind),
      reason: None,
      supporting_document: input.supporting_document,
      line_items,
      version: 0,
    })
  }

  pub(crate) fn with_target(&self, target: TargetSubject) -> Result<Self> {
    Ok(Self {
      target: target.normalized()?,
      ..self.clone()
    })
  }

  /// Share of completed line items, 0 to 100, rounded down. A request with
  /// no line items is 0% complete.
  pub fn completion_percentage(&self) -> u8 {
    let total = self.line_items.len();
    if total == 0 {
      return 0;
    }
    let done = self.line_items.iter().filter(|i| i.is_completed()).count();
    (done * 100 / total) as u8
  }

  /// `true` iff there is at least one line item and all are completed.
  pub fn is_fully_completed(&self) -> bool {
    self.completion_percentage() == 100
  }

  /// Only the owning requester edits, and only while pending or observed.
  pub fn is_editable_by(&self, actor: &Actor) -> bool {
    actor.role == Role::Requester
      && self.is_owned_by(actor)
      && matches!(
        self.status,
        RequestStatus::Pendiente(_) | RequestStatus::Observado
      )
  }

  pub fn is_owned_by(&self, actor: &Actor) -> bool {
    actor.actor_id == self.requester_id
  }

  pub fn line_item(&self, line_item_id: Uuid) -> Option<&LineItem> {
    self.line_items.iter().find(|i| i.line_item_id == line_item_id)
  }

  /// The set of catalog systems this request covers.
  pub fn system_ids(&self) -> BTreeSet<Uuid> {
    self.line_items.iter().map(|i| i.system_id).collect()
  }

  /// Return a copy with one line item's completion flag replaced.
  ///
  /// Line items are frozen once the request is terminal.
  pub fn apply_line_item_update(
    &self,
    line_item_id: Uuid,
    status: AttentionStatus,
  ) -> Result<Self> {
    if self.status.is_terminal() {
      return Err(Error::InvalidTransition {
        action: ActionKind::ToggleLineItem,
        status: self.status,
      });
    }

    let mut next = self.clone();
    let item = next
      .line_items
      .iter_mut()
      .find(|i| i.line_item_id == line_item_id)
      .ok_or(Error::LineItemNotFound(line_item_id))?;
    item.status = status;
    Ok(next)
  }
}
