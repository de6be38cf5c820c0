//! The portal service: I/O around the pure workflow engine.
//!
//! Every command follows the same shape: read what the engine needs from the
//! store, evaluate the engine, then commit the result in one write. The
//! engine never sees the store.

use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
  Error,
  catalog::{CatalogEntry, CatalogFilter, CatalogUpdate, NewCatalogEntry},
  directory::{Office, Person},
  request::{NewRequest, Request, RequestEdit, TargetSubject},
  role::{Actor, Role},
  status::RequestKind,
  store::{AccessStore, CommitOutcome, PersonQuery, RequestQuery},
  summary::Summary,
  view::RequestView,
  workflow::{Action, Workflow},
};

/// Either a workflow rule was violated or the backend failed.
#[derive(Debug, Error)]
pub enum ServiceError<E>
where
  E: std::error::Error + Send + Sync + 'static,
{
  #[error(transparent)]
  Workflow(#[from] Error),

  #[error("store error: {0}")]
  Store(#[source] E),
}

pub type ServiceResult<T, E> = std::result::Result<T, ServiceError<E>>;

/// Narrowing and paging for [`Portal::list_view`]. Paging counts requests
/// inside the view, newest first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewPage {
  pub kind:   Option<RequestKind>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// The portal's command and query surface over a store `S`.
#[derive(Debug, Clone)]
pub struct Portal<S> {
  store:    S,
  workflow: Workflow,
}

impl<S: AccessStore> Portal<S> {
  pub fn new(store: S, workflow: Workflow) -> Self { Self { store, workflow } }

  pub fn store(&self) -> &S { &self.store }

  pub fn workflow(&self) -> &Workflow { &self.workflow }

  // ── Requests ──────────────────────────────────────────────────────────

  /// Create and persist a request in `PENDIENTE_<kind>`.
  pub async fn submit_request(
    &self,
    actor: &Actor,
    input: NewRequest,
  ) -> ServiceResult<Request, S::Error> {
    let catalog = self.catalog().await?;
    let holder = self.find_holder(&input.target).await?;

    let request = self
      .workflow
      .create_request(actor, input, &catalog, holder.as_ref())
      .inspect_err(|e| warn!(actor = %actor.actor_id, "create rejected: {e}"))?;

    self.store.insert_request(&request).await.map_err(ServiceError::Store)?;
    info!(
      request = %request.request_id,
      kind = %request.kind,
      items = request.line_items.len(),
      "request created"
    );
    Ok(request)
  }

  pub async fn get_request(
    &self,
    request_id: Uuid,
  ) -> ServiceResult<Request, S::Error> {
    self
      .store
      .get_request(request_id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::Workflow(Error::RequestNotFound(request_id)))
  }

  /// Completion percentage of a stored request.
  pub async fn progress(&self, request_id: Uuid) -> ServiceResult<u8, S::Error> {
    Ok(self.get_request(request_id).await?.completion_percentage())
  }

  /// Apply a requester's correction to a pending or observed request.
  pub async fn edit_request(
    &self,
    actor: &Actor,
    request_id: Uuid,
    edit: RequestEdit,
  ) -> ServiceResult<Request, S::Error> {
    let current = self.get_request(request_id).await?;
    let catalog = self.catalog().await?;
    let target = edit.target.as_ref().unwrap_or(&current.target);
    let holder = self.find_holder(target).await?;

    let next = self
      .workflow
      .edit_request(&current, actor, edit, &catalog, holder.as_ref())
      .inspect_err(|e| warn!(request = %request_id, "edit rejected: {e}"))?;

    let saved = self.commit(&next, None).await?;
    info!(request = %request_id, "request edited");
    Ok(saved)
  }

  /// Evaluate `action` against the stored request and commit the outcome,
  /// including any directory change, atomically.
  pub async fn apply_action(
    &self,
    actor: &Actor,
    request_id: Uuid,
    action: Action,
  ) -> ServiceResult<Request, S::Error> {
    let current = self.get_request(request_id).await?;
    let action_kind = action.kind();

    let transition = self
      .workflow
      .transition(&current, actor, action)
      .inspect_err(|e| {
        warn!(
          request = %request_id,
          role = %actor.role,
          action = %action_kind,
          "transition rejected: {e}"
        )
      })?;

    let person = match &transition.effect {
      Some(effect) => {
        let existing = self.find_holder(&effect.subject).await?;
        Some(effect.apply(existing)?)
      }
      None => None,
    };

    let saved = self.commit(&transition.request, person.as_ref()).await?;
    info!(
      request = %request_id,
      action = %action_kind,
      from = %current.status,
      to = %saved.status,
      "transition committed"
    );
    if let Some(person) = &person {
      info!(
        person = %person.person_id,
        status = %person.status,
        systems = person.entitlements.len(),
        "directory updated"
      );
    }
    Ok(saved)
  }

  /// The requests `actor` sees in `view`.
  pub async fn list_view(
    &self,
    actor: &Actor,
    view: RequestView,
    page: ViewPage,
  ) -> ServiceResult<Vec<Request>, S::Error> {
    if view.audience() != actor.role {
      return Err(
        Error::Unauthorized {
          role:      actor.role,
          operation: format!("list {view:?}"),
        }
        .into(),
      );
    }

    let query = RequestQuery {
      requester_id: (view == RequestView::MyRequests).then_some(actor.actor_id),
      kind: page.kind,
      ..RequestQuery::default()
    };
    let requests =
      self.store.list_requests(&query).await.map_err(ServiceError::Store)?;
    Ok(
      requests
        .into_iter()
        .filter(|r| view.includes(r, actor))
        .skip(page.offset.unwrap_or(0))
        .take(page.limit.unwrap_or(usize::MAX))
        .collect(),
    )
  }

  /// Headcounts and workload for the approver's dashboard.
  pub async fn summary(&self, actor: &Actor) -> ServiceResult<Summary, S::Error> {
    require_role(actor, Role::Approver, "view the summary")?;
    let persons = self.list_persons(&PersonQuery::default()).await?;
    let offices = self.list_offices().await?;
    let requests = self
      .store
      .list_requests(&RequestQuery::default())
      .await
      .map_err(ServiceError::Store)?;
    Ok(Summary::compute(&persons, &offices, &requests))
  }

  // ── Catalog ───────────────────────────────────────────────────────────

  pub async fn add_system(
    &self,
    actor: &Actor,
    input: NewCatalogEntry,
  ) -> ServiceResult<CatalogEntry, S::Error> {
    require_role(actor, Role::Approver, "manage the catalog")?;
    let input = input.normalized()?;
    self.ensure_code_free(&input.code, None).await?;
    let entry = self.store.add_system(input).await.map_err(ServiceError::Store)?;
    info!(system = %entry.system_id, code = %entry.code, "catalog entry added");
    Ok(entry)
  }

  pub async fn update_system(
    &self,
    actor: &Actor,
    system_id: Uuid,
    update: CatalogUpdate,
  ) -> ServiceResult<CatalogEntry, S::Error> {
    require_role(actor, Role::Approver, "manage the catalog")?;
    let current = self.get_system(system_id).await?;
    // Validate before touching the store.
    let updated = update.apply(&current)?;
    if updated.code != current.code {
      self.ensure_code_free(&updated.code, Some(system_id)).await?;
    }
    let entry = self
      .store
      .update_system(system_id, update)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::Workflow(Error::SystemNotFound(system_id)))?;
    info!(system = %system_id, enabled = entry.enabled, "catalog entry updated");
    Ok(entry)
  }

  /// Flip an entry between enabled and disabled.
  pub async fn toggle_system(
    &self,
    actor: &Actor,
    system_id: Uuid,
  ) -> ServiceResult<CatalogEntry, S::Error> {
    let current = self.get_system(system_id).await?;
    self
      .update_system(actor, system_id, CatalogUpdate::toggle(&current))
      .await
  }

  pub async fn get_system(
    &self,
    system_id: Uuid,
  ) -> ServiceResult<CatalogEntry, S::Error> {
    self
      .store
      .get_system(system_id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or(ServiceError::Workflow(Error::SystemNotFound(system_id)))
  }

  pub async fn list_systems(
    &self,
    filter: &CatalogFilter,
  ) -> ServiceResult<Vec<CatalogEntry>, S::Error> {
    self.store.list_systems(filter).await.map_err(ServiceError::Store)
  }

  // ── Directory ─────────────────────────────────────────────────────────

  pub async fn add_office(
    &self,
    actor: &Actor,
    name: String,
  ) -> ServiceResult<Office, S::Error> {
    require_role(actor, Role::Approver, "manage offices")?;
    let name = name.trim().to_owned();
    if name.is_empty() {
      return Err(Error::precondition("office name must not be blank").into());
    }
    self.store.add_office(name).await.map_err(ServiceError::Store)
  }

  pub async fn list_offices(&self) -> ServiceResult<Vec<Office>, S::Error> {
    self.store.list_offices().await.map_err(ServiceError::Store)
  }

  pub async fn list_persons(
    &self,
    query: &PersonQuery,
  ) -> ServiceResult<Vec<Person>, S::Error> {
    self.store.list_persons(query).await.map_err(ServiceError::Store)
  }

  pub async fn get_person(
    &self,
    person_id: Uuid,
  ) -> ServiceResult<Person, S::Error> {
    self
      .store
      .get_person(person_id)
      .await
      .map_err(ServiceError::Store)?
      .ok_or_else(|| {
        ServiceError::Workflow(Error::PersonNotFound(person_id.to_string()))
      })
  }

  // ── Helpers ───────────────────────────────────────────────────────────

  async fn catalog(&self) -> ServiceResult<Vec<CatalogEntry>, S::Error> {
    self.list_systems(&CatalogFilter::default()).await
  }

  async fn ensure_code_free(
    &self,
    code: &str,
    except: Option<Uuid>,
  ) -> ServiceResult<(), S::Error> {
    let taken = self
      .catalog()
      .await?
      .iter()
      .any(|e| e.code == code && Some(e.system_id) != except);
    if taken {
      return Err(
        Error::precondition(format!("system code {code:?} is already in use"))
          .into(),
      );
    }
    Ok(())
  }

  /// The directory entry a target snapshot refers to: by id when the snapshot
  /// carries one, otherwise by national ID document.
  async fn find_holder(
    &self,
    subject: &TargetSubject,
  ) -> ServiceResult<Option<Person>, S::Error> {
    let found = match subject.person_id {
      Some(id) => self.store.get_person(id).await,
      None => self.store.find_person_by_document(&subject.document).await,
    };
    found.map_err(ServiceError::Store)
  }

  async fn commit(
    &self,
    request: &Request,
    person: Option<&Person>,
  ) -> ServiceResult<Request, S::Error> {
    match self
      .store
      .commit_request(request, person)
      .await
      .map_err(ServiceError::Store)?
    {
      CommitOutcome::Committed(saved) => Ok(saved),
      CommitOutcome::Stale => {
        warn!(request = %request.request_id, "stale commit discarded");
        Err(Error::StaleState(request.request_id).into())
      }
    }
  }
}

fn require_role(actor: &Actor, role: Role, operation: &str) -> crate::Result<()> {
  if actor.role == role {
    Ok(())
  } else {
    Err(Error::Unauthorized {
      role:      actor.role,
      operation: operation.to_owned(),
    })
  }
}
