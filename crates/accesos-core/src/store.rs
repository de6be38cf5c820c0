//! The `AccessStore` trait and supporting query types.
//!
//! The trait is implemented by storage backends (e.g. `accesos-store-sqlite`).
//! The service and the HTTP layer depend on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use serde::Deserialize;
use uuid::Uuid;

use crate::{
  catalog::{CatalogEntry, CatalogFilter, CatalogUpdate, NewCatalogEntry},
  directory::{Office, Person},
  request::Request,
  status::{ActivityStatus, RequestKind},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Parameters for [`AccessStore::list_requests`]. Results are newest first.
#[derive(Debug, Clone, Default)]
pub struct RequestQuery {
  /// Restrict to requests created by this account.
  pub requester_id: Option<Uuid>,
  pub kind:         Option<RequestKind>,
  pub limit:        Option<usize>,
  pub offset:       Option<usize>,
}

/// Directory filters for [`AccessStore::list_persons`]. Results are ordered
/// by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PersonQuery {
  pub status:    Option<ActivityStatus>,
  pub office_id: Option<Uuid>,
  /// Case-insensitive substring of the name, or a prefix of the document.
  pub search:    Option<String>,
}

impl PersonQuery {
  pub fn matches(&self, person: &Person) -> bool {
    if self.status.is_some_and(|s| s != person.status) {
      return false;
    }
    if self.office_id.is_some_and(|id| id != person.office_id) {
      return false;
    }
    match self.search.as_deref().map(str::trim) {
      None | Some("") => true,
      Some(needle) => {
        person.name.to_lowercase().contains(&needle.to_lowercase())
          || person.document.starts_with(needle)
      }
    }
  }
}

/// The result of [`AccessStore::commit_request`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
  /// Written; carries the request with its new version.
  Committed(Request),
  /// The stored version no longer matches; nothing was written.
  Stale,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// The error type of a backend.
pub trait StoreError: std::error::Error + Send + Sync + 'static {
  /// The write was refused because it would break a uniqueness rule, such as
  /// a repeated catalog code or national ID document.
  fn is_conflict(&self) -> bool { false }
}

/// Abstraction over a portal persistence backend.
///
/// All methods return `Send` futures so the trait can be used in multi-threaded
/// async runtimes (e.g. tokio with `axum`).
pub trait AccessStore: Send + Sync {
  type Error: StoreError;

  // ── Offices ───────────────────────────────────────────────────────────

  fn add_office(
    &self,
    name: String,
  ) -> impl Future<Output = Result<Office, Self::Error>> + Send + '_;

  fn list_offices(
    &self,
  ) -> impl Future<Output = Result<Vec<Office>, Self::Error>> + Send + '_;

  // ── Catalog ───────────────────────────────────────────────────────────

  /// Persist a new, enabled catalog entry. Codes are unique.
  fn add_system(
    &self,
    input: NewCatalogEntry,
  ) -> impl Future<Output = Result<CatalogEntry, Self::Error>> + Send + '_;

  /// Apply a partial update. Returns `None` if the entry does not exist.
  fn update_system(
    &self,
    system_id: Uuid,
    update: CatalogUpdate,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  fn get_system(
    &self,
    system_id: Uuid,
  ) -> impl Future<Output = Result<Option<CatalogEntry>, Self::Error>> + Send + '_;

  /// List catalog entries in catalog order (the order they were added).
  fn list_systems<'a>(
    &'a self,
    filter: &'a CatalogFilter,
  ) -> impl Future<Output = Result<Vec<CatalogEntry>, Self::Error>> + Send + 'a;

  // ── Persons ───────────────────────────────────────────────────────────

  fn get_person(
    &self,
    person_id: Uuid,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + '_;

  fn find_person_by_document<'a>(
    &'a self,
    document: &'a str,
  ) -> impl Future<Output = Result<Option<Person>, Self::Error>> + Send + 'a;

  fn list_persons<'a>(
    &'a self,
    query: &'a PersonQuery,
  ) -> impl Future<Output = Result<Vec<Person>, Self::Error>> + Send + 'a;

  /// Insert or replace a person by `person_id`, ignoring and bumping its
  /// stored version.
  fn upsert_person<'a>(
    &'a self,
    person: &'a Person,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  // ── Requests ──────────────────────────────────────────────────────────

  /// Persist a freshly created request with its line items.
  fn insert_request<'a>(
    &'a self,
    request: &'a Request,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  fn get_request(
    &self,
    request_id: Uuid,
  ) -> impl Future<Output = Result<Option<Request>, Self::Error>> + Send + '_;

  fn list_requests<'a>(
    &'a self,
    query: &'a RequestQuery,
  ) -> impl Future<Output = Result<Vec<Request>, Self::Error>> + Send + 'a;

  /// Write `request` (status, reason, target, line items) and, if given,
  /// `person`, in one transaction.
  ///
  /// The write happens only if the stored version still equals
  /// `request.version`; the stored version is then incremented. Otherwise
  /// nothing is written and [`CommitOutcome::Stale`] is returned, so of two
  /// concurrent commits from the same snapshot exactly one succeeds.
  ///
  /// `person` is guarded the same way by [`Person::version`]: it is written
  /// only if the stored person is still at that version, or, for version 0,
  /// only if no person with its id or document exists yet. Two approvals
  /// for the same person computed from one directory read cannot both land.
  fn commit_request<'a>(
    &'a self,
    request: &'a Request,
    person: Option<&'a Person>,
  ) -> impl Future<Output = Result<CommitOutcome, Self::Error>> + Send + 'a;
}
