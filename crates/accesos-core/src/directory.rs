//! Offices, persons, and the person changes an approved request produces.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  request::{Request, TargetSubject},
  role::Role,
  status::{ActivityStatus, RequestKind},
};

/// A flat named grouping of staff. No hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Office {
  pub office_id: Uuid,
  pub name:      String,
}

/// A staff member in the personnel directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub person_id:    Uuid,
  pub name:         String,
  /// National ID document; the natural key used to match request targets.
  pub document:     String,
  pub job_title:    String,
  pub office_id:    Uuid,
  /// Portal role, for staff who also operate the portal.
  pub role:         Option<Role>,
  pub status:       ActivityStatus,
  /// Catalog system ids this person currently holds.
  pub entitlements: BTreeSet<Uuid>,
  /// Optimistic-concurrency token; 0 for a person not yet stored.
  #[serde(default)]
  pub version:      u64,
}

impl Person {
  pub fn is_active(&self) -> bool { self.status == ActivityStatus::Activo }

  fn refresh_from(&mut self, subject: &TargetSubject) {
    self.name = subject.name.clone();
    self.document = subject.document.clone();
    self.job_title = subject.job_title.clone();
    self.office_id = subject.office_id;
  }
}

// ─── Effects ─────────────────────────────────────────────────────────────────

/// How an approved request changes the target's entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", content = "systems", rename_all = "snake_case")]
pub enum EntitlementChange {
  /// Activate the person (creating them if needed) holding these systems.
  Activate(BTreeSet<Uuid>),
  /// Deactivate the person and clear every entitlement.
  Deactivate,
  /// Add these systems to an existing person's set.
  Grant(BTreeSet<Uuid>),
}

/// The side effect of approving a request. The engine only describes it; the
/// service applies it to the directory in the same commit as the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonEffect {
  /// Who is affected, as captured on the request.
  pub subject: TargetSubject,
  pub change:  EntitlementChange,
}

impl PersonEffect {
  pub fn for_request(request: &Request) -> Self {
    let systems = request.system_ids();
    let change = match request.kind {
      RequestKind::Alta => EntitlementChange::Activate(systems),
      RequestKind::Baja => EntitlementChange::Deactivate,
      RequestKind::Modificacion => EntitlementChange::Grant(systems),
    };
    Self {
      subject: request.target.clone(),
      change,
    }
  }

  /// Compute the person record after this effect. `existing` is the current
  /// directory entry for the subject, if any.
  pub fn apply(&self, existing: Option<Person>) -> Result<Person> {
    match (&self.change, existing) {
      (EntitlementChange::Activate(systems), None) => Ok(Person {
        person_id:    self.subject.person_id.unwrap_or_else(Uuid::new_v4),
        name:         self.subject.name.clone(),
        document:     self.subject.document.clone(),
        job_title:    self.subject.job_title.clone(),
        office_id:    self.subject.office_id,
        role:         None,
        status:       ActivityStatus::Activo,
        entitlements: systems.clone(),
        version:      0,
      }),
      (EntitlementChange::Activate(systems), Some(mut person)) => {
        person.refresh_from(&self.subject);
        person.status = ActivityStatus::Activo;
        person.entitlements.extend(systems.iter().copied());
        Ok(person)
      }
      (EntitlementChange::Deactivate, Some(mut person)) => {
        person.status = ActivityStatus::Inactivo;
        person.entitlements.clear();
        Ok(person)
      }
      (EntitlementChange::Grant(systems), Some(mut person)) => {
        if !person.is_active() {
          return Err(Error::precondition(format!(
            "person {} is inactive; request an ALTA instead",
            person.document
          )));
        }
        person.entitlements.extend(systems.iter().copied());
        Ok(person)
      }
      (_, None) => Err(Error::PersonNotFound(self.subject.document.clone())),
    }
  }
}
