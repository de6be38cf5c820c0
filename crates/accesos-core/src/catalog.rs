//! The catalog of systems a request can grant or revoke.
//!
//! Catalog entries are never deleted, only disabled. Requests reference them
//! by id and keep a copy of the display name taken at creation time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, status::RequestKind};

/// A grantable resource: an application, a mailbox, a shared folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
  pub system_id:       Uuid,
  pub name:            String,
  /// Unique short code, e.g. `CORREO`, `SIGEIN`.
  pub code:            String,
  pub applies_alta:    bool,
  pub applies_baja:    bool,
  /// Line items for this system must carry a free-text detail.
  pub requires_detail: bool,
  pub enabled:         bool,
}

impl CatalogEntry {
  /// Whether this system may be selected on a request of `kind`.
  /// MODIFICACION grants access, so it follows the ALTA flag.
  pub fn applies_to(&self, kind: RequestKind) -> bool {
    match kind {
      RequestKind::Alta | RequestKind::Modificacion => self.applies_alta,
      RequestKind::Baja => self.applies_baja,
    }
  }
}

/// Input to [`crate::store::AccessStore::add_system`]. New entries start
/// enabled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCatalogEntry {
  pub name:            String,
  pub code:            String,
  #[serde(default)]
  pub applies_alta:    bool,
  #[serde(default)]
  pub applies_baja:    bool,
  #[serde(default)]
  pub requires_detail: bool,
}

impl NewCatalogEntry {
  /// Trim the name, upper-case the code and reject blanks.
  pub fn normalized(self) -> Result<Self> {
    let name = self.name.trim().to_owned();
    let code = self.code.trim().to_uppercase();
    if name.is_empty() {
      return Err(Error::precondition("system name must not be blank"));
    }
    if code.is_empty() {
      return Err(Error::precondition("system code must not be blank"));
    }
    Ok(Self { name, code, ..self })
  }

  pub fn into_entry(self, system_id: Uuid) -> CatalogEntry {
    CatalogEntry {
      system_id,
      name: self.name,
      code: self.code,
      applies_alta: self.applies_alta,
      applies_baja: self.applies_baja,
      requires_detail: self.requires_detail,
      enabled: true,
    }
  }
}

/// A partial update; `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogUpdate {
  pub name:            Option<String>,
  pub code:            Option<String>,
  pub applies_alta:    Option<bool>,
  pub applies_baja:    Option<bool>,
  pub requires_detail: Option<bool>,
  pub enabled:         Option<bool>,
}

impl CatalogUpdate {
  pub fn toggle(entry: &CatalogEntry) -> Self {
    Self {
      enabled: Some(!entry.enabled),
      ..Self::default()
    }
  }

  /// Apply to `entry`, normalising text fields the same way as creation.
  /// Existing line items are unaffected: they keep their copied name.
  pub fn apply(&self, entry: &CatalogEntry) -> Result<CatalogEntry> {
    let mut next = entry.clone();
    if let Some(name) = &self.name {
      let name = name.trim();
      if name.is_empty() {
        return Err(Error::precondition("system name must not be blank"));
      }
      next.name = name.to_owned();
    }
    if let Some(code) = &self.code {
      let code = code.trim().to_uppercase();
      if code.is_empty() {
        return Err(Error::precondition("system code must not be blank"));
      }
      next.code = code;
    }
    if let Some(v) = self.applies_alta {
      next.applies_alta = v;
    }
    if let Some(v) = self.applies_baja {
      next.applies_baja = v;
    }
    if let Some(v) = self.requires_detail {
      next.requires_detail = v;
    }
    if let Some(v) = self.enabled {
      next.enabled = v;
    }
    Ok(next)
  }
}

/// Parameters for [`crate::store::AccessStore::list_systems`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogFilter {
  /// Only systems selectable on requests of this kind.
  pub applies_to:   Option<RequestKind>,
  #[serde(default)]
  pub enabled_only: bool,
}

impl CatalogFilter {
  pub fn matches(&self, entry: &CatalogEntry) -> bool {
    if self.enabled_only && !entry.enabled {
      return false;
    }
    self.applies_to.is_none_or(|kind| entry.applies_to(kind))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn folder() -> CatalogEntry {
    CatalogEntry {
      system_id:       Uuid::new_v4(),
      name:            "Shared folder".into(),
      code:            "CARPETA".into(),
      applies_alta:    true,
      applies_baja:    false,
      requires_detail: true,
      enabled:         true,
    }
  }

  #[test]
  fn modificacion_follows_alta_flag() {
    let entry = folder();
    assert!(entry.applies_to(RequestKind::Alta));
    assert!(entry.applies_to(RequestKind::Modificacion));
    assert!(!entry.applies_to(RequestKind::Baja));
  }

  #[test]
  fn filter_by_kind_and_enabled() {
    let mut entry = folder();
    let alta_only = CatalogFilter {
      applies_to:   Some(RequestKind::Alta),
      enabled_only: true,
    };
    assert!(alta_only.matches(&entry));

    entry.enabled = false;
    assert!(!alta_only.matches(&entry));
    assert!(CatalogFilter::default().matches(&entry));

    let baja = CatalogFilter {
      applies_to:   Some(RequestKind::Baja),
      enabled_only: false,
    };
    assert!(!baja.matches(&entry));
  }

  #[test]
  fn new_entry_is_normalized() {
    let input = NewCatalogEntry {
      name:            "  Email ".into(),
      code:            " correo".into(),
      applies_alta:    true,
      applies_baja:    true,
      requires_detail: false,
    };
    let entry = input.normalized().unwrap().into_entry(Uuid::nil());
    assert_eq!(entry.name, "Email");
    assert_eq!(entry.code, "CORREO");
    assert!(entry.enabled);
  }

  #[test]
  fn blank_code_is_rejected() {
    let input = NewCatalogEntry {
      name:            "Email".into(),
      code:            "   ".into(),
      applies_alta:    true,
      applies_baja:    true,
      requires_detail: false,
    };
    assert!(matches!(input.normalized(), Err(Error::PreconditionFailed(_))));
  }

  #[test]
  fn update_changes_only_given_fields() {
    let entry = folder();
    let update = CatalogUpdate {
      name: Some("Departmental share".into()),
      applies_baja: Some(true),
      ..CatalogUpdate::default()
    };
    let next = update.apply(&entry).unwrap();
    assert_eq!(next.name, "Departmental share");
    assert!(next.applies_baja);
    assert_eq!(next.code, entry.code);
    assert_eq!(next.requires_detail, entry.requires_detail);
  }

  #[test]
  fn toggle_flips_enabled() {
    let entry = folder();
    let next = CatalogUpdate::toggle(&entry).apply(&entry).unwrap();
    assert!(!next.enabled);
    let back = CatalogUpdate::toggle(&next).apply(&next).unwrap();
    assert!(back.enabled);
  }
}
