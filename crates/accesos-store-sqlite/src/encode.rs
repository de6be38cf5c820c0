//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are RFC 3339 strings. Statuses and kinds use their canonical
//! upper-case strings. The target snapshot and entitlement sets are compact
//! JSON. UUIDs are hyphenated lowercase strings.

use std::{collections::BTreeSet, str::FromStr};

use accesos_core::{
  catalog::CatalogEntry,
  directory::{Office, Person},
  request::{LineItem, Request, TargetSubject},
  role::Role,
  status::{ActivityStatus, AttentionStatus, RequestKind, RequestStatus},
};
use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

/// Fixed-width so that string order is time order.
pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Parse a strum-backed enum column.
fn decode_enum<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  T::from_str(s).map_err(|_| Error::Decode {
    column,
    value: s.to_owned(),
  })
}

pub fn decode_status(s: &str) -> Result<RequestStatus> {
  Ok(RequestStatus::from_str(s)?)
}

// ─── Structured columns ──────────────────────────────────────────────────────

pub fn encode_target(target: &TargetSubject) -> Result<String> {
  Ok(serde_json::to_string(target)?)
}

pub fn encode_entitlements(systems: &BTreeSet<Uuid>) -> Result<String> {
  Ok(serde_json::to_string(systems)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from an `offices` row.
pub struct RawOffice {
  pub office_id: String,
  pub name:      String,
}

impl RawOffice {
  pub fn into_office(self) -> Result<Office> {
    Ok(Office {
      office_id: decode_uuid(&self.office_id)?,
      name:      self.name,
    })
  }
}

/// Raw values read directly from a `systems` row.
pub struct RawSystem {
  pub system_id:       String,
  pub name:            String,
  pub code:            String,
  pub applies_alta:    bool,
  pub applies_baja:    bool,
  pub requires_detail: bool,
  pub enabled:         bool,
}

pub const SYSTEM_COLUMNS: &str =
  "system_id, name, code, applies_alta, applies_baja, requires_detail, enabled";

impl RawSystem {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      system_id:       row.get(0)?,
      name:            row.get(1)?,
      code:            row.get(2)?,
      applies_alta:    row.get(3)?,
      applies_baja:    row.get(4)?,
      requires_detail: row.get(5)?,
      enabled:         row.get(6)?,
    })
  }

  pub fn into_entry(self) -> Result<CatalogEntry> {
    Ok(CatalogEntry {
      system_id:       decode_uuid(&self.system_id)?,
      name:            self.name,
      code:            self.code,
      applies_alta:    self.applies_alta,
      applies_baja:    self.applies_baja,
      requires_detail: self.requires_detail,
      enabled:         self.enabled,
    })
  }
}

/// Raw strings read directly from a `persons` row.
pub struct RawPerson {
  pub person_id:    String,
  pub name:         String,
  pub document:     String,
  pub job_title:    String,
  pub office_id:    String,
  pub role:         Option<String>,
  pub status:       String,
  pub entitlements: String,
  pub version:      i64,
}

pub const PERSON_COLUMNS: &str = "person_id, name, document, job_title, \
                                  office_id, role, status, entitlements, \
                                  version";

impl RawPerson {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      person_id:    row.get(0)?,
      name:         row.get(1)?,
      document:     row.get(2)?,
      job_title:    row.get(3)?,
      office_id:    row.get(4)?,
      role:         row.get(5)?,
      status:       row.get(6)?,
      entitlements: row.get(7)?,
      version:      row.get(8)?,
    })
  }

  pub fn into_person(self) -> Result<Person> {
    let entitlements: Vec<String> = serde_json::from_str(&self.entitlements)?;
    Ok(Person {
      person_id:    decode_uuid(&self.person_id)?,
      name:         self.name,
      document:     self.document,
      job_title:    self.job_title,
      office_id:    decode_uuid(&self.office_id)?,
      role:         self
        .role
        .as_deref()
        .map(|r| decode_enum::<Role>("persons.role", r))
        .transpose()?,
      status:       decode_enum::<ActivityStatus>("persons.status", &self.status)?,
      entitlements: entitlements
        .iter()
        .map(|s| decode_uuid(s))
        .collect::<Result<_>>()?,
      version:      u64::try_from(self.version).map_err(|_| Error::Decode {
        column: "persons.version",
        value:  self.version.to_string(),
      })?,
    })
  }
}

/// Raw values read directly from a `line_items` row.
pub struct RawLineItem {
  pub line_item_id:    String,
  pub system_id:       String,
  pub system_name:     String,
  pub requires_detail: bool,
  pub detail:          Option<String>,
  pub status:          String,
}

impl RawLineItem {
  pub fn into_line_item(self) -> Result<LineItem> {
    Ok(LineItem {
      line_item_id:    decode_uuid(&self.line_item_id)?,
      system_id:       decode_uuid(&self.system_id)?,
      system_name:     self.system_name,
      requires_detail: self.requires_detail,
      detail:          self.detail,
      status:          decode_enum::<AttentionStatus>(
        "line_items.status",
        &self.status,
      )?,
    })
  }
}

/// Raw values read from a `requests` row plus its `line_items` rows.
pub struct RawRequest {
  pub request_id:          String,
  pub created_at:          String,
  pub kind:                String,
  pub target:              String,
  pub requester_id:        String,
  pub status:              String,
  pub reason:              Option<String>,
  pub supporting_document: Option<String>,
  pub version:             i64,
  pub line_items:          Vec<RawLineItem>,
}

pub const REQUEST_COLUMNS: &str = "request_id, created_at, kind, target, \
                                   requester_id, status, reason, \
                                   supporting_document, version";

impl RawRequest {
  /// Read the request columns; line items are attached separately.
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:          row.get(0)?,
      created_at:          row.get(1)?,
      kind:                row.get(2)?,
      target:              row.get(3)?,
      requester_id:        row.get(4)?,
      status:              row.get(5)?,
      reason:              row.get(6)?,
      supporting_document: row.get(7)?,
      version:             row.get(8)?,
      line_items:          Vec::new(),
    })
  }

  pub fn into_request(self) -> Result<Request> {
    let kind = decode_enum::<RequestKind>("requests.kind", &self.kind)?;
    let status = decode_status(&self.status)?;
    if status.kind().is_some_and(|k| k != kind) {
      return Err(Error::Decode {
        column: "requests.status",
        value:  self.status,
      });
    }

    Ok(Request {
      request_id: decode_uuid(&self.request_id)?,
      created_at: decode_dt(&self.created_at)?,
      kind,
      target: serde_json::from_str(&self.target)?,
      requester_id: decode_uuid(&self.requester_id)?,
      status,
      reason: self.reason,
      supporting_document: self.supporting_document,
      line_items: self
        .line_items
        .into_iter()
        .map(RawLineItem::into_line_item)
        .collect::<Result<_>>()?,
      version: u64::try_from(self.version).map_err(|_| Error::Decode {
        column: "requests.version",
        value:  self.version.to_string(),
      })?,
    })
  }
}

/// Read the line items of one request in stored order.
pub fn read_line_items(
  conn: &rusqlite::Connection,
  request_id: &str,
) -> rusqlite::Result<Vec<RawLineItem>> {
  let mut stmt = conn.prepare(
    "SELECT line_item_id, system_id, system_name, requires_detail, detail, status
     FROM line_items WHERE request_id = ?1 ORDER BY position",
  )?;
  stmt
    .query_map(rusqlite::params![request_id], |row| {
      Ok(RawLineItem {
        line_item_id:    row.get(0)?,
        system_id:       row.get(1)?,
        system_name:     row.get(2)?,
        requires_detail: row.get(3)?,
        detail:          row.get(4)?,
        status:          row.get(5)?,
      })
    })?
    .collect()
}

/// Replace the line items of `request_id` with `items`, keeping their order.
pub fn write_line_items(
  conn: &rusqlite::Connection,
  request_id: &str,
  items: &[EncodedLineItem],
) -> rusqlite::Result<()> {
  conn.execute(
    "DELETE FROM line_items WHERE request_id = ?1",
    rusqlite::params![request_id],
  )?;
  let mut stmt = conn.prepare(
    "INSERT INTO line_items (
       line_item_id, request_id, position, system_id, system_name,
       requires_detail, detail, status
     ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
  )?;
  for (position, item) in items.iter().enumerate() {
    stmt.execute(rusqlite::params![
      item.line_item_id,
      request_id,
      position as i64,
      item.system_id,
      item.system_name,
      item.requires_detail,
      item.detail,
      item.status,
    ])?;
  }
  Ok(())
}

/// A line item already converted to column values, ready to move into a
/// database closure.
pub struct EncodedLineItem {
  pub line_item_id:    String,
  pub system_id:       String,
  pub system_name:     String,
  pub requires_detail: bool,
  pub detail:          Option<String>,
  pub status:          String,
}

impl From<&LineItem> for EncodedLineItem {
  fn from(item: &LineItem) -> Self {
    Self {
      line_item_id:    encode_uuid(item.line_item_id),
      system_id:       encode_uuid(item.system_id),
      system_name:     item.system_name.clone(),
      requires_detail: item.requires_detail,
      detail:          item.detail.clone(),
      status:          item.status.to_string(),
    }
  }
}

/// A person converted to column values. `version` is the version the person
/// was read at, 0 if it has never been stored.
pub struct EncodedPerson {
  pub person_id:    String,
  pub name:         String,
  pub document:     String,
  pub job_title:    String,
  pub office_id:    String,
  pub role:         Option<String>,
  pub status:       String,
  pub entitlements: String,
  pub version:      i64,
}

impl EncodedPerson {
  pub fn new(person: &Person) -> Result<Self> {
    Ok(Self {
      person_id:    encode_uuid(person.person_id),
      name:         person.name.clone(),
      document:     person.document.clone(),
      job_title:    person.job_title.clone(),
      office_id:    encode_uuid(person.office_id),
      role:         person.role.map(|r| r.to_string()),
      status:       person.status.to_string(),
      entitlements: encode_entitlements(&person.entitlements)?,
      version:      person.version as i64,
    })
  }

  /// Unconditional write for directory administration. Bumps the stored
  /// version so that in-flight approvals holding an older copy go stale.
  pub fn upsert(&self, conn: &rusqlite::Connection) -> rusqlite::Result<()> {
    conn.execute(
      "INSERT INTO persons (
         person_id, name, document, job_title, office_id, role, status,
         entitlements, version
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)
       ON CONFLICT(person_id) DO UPDATE SET
         name = excluded.name,
         document = excluded.document,
         job_title = excluded.job_title,
         office_id = excluded.office_id,
         role = excluded.role,
         status = excluded.status,
         entitlements = excluded.entitlements,
         version = persons.version + 1",
      rusqlite::params![
        self.person_id,
        self.name,
        self.document,
        self.job_title,
        self.office_id,
        self.role,
        self.status,
        self.entitlements,
      ],
    )?;
    Ok(())
  }

  /// Compare-and-swap write. Updates the row only if it is still at
  /// `self.version`; a never-stored person is inserted only if neither its
  /// id nor its document exists yet. Returns `false` when the row moved on.
  pub fn commit(&self, conn: &rusqlite::Connection) -> rusqlite::Result<bool> {
    if self.version == 0 {
      let inserted = conn.execute(
        "INSERT INTO persons (
           person_id, name, document, job_title, office_id, role, status,
           entitlements, version
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 1)
         ON CONFLICT DO NOTHING",
        rusqlite::params![
          self.person_id,
          self.name,
          self.document,
          self.job_title,
          self.office_id,
          self.role,
          self.status,
          self.entitlements,
        ],
      )?;
      return Ok(inserted > 0);
    }

    let changed = conn.execute(
      "UPDATE persons SET
         name = ?2, document = ?3, job_title = ?4, office_id = ?5, role = ?6,
         status = ?7, entitlements = ?8, version = version + 1
       WHERE person_id = ?1 AND version = ?9",
      rusqlite::params![
        self.person_id,
        self.name,
        self.document,
        self.job_title,
        self.office_id,
        self.role,
        self.status,
        self.entitlements,
        self.version,
      ],
    )?;
    Ok(changed > 0)
  }
}
