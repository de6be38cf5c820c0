//! [`SqliteStore`]: the SQLite implementation of [`AccessStore`].

use std::path::Path;

use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use accesos_core::{
  catalog::{CatalogEntry, CatalogFilter, CatalogUpdate, NewCatalogEntry},
  directory::{Office, Person},
  request::Request,
  store::{AccessStore, CommitOutcome, PersonQuery, RequestQuery},
};

use crate::{
  encode::{
    encode_dt, encode_target, encode_uuid, read_line_items, write_line_items,
    EncodedLineItem, EncodedPerson, RawOffice, RawPerson, RawRequest, RawSystem,
    PERSON_COLUMNS, REQUEST_COLUMNS, SYSTEM_COLUMNS,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A portal store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl std::fmt::Debug for SqliteStore {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SqliteStore").finish_non_exhaustive()
  }
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store; useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn find_person(
    &self,
    column: &'static str,
    value: String,
  ) -> Result<Option<Person>> {
    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PERSON_COLUMNS} FROM persons WHERE {column} = ?1"),
            rusqlite::params![value],
            RawPerson::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn write_system(&self, entry: &CatalogEntry) -> Result<()> {
    let id_str = encode_uuid(entry.system_id);
    let entry = entry.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE systems SET
             name = ?2, code = ?3, applies_alta = ?4, applies_baja = ?5,
             requires_detail = ?6, enabled = ?7
           WHERE system_id = ?1",
          rusqlite::params![
            id_str,
            entry.name,
            entry.code,
            entry.applies_alta,
            entry.applies_baja,
            entry.requires_detail,
            entry.enabled,
          ],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }
}

// ─── AccessStore impl ────────────────────────────────────────────────────────

impl AccessStore for SqliteStore {
  type Error = Error;

  // ── Offices ───────────────────────────────────────────────────────────

  async fn add_office(&self, name: String) -> Result<Office> {
    let office = Office {
      office_id: Uuid::new_v4(),
      name,
    };

    let id_str = encode_uuid(office.office_id);
    let name = office.name.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO offices (office_id, name) VALUES (?1, ?2)",
          rusqlite::params![id_str, name],
        )?;
        Ok(())
      })
      .await?;

    Ok(office)
  }

  async fn list_offices(&self) -> Result<Vec<Office>> {
    let raws: Vec<RawOffice> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT office_id, name FROM offices ORDER BY name")?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawOffice {
              office_id: row.get(0)?,
              name:      row.get(1)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawOffice::into_office).collect()
  }

  // ── Catalog ───────────────────────────────────────────────────────────

  async fn add_system(&self, input: NewCatalogEntry) -> Result<CatalogEntry> {
    let entry = input.into_entry(Uuid::new_v4());

    let id_str = encode_uuid(entry.system_id);
    let row = entry.clone();

    let inserted: bool = self
      .conn
      .call(move |conn| {
        let taken = conn
          .query_row(
            "SELECT 1 FROM systems WHERE code = ?1",
            rusqlite::params![row.code],
            |_| Ok(()),
          )
          .optional()?
          .is_some();
        if taken {
          return Ok(false);
        }

        conn.execute(
          "INSERT INTO systems (
             system_id, name, code, applies_alta, applies_baja,
             requires_detail, enabled
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            id_str,
            row.name,
            row.code,
            row.applies_alta,
            row.applies_baja,
            row.requires_detail,
            row.enabled,
          ],
        )?;
        Ok(true)
      })
      .await?;

    if !inserted {
      return Err(Error::DuplicateCode(entry.code));
    }
    Ok(entry)
  }

  async fn update_system(
    &self,
    system_id: Uuid,
    update: CatalogUpdate,
  ) -> Result<Option<CatalogEntry>> {
    let Some(current) = self.get_system(system_id).await? else {
      return Ok(None);
    };
    let next = update.apply(&current)?;

    if next.code != current.code {
      let clash = self
        .list_systems(&CatalogFilter::default())
        .await?
        .into_iter()
        .any(|e| e.code == next.code && e.system_id != system_id);
      if clash {
        return Err(Error::DuplicateCode(next.code));
      }
    }

    self.write_system(&next).await?;
    Ok(Some(next))
  }

  async fn get_system(&self, system_id: Uuid) -> Result<Option<CatalogEntry>> {
    let id_str = encode_uuid(system_id);

    let raw: Option<RawSystem> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {SYSTEM_COLUMNS} FROM systems WHERE system_id = ?1"),
            rusqlite::params![id_str],
            RawSystem::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawSystem::into_entry).transpose()
  }

  async fn list_systems(&self, filter: &CatalogFilter) -> Result<Vec<CatalogEntry>> {
    let raws: Vec<RawSystem> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {SYSTEM_COLUMNS} FROM systems ORDER BY rowid"))?;
        let rows = stmt
          .query_map([], RawSystem::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut entries = Vec::with_capacity(raws.len());
    for raw in raws {
      let entry = raw.into_entry()?;
      if filter.matches(&entry) {
        entries.push(entry);
      }
    }
    Ok(entries)
  }

  // ── Persons ───────────────────────────────────────────────────────────

  async fn get_person(&self, person_id: Uuid) -> Result<Option<Person>> {
    self.find_person("person_id", encode_uuid(person_id)).await
  }

  async fn find_person_by_document(&self, document: &str) -> Result<Option<Person>> {
    self.find_person("document", document.trim().to_owned()).await
  }

  async fn list_persons(&self, query: &PersonQuery) -> Result<Vec<Person>> {
    let raws: Vec<RawPerson> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {PERSON_COLUMNS} FROM persons ORDER BY name"))?;
        let rows = stmt
          .query_map([], RawPerson::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    let mut persons = Vec::with_capacity(raws.len());
    for raw in raws {
      let person = raw.into_person()?;
      if query.matches(&person) {
        persons.push(person);
      }
    }
    Ok(persons)
  }

  async fn upsert_person(&self, person: &Person) -> Result<()> {
    let encoded = EncodedPerson::new(person)?;

    self
      .conn
      .call(move |conn| {
        encoded.upsert(conn)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  // ── Requests ──────────────────────────────────────────────────────────

  async fn insert_request(&self, request: &Request) -> Result<()> {
    let id_str           = encode_uuid(request.request_id);
    let created_at_str   = encode_dt(request.created_at);
    let kind_str         = request.kind.to_string();
    let target_str       = encode_target(&request.target)?;
    let requester_id_str = encode_uuid(request.requester_id);
    let status_str       = request.status.to_string();
    let reason           = request.reason.clone();
    let document         = request.supporting_document.clone();
    let version          = request.version as i64;
    let items: Vec<EncodedLineItem> =
      request.line_items.iter().map(EncodedLineItem::from).collect();

    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        tx.execute(
          "INSERT INTO requests (
             request_id, created_at, kind, target, requester_id, status,
             reason, supporting_document, version
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
          rusqlite::params![
            id_str,
            created_at_str,
            kind_str,
            target_str,
            requester_id_str,
            status_str,
            reason,
            document,
            version,
          ],
        )?;
        write_line_items(&tx, &id_str, &items)?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn get_request(&self, request_id: Uuid) -> Result<Option<Request>> {
    let id_str = encode_uuid(request_id);

    let raw: Option<RawRequest> = self
      .conn
      .call(move |conn| {
        let raw = conn
          .query_row(
            &format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE request_id = ?1"),
            rusqlite::params![id_str],
            RawRequest::from_row,
          )
          .optional()?;
        let Some(mut raw) = raw else {
          return Ok(None);
        };
        raw.line_items = read_line_items(conn, &id_str)?;
        Ok(Some(raw))
      })
      .await?;

    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_requests(&self, query: &RequestQuery) -> Result<Vec<Request>> {
    let mut sql = format!("SELECT {REQUEST_COLUMNS} FROM requests WHERE 1 = 1");
    let mut params: Vec<String> = Vec::new();

    if let Some(requester_id) = query.requester_id {
      params.push(encode_uuid(requester_id));
      sql.push_str(&format!(" AND requester_id = ?{}", params.len()));
    }
    if let Some(kind) = query.kind {
      params.push(kind.to_string());
      sql.push_str(&format!(" AND kind = ?{}", params.len()));
    }

    sql.push_str(" ORDER BY created_at DESC, rowid DESC");
    // SQLite requires a LIMIT before an OFFSET; -1 means unbounded.
    match (query.limit, query.offset) {
      (Some(limit), offset) => {
        sql.push_str(&format!(" LIMIT {limit} OFFSET {}", offset.unwrap_or(0)))
      }
      (None, Some(offset)) => sql.push_str(&format!(" LIMIT -1 OFFSET {offset}")),
      (None, None) => {}
    }

    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let mut raws = stmt
          .query_map(rusqlite::params_from_iter(params.iter()), RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        for raw in &mut raws {
          raw.line_items = read_line_items(conn, &raw.request_id)?;
        }
        Ok(raws)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn commit_request(
    &self,
    request: &Request,
    person: Option<&Person>,
  ) -> Result<CommitOutcome> {
    let id_str     = encode_uuid(request.request_id);
    let target_str = encode_target(&request.target)?;
    let status_str = request.status.to_string();
    let reason     = request.reason.clone();
    let document   = request.supporting_document.clone();
    let version    = request.version as i64;
    let items: Vec<EncodedLineItem> =
      request.line_items.iter().map(EncodedLineItem::from).collect();
    let person = person.map(EncodedPerson::new).transpose()?;

    let written: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let changed = tx.execute(
          "UPDATE requests SET
             target = ?2, status = ?3, reason = ?4, supporting_document = ?5,
             version = version + 1
           WHERE request_id = ?1 AND version = ?6",
          rusqlite::params![id_str, target_str, status_str, reason, document, version],
        )?;
        if changed == 0 {
          // Dropping the transaction rolls it back.
          return Ok(false);
        }

        write_line_items(&tx, &id_str, &items)?;
        let person_written = match &person {
          Some(person) => person.commit(&tx)?,
          None => true,
        };
        if !person_written {
          return Ok(false);
        }
        tx.commit()?;
        Ok(true)
      })
      .await?;

    if !written {
      return Ok(CommitOutcome::Stale);
    }
    Ok(CommitOutcome::Committed(Request {
      version: request.version + 1,
      ..request.clone()
    }))
  }
}
