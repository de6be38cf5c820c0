//! Error type for `accesos-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] accesos_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored enum column holds a value this build does not know.
  #[error("cannot decode {column}: {value:?}")]
  Decode { column: &'static str, value: String },

  #[error("a catalog entry with code {0:?} already exists")]
  DuplicateCode(String),
}

impl accesos_core::store::StoreError for Error {
  fn is_conflict(&self) -> bool {
    match self {
      Self::DuplicateCode(_) => true,
      Self::Database(tokio_rusqlite::Error::Rusqlite(
        rusqlite::Error::SqliteFailure(e, _),
      )) => e.code == rusqlite::ErrorCode::ConstraintViolation,
      _ => false,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
