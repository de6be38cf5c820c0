//! API error type and [`axum::response::IntoResponse`] implementation.

use accesos_core::{Error, service::ServiceError, store::StoreError};
use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("forbidden: {0}")]
  Forbidden(String),

  /// The request is not in a status that allows the operation, or it
  /// changed underneath the caller.
  #[error("conflict: {0}")]
  Conflict(String),

  #[error("unprocessable: {0}")]
  Unprocessable(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    let message = e.to_string();
    match e {
      Error::Unauthorized { .. } => Self::Forbidden(message),
      Error::InvalidTransition { .. } | Error::StaleState(_) => {
        Self::Conflict(message)
      }
      Error::PreconditionFailed(_) => Self::Unprocessable(message),
      Error::UnknownStatus(_) => Self::BadRequest(message),
      e if e.is_not_found() => Self::NotFound(message),
      _ => Self::Unprocessable(message),
    }
  }
}

impl<E: StoreError> From<ServiceError<E>> for ApiError {
  fn from(e: ServiceError<E>) -> Self {
    match e {
      ServiceError::Workflow(e) => e.into(),
      ServiceError::Store(e) if e.is_conflict() => {
        tracing::warn!("store refused a conflicting write: {e}");
        Self::Conflict("the write conflicts with an existing record".into())
      }
      ServiceError::Store(e) => Self::Store(Box::new(e)),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, message) = match &self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, m.clone()),
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m.clone()),
      ApiError::Forbidden(m) => (StatusCode::FORBIDDEN, m.clone()),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, m.clone()),
      ApiError::Unprocessable(m) => (StatusCode::UNPROCESSABLE_ENTITY, m.clone()),
      // Store details stay in the log.
      ApiError::Store(e) => {
        tracing::error!("store failure: {e}");
        (StatusCode::INTERNAL_SERVER_ERROR, "internal store error".to_owned())
      }
    };
    (status, Json(json!({ "error": message }))).into_response()
  }
}
