//! Handlers for `/offices` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/offices` | Ordered by name |
//! | `POST` | `/offices` | Body: `{"name":"..."}`; approver only |

use std::sync::Arc;

use accesos_core::{directory::Office, service::Portal, store::AccessStore};
use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use serde::Deserialize;

use crate::{actor::CurrentActor, error::ApiError};

/// `GET /offices`
pub async fn list<S>(
  State(portal): State<Arc<Portal<S>>>,
) -> Result<Json<Vec<Office>>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.list_offices().await?))
}

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub name: String,
}

/// `POST /offices`
pub async fn create<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AccessStore,
{
  let office = portal.add_office(&actor, body.name).await?;
  Ok((StatusCode::CREATED, Json(office)))
}
