//! Handlers for `/persons` endpoints. The directory is written only by
//! approved requests, so these are read-only.

use std::sync::Arc;

use accesos_core::{
  directory::Person,
  service::Portal,
  store::{AccessStore, PersonQuery},
};
use axum::{
  Json,
  extract::{Path, Query, State},
};
use uuid::Uuid;

use crate::error::ApiError;

/// `GET /persons[?status=ACTIVO|INACTIVO][&office_id=<uuid>][&search=<text>]`
pub async fn list<S>(
  State(portal): State<Arc<Portal<S>>>,
  Query(query): Query<PersonQuery>,
) -> Result<Json<Vec<Person>>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.list_persons(&query).await?))
}

/// `GET /persons/{id}`
pub async fn get_one<S>(
  State(portal): State<Arc<Portal<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Person>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.get_person(id).await?))
}
