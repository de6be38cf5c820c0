//! Handlers for `/systems` endpoints (the system catalog).
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/systems` | Optional `?applies_to=ALTA\|BAJA\|MODIFICACION&enabled_only=true` |
//! | `POST`  | `/systems` | Body: [`NewCatalogEntry`]; returns 201 |
//! | `GET`   | `/systems/{id}` | 404 if not found |
//! | `PATCH` | `/systems/{id}` | Body: [`CatalogUpdate`] |
//! | `POST`  | `/systems/{id}/toggle` | Flips the enabled flag |
//!
//! Writes require the approver role.

use std::sync::Arc;

use accesos_core::{
  catalog::{CatalogEntry, CatalogFilter, CatalogUpdate, NewCatalogEntry},
  service::Portal,
  store::AccessStore,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /systems[?applies_to=<kind>][&enabled_only=true]`
pub async fn list<S>(
  State(portal): State<Arc<Portal<S>>>,
  Query(filter): Query<CatalogFilter>,
) -> Result<Json<Vec<CatalogEntry>>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.list_systems(&filter).await?))
}

/// `GET /systems/{id}`
pub async fn get_one<S>(
  State(portal): State<Arc<Portal<S>>>,
  Path(id): Path<Uuid>,
) -> Result<Json<CatalogEntry>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.get_system(id).await?))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /systems`: returns 201 + the stored entry.
pub async fn create<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewCatalogEntry>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AccessStore,
{
  let entry = portal.add_system(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(entry)))
}

/// `PATCH /systems/{id}`
pub async fn update<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<CatalogUpdate>,
) -> Result<Json<CatalogEntry>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.update_system(&actor, id, body).await?))
}

/// `POST /systems/{id}/toggle`
pub async fn toggle<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<CatalogEntry>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.toggle_system(&actor, id).await?))
}
