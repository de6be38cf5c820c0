//! Handlers for `/requests` endpoints.
//!
//! | Method  | Path | Notes |
//! |---------|------|-------|
//! | `GET`   | `/requests` | Optional `?view=<view>` (defaults to the caller's home view), `kind`, `limit`, `offset` |
//! | `POST`  | `/requests` | Body: [`NewRequest`]; requester only; returns 201 |
//! | `GET`   | `/requests/{id}` | Requesters only see their own |
//! | `PATCH` | `/requests/{id}` | Body: [`RequestEdit`]; owner, while pending or observed |
//! | `GET`   | `/requests/{id}/progress` | `{"request_id":..,"percentage":..}` |
//! | `POST`  | `/requests/{id}/actions` | Body: tagged [`Action`], e.g. `{"action":"start"}` |

use std::sync::Arc;

use accesos_core::{
  Error,
  request::{NewRequest, Request, RequestEdit},
  role::{Actor, Role},
  service::{Portal, ViewPage},
  status::RequestKind,
  store::AccessStore,
  view::{RequestView, visible_status_label},
  workflow::Action,
};
use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{actor::CurrentActor, error::ApiError};

/// A request as returned to a particular caller.
#[derive(Debug, Serialize)]
pub struct RequestDetail {
  #[serde(flatten)]
  pub request:      Request,
  pub progress:     u8,
  /// `None` when the caller's role never sees this status.
  pub status_label: Option<String>,
}

impl RequestDetail {
  fn for_role(request: Request, role: Role) -> Self {
    Self {
      progress: request.completion_percentage(),
      status_label: visible_status_label(&request, role),
      request,
    }
  }
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub view:   Option<RequestView>,
  pub kind:   Option<RequestKind>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

/// `GET /requests[?view=<view>][&kind=<kind>][&limit=<n>][&offset=<n>]`
pub async fn list<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<RequestDetail>>, ApiError>
where
  S: AccessStore,
{
  let view = params
    .view
    .unwrap_or_else(|| RequestView::default_for(actor.role));
  let page = ViewPage {
    kind:   params.kind,
    limit:  params.limit,
    offset: params.offset,
  };
  let requests = portal.list_view(&actor, view, page).await?;
  Ok(Json(
    requests
      .into_iter()
      .map(|r| RequestDetail::for_role(r, actor.role))
      .collect(),
  ))
}

// ─── Create / edit ────────────────────────────────────────────────────────────

/// `POST /requests`: returns 201 + the new `PENDIENTE_<kind>` request.
pub async fn create<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewRequest>,
) -> Result<impl IntoResponse, ApiError>
where
  S: AccessStore,
{
  let request = portal.submit_request(&actor, body).await?;
  Ok((
    StatusCode::CREATED,
    Json(RequestDetail::for_role(request, actor.role)),
  ))
}

/// `PATCH /requests/{id}`
pub async fn edit<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(body): Json<RequestEdit>,
) -> Result<Json<RequestDetail>, ApiError>
where
  S: AccessStore,
{
  let request = portal.edit_request(&actor, id, body).await?;
  Ok(Json(RequestDetail::for_role(request, actor.role)))
}

// ─── Reads ────────────────────────────────────────────────────────────────────

/// `GET /requests/{id}`
pub async fn get_one<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>, ApiError>
where
  S: AccessStore,
{
  let request = readable(&portal, &actor, id).await?;
  Ok(Json(RequestDetail::for_role(request, actor.role)))
}

#[derive(Debug, Serialize)]
pub struct Progress {
  pub request_id: Uuid,
  pub percentage: u8,
}

/// `GET /requests/{id}/progress`
pub async fn progress<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
) -> Result<Json<Progress>, ApiError>
where
  S: AccessStore,
{
  let request = readable(&portal, &actor, id).await?;
  Ok(Json(Progress {
    request_id: id,
    percentage: request.completion_percentage(),
  }))
}

// ─── Actions ──────────────────────────────────────────────────────────────────

/// `POST /requests/{id}/actions`
pub async fn act<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<Uuid>,
  Json(action): Json<Action>,
) -> Result<Json<RequestDetail>, ApiError>
where
  S: AccessStore,
{
  let request = portal.apply_action(&actor, id, action).await?;
  Ok(Json(RequestDetail::for_role(request, actor.role)))
}

/// Load a request, hiding other requesters' requests from a requester.
async fn readable<S>(
  portal: &Portal<S>,
  actor: &Actor,
  id: Uuid,
) -> Result<Request, ApiError>
where
  S: AccessStore,
{
  let request = portal.get_request(id).await?;
  if actor.role == Role::Requester && !request.is_owned_by(actor) {
    return Err(
      Error::Unauthorized {
        role:      actor.role,
        operation: "read another requester's request".into(),
      }
      .into(),
    );
  }
  Ok(request)
}
