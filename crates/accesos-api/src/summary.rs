//! Handler for `GET /summary`, the approver's dashboard.

use std::sync::Arc;

use accesos_core::{service::Portal, store::AccessStore, summary::Summary};
use axum::{Json, extract::State};

use crate::{actor::CurrentActor, error::ApiError};

/// `GET /summary`: approver only.
pub async fn get<S>(
  State(portal): State<Arc<Portal<S>>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Summary>, ApiError>
where
  S: AccessStore,
{
  Ok(Json(portal.summary(&actor).await?))
}
