//! Extractor for the account acting on a request.

use std::str::FromStr as _;

use accesos_core::role::{Actor, Role};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, request::Parts},
};
use uuid::Uuid;

use crate::error::ApiError;

pub const ACTOR_ID_HEADER: &str = "x-actor-id";
pub const ACTOR_ROLE_HEADER: &str = "x-actor-role";

/// The caller, as asserted by the fronting authentication layer.
#[derive(Debug, Clone, Copy)]
pub struct CurrentActor(pub Actor);

/// Read the actor headers directly.
pub fn actor_from_headers(headers: &HeaderMap) -> Result<Actor, ApiError> {
  let header = |name: &str| {
    headers
      .get(name)
      .and_then(|v| v.to_str().ok())
      .map(str::trim)
      .ok_or_else(|| ApiError::BadRequest(format!("missing {name} header")))
  };

  let actor_id = Uuid::parse_str(header(ACTOR_ID_HEADER)?)
    .map_err(|e| ApiError::BadRequest(format!("invalid {ACTOR_ID_HEADER}: {e}")))?;
  let role = header(ACTOR_ROLE_HEADER)?;
  let role = Role::from_str(role)
    .map_err(|_| ApiError::BadRequest(format!("unknown role {role:?}")))?;

  Ok(Actor::new(actor_id, role))
}

impl<S> FromRequestParts<S> for CurrentActor
where
  S: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    actor_from_headers(&parts.headers).map(CurrentActor)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(id: &str, role: &str) -> HeaderMap {
    let mut map = HeaderMap::new();
    map.insert(ACTOR_ID_HEADER, HeaderValue::from_str(id).unwrap());
    map.insert(ACTOR_ROLE_HEADER, HeaderValue::from_str(role).unwrap());
    map
  }

  #[test]
  fn parses_wire_role_codes() {
    let id = Uuid::new_v4();
    let actor = actor_from_headers(&headers(&id.to_string(), "JEFE_ETIC")).unwrap();
    assert_eq!(actor, Actor::new(id, Role::Approver));
  }

  #[test]
  fn rejects_unknown_role_and_missing_headers() {
    let id = Uuid::new_v4().to_string();
    assert!(matches!(
      actor_from_headers(&headers(&id, "ADMIN")),
      Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
      actor_from_headers(&headers("not-a-uuid", "OGA")),
      Err(ApiError::BadRequest(_))
    ));
    assert!(matches!(
      actor_from_headers(&HeaderMap::new()),
      Err(ApiError::BadRequest(_))
    ));
  }
}
