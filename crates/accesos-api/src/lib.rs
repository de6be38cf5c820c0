//! JSON REST API for the access-request portal.
//!
//! Exposes an axum [`Router`] backed by a [`Portal`] over any
//! [`accesos_core::store::AccessStore`]. Authentication and TLS are the
//! caller's responsibility; the acting account arrives in the `X-Actor-Id`
//! and `X-Actor-Role` headers (see [`actor`]).
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", accesos_api::api_router(portal.clone()))
//! ```

pub mod actor;
pub mod error;
pub mod offices;
pub mod persons;
pub mod requests;
pub mod summary;
pub mod systems;

use std::sync::Arc;

use accesos_core::{service::Portal, store::AccessStore};
use axum::{
  Router,
  routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use actor::CurrentActor;
pub use error::ApiError;

/// Build the API router for `portal`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(portal: Arc<Portal<S>>) -> Router<()>
where
  S: AccessStore + 'static,
{
  Router::new()
    // Directory
    .route("/offices", get(offices::list::<S>).post(offices::create::<S>))
    .route("/persons", get(persons::list::<S>))
    .route("/persons/{id}", get(persons::get_one::<S>))
    // Catalog
    .route("/systems", get(systems::list::<S>).post(systems::create::<S>))
    .route(
      "/systems/{id}",
      get(systems::get_one::<S>).patch(systems::update::<S>),
    )
    .route("/systems/{id}/toggle", post(systems::toggle::<S>))
    // Requests
    .route("/requests", get(requests::list::<S>).post(requests::create::<S>))
    .route(
      "/requests/{id}",
      get(requests::get_one::<S>).patch(requests::edit::<S>),
    )
    .route("/requests/{id}/progress", get(requests::progress::<S>))
    .route("/requests/{id}/actions", post(requests::act::<S>))
    // Dashboard
    .route("/summary", get(summary::get::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(portal)
}

#[cfg(test)]
mod tests;
