//! Router tests against an in-memory SQLite store.

use std::sync::Arc;

use accesos_core::{
  role::{Actor, Role},
  service::{Portal, ServiceError},
  workflow::Workflow,
};
use accesos_store_sqlite::SqliteStore;
use axum::{
  Router,
  body::Body,
  http::{Request, StatusCode, header},
  response::IntoResponse as _,
};
use serde_json::{Value, json};
use tower::ServiceExt as _;
use uuid::Uuid;

use crate::{
  actor::{ACTOR_ID_HEADER, ACTOR_ROLE_HEADER},
  ApiError, api_router,
};

async fn app() -> Router {
  let store = SqliteStore::open_in_memory().await.unwrap();
  api_router(Arc::new(Portal::new(store, Workflow::default())))
}

async fn send(
  app: &Router,
  method: &str,
  uri: &str,
  actor: Option<&Actor>,
  body: Option<Value>,
) -> (StatusCode, Value) {
  let mut builder = Request::builder().method(method).uri(uri);
  if let Some(actor) = actor {
    builder = builder
      .header(ACTOR_ID_HEADER, actor.actor_id.to_string())
      .header(ACTOR_ROLE_HEADER, actor.role.to_string());
  }
  let body = match body {
    Some(v) => {
      builder = builder.header(header::CONTENT_TYPE, "application/json");
      Body::from(v.to_string())
    }
    None => Body::empty(),
  };

  let resp = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  let value = if bytes.is_empty() {
    Value::Null
  } else {
    serde_json::from_slice(&bytes).unwrap()
  };
  (status, value)
}

struct Cast {
  requester:   Actor,
  coordinator: Actor,
  approver:    Actor,
}

fn cast() -> Cast {
  Cast {
    requester:   Actor::new(Uuid::new_v4(), Role::Requester),
    coordinator: Actor::new(Uuid::new_v4(), Role::Coordinator),
    approver:    Actor::new(Uuid::new_v4(), Role::Approver),
  }
}

async fn add_system(app: &Router, approver: &Actor, code: &str) -> String {
  let (status, body) = send(
    app,
    "POST",
    "/systems",
    Some(approver),
    Some(json!({
      "name": format!("System {code}"),
      "code": code,
      "applies_alta": true,
      "applies_baja": true,
    })),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{body}");
  body["system_id"].as_str().unwrap().to_owned()
}

fn alta_body(systems: &[&str]) -> Value {
  json!({
    "kind": "ALTA",
    "target": {
      "person_id": null,
      "name": "Jane Doe",
      "document": "40111222",
      "job_title": "Analyst",
      "office_id": Uuid::new_v4(),
      "office_name": null,
    },
    "items": systems
      .iter()
      .map(|id| json!({ "system_id": id, "detail": null }))
      .collect::<Vec<_>>(),
    "supporting_document": null,
  })
}

async fn action(
  app: &Router,
  actor: &Actor,
  id: &str,
  body: Value,
) -> (StatusCode, Value) {
  send(app, "POST", &format!("/requests/{id}/actions"), Some(actor), Some(body))
    .await
}

/// Submit an ALTA for Jane Doe and return the created request.
async fn submit(app: &Router, requester: &Actor, systems: &[&str]) -> Value {
  let (status, created) =
    send(app, "POST", "/requests", Some(requester), Some(alta_body(systems)))
      .await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  created
}

/// Check off every line item of `created` and send it to validation.
async fn to_validation(app: &Router, coordinator: &Actor, created: &Value) {
  let id = created["request_id"].as_str().unwrap();
  for item in created["line_items"].as_array().unwrap() {
    let (status, body) = action(
      app,
      coordinator,
      id,
      json!({
        "action": "toggle_line_item",
        "line_item_id": item["line_item_id"],
        "status": "COMPLETADO",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
  }
  let (status, body) =
    action(app, coordinator, id, json!({ "action": "send_to_validate" })).await;
  assert_eq!(status, StatusCode::OK, "{body}");
}

async fn body_json(error: ApiError) -> (StatusCode, Value) {
  let resp = error.into_response();
  let status = resp.status();
  let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
    .await
    .unwrap();
  (status, serde_json::from_slice(&bytes).unwrap())
}

// ─── Errors ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn uniqueness_violations_are_conflicts() {
  let duplicate: ServiceError<accesos_store_sqlite::Error> =
    ServiceError::Store(accesos_store_sqlite::Error::DuplicateCode("MAIL".into()));
  let (status, body) = body_json(duplicate.into()).await;
  assert_eq!(status, StatusCode::CONFLICT);
  assert!(!body["error"].as_str().unwrap().contains("MAIL"));
}

#[tokio::test]
async fn store_failures_do_not_leak_details() {
  let failure: ServiceError<accesos_store_sqlite::Error> = ServiceError::Store(
    accesos_store_sqlite::Error::DateParse("persons.secret_column".into()),
  );
  let (status, body) = body_json(failure.into()).await;
  assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
  assert_eq!(body, json!({ "error": "internal store error" }));
}

// ─── Catalog ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn catalog_writes_are_approver_only() {
  let app = app().await;
  let cast = cast();

  let (status, body) = send(
    &app,
    "POST",
    "/systems",
    Some(&cast.coordinator),
    Some(json!({ "name": "Mail", "code": "MAIL" })),
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
  assert!(body["error"].is_string());

  let id = add_system(&app, &cast.approver, "MAIL").await;
  let (status, body) = send(
    &app,
    "POST",
    &format!("/systems/{id}/toggle"),
    Some(&cast.approver),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(body["enabled"], false);

  let (_, listed) =
    send(&app, "GET", "/systems?enabled_only=true", None, None).await;
  assert_eq!(listed, json!([]));

  let (status, _) =
    send(&app, "GET", &format!("/systems/{}", Uuid::new_v4()), None, None).await;
  assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_actor_headers_are_a_bad_request() {
  let app = app().await;
  let (status, body) =
    send(&app, "POST", "/offices", None, Some(json!({ "name": "Logistics" })))
      .await;
  assert_eq!(status, StatusCode::BAD_REQUEST);
  assert!(body["error"].as_str().unwrap().contains(ACTOR_ID_HEADER));
}

// ─── Requests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn alta_end_to_end() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;
  let erp = add_system(&app, &cast.approver, "ERP").await;

  let (status, created) = send(
    &app,
    "POST",
    "/requests",
    Some(&cast.requester),
    Some(alta_body(&[mail.as_str(), erp.as_str()])),
  )
  .await;
  assert_eq!(status, StatusCode::CREATED, "{created}");
  assert_eq!(created["status"], "PENDIENTE_ALTA");
  assert_eq!(created["status_label"], "PENDIENTE ALTA");
  assert_eq!(created["progress"], 0);
  let id = created["request_id"].as_str().unwrap().to_owned();

  let (_, inbox) = send(
    &app,
    "GET",
    "/requests?view=coordinator_inbox",
    Some(&cast.coordinator),
    None,
  )
  .await;
  assert_eq!(inbox.as_array().unwrap().len(), 1);

  let (status, _) = action(&app, &cast.coordinator, &id, json!({ "action": "start" })).await;
  assert_eq!(status, StatusCode::OK);

  // Sending early is refused while items are open.
  let (status, _) = action(
    &app,
    &cast.coordinator,
    &id,
    json!({ "action": "send_to_validate" }),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let items: Vec<String> = created["line_items"]
    .as_array()
    .unwrap()
    .iter()
    .map(|i| i["line_item_id"].as_str().unwrap().to_owned())
    .collect();
  for item in &items {
    let (status, body) = action(
      &app,
      &cast.coordinator,
      &id,
      json!({
        "action": "toggle_line_item",
        "line_item_id": item,
        "status": "COMPLETADO",
      }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
  }

  let (_, progress) = send(
    &app,
    "GET",
    &format!("/requests/{id}/progress"),
    Some(&cast.requester),
    None,
  )
  .await;
  assert_eq!(progress["percentage"], 100);

  let (status, _) = action(
    &app,
    &cast.coordinator,
    &id,
    json!({ "action": "send_to_validate" }),
  )
  .await;
  assert_eq!(status, StatusCode::OK);

  // Only the approver may approve.
  let (status, _) =
    action(&app, &cast.coordinator, &id, json!({ "action": "approve" })).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, done) =
    action(&app, &cast.approver, &id, json!({ "action": "approve" })).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(done["status"], "COMPLETADO_ALTA");

  // Approving twice is a conflict, not a second directory write.
  let (status, _) =
    action(&app, &cast.approver, &id, json!({ "action": "approve" })).await;
  assert_eq!(status, StatusCode::CONFLICT);

  let (_, persons) = send(&app, "GET", "/persons", None, None).await;
  let persons = persons.as_array().unwrap();
  assert_eq!(persons.len(), 1);
  assert_eq!(persons[0]["document"], "40111222");
  assert_eq!(persons[0]["status"], "ACTIVO");
  assert_eq!(persons[0]["entitlements"].as_array().unwrap().len(), 2);
}

#[tokio::test]
async fn requesters_only_see_their_own_requests() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;
  let (_, created) = send(
    &app,
    "POST",
    "/requests",
    Some(&cast.requester),
    Some(alta_body(&[mail.as_str()])),
  )
  .await;
  let id = created["request_id"].as_str().unwrap();

  let stranger = Actor::new(Uuid::new_v4(), Role::Requester);
  let (status, _) =
    send(&app, "GET", &format!("/requests/{id}"), Some(&stranger), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (_, mine) = send(&app, "GET", "/requests", Some(&stranger), None).await;
  assert_eq!(mine, json!([]));

  // The technician reads it but gets no label for a pending status.
  let technician = Actor::new(Uuid::new_v4(), Role::Technician);
  let (status, seen) =
    send(&app, "GET", &format!("/requests/{id}"), Some(&technician), None).await;
  assert_eq!(status, StatusCode::OK);
  assert_eq!(seen["status_label"], Value::Null);

  let (status, _) = send(
    &app,
    "GET",
    "/requests?view=approver_queue",
    Some(&cast.requester),
    None,
  )
  .await;
  assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn observe_then_edit_and_resubmit() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;
  let erp = add_system(&app, &cast.approver, "ERP").await;
  let (_, created) = send(
    &app,
    "POST",
    "/requests",
    Some(&cast.requester),
    Some(alta_body(&[mail.as_str()])),
  )
  .await;
  let id = created["request_id"].as_str().unwrap().to_owned();

  let (status, _) = action(
    &app,
    &cast.coordinator,
    &id,
    json!({ "action": "observe", "reason": "   " }),
  )
  .await;
  assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

  let (_, observed) = action(
    &app,
    &cast.coordinator,
    &id,
    json!({ "action": "observe", "reason": "add the ERP account" }),
  )
  .await;
  assert_eq!(observed["status"], "OBSERVADO");
  assert_eq!(observed["reason"], "add the ERP account");

  let (status, edited) = send(
    &app,
    "PATCH",
    &format!("/requests/{id}"),
    Some(&cast.requester),
    Some(json!({
      "items": [
        { "system_id": mail, "detail": null },
        { "system_id": erp, "detail": null },
      ],
    })),
  )
  .await;
  assert_eq!(status, StatusCode::OK, "{edited}");
  assert_eq!(edited["line_items"].as_array().unwrap().len(), 2);

  let (_, resubmitted) =
    action(&app, &cast.requester, &id, json!({ "action": "resubmit" })).await;
  assert_eq!(resubmitted["status"], "PENDIENTE_ALTA");
  assert_eq!(resubmitted["reason"], Value::Null);
}

#[tokio::test]
async fn request_lists_filter_by_kind_and_page() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;
  let mut ids = Vec::new();
  for _ in 0..3 {
    let created = submit(&app, &cast.requester, &[mail.as_str()]).await;
    ids.push(created["request_id"].as_str().unwrap().to_owned());
  }

  let (_, page) =
    send(&app, "GET", "/requests?limit=2", Some(&cast.requester), None).await;
  let page: Vec<&str> = page
    .as_array()
    .unwrap()
    .iter()
    .map(|r| r["request_id"].as_str().unwrap())
    .collect();
  assert_eq!(page, [ids[2].as_str(), ids[1].as_str()]);

  let (_, rest) = send(
    &app,
    "GET",
    "/requests?view=coordinator_inbox&offset=2",
    Some(&cast.coordinator),
    None,
  )
  .await;
  assert_eq!(rest.as_array().unwrap().len(), 1);
  assert_eq!(rest[0]["request_id"], ids[0].as_str());

  let (_, bajas) = send(
    &app,
    "GET",
    "/requests?kind=BAJA",
    Some(&cast.requester),
    None,
  )
  .await;
  assert_eq!(bajas, json!([]));

  let (_, altas) = send(
    &app,
    "GET",
    "/requests?kind=ALTA&limit=10",
    Some(&cast.requester),
    None,
  )
  .await;
  assert_eq!(altas.as_array().unwrap().len(), 3);
}

// ─── Directory and dashboard ─────────────────────────────────────────────────

#[tokio::test]
async fn summary_counts_validation_backlog_for_the_approver() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;

  let waiting = submit(&app, &cast.requester, &[mail.as_str()]).await;
  to_validation(&app, &cast.coordinator, &waiting).await;
  submit(&app, &cast.requester, &[mail.as_str()]).await;

  let (status, _) = send(&app, "GET", "/summary", Some(&cast.coordinator), None).await;
  assert_eq!(status, StatusCode::FORBIDDEN);

  let (status, summary) =
    send(&app, "GET", "/summary", Some(&cast.approver), None).await;
  assert_eq!(status, StatusCode::OK, "{summary}");
  assert_eq!(summary["active_persons"], 0);
  assert_eq!(summary["awaiting_validation"]["alta"], 1);
  assert_eq!(summary["awaiting_validation"]["total"], 1);
  assert_eq!(summary["pending_baja"]["total"], 0);

  let id = waiting["request_id"].as_str().unwrap();
  let (status, _) =
    action(&app, &cast.approver, id, json!({ "action": "approve" })).await;
  assert_eq!(status, StatusCode::OK);

  let (_, summary) = send(&app, "GET", "/summary", Some(&cast.approver), None).await;
  assert_eq!(summary["active_persons"], 1);
  assert_eq!(summary["awaiting_validation"]["total"], 0);
  assert_eq!(summary["persons_by_office"][0]["count"], 1);
}

#[tokio::test]
async fn persons_can_be_filtered() {
  let app = app().await;
  let cast = cast();
  let mail = add_system(&app, &cast.approver, "MAIL").await;
  let created = submit(&app, &cast.requester, &[mail.as_str()]).await;
  to_validation(&app, &cast.coordinator, &created).await;
  let id = created["request_id"].as_str().unwrap();
  action(&app, &cast.approver, id, json!({ "action": "approve" })).await;

  let (_, found) = send(&app, "GET", "/persons?search=JANE", None, None).await;
  assert_eq!(found.as_array().unwrap().len(), 1);

  let (_, active) = send(&app, "GET", "/persons?status=ACTIVO", None, None).await;
  assert_eq!(active.as_array().unwrap().len(), 1);

  let (_, inactive) = send(&app, "GET", "/persons?status=INACTIVO", None, None).await;
  assert_eq!(inactive, json!([]));

  let (_, elsewhere) = send(
    &app,
    "GET",
    &format!("/persons?office_id={}", Uuid::new_v4()),
    None,
    None,
  )
  .await;
  assert_eq!(elsewhere, json!([]));
}
