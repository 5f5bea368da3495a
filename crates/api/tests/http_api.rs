//! In-process HTTP tests over the full router with in-memory storage.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use uuid::Uuid;

use crewforge_api::app::{build_app, services::AppServices};
use crewforge_ledger::LedgerClient;

fn test_app() -> (Router, Arc<AppServices>) {
    let services = Arc::new(AppServices::in_memory(LedgerClient::Disabled));
    (build_app(services.clone()), services)
}

async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    tenant: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(tenant) = tenant {
        builder = builder.header("x-tenant-id", tenant.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn create_task(app: &Router, tenant: Uuid, body: Value) -> Value {
    let (status, task) = send(app, "POST", "/tasks", Some(tenant), Some(body)).await;
    assert_eq!(status, StatusCode::CREATED);
    task
}

#[tokio::test]
async fn health_needs_no_tenant() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn tenant_header_is_required_on_scoped_routes() {
    let (app, _) = test_app();
    let (status, body) = send(&app, "GET", "/tasks", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "missing_tenant");

    let request = Request::builder()
        .method("GET")
        .uri("/tasks")
        .header("x-tenant-id", "not-a-uuid")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn created_task_round_trips() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();

    let task = create_task(
        &app,
        tenant,
        json!({
            "complexity": 4,
            "priority": "high",
            "required_skills": ["Rust", "sql"],
        }),
    )
    .await;
    assert_eq!(task["status"], "assigned");
    assert_eq!(task["priority"], "high");
    assert_eq!(task["complexity"], 4);
    assert_eq!(task["required_skills"], json!(["rust", "sql"]));
    assert_eq!(task["active"], true);

    let id = task["id"].as_str().unwrap();
    let (status, fetched) = send(&app, "GET", &format!("/tasks/{id}"), Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], task["id"]);
}

#[tokio::test]
async fn tasks_are_invisible_to_other_tenants() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();
    let task = create_task(&app, tenant, json!({ "complexity": 2 })).await;
    let id = task["id"].as_str().unwrap();

    let intruder = Uuid::now_v7();
    let (status, _) = send(&app, "GET", &format!("/tasks/{id}"), Some(intruder), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, list) = send(&app, "GET", "/tasks", Some(intruder), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(list, json!([]));
}

#[tokio::test]
async fn out_of_range_complexity_is_rejected() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();
    let (status, body) = send(
        &app,
        "POST",
        "/tasks",
        Some(tenant),
        Some(json!({ "complexity": 9 })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn skipping_a_lifecycle_stage_is_unprocessable() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();
    let task = create_task(&app, tenant, json!({ "complexity": 3 })).await;
    let id = task["id"].as_str().unwrap();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/tasks/{id}/status"),
        Some(tenant),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn deactivated_task_leaves_default_listings() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();
    let task = create_task(&app, tenant, json!({ "complexity": 1 })).await;
    let id = task["id"].as_str().unwrap();

    let (status, _) = send(&app, "DELETE", &format!("/tasks/{id}"), Some(tenant), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (_, list) = send(&app, "GET", "/tasks", Some(tenant), None).await;
    assert_eq!(list, json!([]));

    let (_, list) = send(
        &app,
        "GET",
        "/tasks?include_inactive=true",
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(list.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn unknown_employee_reports_unscored_not_missing() {
    let (app, _) = test_app();
    let tenant = Uuid::now_v7();
    let employee = Uuid::now_v7();

    let (status, body) = send(
        &app,
        "GET",
        &format!("/employees/{employee}/performance"),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["score"], Value::Null);
    assert_eq!(body["trend"], "insufficient_data");
    assert!(body["narrative"].as_str().unwrap().contains("No performance score"));
}

#[tokio::test]
async fn completion_flows_through_scoring_and_ledger() {
    let (app, services) = test_app();
    let tenant = Uuid::now_v7();
    let employee = Uuid::now_v7();

    let due = chrono::Utc::now() + chrono::Duration::days(7);
    let task = create_task(
        &app,
        tenant,
        json!({
            "complexity": 3,
            "assignee": employee,
            "due_at": due,
        }),
    )
    .await;
    let id = task["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/tasks/{id}/status"),
        Some(tenant),
        Some(json!({ "status": "in_progress" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["scoring_enqueued"], false);
    assert_eq!(body["ledger_enqueued"], false);

    let (status, body) = send(
        &app,
        "PATCH",
        &format!("/tasks/{id}/status"),
        Some(tenant),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(body["scoring_enqueued"], true);
    assert_eq!(body["ledger_enqueued"], true);
    assert!(body["completed_at"].is_string());

    // Drain both queues the way the spawned workers would.
    assert_eq!(services.scoring_worker().run_pending().await, 1);
    assert_eq!(services.ledger_worker().run_pending().await, 1);

    let (status, perf) = send(
        &app,
        "GET",
        &format!("/employees/{employee}/performance"),
        Some(tenant),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // One task, completed on time, complexity 3: 40 + 35 + 15.
    assert_eq!(perf["score"], 90.0);
    assert_eq!(perf["grade"], "A+");
    assert_eq!(perf["task_count"], 1);

    let (status, entry) = send(&app, "GET", &format!("/tasks/{id}/ledger"), Some(tenant), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["task_id"], json!(id));
    // Ledger disabled: local entry only, no transaction reference.
    assert_eq!(entry["tx_ref"], Value::Null);
}

#[tokio::test]
async fn completing_twice_is_rejected_and_jobs_stay_deduped() {
    let (app, services) = test_app();
    let tenant = Uuid::now_v7();
    let task = create_task(
        &app,
        tenant,
        json!({ "complexity": 2, "assignee": Uuid::now_v7() }),
    )
    .await;
    let id = task["id"].as_str().unwrap().to_string();

    for status_name in ["in_progress", "completed"] {
        let (status, _) = send(
            &app,
            "PATCH",
            &format!("/tasks/{id}/status"),
            Some(tenant),
            Some(json!({ "status": status_name })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    // Completed is terminal.
    let (status, _) = send(
        &app,
        "PATCH",
        &format!("/tasks/{id}/status"),
        Some(tenant),
        Some(json!({ "status": "completed" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    // Exactly one job per queue despite the retried request.
    assert_eq!(services.scoring_worker().run_pending().await, 1);
    assert_eq!(services.ledger_worker().run_pending().await, 1);
}
