use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, patch, post},
};
use chrono::Utc;
use uuid::Uuid;

use crewforge_core::TaskId;
use crewforge_infra::TaskFilter;
use crewforge_tasks::{Complexity, Priority, SkillSet, Task, TaskLifecycle, TaskStatus};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new()
        .route("/", post(create_task).get(list_tasks))
        .route("/:id", get(get_task).delete(deactivate_task))
        .route("/:id/status", patch(update_status))
        .route("/:id/ledger", get(get_ledger_entry))
}

pub async fn create_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Json(body): Json<dto::CreateTaskRequest>,
) -> axum::response::Response {
    let complexity = match Complexity::new(body.complexity) {
        Ok(c) => c,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let priority = match body.priority.as_deref() {
        Some(raw) => match raw.parse::<Priority>() {
            Ok(p) => p,
            Err(e) => return errors::domain_error_to_response(e),
        },
        None => Priority::default(),
    };

    let mut task = Task::new(tenant.tenant_id(), complexity)
        .with_priority(priority)
        .with_required_skills(body.required_skills.iter().collect::<SkillSet>());
    if let Some(assignee) = body.assignee {
        task = task.with_assignee(assignee.into());
    }
    if let Some(due_at) = body.due_at {
        task = task.with_due_at(due_at);
    }

    if let Err(e) = services.tasks.insert(&task).await {
        return errors::repo_error_to_response(e);
    }

    (StatusCode::CREATED, Json(dto::TaskResponse::from_task(&task))).into_response()
}

pub async fn list_tasks(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Query(query): Query<dto::ListTasksQuery>,
) -> axum::response::Response {
    let status = match query.status.as_deref() {
        Some(raw) => match raw.parse::<TaskStatus>() {
            Ok(s) => Some(s),
            Err(e) => return errors::domain_error_to_response(e),
        },
        None => None,
    };

    let filter = TaskFilter {
        status,
        assignee: query.assignee.map(Into::into),
        include_inactive: query.include_inactive,
    };

    match services.tasks.list(tenant.tenant_id(), &filter).await {
        Ok(tasks) => {
            let out: Vec<dto::TaskResponse> =
                tasks.iter().map(dto::TaskResponse::from_task).collect();
            Json(out).into_response()
        }
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn get_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services
        .tasks
        .get(tenant.tenant_id(), TaskId::from_uuid(id))
        .await
    {
        Ok(Some(task)) => Json(dto::TaskResponse::from_task(&task)).into_response(),
        Ok(None) => errors::json_error(StatusCode::NOT_FOUND, "not_found", "task not found"),
        Err(e) => errors::repo_error_to_response(e),
    }
}

pub async fn deactivate_task(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let mut task = match services
        .tasks
        .get(tenant.tenant_id(), TaskId::from_uuid(id))
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "task not found");
        }
        Err(e) => return errors::repo_error_to_response(e),
    };

    task.deactivate();
    if let Err(e) = services.tasks.update(&task).await {
        return errors::repo_error_to_response(e);
    }
    StatusCode::NO_CONTENT.into_response()
}

pub async fn update_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
    Json(body): Json<dto::UpdateStatusRequest>,
) -> axum::response::Response {
    let requested = match body.status.parse::<TaskStatus>() {
        Ok(s) => s,
        Err(e) => return errors::domain_error_to_response(e),
    };

    let mut task = match services
        .tasks
        .get(tenant.tenant_id(), TaskId::from_uuid(id))
        .await
    {
        Ok(Some(task)) => task,
        Ok(None) => {
            return errors::json_error(StatusCode::NOT_FOUND, "not_found", "task not found");
        }
        Err(e) => return errors::repo_error_to_response(e),
    };

    let dispatch = match TaskLifecycle::transition(&mut task, requested, Utc::now()) {
        Ok(d) => d,
        Err(e) => return errors::domain_error_to_response(e),
    };

    // The durable order matters: the status row lands before the jobs so a
    // claimed job always sees the completed task.
    if let Err(e) = services.tasks.update(&task).await {
        return errors::repo_error_to_response(e);
    }

    let receipt = if dispatch.is_eligible() {
        match services.dispatcher.dispatch_completion(&task).await {
            Ok(receipt) => receipt,
            Err(e) => return errors::job_store_error_to_response(e),
        }
    } else {
        crewforge_infra::DispatchReceipt {
            scoring_enqueued: false,
            ledger_enqueued: false,
        }
    };

    Json(dto::StatusChangeResponse {
        task: dto::TaskResponse::from_task(&task),
        scoring_enqueued: receipt.scoring_enqueued,
        ledger_enqueued: receipt.ledger_enqueued,
    })
    .into_response()
}

pub async fn get_ledger_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    match services
        .ledger_entries
        .for_task(tenant.tenant_id(), TaskId::from_uuid(id))
        .await
    {
        Ok(Some(entry)) => Json(dto::LedgerEntryResponse::from_entry(&entry)).into_response(),
        Ok(None) => errors::json_error(
            StatusCode::NOT_FOUND,
            "not_found",
            "no ledger entry recorded for this task",
        ),
        Err(e) => errors::repo_error_to_response(e),
    }
}
