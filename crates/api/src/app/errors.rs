//! Consistent JSON error responses.

use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use crewforge_core::DomainError;
use crewforge_infra::{JobStoreError, RepoError};

pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(msg) => json_error(StatusCode::BAD_REQUEST, "validation_error", msg),
        DomainError::InvalidId(msg) => json_error(StatusCode::BAD_REQUEST, "invalid_id", msg),
        DomainError::InvalidTransition { from, requested } => json_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "invalid_transition",
            format!("cannot move task from {from} to {requested}"),
        ),
        DomainError::InvariantViolation(msg) => {
            json_error(StatusCode::UNPROCESSABLE_ENTITY, "invariant_violation", msg)
        }
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict(msg) => json_error(StatusCode::CONFLICT, "conflict", msg),
    }
}

pub fn repo_error_to_response(err: RepoError) -> axum::response::Response {
    match err {
        RepoError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        RepoError::Duplicate => json_error(StatusCode::CONFLICT, "conflict", "duplicate row"),
        RepoError::Storage(msg) => {
            tracing::error!(error = %msg, "storage failure");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "storage_error",
                "internal storage error",
            )
        }
    }
}

/// Queue writes failing is an infrastructure fault, never the caller's.
pub fn job_store_error_to_response(err: JobStoreError) -> axum::response::Response {
    tracing::error!(error = %err, "job queue failure");
    json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "queue_error",
        "internal queue error",
    )
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_failures_map_to_internal_errors() {
        let response =
            job_store_error_to_response(JobStoreError::Storage("connection refused".into()));
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn conflict_stays_a_client_visible_conflict() {
        let response = domain_error_to_response(DomainError::conflict("task already archived"));
        assert_eq!(response.status(), StatusCode::CONFLICT);
    }
}
