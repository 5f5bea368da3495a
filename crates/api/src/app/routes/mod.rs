use axum::Router;

pub mod performance;
pub mod system;
pub mod tasks;

/// Router for all tenant-scoped endpoints.
pub fn router() -> Router {
    Router::new()
        .nest("/tasks", tasks::router())
        .nest("/employees", performance::router())
}
