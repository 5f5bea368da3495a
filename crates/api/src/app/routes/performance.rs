use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path},
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crewforge_core::EmployeeId;
use crewforge_scoring::{ScoreCard, ScoreFactors, TemplateNarrator, Trend};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::TenantContext;

pub fn router() -> Router {
    Router::new().route("/:id/performance", get(get_performance))
}

/// Latest performance sample plus trend and a readable explanation. An
/// employee with no scoring history gets the unscored shape, not a 404:
/// "never scored" is a valid answer.
pub async fn get_performance(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    Path(id): Path<Uuid>,
) -> axum::response::Response {
    let employee_id = EmployeeId::from_uuid(id);

    let history = match services
        .performance
        .for_employee(tenant.tenant_id(), employee_id)
        .await
    {
        Ok(history) => history,
        Err(e) => return errors::repo_error_to_response(e),
    };

    let Some(latest) = history.last() else {
        let narrative = TemplateNarrator::render(&ScoreCard::empty(), Trend::InsufficientData);
        return Json(dto::PerformanceResponse::unscored(id, narrative)).into_response();
    };

    let trend = Trend::from_samples(&history, Utc::now());
    let card = ScoreCard {
        score: latest.score,
        grade: latest.score.map(crewforge_scoring::Grade::from_score),
        factors: ScoreFactors {
            completion_rate: latest.completion_rate,
            on_time_rate: latest.on_time_rate,
            avg_complexity: latest.avg_complexity,
        },
        task_count: latest.task_count,
    };
    let narrative = TemplateNarrator::render(&card, trend);

    Json(dto::PerformanceResponse::from_sample(
        id, latest, trend, narrative,
    ))
    .into_response()
}
