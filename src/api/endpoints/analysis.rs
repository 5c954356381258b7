//! Manual batch trigger.

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::api::error::ApiError;
use crate::api::types::{ApiContext, RunAnalysisResponse};
use crate::intelligence::run_batch;

/// `POST /api/clinicians/{clinician_id}/analysis/run`: run the batch
/// analysis now and report how many alerts it created.
pub async fn run(
    State(ctx): State<ApiContext>,
    Path(clinician_id): Path<Uuid>,
) -> Result<Json<RunAnalysisResponse>, ApiError> {
    let report = run_batch(ctx.core.clone(), clinician_id).await?;
    Ok(Json(RunAnalysisResponse {
        generated: report.generated_count(),
        report,
    }))
}
