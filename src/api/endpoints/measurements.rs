//! Measurement ingest.
//!
//! `POST /api/patients/{patient_id}/measurements` stores the reading and
//! starts immediate analysis in the background. Analysis failures never
//! fail the write.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::api::endpoints::require_role;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, MeasurementRequest};
use crate::db::repository::insert_measurement;
use crate::intelligence::spawn_immediate_analysis;
use crate::models::{Measurement, UserRole};

pub async fn create(
    State(ctx): State<ApiContext>,
    Path(patient_id): Path<Uuid>,
    Json(body): Json<MeasurementRequest>,
) -> Result<(StatusCode, Json<Measurement>), ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &patient_id, UserRole::Patient)?;

    let now = chrono::Local::now().naive_local();
    let measurement = body.into_measurement(patient_id, now);
    measurement.validate().map_err(ApiError::BadRequest)?;
    measurement
        .validate_measured_at(&now)
        .map_err(ApiError::BadRequest)?;
    insert_measurement(&conn, &measurement)?;
    drop(conn);

    tracing::debug!(
        patient_id = %patient_id,
        measurement_id = %measurement.id,
        metric_type = %measurement.metric_type,
        "Measurement stored"
    );
    spawn_immediate_analysis(ctx.core.clone(), measurement.id);

    Ok((StatusCode::CREATED, Json(measurement)))
}
