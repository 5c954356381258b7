//! Clinician alert endpoints: list, stats, detail, handle.

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::api::endpoints::require_role;
use crate::api::error::ApiError;
use crate::api::types::{AlertListQuery, ApiContext, HandleAlertRequest};
use crate::db::repository::{get_alert, get_alert_stats, list_alerts_for_clinician, update_alert_handling};
use crate::models::{Alert, AlertHandling, AlertStats, UserRole};

fn now() -> chrono::NaiveDateTime {
    chrono::Local::now().naive_local()
}

/// `GET /api/clinicians/{clinician_id}/alerts`
pub async fn list(
    State(ctx): State<ApiContext>,
    Path(clinician_id): Path<Uuid>,
    Query(query): Query<AlertListQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &clinician_id, UserRole::Clinician)?;
    let alerts = list_alerts_for_clinician(&conn, &clinician_id, &query.into(), &now())?;
    Ok(Json(alerts))
}

/// `GET /api/clinicians/{clinician_id}/alerts/stats`
pub async fn stats(
    State(ctx): State<ApiContext>,
    Path(clinician_id): Path<Uuid>,
) -> Result<Json<AlertStats>, ApiError> {
    let conn = ctx.core.open_db()?;
    require_role(&conn, &clinician_id, UserRole::Clinician)?;
    Ok(Json(get_alert_stats(&conn, &clinician_id)?))
}

/// `GET /api/clinicians/{clinician_id}/alerts/{alert_id}`. Alerts assigned
/// to someone else read as not found.
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path((clinician_id, alert_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Alert>, ApiError> {
    let conn = ctx.core.open_db()?;
    match get_alert(&conn, &alert_id)? {
        Some(alert) if alert.clinician_id == Some(clinician_id) => Ok(Json(alert)),
        _ => Err(ApiError::NotFound(format!("Alert {alert_id} not found"))),
    }
}

/// `POST /api/clinicians/{clinician_id}/alerts/{alert_id}/handle`
///
/// Only the assigned clinician may act, and only on a pending alert.
pub async fn handle(
    State(ctx): State<ApiContext>,
    Path((clinician_id, alert_id)): Path<(Uuid, Uuid)>,
    Json(body): Json<HandleAlertRequest>,
) -> Result<Json<Alert>, ApiError> {
    let handling: AlertHandling = body.into();
    if !handling.status.is_terminal() {
        return Err(ApiError::BadRequest(format!(
            "Cannot move an alert to {}",
            handling.status
        )));
    }

    let conn = ctx.core.open_db()?;
    let alert = get_alert(&conn, &alert_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Alert {alert_id} not found")))?;
    if alert.clinician_id != Some(clinician_id) {
        return Err(ApiError::Forbidden(
            "Only the assigned clinician can handle this alert".into(),
        ));
    }
    if alert.status.is_terminal() {
        return Err(ApiError::Conflict(format!("Alert is already {}", alert.status)));
    }

    if !update_alert_handling(&conn, &alert_id, &clinician_id, &handling, &now())? {
        return Err(ApiError::Conflict("Alert was handled concurrently".into()));
    }
    tracing::info!(
        alert_id = %alert_id,
        clinician_id = %clinician_id,
        status = %handling.status,
        "Alert handled"
    );

    let updated = get_alert(&conn, &alert_id)?
        .ok_or_else(|| ApiError::NotFound(format!("Alert {alert_id} not found")))?;
    Ok(Json(updated))
}
