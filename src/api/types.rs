//! Shared context and request/response bodies for the HTTP API.

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::intelligence::BatchReport;
use crate::models::{
    AlertFilter, AlertHandling, AlertPriority, AlertStatus, AlertType, Measurement, MetricType,
};

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub core: Arc<CoreState>,
}

impl ApiContext {
    pub fn new(core: Arc<CoreState>) -> Self {
        Self { core }
    }
}

/// Body of `POST /api/patients/{patient_id}/measurements`.
#[derive(Debug, Clone, Deserialize)]
pub struct MeasurementRequest {
    pub metric_type: MetricType,
    pub systolic: Option<f64>,
    pub diastolic: Option<f64>,
    pub glucose: Option<f64>,
    pub heart_rate: Option<f64>,
    pub weight: Option<f64>,
    pub uric_acid: Option<f64>,
    pub total_cholesterol: Option<f64>,
    pub triglycerides: Option<f64>,
    pub hdl: Option<f64>,
    pub ldl: Option<f64>,
    /// Defaults to the time of submission.
    pub measured_at: Option<NaiveDateTime>,
    /// Defaults to the patient.
    pub recorded_by: Option<Uuid>,
    pub note: Option<String>,
}

impl MeasurementRequest {
    pub fn into_measurement(self, patient_id: Uuid, now: NaiveDateTime) -> Measurement {
        let mut m = Measurement::new(patient_id, self.metric_type, self.measured_at.unwrap_or(now));
        m.systolic = self.systolic;
        m.diastolic = self.diastolic;
        m.glucose = self.glucose;
        m.heart_rate = self.heart_rate;
        m.weight = self.weight;
        m.uric_acid = self.uric_acid;
        m.total_cholesterol = self.total_cholesterol;
        m.triglycerides = self.triglycerides;
        m.hdl = self.hdl;
        m.ldl = self.ldl;
        m.recorded_by = self.recorded_by.unwrap_or(patient_id);
        m.note = self.note;
        m.created_at = now;
        m
    }
}

/// Widest day window a list query may ask for.
pub const MAX_FILTER_DAYS: u32 = 3650;

/// Query of `GET /api/clinicians/{clinician_id}/alerts`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertListQuery {
    pub patient_id: Option<Uuid>,
    pub priority: Option<AlertPriority>,
    pub alert_type: Option<AlertType>,
    pub status: Option<AlertStatus>,
    pub days: Option<u32>,
    pub limit: Option<u32>,
}

impl From<AlertListQuery> for AlertFilter {
    fn from(q: AlertListQuery) -> Self {
        AlertFilter {
            patient_id: q.patient_id,
            priority: q.priority,
            alert_type: q.alert_type,
            status: q.status,
            days: q.days.map(|d| d.min(MAX_FILTER_DAYS)),
            limit: q.limit,
        }
    }
}

/// Body of the handle action.
#[derive(Debug, Clone, Deserialize)]
pub struct HandleAlertRequest {
    pub status: AlertStatus,
    pub notes: Option<String>,
    pub action_taken: Option<String>,
}

impl From<HandleAlertRequest> for AlertHandling {
    fn from(r: HandleAlertRequest) -> Self {
        AlertHandling {
            status: r.status,
            notes: r.notes,
            action_taken: r.action_taken,
        }
    }
}

/// Response of `POST /api/clinicians/{clinician_id}/analysis/run`.
#[derive(Debug, Serialize)]
pub struct RunAnalysisResponse {
    pub generated: usize,
    pub report: BatchReport,
}
