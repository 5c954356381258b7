use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{AlertPriority, AlertRule, AlertStatus, AlertType, MetricType};

/// Persisted alert. Created only by the emitter; mutated only by a
/// clinician's handling action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Alert {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub clinician_id: Option<Uuid>,
    pub alert_type: AlertType,
    pub rule: AlertRule,
    /// Metric the rule looked at, when it is metric-specific. Part of the
    /// dedup key together with patient, type and rule.
    pub metric_type: Option<MetricType>,
    pub priority: AlertPriority,
    pub status: AlertStatus,
    pub title: String,
    pub message: String,
    pub measurement_id: Option<Uuid>,
    pub created_at: NaiveDateTime,
    pub handled_by: Option<Uuid>,
    pub handled_at: Option<NaiveDateTime>,
    pub handling_notes: Option<String>,
    pub action_taken: Option<String>,
}

/// Clinician handling action on a pending alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertHandling {
    pub status: AlertStatus,
    pub notes: Option<String>,
    pub action_taken: Option<String>,
}

/// Aggregate counts for a clinician's alerts.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AlertStats {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
    pub by_priority: BTreeMap<String, u64>,
    pub by_type: BTreeMap<String, u64>,
}
