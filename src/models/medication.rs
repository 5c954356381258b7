use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::AdherenceStatus;

/// Medication plan owned by the scheduling collaborator. Read-only here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicationPlan {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub medication_name: String,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

/// One scheduled dose occurrence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdherenceRecord {
    pub id: Uuid,
    pub plan_id: Uuid,
    pub scheduled_at: NaiveDateTime,
    pub status: AdherenceStatus,
}
