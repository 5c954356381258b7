use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::BindingStatus;

/// Clinician-patient scoping relation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClinicianBinding {
    pub id: Uuid,
    pub clinician_id: Uuid,
    pub patient_id: Uuid,
    pub status: BindingStatus,
    /// At most one active binding per patient carries this flag.
    pub is_primary: bool,
    pub created_at: NaiveDateTime,
}

impl ClinicianBinding {
    pub fn is_active(&self) -> bool {
        self.status == BindingStatus::Active
    }
}
