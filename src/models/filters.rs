use uuid::Uuid;

use super::enums::{AlertPriority, AlertStatus, AlertType};

#[derive(Debug, Default, Clone)]
pub struct AlertFilter {
    pub patient_id: Option<Uuid>,
    pub priority: Option<AlertPriority>,
    pub alert_type: Option<AlertType>,
    pub status: Option<AlertStatus>,
    /// Only alerts created in the trailing number of days.
    pub days: Option<u32>,
    pub limit: Option<u32>,
}
