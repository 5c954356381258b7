use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{Gender, MetricType};
use super::user::User;

/// Personalized bounds a clinician sets for one metric type.
///
/// The optional gender, age range and diagnosis fields narrow which
/// patients the setting applies to. An unset restriction matches everyone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdSetting {
    pub id: Uuid,
    pub clinician_id: Uuid,
    pub metric_type: MetricType,
    pub gender: Option<Gender>,
    pub age_min: Option<u32>,
    pub age_max: Option<u32>,
    pub diagnosis: Option<String>,
    pub warning_min: Option<f64>,
    pub warning_max: Option<f64>,
    pub danger_min: Option<f64>,
    pub danger_max: Option<f64>,
    pub active: bool,
    pub created_at: NaiveDateTime,
}

impl ThresholdSetting {
    /// Number of restrictions set. Higher means more specific.
    pub fn specificity(&self) -> u8 {
        u8::from(self.gender.is_some())
            + u8::from(self.age_min.is_some() || self.age_max.is_some())
            + u8::from(self.diagnosis.is_some())
    }

    /// True when every restriction on the setting matches the patient.
    /// A restriction the patient has no data for does not match.
    pub fn applies_to(&self, patient: &User, age: Option<u32>) -> bool {
        if let Some(gender) = self.gender {
            if patient.gender != Some(gender) {
                return false;
            }
        }
        if self.age_min.is_some() || self.age_max.is_some() {
            let Some(age) = age else {
                return false;
            };
            if self.age_min.is_some_and(|min| age < min) || self.age_max.is_some_and(|max| age > max) {
                return false;
            }
        }
        if let Some(ref diagnosis) = self.diagnosis {
            match patient.diagnosis {
                Some(ref d) if d.eq_ignore_ascii_case(diagnosis) => {}
                _ => return false,
            }
        }
        true
    }
}
