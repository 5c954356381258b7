use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::MetricType;

/// Readings may run slightly ahead of the server clock.
pub const MAX_FUTURE_SKEW_MINUTES: i64 = 10;
/// Oldest back-dated reading accepted on ingest.
pub const MAX_BACKDATE_DAYS: i64 = 3650;

/// A patient health measurement.
///
/// Only the fields belonging to `metric_type` are populated. The others
/// stay `None` and are never coerced from neighbouring fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Measurement {
    pub id: Uuid,
    pub patient_id: Uuid,
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
    pub measured_at: NaiveDateTime,
    pub recorded_by: Uuid,
    pub modified_by: Option<Uuid>,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
}

/// Missing or malformed numeric field on a measurement.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{metric} measurement {id} has no usable {field}")]
pub struct FieldError {
    pub id: Uuid,
    pub metric: MetricType,
    pub field: &'static str,
}

impl Measurement {
    /// Empty measurement of the given type; callers fill in the typed fields.
    pub fn new(patient_id: Uuid, metric_type: MetricType, measured_at: NaiveDateTime) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            metric_type,
            systolic: None,
            diastolic: None,
            glucose: None,
            heart_rate: None,
            weight: None,
            uric_acid: None,
            total_cholesterol: None,
            triglycerides: None,
            hdl: None,
            ldl: None,
            measured_at,
            recorded_by: patient_id,
            modified_by: None,
            note: None,
            created_at: measured_at,
        }
    }

    fn field(&self, value: Option<f64>, field: &'static str) -> Result<f64, FieldError> {
        match value {
            Some(v) if v.is_finite() => Ok(v),
            _ => Err(FieldError {
                id: self.id,
                metric: self.metric_type,
                field,
            }),
        }
    }

    pub fn systolic(&self) -> Result<f64, FieldError> {
        self.field(self.systolic, "systolic")
    }

    pub fn diastolic(&self) -> Result<f64, FieldError> {
        self.field(self.diastolic, "diastolic")
    }

    /// The value trend and threshold rules look at for this metric type:
    /// systolic for blood pressure, total cholesterol for lipid panels.
    pub fn primary_value(&self) -> Result<f64, FieldError> {
        match self.metric_type {
            MetricType::BloodPressure => self.field(self.systolic, "systolic"),
            MetricType::Glucose => self.field(self.glucose, "glucose"),
            MetricType::HeartRate => self.field(self.heart_rate, "heart_rate"),
            MetricType::Weight => self.field(self.weight, "weight"),
            MetricType::UricAcid => self.field(self.uric_acid, "uric_acid"),
            MetricType::LipidPanel => self.field(self.total_cholesterol, "total_cholesterol"),
        }
    }

    /// Names of the fields a measurement of this type must carry.
    pub fn required_fields(metric_type: MetricType) -> &'static [&'static str] {
        match metric_type {
            MetricType::BloodPressure => &["systolic", "diastolic"],
            MetricType::Glucose => &["glucose"],
            MetricType::HeartRate => &["heart_rate"],
            MetricType::Weight => &["weight"],
            MetricType::UricAcid => &["uric_acid"],
            MetricType::LipidPanel => &["total_cholesterol"],
        }
    }

    fn allowed_fields(metric_type: MetricType) -> &'static [&'static str] {
        match metric_type {
            MetricType::LipidPanel => &["total_cholesterol", "triglycerides", "hdl", "ldl"],
            other => Self::required_fields(other),
        }
    }

    fn named_fields(&self) -> [(&'static str, Option<f64>); 10] {
        [
            ("systolic", self.systolic),
            ("diastolic", self.diastolic),
            ("glucose", self.glucose),
            ("heart_rate", self.heart_rate),
            ("weight", self.weight),
            ("uric_acid", self.uric_acid),
            ("total_cholesterol", self.total_cholesterol),
            ("triglycerides", self.triglycerides),
            ("hdl", self.hdl),
            ("ldl", self.ldl),
        ]
    }

    /// Check the typed-field invariant: required fields present and positive,
    /// fields of other metric types empty.
    pub fn validate(&self) -> Result<(), String> {
        let required = Self::required_fields(self.metric_type);
        let allowed = Self::allowed_fields(self.metric_type);

        for (name, value) in self.named_fields() {
            match value {
                Some(v) if !allowed.contains(&name) => {
                    return Err(format!(
                        "{name}={v} does not belong to a {} measurement",
                        self.metric_type
                    ));
                }
                Some(v) if !v.is_finite() || v <= 0.0 => {
                    return Err(format!("{name} must be a positive number, got {v}"));
                }
                None if required.contains(&name) => {
                    return Err(format!(
                        "{} measurement requires {name}",
                        self.metric_type
                    ));
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Check that `measured_at` lies between `MAX_BACKDATE_DAYS` before
    /// `now` and `MAX_FUTURE_SKEW_MINUTES` after it.
    pub fn validate_measured_at(&self, now: &NaiveDateTime) -> Result<(), String> {
        let earliest = now.checked_sub_signed(Duration::days(MAX_BACKDATE_DAYS));
        let latest = now.checked_add_signed(Duration::minutes(MAX_FUTURE_SKEW_MINUTES));
        match (earliest, latest) {
            (Some(earliest), Some(latest))
                if self.measured_at >= earliest && self.measured_at <= latest =>
            {
                Ok(())
            }
            _ => Err(format!(
                "measured_at {} is outside the accepted range",
                self.measured_at
            )),
        }
    }

    /// Free-text note lowercased for keyword matching.
    pub fn note_lower(&self) -> String {
        self.note.as_deref().unwrap_or_default().to_lowercase()
    }
}
