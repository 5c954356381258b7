//! Threshold resolution: personalized settings first, then a static table.

use chrono::NaiveDate;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository::get_candidate_thresholds;
use crate::models::{MetricType, ThresholdSetting, User};

use super::types::AnalysisError;

/// Warning and danger bounds. Unset sides are not checked.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub warning_min: Option<f64>,
    pub warning_max: Option<f64>,
    pub danger_min: Option<f64>,
    pub danger_max: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    Warning,
    Danger,
}

impl Bounds {
    const fn upper(warning: f64, danger: f64) -> Self {
        Self {
            warning_min: None,
            warning_max: Some(warning),
            danger_min: None,
            danger_max: Some(danger),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.warning_min.is_none()
            && self.warning_max.is_none()
            && self.danger_min.is_none()
            && self.danger_max.is_none()
    }

    /// Band the value falls in, `None` inside the normal range.
    pub fn classify(&self, value: f64) -> Option<Band> {
        let outside = |min: Option<f64>, max: Option<f64>| {
            min.is_some_and(|m| value < m) || max.is_some_and(|m| value > m)
        };
        if outside(self.danger_min, self.danger_max) {
            Some(Band::Danger)
        } else if outside(self.warning_min, self.warning_max) {
            Some(Band::Warning)
        } else {
            None
        }
    }
}

/// Static fallback table. Blood pressure bounds apply to systolic.
pub fn default_bounds(metric_type: MetricType) -> Option<Bounds> {
    match metric_type {
        MetricType::BloodPressure => Some(Bounds::upper(140.0, 180.0)),
        MetricType::Glucose => Some(Bounds::upper(7.0, 11.0)),
        MetricType::HeartRate => Some(Bounds::upper(100.0, 120.0)),
        MetricType::Weight | MetricType::UricAcid | MetricType::LipidPanel => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum ThresholdSource {
    Personalized { setting_id: Uuid },
    Default,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ResolvedThreshold {
    pub bounds: Bounds,
    pub source: ThresholdSource,
}

/// Pick the winning personalized setting for a patient.
///
/// Only settings whose every restriction matches apply. The highest
/// specificity wins; ties go to the most recently created, then the
/// smallest id, so the result never depends on storage order.
pub fn select_setting<'a>(
    candidates: &'a [ThresholdSetting],
    patient: &User,
    today: NaiveDate,
) -> Option<&'a ThresholdSetting> {
    let age = patient.age_on(today);
    candidates
        .iter()
        .filter(|s| s.active && s.applies_to(patient, age))
        .filter(|s| !bounds_of(s).is_empty())
        .max_by(|a, b| {
            a.specificity()
                .cmp(&b.specificity())
                .then(a.created_at.cmp(&b.created_at))
                .then(b.id.cmp(&a.id))
        })
}

fn bounds_of(setting: &ThresholdSetting) -> Bounds {
    Bounds {
        warning_min: setting.warning_min,
        warning_max: setting.warning_max,
        danger_min: setting.danger_min,
        danger_max: setting.danger_max,
    }
}

/// Resolve bounds for `(patient, metric_type)`. `None` means no bound is
/// configured and threshold checks for this type are skipped.
pub fn resolve(
    conn: &Connection,
    patient: &User,
    metric_type: MetricType,
    today: NaiveDate,
) -> Result<Option<ResolvedThreshold>, AnalysisError> {
    let candidates = get_candidate_thresholds(conn, &patient.id, metric_type)?;
    if let Some(setting) = select_setting(&candidates, patient, today) {
        return Ok(Some(ResolvedThreshold {
            bounds: bounds_of(setting),
            source: ThresholdSource::Personalized {
                setting_id: setting.id,
            },
        }));
    }
    Ok(default_bounds(metric_type).map(|bounds| ResolvedThreshold {
        bounds,
        source: ThresholdSource::Default,
    }))
}
