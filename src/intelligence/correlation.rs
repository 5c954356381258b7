//! Paired-signal checks: one triggering measurement, one partner lookup.

use rusqlite::Connection;

use crate::db::repository::get_latest_measurement;
use crate::models::{AlertPriority, AlertRule, Measurement, MetricType};

use super::helpers::{fmt1, hours_before};
use super::types::{AlertCandidate, AnalysisError};

pub const BP_ELEVATED_SYSTOLIC: f64 = 160.0;
pub const BP_ELEVATED_DIASTOLIC: f64 = 100.0;
pub const HR_LOW_FOR_HIGH_BP: f64 = 80.0;
pub const GLUCOSE_ELEVATED: f64 = 11.1;
pub const WEIGHT_LOW: f64 = 60.0;

/// Which pair a trigger belongs to and the partner metric to look up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pairing {
    BloodPressureHeartRate,
    GlucoseWeight,
}

impl Pairing {
    pub fn for_trigger(metric: MetricType) -> Option<(Pairing, MetricType)> {
        match metric {
            MetricType::BloodPressure => Some((Pairing::BloodPressureHeartRate, MetricType::HeartRate)),
            MetricType::HeartRate => Some((Pairing::BloodPressureHeartRate, MetricType::BloodPressure)),
            MetricType::Glucose => Some((Pairing::GlucoseWeight, MetricType::Weight)),
            MetricType::Weight => Some((Pairing::GlucoseWeight, MetricType::Glucose)),
            MetricType::UricAcid | MetricType::LipidPanel => None,
        }
    }

    pub fn window_hours(self, bp_hr_hours: i64, glucose_weight_hours: i64) -> i64 {
        match self {
            Pairing::BloodPressureHeartRate => bp_hr_hours,
            Pairing::GlucoseWeight => glucose_weight_hours,
        }
    }
}

fn bp_elevated(m: &Measurement) -> Result<bool, AnalysisError> {
    Ok(m.systolic()? > BP_ELEVATED_SYSTOLIC || m.diastolic()? > BP_ELEVATED_DIASTOLIC)
}

/// Whether the trigger's own side of its pair is abnormal. No partner
/// lookup happens otherwise.
pub fn trigger_is_abnormal(m: &Measurement) -> Result<bool, AnalysisError> {
    Ok(match m.metric_type {
        MetricType::BloodPressure => bp_elevated(m)?,
        MetricType::HeartRate => m.primary_value()? < HR_LOW_FOR_HIGH_BP,
        MetricType::Glucose => m.primary_value()? > GLUCOSE_ELEVATED,
        MetricType::Weight => m.primary_value()? < WEIGHT_LOW,
        MetricType::UricAcid | MetricType::LipidPanel => false,
    })
}

/// Evaluate an abnormal trigger against its partner reading.
pub fn evaluate_pair(
    trigger: &Measurement,
    partner: &Measurement,
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let (bp, hr, glucose, weight) = match (trigger.metric_type, partner.metric_type) {
        (MetricType::BloodPressure, MetricType::HeartRate) => (Some(trigger), Some(partner), None, None),
        (MetricType::HeartRate, MetricType::BloodPressure) => (Some(partner), Some(trigger), None, None),
        (MetricType::Glucose, MetricType::Weight) => (None, None, Some(trigger), Some(partner)),
        (MetricType::Weight, MetricType::Glucose) => (None, None, Some(partner), Some(trigger)),
        _ => return Ok(None),
    };

    if let (Some(bp), Some(hr)) = (bp, hr) {
        let bpm = hr.primary_value()?;
        if bp_elevated(bp)? && bpm < HR_LOW_FOR_HIGH_BP {
            return Ok(Some(
                AlertCandidate::new(AlertRule::CardiovascularRegulation, AlertPriority::High)
                    .with_measurement(trigger.id)
                    .var("systolic", fmt1(bp.systolic()?))
                    .var("diastolic", fmt1(bp.diastolic()?))
                    .var("heart_rate", fmt1(bpm)),
            ));
        }
    }
    if let (Some(glucose), Some(weight)) = (glucose, weight) {
        let g = glucose.primary_value()?;
        let w = weight.primary_value()?;
        if g > GLUCOSE_ELEVATED && w < WEIGHT_LOW {
            return Ok(Some(
                AlertCandidate::new(AlertRule::GlucoseWeightLoss, AlertPriority::Medium)
                    .with_measurement(trigger.id)
                    .var("glucose", fmt1(g))
                    .var("weight", fmt1(w)),
            ));
        }
    }
    Ok(None)
}

/// Correlate one measurement with the most recent partner reading in the
/// window ending at the trigger's timestamp. One lookup at most.
pub fn correlate(
    conn: &Connection,
    trigger: &Measurement,
    bp_hr_hours: i64,
    glucose_weight_hours: i64,
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let Some((pairing, partner_metric)) = Pairing::for_trigger(trigger.metric_type) else {
        return Ok(None);
    };
    if !trigger_is_abnormal(trigger)? {
        return Ok(None);
    }
    let hours = pairing.window_hours(bp_hr_hours, glucose_weight_hours);
    let from = hours_before(&trigger.measured_at, hours)?;
    let partner = get_latest_measurement(
        conn,
        &trigger.patient_id,
        partner_metric,
        &from,
        &trigger.measured_at,
    )?;
    match partner {
        Some(partner) => evaluate_pair(trigger, &partner),
        None => Ok(None),
    }
}
