//! Per-metric classification rules.
//!
//! Window rules run in the batch path over the trend window. Single-reading
//! rules run in the immediate path on the one measurement just submitted.

use crate::models::{AlertPriority, AlertRule, Measurement, MetricType};

use super::helpers::{fmt1, mean};
use super::thresholds::{Band, Bounds};
use super::trend::{Direction, TrendSummary, GLUCOSE_TREND_DEAD_ZONE};
use super::types::{AlertCandidate, AnalysisError};

pub const BP_SYSTOLIC_HIGH: f64 = 140.0;
pub const BP_SYSTOLIC_SEVERE_MEAN: f64 = 160.0;
pub const BP_HIGH_COUNT: usize = 2;

pub const GLUCOSE_HIGH_MEAN: f64 = 7.0;
pub const GLUCOSE_VERY_HIGH_MEAN: f64 = 10.0;
pub const GLUCOSE_NORMAL_RISING_MEAN: f64 = 6.0;

pub const HEART_RATE_ELEVATED: f64 = 100.0;

pub const WEIGHT_SLOPE_KG: f64 = 0.5;
pub const WEIGHT_MIN_SAMPLES: usize = 3;

/// Note keywords that explain an elevated heart rate.
/// ASCII keywords match whole words of the note; the others match anywhere,
/// since those scripts do not separate words.
const EXERCISE_KEYWORDS: &[&str] = &[
    "exercise", "exercised", "exercising", "workout", "walk", "walked", "walking", "run", "ran",
    "running", "jog", "jogged", "jogging", "gym", "sport", "sports", "cycling", "cycled",
    "运动", "锻炼", "跑步", "散步", "健身",
];

fn primary_values(window: &[Measurement]) -> Result<Vec<f64>, AnalysisError> {
    window
        .iter()
        .map(|m| m.primary_value().map_err(AnalysisError::from))
        .collect()
}

// ═══════════════════════════════════════════
// Window rules
// ═══════════════════════════════════════════

/// Blood pressure over the window: flag when at least two systolic
/// readings reach 140 or the mean systolic exceeds 140.
pub fn classify_blood_pressure_window(
    window: &[Measurement],
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let systolic = window
        .iter()
        .map(|m| m.systolic().map_err(AnalysisError::from))
        .collect::<Result<Vec<_>, _>>()?;
    let Some(avg) = mean(&systolic) else {
        return Ok(None);
    };
    let high_count = systolic.iter().filter(|v| **v >= BP_SYSTOLIC_HIGH).count();

    if high_count < BP_HIGH_COUNT && avg <= BP_SYSTOLIC_HIGH {
        return Ok(None);
    }
    let priority = if avg > BP_SYSTOLIC_SEVERE_MEAN {
        AlertPriority::Critical
    } else {
        AlertPriority::High
    };
    Ok(Some(
        AlertCandidate::new(AlertRule::BpSustainedHigh, priority)
            .for_metric(MetricType::BloodPressure)
            .var("count", high_count)
            .var("total", systolic.len())
            .var("mean", fmt1(avg)),
    ))
}

/// Named glucose window state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlucoseState {
    HighRising,
    HighFalling,
    HighStable,
    NormalRising,
    Normal,
}

/// State and priority of a glucose window from its mean and raw
/// first-to-last trend.
pub fn glucose_state(summary: &TrendSummary) -> (GlucoseState, Option<AlertPriority>) {
    let direction = Direction::from_delta(summary.raw_delta(), GLUCOSE_TREND_DEAD_ZONE);
    let high = summary.mean > GLUCOSE_HIGH_MEAN;
    let very_high = summary.mean > GLUCOSE_VERY_HIGH_MEAN;

    match (high, direction) {
        (true, Direction::Rising) => (
            GlucoseState::HighRising,
            Some(if very_high { AlertPriority::Critical } else { AlertPriority::High }),
        ),
        (true, Direction::Falling) => (
            GlucoseState::HighFalling,
            Some(if very_high { AlertPriority::High } else { AlertPriority::Medium }),
        ),
        (true, Direction::Stable) => (
            GlucoseState::HighStable,
            Some(if very_high { AlertPriority::High } else { AlertPriority::Medium }),
        ),
        (false, Direction::Rising) if summary.mean > GLUCOSE_NORMAL_RISING_MEAN => {
            (GlucoseState::NormalRising, Some(AlertPriority::Medium))
        }
        _ => (GlucoseState::Normal, None),
    }
}

pub fn classify_glucose_window(
    window: &[Measurement],
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let values = primary_values(window)?;
    let Some(summary) = TrendSummary::from_values(&values) else {
        return Ok(None);
    };
    let (state, priority) = glucose_state(&summary);
    let rule = match state {
        GlucoseState::HighRising => AlertRule::GlucoseHighRising,
        GlucoseState::HighFalling => AlertRule::GlucoseHighFalling,
        GlucoseState::HighStable => AlertRule::GlucoseHighStable,
        GlucoseState::NormalRising => AlertRule::GlucoseNormalRising,
        GlucoseState::Normal => return Ok(None),
    };
    Ok(priority.map(|p| {
        AlertCandidate::new(rule, p)
            .for_metric(MetricType::Glucose)
            .var("mean", fmt1(summary.mean))
            .var("first", fmt1(summary.first))
            .var("last", fmt1(summary.last))
            .var("count", summary.count)
    }))
}

fn mentions_exercise(m: &Measurement) -> bool {
    let note = m.note_lower();
    if note.is_empty() {
        return false;
    }
    let words = note.split(|c: char| !c.is_alphanumeric());
    EXERCISE_KEYWORDS.iter().any(|k| {
        if k.is_ascii() {
            words.clone().any(|w| w == *k)
        } else {
            note.contains(k)
        }
    })
}

/// Heart rate, per reading: any reading above 100 bpm without an exercise
/// note qualifies. One alert names the most recent qualifying reading.
pub fn classify_heart_rate_readings(
    window: &[Measurement],
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let mut flagged: Vec<(&Measurement, f64)> = Vec::new();
    for m in window {
        let bpm = m.primary_value()?;
        if bpm > HEART_RATE_ELEVATED && !mentions_exercise(m) {
            flagged.push((m, bpm));
        }
    }
    let Some((latest, bpm)) = flagged.iter().max_by_key(|(m, _)| m.measured_at) else {
        return Ok(None);
    };
    Ok(Some(
        AlertCandidate::new(AlertRule::HeartRateElevated, AlertPriority::High)
            .for_metric(MetricType::HeartRate)
            .with_measurement(latest.id)
            .var("value", fmt1(*bpm))
            .var("count", flagged.len()),
    ))
}

/// Weight change per sample from the OLS slope.
pub fn classify_weight_trend(window: &[Measurement]) -> Result<Option<AlertCandidate>, AnalysisError> {
    if window.len() < WEIGHT_MIN_SAMPLES {
        return Ok(None);
    }
    let values = primary_values(window)?;
    let Some(summary) = TrendSummary::from_values(&values) else {
        return Ok(None);
    };
    if summary.slope.abs() < WEIGHT_SLOPE_KG {
        return Ok(None);
    }
    Ok(Some(
        AlertCandidate::new(AlertRule::WeightRapidChange, AlertPriority::Medium)
            .for_metric(MetricType::Weight)
            .var("slope", fmt1(summary.slope))
            .var("first", fmt1(summary.first))
            .var("last", fmt1(summary.last)),
    ))
}

/// Latest reading against resolved bounds: danger is critical, warning is high.
pub fn classify_against_bounds(
    latest: &Measurement,
    bounds: &Bounds,
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let value = latest.primary_value()?;
    let (rule, priority) = match bounds.classify(value) {
        Some(Band::Danger) => (AlertRule::ThresholdDanger, AlertPriority::Critical),
        Some(Band::Warning) => (AlertRule::ThresholdWarning, AlertPriority::High),
        None => return Ok(None),
    };
    Ok(Some(
        AlertCandidate::new(rule, priority)
            .for_metric(latest.metric_type)
            .with_measurement(latest.id)
            .var("metric", latest.metric_type)
            .var("value", fmt1(value))
            .var("unit", latest.metric_type.unit()),
    ))
}

// ═══════════════════════════════════════════
// Single-reading rules
// ═══════════════════════════════════════════

/// Immediate rules for one reading. Types without rules yield nothing.
pub fn classify_single_reading(m: &Measurement) -> Result<Vec<AlertCandidate>, AnalysisError> {
    let candidate = match m.metric_type {
        MetricType::BloodPressure => single_blood_pressure(m)?,
        MetricType::Glucose => single_glucose(m)?,
        MetricType::HeartRate => single_heart_rate(m)?,
        MetricType::Weight | MetricType::UricAcid | MetricType::LipidPanel => None,
    };
    Ok(candidate.into_iter().collect())
}

fn single_blood_pressure(m: &Measurement) -> Result<Option<AlertCandidate>, AnalysisError> {
    let sys = m.systolic()?;
    let dia = m.diastolic()?;

    // Data-entry sanity check; other rules are meaningless on such a reading.
    if sys <= dia {
        return Ok(Some(
            AlertCandidate::new(AlertRule::BpPhysiologicalError, AlertPriority::High)
                .for_metric(MetricType::BloodPressure)
                .with_measurement(m.id)
                .var("systolic", fmt1(sys))
                .var("diastolic", fmt1(dia)),
        ));
    }
    let (rule, priority) = if sys > 180.0 || dia > 110.0 {
        (AlertRule::BpCritical, AlertPriority::Critical)
    } else if sys > 160.0 || dia > 100.0 {
        (AlertRule::BpHigh, AlertPriority::High)
    } else {
        return Ok(None);
    };
    Ok(Some(
        AlertCandidate::new(rule, priority)
            .for_metric(m.metric_type)
            .with_measurement(m.id)
            .var("systolic", fmt1(sys))
            .var("diastolic", fmt1(dia)),
    ))
}

fn single_glucose(m: &Measurement) -> Result<Option<AlertCandidate>, AnalysisError> {
    let value = m.primary_value()?;
    let (rule, priority) = if value > 16.7 {
        (AlertRule::GlucoseCritical, AlertPriority::Critical)
    } else if value > 11.1 {
        (AlertRule::GlucoseHigh, AlertPriority::High)
    } else if value < 3.9 {
        (AlertRule::GlucoseLow, AlertPriority::High)
    } else {
        return Ok(None);
    };
    Ok(Some(
        AlertCandidate::new(rule, priority)
            .for_metric(m.metric_type)
            .with_measurement(m.id)
            .var("value", fmt1(value)),
    ))
}

fn single_heart_rate(m: &Measurement) -> Result<Option<AlertCandidate>, AnalysisError> {
    let value = m.primary_value()?;
    let (rule, priority) = if value > 120.0 {
        (AlertRule::HeartRateCritical, AlertPriority::Critical)
    } else if value > 100.0 {
        (AlertRule::HeartRateHigh, AlertPriority::High)
    } else if value < 50.0 {
        (AlertRule::HeartRateLow, AlertPriority::High)
    } else {
        return Ok(None);
    };
    Ok(Some(
        AlertCandidate::new(rule, priority)
            .for_metric(m.metric_type)
            .with_measurement(m.id)
            .var("value", fmt1(value)),
    ))
}
