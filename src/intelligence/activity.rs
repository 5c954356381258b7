//! Engagement: recorded activity against what the care plan expects.

use serde::Serialize;

use crate::models::{AlertPriority, AlertRule};

use super::helpers::fmt_pct;
use super::types::AlertCandidate;

pub const RECORDS_PER_DAY_WITH_PLAN: u32 = 3;
pub const RECORDS_PER_DAY_METRICS_ONLY: u32 = 2;
pub const LOW_ENGAGEMENT_RATIO: f64 = 0.30;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Engagement {
    pub measurements: u32,
    pub taken_doses: u32,
    pub expected: u32,
    pub ratio: f64,
}

/// Expected records over `days`: three a day with an active medication
/// plan, two a day for health metrics only.
pub fn expected_records(days: u32, has_active_plan: bool) -> u32 {
    let per_day = if has_active_plan {
        RECORDS_PER_DAY_WITH_PLAN
    } else {
        RECORDS_PER_DAY_METRICS_ONLY
    };
    days * per_day
}

pub fn engagement(measurements: u32, taken_doses: u32, days: u32, has_active_plan: bool) -> Engagement {
    let expected = expected_records(days, has_active_plan);
    let ratio = if expected == 0 {
        1.0
    } else {
        f64::from(measurements + taken_doses) / f64::from(expected)
    };
    Engagement {
        measurements,
        taken_doses,
        expected,
        ratio,
    }
}

pub fn activity_alert(e: &Engagement, days: u32) -> Option<AlertCandidate> {
    if e.ratio >= LOW_ENGAGEMENT_RATIO {
        return None;
    }
    Some(
        AlertCandidate::new(AlertRule::LowEngagement, AlertPriority::Low)
            .var("ratio", fmt_pct(e.ratio))
            .var("actual", e.measurements + e.taken_doses)
            .var("expected", e.expected)
            .var("days", days),
    )
}
