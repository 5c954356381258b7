use chrono::{Duration, NaiveDateTime};

use super::types::AnalysisError;

/// Start of a window reaching `days` back from `end`.
pub fn days_before(end: &NaiveDateTime, days: i64) -> Result<NaiveDateTime, AnalysisError> {
    Duration::try_days(days)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| AnalysisError::Computation(format!("{days}-day window before {end} is out of range")))
}

/// Start of a window reaching `hours` back from `end`.
pub fn hours_before(end: &NaiveDateTime, hours: i64) -> Result<NaiveDateTime, AnalysisError> {
    Duration::try_hours(hours)
        .and_then(|span| end.checked_sub_signed(span))
        .ok_or_else(|| AnalysisError::Computation(format!("{hours}-hour window before {end} is out of range")))
}

/// Arithmetic mean, `None` for an empty slice.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample standard deviation (n - 1), `None` below two values.
pub fn sample_stdev(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let m = mean(values)?;
    let var = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    Some(var.sqrt())
}

/// Standard score of `value`; `None` when the spread is zero.
pub fn z_score(value: f64, mean: f64, stdev: f64) -> Option<f64> {
    if stdev <= f64::EPSILON {
        return None;
    }
    Some((value - mean) / stdev)
}

/// One-decimal display formatting for template variables.
pub fn fmt1(value: f64) -> String {
    format!("{value:.1}")
}

/// Whole-percent display formatting for ratios.
pub fn fmt_pct(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    #[test]
    fn window_starts_in_range() {
        let end = at("2026-03-10 12:00:00");
        assert_eq!(days_before(&end, 7).unwrap(), at("2026-03-03 12:00:00"));
        assert_eq!(hours_before(&end, 24).unwrap(), at("2026-03-09 12:00:00"));
    }

    #[test]
    fn window_start_overflow_is_an_error() {
        let ancient = NaiveDateTime::MIN + Duration::days(1);
        assert!(matches!(days_before(&ancient, 7), Err(AnalysisError::Computation(_))));
        assert!(matches!(hours_before(&ancient, 168), Err(AnalysisError::Computation(_))));
        let end = at("2026-03-10 12:00:00");
        assert!(days_before(&end, i64::MAX).is_err());
    }

    #[test]
    fn mean_of_empty_is_none() {
        assert_eq!(mean(&[]), None);
        assert_eq!(mean(&[2.0, 4.0]), Some(3.0));
    }

    #[test]
    fn stdev_needs_two_values() {
        assert_eq!(sample_stdev(&[5.0]), None);
        let sd = sample_stdev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((sd - 2.138).abs() < 0.001);
    }

    #[test]
    fn z_score_zero_spread() {
        assert_eq!(z_score(10.0, 5.0, 0.0), None);
        assert_eq!(z_score(9.0, 5.0, 2.0), Some(2.0));
    }

    #[test]
    fn formatting() {
        assert_eq!(fmt1(147.666), "147.7");
        assert_eq!(fmt_pct(1.0 / 6.0), "17%");
    }
}
