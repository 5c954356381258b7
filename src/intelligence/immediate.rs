//! Immediate analysis of one submitted measurement, routed to the
//! patient's primary clinician.

use std::sync::Arc;

use chrono::NaiveDateTime;
use rusqlite::Connection;
use uuid::Uuid;

use crate::core_state::CoreState;
use crate::db::repository::{get_measurement, get_measurements_in_window, get_primary_binding, get_user};
use crate::models::{AlertPriority, AlertRule, Measurement};

use super::classify::classify_single_reading;
use super::correlation::correlate;
use super::engine::HealthAnalysisEngine;
use super::helpers::{days_before, fmt1, mean, sample_stdev, z_score};
use super::types::{AlertCandidate, AnalysisError, ImmediateReport, PatientReport};

pub const ZSCORE_MIN_SAMPLES: usize = 3;
pub const ZSCORE_LIMIT: f64 = 2.0;

/// Compare a reading with the same metric's history (excluding itself).
/// Needs at least three prior readings with non-zero spread.
pub fn historical_deviation(
    reading: &Measurement,
    history: &[Measurement],
) -> Result<Option<AlertCandidate>, AnalysisError> {
    let values = history
        .iter()
        .filter(|m| m.id != reading.id)
        .map(|m| m.primary_value().map_err(AnalysisError::from))
        .collect::<Result<Vec<_>, _>>()?;
    if values.len() < ZSCORE_MIN_SAMPLES {
        return Ok(None);
    }
    let value = reading.primary_value()?;
    let (Some(avg), Some(sd)) = (mean(&values), sample_stdev(&values)) else {
        return Ok(None);
    };
    let Some(z) = z_score(value, avg, sd) else {
        return Ok(None);
    };
    if z.abs() <= ZSCORE_LIMIT {
        return Ok(None);
    }
    Ok(Some(
        AlertCandidate::new(AlertRule::HistoricalDeviation, AlertPriority::Medium)
            .for_metric(reading.metric_type)
            .with_measurement(reading.id)
            .var("metric", reading.metric_type)
            .var("value", fmt1(value))
            .var("mean", fmt1(avg))
            .var("z", format!("{z:.2}")),
    ))
}

/// Single-reading rules, historical deviation and correlation for one
/// measurement. Skipped without error when the patient has no primary
/// clinician.
pub fn analyze_measurement(
    conn: &Connection,
    engine: &HealthAnalysisEngine,
    measurement_id: &Uuid,
    now: &NaiveDateTime,
) -> Result<ImmediateReport, AnalysisError> {
    let reading = get_measurement(conn, measurement_id)?.ok_or(AnalysisError::NotFound {
        entity: "Measurement",
        id: *measurement_id,
    })?;
    let skipped = |reason| ImmediateReport {
        measurement_id: *measurement_id,
        skipped_reason: Some(reason),
        outcome: PatientReport::default(),
    };

    let Some(patient) = get_user(conn, &reading.patient_id)? else {
        return Ok(skipped("unknown_patient"));
    };
    if !patient.is_patient() {
        return Ok(skipped("not_a_patient"));
    }
    let Some(binding) = get_primary_binding(conn, &patient.id)? else {
        tracing::debug!(measurement_id = %measurement_id, "No primary clinician, immediate analysis skipped");
        return Ok(skipped("no_primary_binding"));
    };

    let cfg = engine.config();
    let dedup = engine.threshold_dedup();
    let clinician_id = binding.clinician_id;
    let mut report = PatientReport::default();

    engine.run_check(conn, &mut report, &patient, &clinician_id, "single_reading", dedup, now, || {
        classify_single_reading(&reading)
    });
    engine.run_check(conn, &mut report, &patient, &clinician_id, "historical_deviation", dedup, now, || {
        let from = days_before(&reading.measured_at, cfg.zscore_window_days)?;
        let history =
            get_measurements_in_window(conn, &patient.id, reading.metric_type, &from, &reading.measured_at)?;
        Ok(historical_deviation(&reading, &history)?.into_iter().collect())
    });
    engine.run_check(conn, &mut report, &patient, &clinician_id, "correlation", dedup, now, || {
        Ok(correlate(
            conn,
            &reading,
            cfg.bp_hr_correlation_hours,
            cfg.glucose_weight_correlation_hours,
        )?
        .into_iter()
        .collect())
    });

    Ok(ImmediateReport {
        measurement_id: *measurement_id,
        skipped_reason: None,
        outcome: report,
    })
}

/// Fire-and-forget immediate analysis on the blocking pool. Errors are
/// logged, never returned to the submitter.
pub fn spawn_immediate_analysis(state: Arc<CoreState>, measurement_id: Uuid) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let result = tokio::task::spawn_blocking(move || -> Result<ImmediateReport, AnalysisError> {
            let conn = state.open_db()?;
            let engine = state.engine();
            analyze_measurement(&conn, &engine, &measurement_id, &chrono::Local::now().naive_local())
        })
        .await;

        match result {
            Ok(Ok(report)) => tracing::info!(
                measurement_id = %measurement_id,
                generated = report.outcome.generated.len(),
                deduplicated = report.outcome.deduplicated,
                failures = report.outcome.failures.len(),
                skipped = report.skipped_reason.unwrap_or("none"),
                "Immediate analysis complete"
            ),
            Ok(Err(e)) => tracing::warn!(measurement_id = %measurement_id, error = %e, "Immediate analysis failed"),
            Err(e) => tracing::warn!(measurement_id = %measurement_id, error = %e, "Immediate analysis task failed"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::db::open_memory_database;
    use crate::db::repository::fixtures::*;
    use crate::intelligence::adherence::SqliteAdherenceProvider;
    use crate::intelligence::types::FailureKind;
    use crate::models::{AlertType, MetricType, UserRole};

    fn engine() -> HealthAnalysisEngine {
        HealthAnalysisEngine::new(AnalysisConfig::default(), Arc::new(SqliteAdherenceProvider))
    }

    fn now() -> NaiveDateTime {
        ts("2026-03-10 12:00:00")
    }

    #[test]
    fn critical_bp_goes_to_primary_clinician() {
        let conn = open_memory_database().unwrap();
        let (clinician, patient) = care_pair(&conn);
        let m = bp(&conn, patient, ts("2026-03-10 11:55:00"), 186.0, 100.0);

        let report = analyze_measurement(&conn, &engine(), &m.id, &now()).unwrap();
        assert!(report.skipped_reason.is_none());
        let alert = report
            .outcome
            .generated
            .iter()
            .find(|a| a.rule == AlertRule::BpCritical)
            .unwrap();
        assert_eq!(alert.clinician_id, Some(clinician));
        assert_eq!(alert.measurement_id, Some(m.id));
        assert_eq!(alert.priority, AlertPriority::Critical);
    }

    #[test]
    fn no_primary_binding_skips_silently() {
        let conn = open_memory_database().unwrap();
        let clinician = add_user(&conn, UserRole::Clinician);
        let patient = add_user(&conn, UserRole::Patient);
        bind(&conn, clinician, patient, false);
        let m = bp(&conn, patient, ts("2026-03-10 11:55:00"), 190.0, 120.0);

        let report = analyze_measurement(&conn, &engine(), &m.id, &now()).unwrap();
        assert_eq!(report.skipped_reason, Some("no_primary_binding"));
        assert!(report.outcome.generated.is_empty());
    }

    #[test]
    fn unknown_measurement_is_not_found() {
        let conn = open_memory_database().unwrap();
        let err = analyze_measurement(&conn, &engine(), &Uuid::new_v4(), &now()).unwrap_err();
        assert!(matches!(err, AnalysisError::NotFound { entity: "Measurement", .. }));
    }

    #[test]
    fn deviation_from_week_history() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        for (day, w) in [(3, 70.0), (4, 70.4), (5, 69.8), (6, 70.2)] {
            single(&conn, patient, MetricType::Weight, ts(&format!("2026-03-0{day} 08:00:00")), w);
        }
        let m = single(&conn, patient, MetricType::Weight, ts("2026-03-10 08:00:00"), 74.0);

        let report = analyze_measurement(&conn, &engine(), &m.id, &now()).unwrap();
        let alert = report
            .outcome
            .generated
            .iter()
            .find(|a| a.rule == AlertRule::HistoricalDeviation)
            .unwrap();
        assert_eq!(alert.priority, AlertPriority::Medium);
        assert_eq!(alert.alert_type, AlertType::AbnormalTrend);
        assert_eq!(alert.metric_type, Some(MetricType::Weight));
    }

    #[test]
    fn short_history_has_no_deviation() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        single(&conn, patient, MetricType::Weight, ts("2026-03-08 08:00:00"), 70.0);
        single(&conn, patient, MetricType::Weight, ts("2026-03-09 08:00:00"), 70.5);
        let m = single(&conn, patient, MetricType::Weight, ts("2026-03-10 08:00:00"), 90.0);
        let history =
            get_measurements_in_window(&conn, &patient, MetricType::Weight, &ts("2026-03-03 08:00:00"), &m.measured_at)
                .unwrap();
        assert_eq!(history.len(), 3);
        assert!(historical_deviation(&m, &history).unwrap().is_none());
    }

    #[test]
    fn flat_history_has_no_deviation() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        let history: Vec<Measurement> = (1..=4)
            .map(|d| single(&conn, patient, MetricType::HeartRate, ts(&format!("2026-03-0{d} 08:00:00")), 72.0))
            .collect();
        let m = single(&conn, patient, MetricType::HeartRate, ts("2026-03-06 08:00:00"), 95.0);
        assert!(historical_deviation(&m, &history).unwrap().is_none());
    }

    #[test]
    fn correlation_runs_on_submission() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        single(&conn, patient, MetricType::HeartRate, ts("2026-03-10 09:00:00"), 64.0);
        let m = bp(&conn, patient, ts("2026-03-10 11:00:00"), 172.0, 98.0);

        let report = analyze_measurement(&conn, &engine(), &m.id, &now()).unwrap();
        let rules: Vec<AlertRule> = report.outcome.generated.iter().map(|a| a.rule).collect();
        assert!(rules.contains(&AlertRule::CardiovascularRegulation));
        assert!(rules.contains(&AlertRule::BpHigh));
    }

    #[test]
    fn out_of_range_timestamp_fails_only_the_windowed_check() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        let ancient = NaiveDateTime::MIN + chrono::Duration::days(2);
        let m = single(&conn, patient, MetricType::Glucose, ancient, 18.0);

        let report = analyze_measurement(&conn, &engine(), &m.id, &now()).unwrap();
        let failures: Vec<(&str, FailureKind)> = report
            .outcome
            .failures
            .iter()
            .map(|f| (f.check.as_str(), f.kind))
            .collect();
        assert!(failures.contains(&("historical_deviation", FailureKind::Computation)));
        assert!(failures.contains(&("correlation", FailureKind::Computation)));
        assert!(report
            .outcome
            .generated
            .iter()
            .any(|a| a.rule == AlertRule::GlucoseCritical));
    }

    #[test]
    fn repeated_submission_deduplicated() {
        let conn = open_memory_database().unwrap();
        let (_, patient) = care_pair(&conn);
        let first = single(&conn, patient, MetricType::Glucose, ts("2026-03-10 09:00:00"), 2.9);
        let second = single(&conn, patient, MetricType::Glucose, ts("2026-03-10 10:00:00"), 3.1);

        let a = analyze_measurement(&conn, &engine(), &first.id, &ts("2026-03-10 09:01:00")).unwrap();
        assert_eq!(a.outcome.generated.len(), 1);
        let b = analyze_measurement(&conn, &engine(), &second.id, &ts("2026-03-10 10:01:00")).unwrap();
        assert!(b.outcome.generated.is_empty());
        assert_eq!(b.outcome.deduplicated, 1);
    }
}
