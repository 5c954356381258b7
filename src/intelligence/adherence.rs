//! Medication adherence: compliance rate and missed-dose streaks.
//!
//! Medication tracking is an outside collaborator reached through
//! [`AdherenceProvider`]. When it is disabled the engine runs with
//! [`NoopAdherenceProvider`] and adherence checks see no plans.

use chrono::NaiveDateTime;
use rusqlite::Connection;
use serde::Serialize;
use uuid::Uuid;

use crate::db::repository;
use crate::db::DatabaseError;
use crate::models::{AdherenceRecord, AdherenceStatus, AlertPriority, AlertRule, MedicationPlan};

use super::helpers::fmt_pct;
use super::types::AlertCandidate;

/// Read access to medication plans and dose records.
pub trait AdherenceProvider: Send + Sync {
    fn active_plans(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
    ) -> Result<Vec<MedicationPlan>, DatabaseError>;

    /// Records of one plan in `[from, to]`, most recent first.
    fn records(
        &self,
        conn: &Connection,
        plan_id: &Uuid,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<Vec<AdherenceRecord>, DatabaseError>;

    fn taken_doses(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<u32, DatabaseError>;
}

/// Provider backed by the local medication tables.
pub struct SqliteAdherenceProvider;

impl AdherenceProvider for SqliteAdherenceProvider {
    fn active_plans(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
    ) -> Result<Vec<MedicationPlan>, DatabaseError> {
        repository::get_active_medication_plans(conn, patient_id)
    }

    fn records(
        &self,
        conn: &Connection,
        plan_id: &Uuid,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<Vec<AdherenceRecord>, DatabaseError> {
        repository::get_adherence_records(conn, plan_id, from, to)
    }

    fn taken_doses(
        &self,
        conn: &Connection,
        patient_id: &Uuid,
        from: &NaiveDateTime,
        to: &NaiveDateTime,
    ) -> Result<u32, DatabaseError> {
        repository::count_taken_doses(conn, patient_id, from, to)
    }
}

/// Provider for deployments without medication tracking.
pub struct NoopAdherenceProvider;

impl AdherenceProvider for NoopAdherenceProvider {
    fn active_plans(&self, _: &Connection, _: &Uuid) -> Result<Vec<MedicationPlan>, DatabaseError> {
        Ok(Vec::new())
    }

    fn records(
        &self,
        _: &Connection,
        _: &Uuid,
        _: &NaiveDateTime,
        _: &NaiveDateTime,
    ) -> Result<Vec<AdherenceRecord>, DatabaseError> {
        Ok(Vec::new())
    }

    fn taken_doses(
        &self,
        _: &Connection,
        _: &Uuid,
        _: &NaiveDateTime,
        _: &NaiveDateTime,
    ) -> Result<u32, DatabaseError> {
        Ok(0)
    }
}

/// Adherence statistics for one plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanAdherence {
    pub plan_id: Uuid,
    pub medication_name: String,
    pub total: usize,
    pub taken: usize,
    /// `taken / total`, always in `[0, 1]`.
    pub compliance_rate: f64,
    pub consecutive_missed: usize,
}

/// Compute statistics from records ordered most recent first. Records
/// scheduled after `now` have not happened yet and are ignored. `None`
/// when nothing is left to judge.
pub fn compute_plan_adherence(
    plan: &MedicationPlan,
    records: &[AdherenceRecord],
    now: &NaiveDateTime,
    lookback: usize,
) -> Option<PlanAdherence> {
    let due: Vec<&AdherenceRecord> = records.iter().filter(|r| r.scheduled_at <= *now).collect();
    if due.is_empty() {
        return None;
    }
    let taken = due
        .iter()
        .filter(|r| r.status == AdherenceStatus::Taken)
        .count();
    let consecutive_missed = due
        .iter()
        .take(lookback)
        .take_while(|r| r.status == AdherenceStatus::Missed)
        .count();

    Some(PlanAdherence {
        plan_id: plan.id,
        medication_name: plan.medication_name.clone(),
        total: due.len(),
        taken,
        compliance_rate: taken as f64 / due.len() as f64,
        consecutive_missed,
    })
}

/// A missed-dose streak outranks the raw rate.
pub fn adherence_priority(stats: &PlanAdherence) -> Option<AlertPriority> {
    match stats.consecutive_missed {
        n if n >= 3 => return Some(AlertPriority::Critical),
        2 => return Some(AlertPriority::High),
        _ => {}
    }
    let rate = stats.compliance_rate;
    if rate <= 0.5 {
        Some(AlertPriority::Critical)
    } else if rate <= 0.7 {
        Some(AlertPriority::High)
    } else if rate <= 0.85 {
        Some(AlertPriority::Medium)
    } else {
        None
    }
}

/// Fold per-plan results into one patient alert at the worst priority.
pub fn adherence_alert(plans: &[PlanAdherence]) -> Option<AlertCandidate> {
    let flagged: Vec<(&PlanAdherence, AlertPriority)> = plans
        .iter()
        .filter_map(|p| adherence_priority(p).map(|prio| (p, prio)))
        .collect();
    let worst = flagged.iter().map(|(_, p)| *p).max()?;

    let details = flagged
        .iter()
        .map(|(p, _)| {
            format!(
                "{} {} ({}/{}, streak {})",
                p.medication_name,
                fmt_pct(p.compliance_rate),
                p.taken,
                p.total,
                p.consecutive_missed
            )
        })
        .collect::<Vec<_>>()
        .join("; ");
    let max_streak = flagged
        .iter()
        .map(|(p, _)| p.consecutive_missed)
        .max()
        .unwrap_or(0);

    Some(
        AlertCandidate::new(AlertRule::MedicationAdherence, worst)
            .var("plans", flagged.len())
            .var("streak", max_streak)
            .var("details", details),
    )
}
