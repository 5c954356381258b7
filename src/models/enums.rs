use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(MetricType {
    BloodPressure => "blood_pressure",
    Glucose => "glucose",
    HeartRate => "heart_rate",
    Weight => "weight",
    UricAcid => "uric_acid",
    LipidPanel => "lipid_panel",
});

impl MetricType {
    /// Display unit for the primary value.
    pub fn unit(self) -> &'static str {
        match self {
            MetricType::BloodPressure => "mmHg",
            MetricType::Glucose => "mmol/L",
            MetricType::HeartRate => "bpm",
            MetricType::Weight => "kg",
            MetricType::UricAcid => "µmol/L",
            MetricType::LipidPanel => "mmol/L",
        }
    }
}

str_enum!(UserRole {
    Patient => "patient",
    Clinician => "clinician",
});

str_enum!(Gender {
    Male => "male",
    Female => "female",
    Other => "other",
});

str_enum!(BindingStatus {
    Active => "active",
    Inactive => "inactive",
    Transferred => "transferred",
});

str_enum!(AdherenceStatus {
    Pending => "pending",
    Taken => "taken",
    Missed => "missed",
    Skipped => "skipped",
});

str_enum!(AlertType {
    ThresholdExceeded => "threshold_exceeded",
    MissedMedication => "missed_medication",
    AbnormalTrend => "abnormal_trend",
    PatientInactivity => "patient_inactivity",
    CorrelationAnomaly => "correlation_anomaly",
    SystemNotification => "system_notification",
});

str_enum!(AlertPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

impl AlertPriority {
    /// Numeric rank, higher is more urgent.
    pub fn rank(self) -> u8 {
        match self {
            AlertPriority::Low => 0,
            AlertPriority::Medium => 1,
            AlertPriority::High => 2,
            AlertPriority::Critical => 3,
        }
    }
}

impl PartialOrd for AlertPriority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AlertPriority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

str_enum!(AlertStatus {
    Pending => "pending",
    Handled => "handled",
    Dismissed => "dismissed",
});

impl AlertStatus {
    /// Handled and dismissed alerts never reopen.
    pub fn is_terminal(self) -> bool {
        !matches!(self, AlertStatus::Pending)
    }
}

/// Fine-grained rule that produced an alert. Doubles as the localization key.
str_enum!(AlertRule {
    BpSustainedHigh => "bp_sustained_high",
    BpCritical => "bp_critical",
    BpHigh => "bp_high",
    BpPhysiologicalError => "bp_physiological_error",
    GlucoseHighRising => "glucose_high_rising",
    GlucoseHighFalling => "glucose_high_falling",
    GlucoseHighStable => "glucose_high_stable",
    GlucoseNormalRising => "glucose_normal_rising",
    GlucoseCritical => "glucose_critical",
    GlucoseHigh => "glucose_high",
    GlucoseLow => "glucose_low",
    HeartRateElevated => "heart_rate_elevated",
    HeartRateCritical => "heart_rate_critical",
    HeartRateHigh => "heart_rate_high",
    HeartRateLow => "heart_rate_low",
    WeightRapidChange => "weight_rapid_change",
    ThresholdDanger => "threshold_danger",
    ThresholdWarning => "threshold_warning",
    HistoricalDeviation => "historical_deviation",
    MedicationAdherence => "medication_adherence",
    LowEngagement => "low_engagement",
    CardiovascularRegulation => "cardiovascular_regulation",
    GlucoseWeightLoss => "glucose_weight_loss",
    // Reserved for notices stored by other producers. No detection emits it.
    SystemNotice => "system_notice",
});

impl AlertRule {
    /// Coarse alert type each rule files under.
    pub fn alert_type(self) -> AlertType {
        use AlertRule::*;
        match self {
            BpSustainedHigh | BpCritical | BpHigh | BpPhysiologicalError | GlucoseHighStable
            | GlucoseHighFalling | GlucoseCritical | GlucoseHigh | GlucoseLow
            | HeartRateElevated | HeartRateCritical | HeartRateHigh | HeartRateLow
            | ThresholdDanger | ThresholdWarning => AlertType::ThresholdExceeded,
            GlucoseHighRising | GlucoseNormalRising | WeightRapidChange | HistoricalDeviation => {
                AlertType::AbnormalTrend
            }
            MedicationAdherence => AlertType::MissedMedication,
            LowEngagement => AlertType::PatientInactivity,
            CardiovascularRegulation | GlucoseWeightLoss => AlertType::CorrelationAnomaly,
            SystemNotice => AlertType::SystemNotification,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn metric_type_round_trip() {
        for variant in MetricType::all() {
            assert_eq!(MetricType::from_str(variant.as_str()).unwrap(), *variant);
        }
    }

    #[test]
    fn alert_rule_round_trip() {
        for variant in AlertRule::all() {
            assert_eq!(AlertRule::from_str(variant.as_str()).unwrap(), *variant);
        }
    }

    #[test]
    fn system_notice_files_under_system_notification() {
        assert_eq!(AlertRule::SystemNotice.alert_type(), AlertType::SystemNotification);
        assert_eq!(AlertRule::from_str("system_notice").unwrap(), AlertRule::SystemNotice);
    }

    #[test]
    fn priority_ordering() {
        assert!(AlertPriority::Low < AlertPriority::Medium);
        assert!(AlertPriority::Medium < AlertPriority::High);
        assert!(AlertPriority::High < AlertPriority::Critical);
        assert_eq!(
            [AlertPriority::High, AlertPriority::Critical, AlertPriority::Low]
                .iter()
                .max(),
            Some(&AlertPriority::Critical)
        );
    }

    #[test]
    fn terminal_statuses() {
        assert!(!AlertStatus::Pending.is_terminal());
        assert!(AlertStatus::Handled.is_terminal());
        assert!(AlertStatus::Dismissed.is_terminal());
    }

    #[test]
    fn glucose_rules_map_to_distinct_types() {
        assert_eq!(AlertRule::GlucoseHighRising.alert_type(), AlertType::AbnormalTrend);
        assert_eq!(AlertRule::GlucoseHighStable.alert_type(), AlertType::ThresholdExceeded);
        assert_eq!(AlertRule::MedicationAdherence.alert_type(), AlertType::MissedMedication);
        assert_eq!(AlertRule::LowEngagement.alert_type(), AlertType::PatientInactivity);
    }

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&AlertType::ThresholdExceeded).unwrap();
        assert_eq!(json, "\"threshold_exceeded\"");
        let json = serde_json::to_string(&AlertRule::GlucoseHighRising).unwrap();
        assert_eq!(json, "\"glucose_high_rising\"");
    }

    #[test]
    fn invalid_enum_returns_error() {
        assert!(MetricType::from_str("temperature").is_err());
        assert!(AlertStatus::from_str("").is_err());
    }
}
