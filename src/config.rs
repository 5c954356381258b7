use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "Carewatch";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_ADDR: &str = "127.0.0.1:8088";
pub const DEFAULT_BATCH_INTERVAL_SECS: u64 = 3600;

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "carewatch=info,tower_http=warn"
}

/// Get the application data directory: ~/Carewatch/
pub fn app_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(APP_NAME)
}

pub fn default_db_path() -> PathBuf {
    app_data_dir().join("carewatch.db")
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidVar { var: &'static str, value: String },

    #[error("Cannot read analysis config {path}: {reason}")]
    AnalysisFile { path: String, reason: String },
}

/// Runtime configuration read from the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    /// `None` disables the periodic batch scheduler.
    pub batch_interval: Option<Duration>,
    pub analysis: AnalysisConfig,
}

impl AppConfig {
    /// `CAREWATCH_DB`, `CAREWATCH_ADDR`, `CAREWATCH_BATCH_INTERVAL_SECS`,
    /// `CAREWATCH_ANALYSIS_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub(crate) fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let db_path = lookup("CAREWATCH_DB")
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(default_db_path);

        let addr_raw = lookup("CAREWATCH_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let bind_addr = addr_raw.parse().map_err(|_| ConfigError::InvalidVar {
            var: "CAREWATCH_ADDR",
            value: addr_raw.clone(),
        })?;

        let interval_secs = match lookup("CAREWATCH_BATCH_INTERVAL_SECS") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidVar {
                var: "CAREWATCH_BATCH_INTERVAL_SECS",
                value: raw,
            })?,
            None => DEFAULT_BATCH_INTERVAL_SECS,
        };
        let batch_interval = (interval_secs > 0).then(|| Duration::from_secs(interval_secs));

        let analysis = match lookup("CAREWATCH_ANALYSIS_CONFIG") {
            Some(path) if !path.trim().is_empty() => AnalysisConfig::load(Path::new(&path))?,
            _ => AnalysisConfig::default(),
        };

        Ok(Self {
            db_path,
            bind_addr,
            batch_interval,
            analysis,
        })
    }
}

/// Supported alert message locales.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Locale {
    #[default]
    En,
    Zh,
}

/// Window sizes and rule knobs for the analysis engine.
///
/// Every field has a default, so a JSON file only needs the keys it
/// overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub trend_window_days: i64,
    pub zscore_window_days: i64,
    pub adherence_window_days: i64,
    pub activity_window_days: i64,
    pub bp_hr_correlation_hours: i64,
    pub glucose_weight_correlation_hours: i64,
    pub batch_dedup_hours: i64,
    pub threshold_dedup_hours: i64,
    pub adherence_lookback: usize,
    pub per_patient_timeout_secs: u64,
    pub locale: Locale,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            trend_window_days: 3,
            zscore_window_days: 7,
            adherence_window_days: 30,
            activity_window_days: 3,
            bp_hr_correlation_hours: 24,
            glucose_weight_correlation_hours: 168,
            batch_dedup_hours: 24,
            threshold_dedup_hours: 6,
            adherence_lookback: 10,
            per_patient_timeout_secs: 30,
            locale: Locale::En,
        }
    }
}

impl AnalysisConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::AnalysisFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|e| ConfigError::AnalysisFile {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn per_patient_timeout(&self) -> Duration {
        Duration::from_secs(self.per_patient_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io::Write;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn app_data_dir_named_after_app() {
        assert!(app_data_dir().ends_with("Carewatch"));
        assert!(default_db_path().starts_with(app_data_dir()));
    }

    #[test]
    fn defaults_without_env() {
        let cfg = AppConfig::from_lookup(lookup_from(&[])).unwrap();
        assert_eq!(cfg.bind_addr, DEFAULT_ADDR.parse::<SocketAddr>().unwrap());
        assert_eq!(cfg.batch_interval, Some(Duration::from_secs(3600)));
        assert_eq!(cfg.analysis, AnalysisConfig::default());
        assert_eq!(cfg.db_path, default_db_path());
    }

    #[test]
    fn zero_interval_disables_scheduler() {
        let cfg = AppConfig::from_lookup(lookup_from(&[("CAREWATCH_BATCH_INTERVAL_SECS", "0")])).unwrap();
        assert!(cfg.batch_interval.is_none());
    }

    #[test]
    fn invalid_addr_rejected() {
        let err = AppConfig::from_lookup(lookup_from(&[("CAREWATCH_ADDR", "not-an-addr")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVar { var: "CAREWATCH_ADDR", .. }));
    }

    #[test]
    fn analysis_config_partial_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"trend_window_days": 5, "locale": "zh"}}"#).unwrap();
        let cfg = AppConfig::from_lookup(lookup_from(&[(
            "CAREWATCH_ANALYSIS_CONFIG",
            file.path().to_str().unwrap(),
        )]))
        .unwrap();
        assert_eq!(cfg.analysis.trend_window_days, 5);
        assert_eq!(cfg.analysis.locale, Locale::Zh);
        assert_eq!(cfg.analysis.batch_dedup_hours, 24);
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, "0.3.0");
    }
}
