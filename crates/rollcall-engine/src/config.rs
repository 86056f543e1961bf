use std::path::PathBuf;
use std::time::Duration;

use chrono::{NaiveTime, Weekday};

use rollcall_core::compare::{Metric, DEFAULT_COSINE_THRESHOLD};
use rollcall_core::status::{default_late_cutoff, DEFAULT_OFF_DAY};

use crate::matcher::{MatchConfig, DEFAULT_CANDIDATE_TIMEOUT, DEFAULT_SEARCH_BUDGET};

/// Engine configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Path to the SQLite database file.
    pub db_path: PathBuf,
    /// Directory for stored evidence images.
    pub evidence_dir: PathBuf,
    /// Comparison metric for gallery search and verification.
    pub metric: Metric,
    /// Match threshold (cosine similarity, or distance under Euclidean).
    pub threshold: f32,
    /// Timeout for a single gallery comparison.
    pub candidate_timeout: Duration,
    /// Wall-clock budget for one whole gallery scan.
    pub search_budget: Duration,
    /// Check-in time-of-day cutoff; later arrivals are `late`.
    pub late_cutoff: NaiveTime,
    /// Minimum number of capture samples required to enroll.
    pub min_enroll_samples: usize,
    /// Weekday with no expected attendance (blank in reports).
    pub off_day: Weekday,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from("rollcall.db"),
            evidence_dir: PathBuf::from("evidence"),
            metric: Metric::Cosine,
            threshold: DEFAULT_COSINE_THRESHOLD,
            candidate_timeout: DEFAULT_CANDIDATE_TIMEOUT,
            search_budget: DEFAULT_SEARCH_BUDGET,
            late_cutoff: default_late_cutoff(),
            min_enroll_samples: 3,
            off_day: DEFAULT_OFF_DAY,
        }
    }
}

impl EngineConfig {
    /// Load configuration from `ROLLCALL_*` environment variables with
    /// defaults.
    pub fn from_env() -> Self {
        let data_dir = std::env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
                PathBuf::from(home).join(".local/share")
            })
            .join("rollcall");

        let db_path = std::env::var("ROLLCALL_DB_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("rollcall.db"));
        let evidence_dir = std::env::var("ROLLCALL_EVIDENCE_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("evidence"));

        Self {
            db_path,
            evidence_dir,
            metric: env_metric("ROLLCALL_METRIC", Metric::Cosine),
            threshold: env_f32("ROLLCALL_MATCH_THRESHOLD", DEFAULT_COSINE_THRESHOLD),
            candidate_timeout: Duration::from_secs(env_u64(
                "ROLLCALL_CANDIDATE_TIMEOUT_SECS",
                DEFAULT_CANDIDATE_TIMEOUT.as_secs(),
            )),
            search_budget: Duration::from_secs(env_u64(
                "ROLLCALL_SEARCH_BUDGET_SECS",
                DEFAULT_SEARCH_BUDGET.as_secs(),
            )),
            late_cutoff: env_time("ROLLCALL_LATE_CUTOFF", default_late_cutoff()),
            min_enroll_samples: env_usize("ROLLCALL_MIN_ENROLL_SAMPLES", 3),
            off_day: env_weekday("ROLLCALL_OFF_DAY", DEFAULT_OFF_DAY),
        }
    }

    /// Matcher settings derived from this configuration.
    pub fn match_config(&self) -> MatchConfig {
        MatchConfig {
            metric: self.metric,
            threshold: self.threshold,
            per_candidate_timeout: self.candidate_timeout,
            overall_budget: self.search_budget,
        }
    }
}

fn env_f32(key: &str, default: f32) -> f32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_metric(key: &str, default: Metric) -> Metric {
    match std::env::var(key).as_deref() {
        Ok("euclidean") => Metric::Euclidean,
        Ok("cosine") => Metric::Cosine,
        _ => default,
    }
}

fn env_time(key: &str, default: NaiveTime) -> NaiveTime {
    std::env::var(key)
        .ok()
        .and_then(|v| NaiveTime::parse_from_str(&v, "%H:%M").ok())
        .unwrap_or(default)
}

fn env_weekday(key: &str, default: Weekday) -> Weekday {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
