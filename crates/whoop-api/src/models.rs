//! Typed models for WHOOP data API payloads
//!
//! Every scored field is optional: vendor payloads are parsed structurally
//! and nothing beyond that is validated, so unexpected or missing fields
//! surface to the presentation layer as absent values rather than as
//! failures of the client.

use serde::Deserialize;

/// Response envelope for paged collections.
///
/// `next_token` is surfaced to the caller but never followed
/// automatically; each call fetches exactly one page.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection<T> {
    #[serde(default = "Vec::new")]
    pub records: Vec<T>,
    #[serde(default)]
    pub next_token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct UserProfile {
    pub user_id: Option<u64>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SleepRecord {
    pub id: Option<String>,
    pub cycle_id: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub nap: Option<bool>,
    pub score_state: Option<String>,
    pub score: Option<SleepScore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SleepScore {
    pub stage_summary: Option<SleepStageSummary>,
    pub sleep_performance_percentage: Option<f64>,
    pub sleep_efficiency_percentage: Option<f64>,
    pub sleep_consistency_percentage: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SleepStageSummary {
    pub total_in_bed_time_milli: Option<u64>,
    pub total_awake_time_milli: Option<u64>,
    pub total_light_sleep_time_milli: Option<u64>,
    pub total_slow_wave_sleep_time_milli: Option<u64>,
    pub total_rem_sleep_time_milli: Option<u64>,
    pub disturbance_count: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecoveryRecord {
    pub cycle_id: Option<i64>,
    pub created_at: Option<String>,
    pub score_state: Option<String>,
    pub score: Option<RecoveryScore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecoveryScore {
    pub recovery_score: Option<f64>,
    pub resting_heart_rate: Option<f64>,
    pub hrv_rmssd_milli: Option<f64>,
    pub spo2_percentage: Option<f64>,
    pub skin_temp_celsius: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleRecord {
    pub id: Option<i64>,
    pub start: Option<String>,
    pub end: Option<String>,
    pub score_state: Option<String>,
    pub score: Option<CycleScore>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleScore {
    pub strain: Option<f64>,
    pub kilojoule: Option<f64>,
    pub average_heart_rate: Option<f64>,
    pub max_heart_rate: Option<f64>,
}
