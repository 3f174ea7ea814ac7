use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_START_HOUR: u32 = 8;
pub const DEFAULT_END_HOUR: u32 = 22;
pub const DEFAULT_ALPHA: f64 = 1.0;
pub const DEFAULT_BETA: f64 = 0.1;
pub const DEFAULT_GAMMA: f64 = 1.0;
pub const DEFAULT_GAMMA_CONTIGUITY: f64 = 0.05;
pub const DEFAULT_HARD_TASK_THRESHOLD: i64 = 4;
pub const DEFAULT_TIME_LIMIT_SECONDS: u64 = 30;

/// Caller-tunable knobs for one optimization request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OptimizeSettings {
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default = "default_beta")]
    pub beta: f64,
    #[serde(default = "default_gamma")]
    pub gamma: f64,
    #[serde(default = "default_gamma_contiguity", rename = "gamma_contiguity")]
    pub gamma_contiguity: f64,
    /// Maximum task slots per day; `None` disables the limit.
    #[serde(default)]
    pub daily_limit_slots: Option<usize>,
    #[serde(default = "default_hard_task_threshold")]
    pub hard_task_threshold: i64,
    #[serde(default = "default_time_limit_seconds")]
    pub time_limit_seconds: u64,
    /// Per-slot leisure weights; when present it must cover every slot.
    #[serde(default)]
    pub leisure_weights: Option<HashMap<usize, f64>>,
    /// Per-slot stress multipliers; when present it must cover every slot.
    #[serde(default)]
    pub stress_multipliers: Option<HashMap<usize, f64>>,
}

impl Default for OptimizeSettings {
    fn default() -> Self {
        OptimizeSettings {
            start_hour: DEFAULT_START_HOUR,
            end_hour: DEFAULT_END_HOUR,
            alpha: DEFAULT_ALPHA,
            beta: DEFAULT_BETA,
            gamma: DEFAULT_GAMMA,
            gamma_contiguity: DEFAULT_GAMMA_CONTIGUITY,
            daily_limit_slots: None,
            hard_task_threshold: DEFAULT_HARD_TASK_THRESHOLD,
            time_limit_seconds: DEFAULT_TIME_LIMIT_SECONDS,
            leisure_weights: None,
            stress_multipliers: None,
        }
    }
}

fn default_start_hour() -> u32 {
    DEFAULT_START_HOUR
}

fn default_end_hour() -> u32 {
    DEFAULT_END_HOUR
}

fn default_alpha() -> f64 {
    DEFAULT_ALPHA
}

fn default_beta() -> f64 {
    DEFAULT_BETA
}

fn default_gamma() -> f64 {
    DEFAULT_GAMMA
}

fn default_gamma_contiguity() -> f64 {
    DEFAULT_GAMMA_CONTIGUITY
}

fn default_hard_task_threshold() -> i64 {
    DEFAULT_HARD_TASK_THRESHOLD
}

fn default_time_limit_seconds() -> u64 {
    DEFAULT_TIME_LIMIT_SECONDS
}
