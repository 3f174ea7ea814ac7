use serde::{Deserialize, Serialize};

use crate::models::task::Preference;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SolveStatus {
    Optimal,
    Suboptimal,
    TimeLimitReached,
    Infeasible,
    InfeasibleOrUnbounded,
    NoSchedulableTasks,
    ConfigurationError,
    Error,
}

impl SolveStatus {
    pub fn has_solution(self) -> bool {
        matches!(
            self,
            SolveStatus::Optimal | SolveStatus::Suboptimal | SolveStatus::TimeLimitReached
        )
    }
}

/// One scheduled task occurrence. Slot indices are authoritative; the
/// datetime strings are derived for display.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleEntry {
    pub id: String,
    pub name: String,
    pub priority: i64,
    pub difficulty: i64,
    pub start_slot: usize,
    /// Last occupied slot, inclusive.
    pub end_slot: usize,
    #[serde(rename = "startTime")]
    pub start_time: String,
    #[serde(rename = "endTime")]
    pub end_time: String,
    pub duration_min: i64,
    pub preference: Preference,
    pub stress_multiplier_at_start: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FilteredTask {
    pub id: String,
    pub name: String,
    pub reason: String,
    pub required_duration_min: Option<i64>,
    pub current_duration_min: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SolveResult {
    pub status: SolveStatus,
    pub schedule: Vec<ScheduleEntry>,
    pub raw_total_leisure_minutes: f64,
    pub weighted_leisure_score: f64,
    pub weighted_stress_score: f64,
    pub contiguous_leisure_pairs: i64,
    pub objective_value: Option<f64>,
    pub solve_time_seconds: f64,
    pub completion_rate: f64,
    pub message: String,
    pub filtered_tasks_info: Vec<FilteredTask>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub error_details: Vec<String>,
}

impl SolveResult {
    /// Empty result shell; callers fill in status, metrics and message.
    pub fn empty(status: SolveStatus, message: impl Into<String>) -> Self {
        SolveResult {
            status,
            schedule: Vec::new(),
            raw_total_leisure_minutes: 0.0,
            weighted_leisure_score: 0.0,
            weighted_stress_score: 0.0,
            contiguous_leisure_pairs: 0,
            objective_value: None,
            solve_time_seconds: 0.0,
            completion_rate: 0.0,
            message: message.into(),
            filtered_tasks_info: Vec::new(),
            warnings: Vec::new(),
            error_details: Vec::new(),
        }
    }
}
