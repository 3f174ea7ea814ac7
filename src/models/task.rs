use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub difficulty: Option<i64>,
    #[serde(default)]
    pub duration: Option<i64>,
    #[serde(default)]
    pub deadline: Option<DeadlineInput>,
    #[serde(default)]
    pub preference: Option<String>,
}

/// A deadline is either a non-negative day offset from day 0 (interpreted as
/// end-of-window on that day) or an ISO-8601 local datetime string.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum DeadlineInput {
    RelativeDays(i64),
    Timestamp(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Preference {
    #[default]
    Any,
    Morning,
    Afternoon,
    Evening,
}

impl Preference {
    pub fn parse(value: &str) -> Option<Preference> {
        match value.to_ascii_lowercase().as_str() {
            "any" => Some(Preference::Any),
            "morning" => Some(Preference::Morning),
            "afternoon" => Some(Preference::Afternoon),
            "evening" => Some(Preference::Evening),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Preference::Any => "any",
            Preference::Morning => "morning",
            Preference::Afternoon => "afternoon",
            Preference::Evening => "evening",
        }
    }
}

impl std::fmt::Display for Preference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTask {
    pub id: String,
    pub name: String,
    pub priority: i64,
    pub difficulty: i64,
    pub duration_min: i64,
    pub duration_slots: usize,
    pub deadline_slot: usize,
    pub preference: Preference,
}

impl ParsedTask {
    /// Latest slot index at which the task may still start and meet its
    /// deadline. Zero when the deadline leaves no slack at all.
    pub fn latest_feasible_start(&self) -> usize {
        (self.deadline_slot + 1).saturating_sub(self.duration_slots)
    }
}
