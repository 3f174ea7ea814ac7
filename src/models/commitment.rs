use serde::{Deserialize, Serialize};

/// Externally blocked interval (class, meal, meeting).
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlockedInterval {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub start_time: Option<String>,
    #[serde(default)]
    pub end_time: Option<String>,
    #[serde(default)]
    pub activity: Option<String>,
}
