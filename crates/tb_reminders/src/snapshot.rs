use serde::{Deserialize, Serialize};
use tb_core::models::Priority;

pub const SNAPSHOT_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotListV1 {
    pub list_id: String,
    pub name: String,
}

/// One reminder as the host-side exporter serializes it: the EventKit
/// completion flag and the 0/1/5/9 priority integer, untranslated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReminderRecordV1 {
    pub item_id: String,
    pub list_id: String,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default)]
    pub priority: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SnapshotFileV1 {
    pub schema_version: u32,
    #[serde(default)]
    pub lists: Vec<SnapshotListV1>,
    #[serde(default)]
    pub reminders: Vec<ReminderRecordV1>,
}

impl Default for SnapshotFileV1 {
    fn default() -> Self {
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            lists: Vec::new(),
            reminders: Vec::new(),
        }
    }
}

/// EventKit priority bands: 1-4 high, 5 medium, 6-9 low, 0 unset.
pub fn priority_from_int(value: i64) -> Option<Priority> {
    match value {
        1..=4 => Some(Priority::High),
        5 => Some(Priority::Medium),
        6..=9 => Some(Priority::Low),
        _ => None,
    }
}

pub fn priority_to_int(value: Option<Priority>) -> i64 {
    match value {
        Some(Priority::High) => 1,
        Some(Priority::Medium) => 5,
        Some(Priority::Low) => 9,
        None => 0,
    }
}
