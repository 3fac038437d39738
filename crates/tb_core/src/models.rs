use crate::types::{ListId, ObsId, RemId, VaultId};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Todo,
    Done,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "todo",
            TaskStatus::Done => "done",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Modification times arrive as ISO strings from the Markdown side and as
/// native datetimes from the Reminders gateway. Both shapes normalize
/// through `resolve`; a string that fails to parse resolves to `None` and
/// must never be treated as "earlier".
#[derive(Debug, Clone, PartialEq)]
pub enum Timestamp {
    Absent,
    Iso(String),
    Native(DateTime<Utc>),
}

impl Timestamp {
    pub fn resolve(&self) -> Option<DateTime<Utc>> {
        match self {
            Timestamp::Absent => None,
            Timestamp::Native(value) => Some(*value),
            Timestamp::Iso(raw) => parse_iso_datetime(raw),
        }
    }

    pub fn is_unparseable(&self) -> bool {
        matches!(self, Timestamp::Iso(_)) && self.resolve().is_none()
    }
}

pub fn parse_iso_datetime(raw: &str) -> Option<DateTime<Utc>> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Offset-less local form; read as UTC.
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(DateTime::from_naive_utc_and_offset(naive, Utc));
    }
    None
}

/// Day-granularity date parser tolerant of datetime prefixes and
/// single-digit month/day segments.
pub fn parse_day(raw: &str) -> Option<NaiveDate> {
    let mut text = raw.trim();
    if let Some(idx) = text.find('T') {
        text = &text[..idx];
    }
    let text = text.split(&['+', 'Z'][..]).next().unwrap_or(text);
    let mut parts = text.split('-');
    let year: i32 = parts.next()?.trim().parse().ok()?;
    let month: u32 = parts.next()?.trim().parse().ok()?;
    let day: u32 = parts.next()?.trim().parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

pub fn format_day(value: &NaiveDate) -> String {
    value.format("%Y-%m-%d").to_string()
}

#[derive(Debug, Clone)]
pub struct ObsidianTask {
    pub id: ObsId,
    pub vault_id: VaultId,
    pub file_path: String,
    pub line_number: usize,
    pub block_id: Option<String>,
    pub status: TaskStatus,
    pub description: String,
    pub raw_line: String,
    pub due: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub notes: Option<String>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}

#[derive(Debug, Clone)]
pub struct RemindersTask {
    pub id: RemId,
    pub list_id: ListId,
    pub list_name: String,
    pub status: TaskStatus,
    pub title: String,
    pub due: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub notes: Option<String>,
    pub tags: Vec<String>,
    pub created_at: Timestamp,
    pub modified_at: Timestamp,
}
