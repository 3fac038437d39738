use crate::snapshot::{
    priority_from_int, priority_to_int, ReminderRecordV1, SnapshotFileV1, SNAPSHOT_SCHEMA_VERSION,
};
use crate::tags::{decode_tags_from_notes, encode_tags_in_notes};
use chrono::{SecondsFormat, Utc};
use std::fs;
use std::path::PathBuf;
use tb_core::app_error::{AppError, AppResult};
use tb_core::models::{parse_day, parse_iso_datetime, RemindersTask, TaskStatus, Timestamp};
use tb_core::plan::{NewTaskFieldsV1, TaskChangesV1};
use tb_core::store_traits::RemindersGateway;
use tb_core::types::{ListId, RemId};
use uuid::Uuid;

fn gateway_error(code: &str, message: &str, retryable: bool, details: serde_json::Value) -> AppError {
    AppError::new(code, "reminders", message, retryable, details)
}

/// Gateway over the bridge snapshot the host-side exporter maintains.
/// EventKit itself stays on the host; this file is the authorization
/// boundary. If it cannot be read, the calendar store never granted us
/// anything, and the run must abort before mutating either side.
pub struct FileGateway {
    path: PathBuf,
    fixed_now: Option<String>,
}

impl FileGateway {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            fixed_now: None,
        }
    }

    /// Pin the clock used for created/modified stamps.
    pub fn with_fixed_now(mut self, now_iso: &str) -> Self {
        self.fixed_now = Some(now_iso.to_string());
        self
    }

    fn now_iso(&self) -> String {
        match &self.fixed_now {
            Some(fixed) => fixed.clone(),
            None => Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }

    fn load(&self) -> AppResult<SnapshotFileV1> {
        let bytes = fs::read(&self.path).map_err(|e| {
            if matches!(
                e.kind(),
                std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied
            ) {
                gateway_error(
                    "TB_REMINDERS_AUTH_DENIED",
                    "reminders snapshot unavailable; host store access not granted",
                    false,
                    serde_json::json!({ "error": e.to_string(), "path": self.path }),
                )
            } else {
                gateway_error(
                    "TB_REMINDERS_SNAPSHOT_INVALID",
                    "failed to read reminders snapshot",
                    true,
                    serde_json::json!({ "error": e.to_string(), "path": self.path }),
                )
            }
        })?;
        let snapshot: SnapshotFileV1 = serde_json::from_slice(&bytes).map_err(|e| {
            gateway_error(
                "TB_REMINDERS_SNAPSHOT_INVALID",
                "failed to parse reminders snapshot",
                false,
                serde_json::json!({ "error": e.to_string(), "path": self.path }),
            )
        })?;
        if snapshot.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(gateway_error(
                "TB_REMINDERS_SNAPSHOT_INVALID",
                "unsupported reminders snapshot schema_version",
                false,
                serde_json::json!({
                    "expected": SNAPSHOT_SCHEMA_VERSION,
                    "actual": snapshot.schema_version
                }),
            ));
        }
        Ok(snapshot)
    }

    fn save(&self, snapshot: &SnapshotFileV1) -> AppResult<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(|e| {
            gateway_error(
                "TB_REMINDERS_SNAPSHOT_WRITE_FAILED",
                "failed to serialize reminders snapshot",
                false,
                serde_json::json!({ "error": e.to_string() }),
            )
        })?;
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, &bytes).map_err(|e| {
            gateway_error(
                "TB_REMINDERS_SNAPSHOT_WRITE_FAILED",
                "failed to write reminders snapshot temp file",
                false,
                serde_json::json!({ "error": e.to_string(), "path": tmp_path }),
            )
        })?;
        fs::rename(&tmp_path, &self.path).map_err(|e| {
            gateway_error(
                "TB_REMINDERS_SNAPSHOT_WRITE_FAILED",
                "failed to rename reminders snapshot into place",
                false,
                serde_json::json!({ "error": e.to_string(), "from": tmp_path, "to": self.path }),
            )
        })?;
        Ok(())
    }

    fn list_name(snapshot: &SnapshotFileV1, list_id: &str) -> String {
        snapshot
            .lists
            .iter()
            .find(|list| list.list_id == list_id)
            .map(|list| list.name.clone())
            .unwrap_or_default()
    }

    fn task_from_record(snapshot: &SnapshotFileV1, record: &ReminderRecordV1) -> RemindersTask {
        let (notes, tags) = decode_tags_from_notes(record.notes.as_deref());
        // modified_at crosses the boundary as a native datetime value;
        // anything unparseable degrades to Absent, never to a string the
        // resolver might mishandle.
        let modified_at = record
            .modified_at
            .as_deref()
            .and_then(parse_iso_datetime)
            .map(Timestamp::Native)
            .unwrap_or(Timestamp::Absent);
        let created_at = record
            .created_at
            .as_deref()
            .and_then(parse_iso_datetime)
            .map(Timestamp::Native)
            .unwrap_or(Timestamp::Absent);
        RemindersTask {
            id: RemId(record.item_id.clone()),
            list_id: ListId(record.list_id.clone()),
            list_name: Self::list_name(snapshot, &record.list_id),
            status: if record.completed {
                TaskStatus::Done
            } else {
                TaskStatus::Todo
            },
            title: record.title.clone(),
            due: record.due.as_deref().and_then(parse_day),
            priority: priority_from_int(record.priority),
            notes,
            tags,
            created_at,
            modified_at,
        }
    }

    fn record_index(snapshot: &SnapshotFileV1, id: &RemId) -> AppResult<usize> {
        snapshot
            .reminders
            .iter()
            .position(|record| record.item_id == id.0)
            .ok_or_else(|| {
                gateway_error(
                    "TB_REMINDERS_ITEM_NOT_FOUND",
                    "reminder not present in snapshot",
                    false,
                    serde_json::json!({ "item_id": id.0 }),
                )
            })
    }
}

impl RemindersGateway for FileGateway {
    fn list_reminders(&mut self, list_ids: &[ListId]) -> AppResult<Vec<RemindersTask>> {
        let snapshot = self.load()?;
        let wanted: Vec<&str> = list_ids.iter().map(|id| id.0.as_str()).collect();
        let mut tasks: Vec<RemindersTask> = snapshot
            .reminders
            .iter()
            .filter(|record| wanted.contains(&record.list_id.as_str()))
            .map(|record| Self::task_from_record(&snapshot, record))
            .collect();
        tasks.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(tasks)
    }

    fn create_reminder(&mut self, list_id: &ListId, fields: &NewTaskFieldsV1) -> AppResult<RemId> {
        let mut snapshot = self.load()?;
        let now_iso = self.now_iso();
        let item_id = Uuid::new_v4().to_string().to_uppercase();
        let notes = encode_tags_in_notes(fields.notes.as_deref(), &fields.tags);
        snapshot.reminders.push(ReminderRecordV1 {
            item_id: item_id.clone(),
            list_id: list_id.0.clone(),
            title: fields.description.clone(),
            completed: fields.status == TaskStatus::Done,
            due: fields.due.clone(),
            priority: priority_to_int(fields.priority),
            notes: if notes.is_empty() { None } else { Some(notes) },
            created_at: Some(now_iso.clone()),
            modified_at: Some(now_iso),
        });
        self.save(&snapshot)?;
        Ok(RemId(item_id))
    }

    fn update_reminder(&mut self, id: &RemId, changes: &TaskChangesV1) -> AppResult<()> {
        let mut snapshot = self.load()?;
        let idx = Self::record_index(&snapshot, id)?;
        let now_iso = self.now_iso();
        let record = &mut snapshot.reminders[idx];

        if let Some(status) = changes.status {
            record.completed = status == TaskStatus::Done;
        }
        if let Some(description) = &changes.description {
            record.title = description.clone();
        }
        if let Some(due) = &changes.due {
            record.due = due.value.clone();
        }
        if let Some(priority) = &changes.priority {
            record.priority = priority_to_int(priority.value);
        }
        if let Some(tags) = &changes.tags {
            let (user_notes, _) = decode_tags_from_notes(record.notes.as_deref());
            let combined = encode_tags_in_notes(user_notes.as_deref(), tags);
            record.notes = if combined.is_empty() {
                None
            } else {
                Some(combined)
            };
        }
        record.modified_at = Some(now_iso);

        self.save(&snapshot)
    }

    fn delete_reminder(&mut self, id: &RemId) -> AppResult<()> {
        let mut snapshot = self.load()?;
        let idx = Self::record_index(&snapshot, id)?;
        snapshot.reminders.remove(idx);
        self.save(&snapshot)
    }
}
