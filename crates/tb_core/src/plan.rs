use crate::app_error::{AppError, AppResult};
use crate::links::SyncLinkV1;
use crate::models::{Priority, TaskStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Obs,
    Rem,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Obs => "obs",
            Side::Rem => "rem",
        }
    }
}

/// A due-date or priority change must be able to express "cleared", so the
/// payload nests the optional value.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DueChangeV1 {
    pub value: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PriorityChangeV1 {
    pub value: Option<Priority>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TaskChangesV1 {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<DueChangeV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<PriorityChangeV1>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
}

impl TaskChangesV1 {
    pub fn is_empty(&self) -> bool {
        self.status.is_none()
            && self.description.is_none()
            && self.due.is_none()
            && self.priority.is_none()
            && self.tags.is_none()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTaskFieldsV1 {
    pub description: String,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpdateOpV1 {
    pub store: Side,
    pub id: String,
    pub changes: TaskChangesV1,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateRemOpV1 {
    pub obs_id: String,
    pub list_id: String,
    pub fields: NewTaskFieldsV1,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateObsOpV1 {
    pub rem_id: String,
    pub target_file: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading: Option<String>,
    pub fields: NewTaskFieldsV1,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeleteOpV1 {
    pub store: Side,
    pub id: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncPlanV1 {
    pub schema_version: u32,
    pub vault_id: String,
    pub generated_at_ms: i64,
    pub updates: Vec<UpdateOpV1>,
    pub creates_rem: Vec<CreateRemOpV1>,
    pub creates_obs: Vec<CreateObsOpV1>,
    pub deletes: Vec<DeleteOpV1>,
}

impl SyncPlanV1 {
    pub fn new(vault_id: &str, generated_at_ms: i64) -> Self {
        Self {
            schema_version: 1,
            vault_id: vault_id.to_string(),
            generated_at_ms,
            updates: Vec::new(),
            creates_rem: Vec::new(),
            creates_obs: Vec::new(),
            deletes: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.updates.is_empty()
            && self.creates_rem.is_empty()
            && self.creates_obs.is_empty()
            && self.deletes.is_empty()
    }

    /// Deterministic op order: sorted by (store, id) within each category.
    pub fn sort(&mut self) {
        self.updates
            .sort_by(|a, b| (a.store, &a.id).cmp(&(b.store, &b.id)));
        self.creates_rem.sort_by(|a, b| a.obs_id.cmp(&b.obs_id));
        self.creates_obs.sort_by(|a, b| a.rem_id.cmp(&b.rem_id));
        self.deletes
            .sort_by(|a, b| (a.store, &a.id).cmp(&(b.store, &b.id)));
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DiagnosticV1 {
    pub code: String,
    pub message: String,
    pub details: serde_json::Value,
}

impl DiagnosticV1 {
    pub fn new(code: &str, message: &str, details: serde_json::Value) -> Self {
        Self {
            code: code.to_string(),
            message: message.to_string(),
            details,
        }
    }
}

fn plan_error(message: &str, details: serde_json::Value) -> AppError {
    AppError::new("TB_PLAN_INCONSISTENT", "plan", message, false, details)
}

/// Enforce the 1:1 invariants before anything is applied or persisted: no
/// id appears on two links, no op targets the same task twice, and no
/// create references an id that is already linked.
pub fn validate_plan(plan: &SyncPlanV1, links: &[SyncLinkV1]) -> AppResult<()> {
    let mut obs_ids = BTreeSet::new();
    let mut rem_ids = BTreeSet::new();
    for link in links {
        if !obs_ids.insert(link.obs_id.clone()) {
            return Err(plan_error(
                "two links share the same obsidian id",
                serde_json::json!({ "obs_id": link.obs_id }),
            ));
        }
        if !rem_ids.insert(link.rem_id.clone()) {
            return Err(plan_error(
                "two links share the same reminders id",
                serde_json::json!({ "rem_id": link.rem_id }),
            ));
        }
    }

    let mut update_targets = BTreeSet::new();
    for op in &plan.updates {
        if !update_targets.insert((op.store, op.id.clone())) {
            return Err(plan_error(
                "duplicate update target",
                serde_json::json!({ "store": op.store.as_str(), "id": op.id }),
            ));
        }
    }

    let mut delete_targets = BTreeSet::new();
    for op in &plan.deletes {
        if !delete_targets.insert((op.store, op.id.clone())) {
            return Err(plan_error(
                "duplicate delete target",
                serde_json::json!({ "store": op.store.as_str(), "id": op.id }),
            ));
        }
        if update_targets.contains(&(op.store, op.id.clone())) {
            return Err(plan_error(
                "task is both updated and deleted",
                serde_json::json!({ "store": op.store.as_str(), "id": op.id }),
            ));
        }
    }

    let mut create_sources = BTreeSet::new();
    for op in &plan.creates_rem {
        if !create_sources.insert(op.obs_id.clone()) {
            return Err(plan_error(
                "duplicate reminders create for obsidian task",
                serde_json::json!({ "obs_id": op.obs_id }),
            ));
        }
        if obs_ids.contains(&op.obs_id) {
            return Err(plan_error(
                "reminders create references an already linked obsidian task",
                serde_json::json!({ "obs_id": op.obs_id }),
            ));
        }
    }
    let mut create_rem_sources = BTreeSet::new();
    for op in &plan.creates_obs {
        if !create_rem_sources.insert(op.rem_id.clone()) {
            return Err(plan_error(
                "duplicate obsidian create for reminders task",
                serde_json::json!({ "rem_id": op.rem_id }),
            ));
        }
        if rem_ids.contains(&op.rem_id) {
            return Err(plan_error(
                "obsidian create references an already linked reminders task",
                serde_json::json!({ "rem_id": op.rem_id }),
            ));
        }
    }

    Ok(())
}
