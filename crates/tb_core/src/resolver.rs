use crate::models::{ObsidianTask, Priority, RemindersTask, TaskStatus};
use crate::plan::{DiagnosticV1, Side};
use crate::text::{merge_tags, tag_set};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncField {
    Description,
    Status,
    Due,
    Priority,
    Tags,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Text(String),
    Status(TaskStatus),
    Due(Option<NaiveDate>),
    Priority(Option<Priority>),
    Tags(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldResolution {
    pub field: SyncField,
    pub winner: Side,
    pub value: FieldValue,
}

#[derive(Debug, Default)]
pub struct ResolutionOutcome {
    pub fields: Vec<FieldResolution>,
    pub diagnostics: Vec<DiagnosticV1>,
}

impl ResolutionOutcome {
    pub fn is_clean(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Strictly-later modification time wins; equal or unresolvable
/// timestamps fall back to Obsidian. Reminders takes a field, completion
/// status included, only when its timestamp actually parsed to a later
/// instant.
fn pick_winner(obs_time: Option<DateTime<Utc>>, rem_time: Option<DateTime<Utc>>) -> Side {
    match (obs_time, rem_time) {
        (Some(obs), Some(rem)) if rem > obs => Side::Rem,
        (None, Some(_)) => Side::Rem,
        _ => Side::Obs,
    }
}

/// Compare one linked pair field by field. Every divergent field gets a
/// winner and a resolved value; an empty outcome means the pair is clean.
pub fn resolve_pair(obs: &ObsidianTask, rem: &RemindersTask) -> ResolutionOutcome {
    let mut outcome = ResolutionOutcome::default();

    if obs.modified_at.is_unparseable() {
        outcome.diagnostics.push(DiagnosticV1::new(
            "timestamp_unparseable",
            "obsidian modified_at did not parse; treated as absent",
            serde_json::json!({ "obs_id": obs.id.0 }),
        ));
    }
    if rem.modified_at.is_unparseable() {
        outcome.diagnostics.push(DiagnosticV1::new(
            "timestamp_unparseable",
            "reminders modified_at did not parse; treated as absent",
            serde_json::json!({ "rem_id": rem.id.0 }),
        ));
    }

    let obs_time = obs.modified_at.resolve();
    let rem_time = rem.modified_at.resolve();
    let winner = pick_winner(obs_time, rem_time);

    if obs.description.trim() != rem.title.trim() {
        let value = match winner {
            Side::Obs => obs.description.clone(),
            Side::Rem => rem.title.clone(),
        };
        outcome.fields.push(FieldResolution {
            field: SyncField::Description,
            winner,
            value: FieldValue::Text(value),
        });
    }

    if obs.status != rem.status {
        let value = match winner {
            Side::Obs => obs.status,
            Side::Rem => rem.status,
        };
        outcome.fields.push(FieldResolution {
            field: SyncField::Status,
            winner,
            value: FieldValue::Status(value),
        });
    }

    if obs.due != rem.due {
        let value = match winner {
            Side::Obs => obs.due,
            Side::Rem => rem.due,
        };
        outcome.fields.push(FieldResolution {
            field: SyncField::Due,
            winner,
            value: FieldValue::Due(value),
        });
    }

    if obs.priority != rem.priority {
        let value = match winner {
            Side::Obs => obs.priority,
            Side::Rem => rem.priority,
        };
        outcome.fields.push(FieldResolution {
            field: SyncField::Priority,
            winner,
            value: FieldValue::Priority(value),
        });
    }

    let obs_tags = tag_set(&obs.tags);
    let rem_tags = tag_set(&rem.tags);
    if obs_tags != rem_tags {
        // Parallel tag edits merge rather than fight: when both sides
        // carry tags and disagree, the resolved value is the union.
        let value = if !obs_tags.is_empty() && !rem_tags.is_empty() {
            merge_tags(&obs.tags, &rem.tags)
        } else {
            match winner {
                Side::Obs => obs.tags.clone(),
                Side::Rem => rem.tags.clone(),
            }
        };
        outcome.fields.push(FieldResolution {
            field: SyncField::Tags,
            winner,
            value: FieldValue::Tags(value),
        });
    }

    outcome
}
