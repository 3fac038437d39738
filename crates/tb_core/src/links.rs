use crate::app_error::{AppError, AppResult};
use crate::canon_json::to_canonical_bytes;
use crate::matcher::{score_tasks, MatcherParams};
use crate::models::{ObsidianTask, RemindersTask};
use crate::plan::{DiagnosticV1, Side};
use crate::text::title_hash;
use crate::types::{ObsId, RemId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const LINK_FILE_SCHEMA_VERSION: u32 = 1;

/// Minimum similarity score a recovery candidate must reach before a
/// drifted reminders id is rewritten.
pub const RECOVERY_MIN_SCORE: f64 = 0.90;

/// Persisted identity bridge between one Obsidian task and one Reminders
/// task. `score_milli` is the match score in thousandths (the canonical
/// encoder forbids floats). The `rem_*` anchors exist because the host
/// store's item identifier drifts across edits and device sync; they make
/// recovery a pure function of the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncLinkV1 {
    pub obs_id: String,
    pub rem_id: String,
    pub score_milli: u32,
    pub created_at: String,
    pub last_synced: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rem_list_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rem_title_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rem_last_known_title: Option<String>,
    #[serde(default)]
    pub stale_runs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LinkFileV1 {
    pub schema_version: u32,
    pub links: Vec<SyncLinkV1>,
}

pub fn score_to_milli(score: f64) -> u32 {
    (score.clamp(0.0, 1.0) * 1000.0).round() as u32
}

fn link_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "links", message, false, details)
}

pub fn load_links(path: &Path) -> AppResult<Vec<SyncLinkV1>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(link_error(
                "TB_LINK_FILE_READ_FAILED",
                "failed to read link file",
                serde_json::json!({ "error": e.to_string(), "path": path }),
            ))
        }
    };
    let file: LinkFileV1 = serde_json::from_slice(&bytes).map_err(|e| {
        link_error(
            "TB_LINK_FILE_INVALID",
            "failed to parse link file",
            serde_json::json!({ "error": e.to_string(), "path": path }),
        )
    })?;
    if file.schema_version != LINK_FILE_SCHEMA_VERSION {
        return Err(link_error(
            "TB_LINK_FILE_UNSUPPORTED_VERSION",
            "unsupported link file schema_version",
            serde_json::json!({
                "expected": LINK_FILE_SCHEMA_VERSION,
                "actual": file.schema_version,
                "path": path
            }),
        ));
    }
    Ok(file.links)
}

/// Canonical, sorted, write-if-changed persistence: the serialized bytes
/// are compared with the on-disk file and only a difference triggers a
/// temp-file write plus atomic rename. Returns whether a write happened.
pub fn persist_links(path: &Path, links: &[SyncLinkV1]) -> AppResult<bool> {
    let mut sorted: Vec<SyncLinkV1> = links.to_vec();
    sorted.sort_by(|a, b| (&a.obs_id, &a.rem_id).cmp(&(&b.obs_id, &b.rem_id)));
    let file = LinkFileV1 {
        schema_version: LINK_FILE_SCHEMA_VERSION,
        links: sorted,
    };
    let value = serde_json::to_value(&file).map_err(|e| {
        link_error(
            "TB_LINK_FILE_WRITE_FAILED",
            "failed to serialize link file",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;
    let bytes = to_canonical_bytes(&value)?;

    if let Ok(existing) = fs::read(path) {
        if existing == bytes {
            return Ok(false);
        }
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            link_error(
                "TB_LINK_FILE_WRITE_FAILED",
                "failed to create link file directory",
                serde_json::json!({ "error": e.to_string(), "path": parent }),
            )
        })?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, &bytes).map_err(|e| {
        link_error(
            "TB_LINK_FILE_WRITE_FAILED",
            "failed to write link temp file",
            serde_json::json!({ "error": e.to_string(), "path": tmp_path }),
        )
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        link_error(
            "TB_LINK_FILE_WRITE_FAILED",
            "failed to rename link temp file into place",
            serde_json::json!({ "error": e.to_string(), "from": tmp_path, "to": path }),
        )
    })?;
    Ok(true)
}

/// Lifecycle verdict for one stored link against the current snapshots.
#[derive(Debug, Clone, PartialEq)]
pub enum LinkOutcome {
    /// Both sides present; link carried forward with cleared grace.
    Kept(SyncLinkV1),
    /// Reminders id drifted but anchors re-identified the task; the link
    /// was rewritten to the new id.
    Recovered { link: SyncLinkV1, old_rem_id: String },
    /// Reminders side missing and unrecovered; retained for a grace run.
    Stale(SyncLinkV1),
    /// Link removed; the surviving side, if any, becomes a tombstone
    /// deletion rather than a re-create.
    Retired {
        link: SyncLinkV1,
        tombstone: Option<(Side, String)>,
    },
}

pub struct LinkNormalization {
    pub outcomes: Vec<LinkOutcome>,
    pub diagnostics: Vec<DiagnosticV1>,
}

/// Reconcile stored links against the current snapshots. `advance_grace`
/// is true only for apply runs so dry-runs neither consume the grace
/// window nor retire stale links.
pub fn normalize_links(
    links: Vec<SyncLinkV1>,
    obs_by_id: &BTreeMap<ObsId, &ObsidianTask>,
    rem_by_id: &BTreeMap<RemId, &RemindersTask>,
    params: &MatcherParams,
    advance_grace: bool,
) -> LinkNormalization {
    let linked_rem_ids: std::collections::BTreeSet<String> =
        links.iter().map(|l| l.rem_id.clone()).collect();
    let mut outcomes = Vec::new();
    let mut diagnostics = Vec::new();

    for link in links {
        let obs_task = obs_by_id.get(&ObsId(link.obs_id.clone())).copied();
        let rem_present = rem_by_id.contains_key(&RemId(link.rem_id.clone()));

        match (obs_task, rem_present) {
            (Some(_), true) => {
                let mut kept = link;
                kept.stale_runs = 0;
                outcomes.push(LinkOutcome::Kept(kept));
            }
            (None, _) => {
                // The Markdown task is gone; its counterpart, if still
                // present, is retired rather than re-created.
                let tombstone = if rem_present {
                    Some((Side::Rem, link.rem_id.clone()))
                } else {
                    None
                };
                diagnostics.push(DiagnosticV1::new(
                    "link_retired_obs_missing",
                    "obsidian task disappeared; link retired",
                    serde_json::json!({ "obs_id": link.obs_id, "rem_id": link.rem_id }),
                ));
                outcomes.push(LinkOutcome::Retired { link, tombstone });
            }
            (Some(obs_task), false) => {
                match recover_drifted_link(&link, obs_task, rem_by_id, &linked_rem_ids, params) {
                    Some(candidate) => {
                        let old_rem_id = link.rem_id.clone();
                        let mut recovered = link;
                        recovered.rem_id = candidate.id.0.clone();
                        recovered.rem_list_id = Some(candidate.list_id.0.clone());
                        recovered.rem_title_hash = Some(title_hash(&candidate.title));
                        recovered.rem_last_known_title = Some(candidate.title.clone());
                        recovered.stale_runs = 0;
                        diagnostics.push(DiagnosticV1::new(
                            "link_recovered",
                            "reminders identifier drifted; link rewritten via anchors",
                            serde_json::json!({
                                "obs_id": recovered.obs_id,
                                "old_rem_id": old_rem_id,
                                "new_rem_id": recovered.rem_id
                            }),
                        ));
                        outcomes.push(LinkOutcome::Recovered {
                            link: recovered,
                            old_rem_id,
                        });
                    }
                    None if link.stale_runs == 0 => {
                        let mut stale = link;
                        if advance_grace {
                            stale.stale_runs += 1;
                        }
                        diagnostics.push(DiagnosticV1::new(
                            "link_stale_rem_id",
                            "reminders task missing; link retained for a grace run",
                            serde_json::json!({
                                "obs_id": stale.obs_id,
                                "rem_id": stale.rem_id
                            }),
                        ));
                        outcomes.push(LinkOutcome::Stale(stale));
                    }
                    None => {
                        // Grace expired without recovery: the reminder is
                        // treated as deleted and the deletion propagates.
                        diagnostics.push(DiagnosticV1::new(
                            "link_retired_rem_missing",
                            "reminders task unrecovered past grace; link retired",
                            serde_json::json!({
                                "obs_id": link.obs_id,
                                "rem_id": link.rem_id
                            }),
                        ));
                        let tombstone = Some((Side::Obs, link.obs_id.clone()));
                        outcomes.push(LinkOutcome::Retired { link, tombstone });
                    }
                }
            }
        }
    }

    LinkNormalization {
        outcomes,
        diagnostics,
    }
}

/// Search residual reminders for the drifted counterpart: same list, same
/// title hash, and a unique candidate scoring at least
/// `RECOVERY_MIN_SCORE` against the still-present Obsidian task.
fn recover_drifted_link<'a>(
    link: &SyncLinkV1,
    obs_task: &ObsidianTask,
    rem_by_id: &BTreeMap<RemId, &'a RemindersTask>,
    linked_rem_ids: &std::collections::BTreeSet<String>,
    params: &MatcherParams,
) -> Option<&'a RemindersTask> {
    let (anchor_list, anchor_hash) = match (&link.rem_list_id, &link.rem_title_hash) {
        (Some(list), Some(hash)) => (list, hash),
        _ => return None,
    };

    let mut matched: Vec<&RemindersTask> = Vec::new();
    for task in rem_by_id.values() {
        if linked_rem_ids.contains(task.id.0.as_str()) {
            continue;
        }
        if &task.list_id.0 != anchor_list {
            continue;
        }
        if &title_hash(&task.title) != anchor_hash {
            continue;
        }
        if score_tasks(obs_task, task, params) >= RECOVERY_MIN_SCORE {
            matched.push(*task);
        }
    }
    if matched.len() == 1 {
        Some(matched[0])
    } else {
        None
    }
}
