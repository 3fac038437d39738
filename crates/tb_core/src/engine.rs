use crate::app_error::AppResult;
use crate::config::SyncConfigV2;
use crate::dedup::{auto_decisions, dedup_deletes, find_duplicate_clusters, DedupClusterV1};
use crate::links::{
    load_links, normalize_links, persist_links, score_to_milli, LinkOutcome, SyncLinkV1,
};
use crate::lock::acquire_link_lock;
use crate::matcher::{match_residuals, MatcherParams};
use crate::models::{format_day, ObsidianTask, RemindersTask, TaskStatus};
use crate::plan::{
    CreateObsOpV1, CreateRemOpV1, DeleteOpV1, DiagnosticV1, DueChangeV1, NewTaskFieldsV1,
    PriorityChangeV1, Side, SyncPlanV1, TaskChangesV1, UpdateOpV1, validate_plan,
};
use crate::resolver::{resolve_pair, FieldValue, SyncField};
use crate::routes::{expand_query_lists, route_obs_create, route_rem_create};
use crate::store_traits::{ObsidianStore, RemindersGateway};
use crate::text::{normalize_description, tag_set, title_hash};
use crate::types::{ListId, ObsId, RemId, VaultId};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

pub const FROM_REMINDERS_TAG: &str = "#from-reminders";
pub const CREATED_FROM_OBSIDIAN_NOTE: &str = "Created from Obsidian";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Direction {
    Both,
    ObsToRem,
    RemToObs,
}

impl Direction {
    pub fn allows_obs_mutation(&self) -> bool {
        matches!(self, Direction::Both | Direction::RemToObs)
    }

    pub fn allows_rem_mutation(&self) -> bool {
        matches!(self, Direction::Both | Direction::ObsToRem)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Both => "both",
            Direction::ObsToRem => "obs-to-rem",
            Direction::RemToObs => "rem-to-obs",
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SyncOptions {
    pub apply: bool,
    pub direction: Option<Direction>,
    pub list_ids: Option<Vec<ListId>>,
    pub no_dedup: bool,
    pub dedup_auto_apply: bool,
    pub dedup_decisions: BTreeMap<String, Vec<String>>,
    pub cancel: Option<Arc<AtomicBool>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReportCountsV1 {
    pub updates_obs: usize,
    pub updates_rem: usize,
    pub creates_obs: usize,
    pub creates_rem: usize,
    pub deletes_obs: usize,
    pub deletes_rem: usize,
    pub dedup_clusters: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ApplyFailureV1 {
    pub op: String,
    pub store: Side,
    pub id: String,
    pub error_code: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncReportV1 {
    pub schema_version: u32,
    pub vault_id: String,
    pub generated_at_ms: i64,
    pub dry_run: bool,
    pub direction: Direction,
    pub queried_lists: Vec<String>,
    pub obs_tasks: usize,
    pub rem_tasks: usize,
    pub links_total: usize,
    pub links_created: usize,
    pub links_recovered: usize,
    pub links_retired: usize,
    pub counts: ReportCountsV1,
    pub plan: SyncPlanV1,
    pub dedup_clusters: Vec<DedupClusterV1>,
    pub failures: Vec<ApplyFailureV1>,
    pub diagnostics: Vec<DiagnosticV1>,
    pub partial: bool,
    pub cancelled: bool,
    pub links_persisted: bool,
}

fn iso_from_ms(now_ms: i64) -> String {
    DateTime::from_timestamp_millis(now_ms)
        .unwrap_or_default()
        .to_rfc3339_opts(SecondsFormat::Secs, true)
}

fn is_cancelled(options: &SyncOptions) -> bool {
    options
        .cancel
        .as_ref()
        .map(|flag| flag.load(Ordering::SeqCst))
        .unwrap_or(false)
}

fn new_task_fields_from_obs(task: &ObsidianTask) -> NewTaskFieldsV1 {
    NewTaskFieldsV1 {
        description: task.description.clone(),
        status: task.status,
        due: task.due.as_ref().map(format_day),
        priority: task.priority,
        tags: task.tags.clone(),
        notes: Some(CREATED_FROM_OBSIDIAN_NOTE.to_string()),
    }
}

fn new_task_fields_from_rem(task: &RemindersTask) -> NewTaskFieldsV1 {
    let mut tags = task.tags.clone();
    if !tags.iter().any(|tag| tag == FROM_REMINDERS_TAG) {
        tags.push(FROM_REMINDERS_TAG.to_string());
    }
    NewTaskFieldsV1 {
        description: task.title.clone(),
        status: task.status,
        due: task.due.as_ref().map(format_day),
        priority: task.priority,
        tags,
        notes: task.notes.clone(),
    }
}

/// Translate one resolved field into per-side change sets: a side is
/// updated only when its current value differs from the resolved value
/// and the direction filter allows mutating that side.
fn apply_resolution_to_changes(
    field: &SyncField,
    value: &FieldValue,
    obs: &ObsidianTask,
    rem: &RemindersTask,
    direction: Direction,
    obs_changes: &mut TaskChangesV1,
    rem_changes: &mut TaskChangesV1,
) {
    match (field, value) {
        (SyncField::Description, FieldValue::Text(text)) => {
            if direction.allows_obs_mutation() && obs.description.trim() != text.trim() {
                obs_changes.description = Some(text.clone());
            }
            if direction.allows_rem_mutation() && rem.title.trim() != text.trim() {
                rem_changes.description = Some(text.clone());
            }
        }
        (SyncField::Status, FieldValue::Status(status)) => {
            if direction.allows_obs_mutation() && obs.status != *status {
                obs_changes.status = Some(*status);
            }
            if direction.allows_rem_mutation() && rem.status != *status {
                rem_changes.status = Some(*status);
            }
        }
        (SyncField::Due, FieldValue::Due(due)) => {
            let encoded = DueChangeV1 {
                value: due.as_ref().map(format_day),
            };
            if direction.allows_obs_mutation() && obs.due != *due {
                obs_changes.due = Some(encoded.clone());
            }
            if direction.allows_rem_mutation() && rem.due != *due {
                rem_changes.due = Some(encoded);
            }
        }
        (SyncField::Priority, FieldValue::Priority(priority)) => {
            let encoded = PriorityChangeV1 { value: *priority };
            if direction.allows_obs_mutation() && obs.priority != *priority {
                obs_changes.priority = Some(encoded.clone());
            }
            if direction.allows_rem_mutation() && rem.priority != *priority {
                rem_changes.priority = Some(encoded);
            }
        }
        (SyncField::Tags, FieldValue::Tags(tags)) => {
            let resolved = tag_set(tags);
            if direction.allows_obs_mutation() && tag_set(&obs.tags) != resolved {
                obs_changes.tags = Some(tags.clone());
            }
            if direction.allows_rem_mutation() && tag_set(&rem.tags) != resolved {
                rem_changes.tags = Some(tags.clone());
            }
        }
        _ => {}
    }
}

fn cancelled_report(
    vault_id: &VaultId,
    now_ms: i64,
    options: &SyncOptions,
    direction: Direction,
    queried_lists: &[ListId],
) -> SyncReportV1 {
    SyncReportV1 {
        schema_version: 1,
        vault_id: vault_id.0.clone(),
        generated_at_ms: now_ms,
        dry_run: !options.apply,
        direction,
        queried_lists: queried_lists.iter().map(|l| l.0.clone()).collect(),
        obs_tasks: 0,
        rem_tasks: 0,
        links_total: 0,
        links_created: 0,
        links_recovered: 0,
        links_retired: 0,
        counts: ReportCountsV1::default(),
        plan: SyncPlanV1::new(&vault_id.0, now_ms),
        dedup_clusters: Vec::new(),
        failures: Vec::new(),
        diagnostics: vec![DiagnosticV1::new(
            "run_cancelled",
            "cancellation requested; plan discarded and links untouched",
            serde_json::json!({}),
        )],
        partial: false,
        cancelled: true,
        links_persisted: false,
    }
}

/// One full sync run: collect, normalize links, match, resolve, plan,
/// optionally apply, persist links. Holding the advisory link lock spans
/// the whole call.
pub fn run_sync(
    obs_store: &mut dyn ObsidianStore,
    gateway: &mut dyn RemindersGateway,
    config: &SyncConfigV2,
    links_path: &Path,
    vault_id: &VaultId,
    options: &SyncOptions,
    now_ms: i64,
) -> AppResult<SyncReportV1> {
    let _lock = acquire_link_lock(links_path)?;
    let now_iso = iso_from_ms(now_ms);
    let direction = options.direction.unwrap_or(Direction::Both);
    let params = MatcherParams {
        min_score: config.min_score(),
        days_tolerance: config.days_tolerance,
        ..MatcherParams::default()
    };

    // Collect. The query set must cover every routed list or tasks
    // routed on the previous run look deleted.
    let queried_lists = match &options.list_ids {
        Some(explicit) => explicit.clone(),
        None => expand_query_lists(vault_id, &config.vault_mappings, &config.tag_routes),
    };
    if is_cancelled(options) {
        return Ok(cancelled_report(
            vault_id,
            now_ms,
            options,
            direction,
            &queried_lists,
        ));
    }
    let rem_tasks = gateway.list_reminders(&queried_lists)?;
    let obs_tasks = obs_store.list_tasks(vault_id)?;

    let obs_by_id: BTreeMap<ObsId, &ObsidianTask> =
        obs_tasks.iter().map(|t| (t.id.clone(), t)).collect();
    let rem_by_id: BTreeMap<RemId, &RemindersTask> =
        rem_tasks.iter().map(|t| (t.id.clone(), t)).collect();

    let stored_links = load_links(links_path)?;
    let normalization = normalize_links(
        stored_links,
        &obs_by_id,
        &rem_by_id,
        &params,
        options.apply,
    );
    let mut diagnostics = normalization.diagnostics;

    let mut carry_links: Vec<SyncLinkV1> = Vec::new();
    let mut resolvable_links: Vec<SyncLinkV1> = Vec::new();
    let mut stale_links: Vec<SyncLinkV1> = Vec::new();
    let mut retired_links: Vec<SyncLinkV1> = Vec::new();
    let mut tombstones: Vec<(Side, String)> = Vec::new();
    let mut links_recovered = 0usize;
    for outcome in normalization.outcomes {
        match outcome {
            LinkOutcome::Kept(link) => {
                resolvable_links.push(link.clone());
                carry_links.push(link);
            }
            LinkOutcome::Recovered { link, .. } => {
                links_recovered += 1;
                resolvable_links.push(link.clone());
                carry_links.push(link);
            }
            LinkOutcome::Stale(link) => {
                stale_links.push(link.clone());
                carry_links.push(link);
            }
            LinkOutcome::Retired { link, tombstone } => {
                if let Some(target) = tombstone {
                    tombstones.push(target);
                }
                retired_links.push(link);
            }
        }
    }
    let links_retired = retired_links.len();

    if is_cancelled(options) {
        return Ok(cancelled_report(
            vault_id,
            now_ms,
            options,
            direction,
            &queried_lists,
        ));
    }

    // Partition. Tombstoned tasks are neither matched nor re-created.
    let mut claimed_obs: BTreeSet<String> = carry_links.iter().map(|l| l.obs_id.clone()).collect();
    let mut claimed_rem: BTreeSet<String> = carry_links.iter().map(|l| l.rem_id.clone()).collect();
    for (side, id) in &tombstones {
        match side {
            Side::Obs => {
                claimed_obs.insert(id.clone());
            }
            Side::Rem => {
                claimed_rem.insert(id.clone());
            }
        }
    }

    let obs_residuals: Vec<&ObsidianTask> = obs_tasks
        .iter()
        .filter(|t| !claimed_obs.contains(&t.id.0))
        .collect();
    let rem_residuals: Vec<&RemindersTask> = rem_tasks
        .iter()
        .filter(|t| !claimed_rem.contains(&t.id.0))
        .collect();

    // Match residuals. Completed tasks participate so status flips on
    // one side still pair up.
    let proposals = match_residuals(&obs_residuals, &rem_residuals, &params);
    let mut proposed_links: Vec<SyncLinkV1> = Vec::new();
    for proposal in &proposals {
        let Some(rem_task) = rem_by_id.get(&proposal.rem_id) else {
            continue;
        };
        proposed_links.push(SyncLinkV1 {
            obs_id: proposal.obs_id.0.clone(),
            rem_id: proposal.rem_id.0.clone(),
            score_milli: score_to_milli(proposal.score),
            created_at: now_iso.clone(),
            last_synced: None,
            rem_list_id: Some(rem_task.list_id.0.clone()),
            rem_title_hash: Some(title_hash(&rem_task.title)),
            rem_last_known_title: Some(rem_task.title.clone()),
            stale_runs: 0,
        });
    }
    let matched_obs: BTreeSet<String> = proposed_links.iter().map(|l| l.obs_id.clone()).collect();
    let matched_rem: BTreeSet<String> = proposed_links.iter().map(|l| l.rem_id.clone()).collect();

    let mut plan = SyncPlanV1::new(&vault_id.0, now_ms);
    let mut pair_links: Vec<SyncLinkV1> = resolvable_links.clone();
    pair_links.extend(proposed_links.iter().cloned());
    for link in &pair_links {
        let obs_task = match obs_by_id.get(&ObsId(link.obs_id.clone())) {
            Some(task) => *task,
            None => continue,
        };
        let rem_task = match rem_by_id.get(&RemId(link.rem_id.clone())) {
            Some(task) => *task,
            None => continue,
        };
        let outcome = resolve_pair(obs_task, rem_task);
        diagnostics.extend(outcome.diagnostics);
        let mut obs_changes = TaskChangesV1::default();
        let mut rem_changes = TaskChangesV1::default();
        for resolution in &outcome.fields {
            apply_resolution_to_changes(
                &resolution.field,
                &resolution.value,
                obs_task,
                rem_task,
                direction,
                &mut obs_changes,
                &mut rem_changes,
            );
        }
        if !obs_changes.is_empty() {
            plan.updates.push(UpdateOpV1 {
                store: Side::Obs,
                id: link.obs_id.clone(),
                changes: obs_changes,
            });
        }
        if !rem_changes.is_empty() {
            plan.updates.push(UpdateOpV1 {
                store: Side::Rem,
                id: link.rem_id.clone(),
                changes: rem_changes,
            });
        }
    }

    // Dedup safety for creates: a residual whose normalized description
    // matches a linked task would only mint a duplicate.
    let mut linked_norms: BTreeSet<String> = BTreeSet::new();
    for link in pair_links.iter().chain(stale_links.iter()) {
        if let Some(task) = obs_by_id.get(&ObsId(link.obs_id.clone())) {
            linked_norms.insert(normalize_description(&task.description));
        }
        if let Some(task) = rem_by_id.get(&RemId(link.rem_id.clone())) {
            linked_norms.insert(normalize_description(&task.title));
        }
    }

    let known_lists = config.known_list_ids();
    if direction.allows_rem_mutation() {
        for task in obs_residuals
            .iter()
            .filter(|t| !matched_obs.contains(&t.id.0))
        {
            if task.status == TaskStatus::Done {
                continue;
            }
            if linked_norms.contains(&normalize_description(&task.description)) {
                diagnostics.push(DiagnosticV1::new(
                    "create_suppressed_duplicate",
                    "reminders create suppressed: description collides with a linked task",
                    serde_json::json!({ "obs_id": task.id.0 }),
                ));
                continue;
            }
            match route_obs_create(
                vault_id,
                &task.tags,
                &config.tag_routes,
                &config.vault_mappings,
                &known_lists,
            ) {
                Ok(list_id) => plan.creates_rem.push(CreateRemOpV1 {
                    obs_id: task.id.0.clone(),
                    list_id: list_id.0,
                    fields: new_task_fields_from_obs(task),
                }),
                Err(e) => diagnostics.push(DiagnosticV1::new(
                    &e.code,
                    "reminders create refused by routing",
                    serde_json::json!({ "obs_id": task.id.0, "cause": e.message }),
                )),
            }
        }
    }
    if direction.allows_obs_mutation() {
        for task in rem_residuals
            .iter()
            .filter(|t| !matched_rem.contains(&t.id.0))
        {
            if task.status == TaskStatus::Done {
                continue;
            }
            if linked_norms.contains(&normalize_description(&task.title)) {
                diagnostics.push(DiagnosticV1::new(
                    "create_suppressed_duplicate",
                    "obsidian create suppressed: description collides with a linked task",
                    serde_json::json!({ "rem_id": task.id.0 }),
                ));
                continue;
            }
            let (target_file, heading) =
                route_rem_create(&task.list_id, &config.list_routes, &config.inbox_file);
            plan.creates_obs.push(CreateObsOpV1 {
                rem_id: task.id.0.clone(),
                target_file,
                heading,
                fields: new_task_fields_from_rem(task),
            });
        }
    }

    // Tombstone deletions: the disappearance of one side propagates to
    // the survivor instead of resurrecting the pair.
    for (side, id) in &tombstones {
        let allowed = match side {
            Side::Obs => direction.allows_obs_mutation(),
            Side::Rem => direction.allows_rem_mutation(),
        };
        if allowed {
            plan.deletes.push(DeleteOpV1 {
                store: *side,
                id: id.clone(),
                reason: "tombstone".to_string(),
            });
        }
    }

    let mut dedup_clusters: Vec<DedupClusterV1> = Vec::new();
    if config.enable_deduplication && !options.no_dedup {
        let mut excluded: BTreeSet<String> = claimed_obs.clone();
        excluded.extend(claimed_rem.iter().cloned());
        excluded.extend(matched_obs.iter().cloned());
        excluded.extend(matched_rem.iter().cloned());
        dedup_clusters = find_duplicate_clusters(&obs_tasks, &rem_tasks, &excluded);
        let decisions = if !options.dedup_decisions.is_empty() {
            options.dedup_decisions.clone()
        } else if options.dedup_auto_apply || config.dedup_auto_apply {
            auto_decisions(&dedup_clusters)
        } else {
            BTreeMap::new()
        };
        for (side, id) in dedup_deletes(&dedup_clusters, &decisions) {
            let allowed = match side {
                Side::Obs => direction.allows_obs_mutation(),
                Side::Rem => direction.allows_rem_mutation(),
            };
            if allowed {
                plan.deletes.push(DeleteOpV1 {
                    store: side,
                    id,
                    reason: "dedup".to_string(),
                });
            }
        }
    }

    plan.sort();

    // The 1:1 invariant is checked before anything is applied or
    // persisted.
    let mut all_links: Vec<SyncLinkV1> = carry_links.clone();
    all_links.extend(proposed_links.iter().cloned());
    validate_plan(&plan, &all_links)?;

    if is_cancelled(options) {
        return Ok(cancelled_report(
            vault_id,
            now_ms,
            options,
            direction,
            &queried_lists,
        ));
    }

    // Apply, best effort per op.
    let mut failures: Vec<ApplyFailureV1> = Vec::new();
    let mut created_links: Vec<SyncLinkV1> = Vec::new();
    let mut failed_ids: BTreeSet<String> = BTreeSet::new();
    let mut missing_create_id = false;

    if options.apply {
        for op in &plan.updates {
            let result = match op.store {
                Side::Obs => match obs_by_id.get(&ObsId(op.id.clone())) {
                    Some(task) => obs_store.update_task(task, &op.changes),
                    None => Err(crate::app_error::AppError::internal(
                        "update target missing from snapshot",
                    )),
                },
                Side::Rem => gateway.update_reminder(&RemId(op.id.clone()), &op.changes),
            };
            if let Err(e) = result {
                failed_ids.insert(op.id.clone());
                failures.push(ApplyFailureV1 {
                    op: "update".to_string(),
                    store: op.store,
                    id: op.id.clone(),
                    error_code: e.code,
                    message: e.message,
                });
            }
        }

        for op in &plan.creates_obs {
            match obs_store.create_task(
                vault_id,
                &op.target_file,
                op.heading.as_deref(),
                &op.fields,
            ) {
                Ok(created) => {
                    let rem_task = rem_by_id.get(&RemId(op.rem_id.clone()));
                    created_links.push(SyncLinkV1 {
                        obs_id: created.id.0.clone(),
                        rem_id: op.rem_id.clone(),
                        score_milli: 1000,
                        created_at: now_iso.clone(),
                        last_synced: Some(now_iso.clone()),
                        rem_list_id: rem_task.map(|t| t.list_id.0.clone()),
                        rem_title_hash: rem_task.map(|t| title_hash(&t.title)),
                        rem_last_known_title: rem_task.map(|t| t.title.clone()),
                        stale_runs: 0,
                    });
                }
                Err(e) => failures.push(ApplyFailureV1 {
                    op: "create".to_string(),
                    store: Side::Obs,
                    id: op.rem_id.clone(),
                    error_code: e.code,
                    message: e.message,
                }),
            }
        }

        for op in &plan.creates_rem {
            match gateway.create_reminder(&ListId(op.list_id.clone()), &op.fields) {
                Ok(rem_id) if rem_id.0.is_empty() => {
                    missing_create_id = true;
                    diagnostics.push(DiagnosticV1::new(
                        "create_returned_no_id",
                        "gateway create succeeded without an id; links not persisted",
                        serde_json::json!({ "obs_id": op.obs_id }),
                    ));
                }
                Ok(rem_id) => created_links.push(SyncLinkV1 {
                    obs_id: op.obs_id.clone(),
                    rem_id: rem_id.0,
                    score_milli: 1000,
                    created_at: now_iso.clone(),
                    last_synced: Some(now_iso.clone()),
                    rem_list_id: Some(op.list_id.clone()),
                    rem_title_hash: Some(title_hash(&op.fields.description)),
                    rem_last_known_title: Some(op.fields.description.clone()),
                    stale_runs: 0,
                }),
                Err(e) => failures.push(ApplyFailureV1 {
                    op: "create".to_string(),
                    store: Side::Rem,
                    id: op.obs_id.clone(),
                    error_code: e.code,
                    message: e.message,
                }),
            }
        }

        for op in &plan.deletes {
            let result = match op.store {
                Side::Obs => match obs_by_id.get(&ObsId(op.id.clone())) {
                    Some(task) => obs_store.delete_task(task),
                    None => Err(crate::app_error::AppError::internal(
                        "delete target missing from snapshot",
                    )),
                },
                Side::Rem => gateway.delete_reminder(&RemId(op.id.clone())),
            };
            if let Err(e) = result {
                failed_ids.insert(op.id.clone());
                failures.push(ApplyFailureV1 {
                    op: "delete".to_string(),
                    store: op.store,
                    id: op.id.clone(),
                    error_code: e.code,
                    message: e.message,
                });
            }
        }
    }

    let mut final_links: Vec<SyncLinkV1> = Vec::new();
    if options.apply {
        for mut link in carry_links {
            let clean = !failed_ids.contains(&link.obs_id) && !failed_ids.contains(&link.rem_id);
            if clean && rem_by_id.contains_key(&RemId(link.rem_id.clone())) {
                link.last_synced = Some(now_iso.clone());
            }
            final_links.push(link);
        }
        for mut link in proposed_links.clone() {
            let clean = !failed_ids.contains(&link.obs_id) && !failed_ids.contains(&link.rem_id);
            if clean {
                link.last_synced = Some(now_iso.clone());
            }
            final_links.push(link);
        }
        final_links.extend(created_links.iter().cloned());
    } else {
        final_links.extend(carry_links.iter().cloned());
        final_links.extend(retired_links.iter().cloned());
        final_links.extend(proposed_links.iter().cloned());
    }

    let links_persisted = if missing_create_id {
        diagnostics.push(DiagnosticV1::new(
            "links_not_persisted",
            "a create returned no id; keeping the previous link set",
            serde_json::json!({}),
        ));
        false
    } else {
        persist_links(links_path, &final_links)?
    };

    let partial = !failures.is_empty() || missing_create_id;

    let counts = ReportCountsV1 {
        updates_obs: plan
            .updates
            .iter()
            .filter(|op| op.store == Side::Obs)
            .count(),
        updates_rem: plan
            .updates
            .iter()
            .filter(|op| op.store == Side::Rem)
            .count(),
        creates_obs: plan.creates_obs.len(),
        creates_rem: plan.creates_rem.len(),
        deletes_obs: plan
            .deletes
            .iter()
            .filter(|op| op.store == Side::Obs)
            .count(),
        deletes_rem: plan
            .deletes
            .iter()
            .filter(|op| op.store == Side::Rem)
            .count(),
        dedup_clusters: dedup_clusters.len(),
    };

    let (obs_visible, rem_visible) = if config.include_completed {
        (obs_tasks.len(), rem_tasks.len())
    } else {
        (
            obs_tasks
                .iter()
                .filter(|t| t.status != TaskStatus::Done)
                .count(),
            rem_tasks
                .iter()
                .filter(|t| t.status != TaskStatus::Done)
                .count(),
        )
    };

    Ok(SyncReportV1 {
        schema_version: 1,
        vault_id: vault_id.0.clone(),
        generated_at_ms: now_ms,
        dry_run: !options.apply,
        direction,
        queried_lists: queried_lists.iter().map(|l| l.0.clone()).collect(),
        obs_tasks: obs_visible,
        rem_tasks: rem_visible,
        links_total: final_links.len(),
        links_created: proposed_links.len() + created_links.len(),
        links_recovered,
        links_retired,
        counts,
        plan,
        dedup_clusters,
        failures,
        diagnostics,
        partial,
        cancelled: false,
        links_persisted,
    })
}
