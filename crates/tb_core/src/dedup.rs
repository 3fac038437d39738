use crate::hashing::short_digest;
use crate::models::{format_day, ObsidianTask, RemindersTask};
use crate::plan::Side;
use crate::text::normalize_description;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupMemberV1 {
    pub id: String,
    pub description: String,
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DedupClusterV1 {
    pub cluster_id: String,
    pub store: Side,
    pub normalized: String,
    pub members: Vec<DedupMemberV1>,
}

fn cluster_id(store: Side, normalized: &str) -> String {
    short_digest(format!("tb.dedup.v1\n{}\n{}", store.as_str(), normalized).as_bytes())
}

fn obs_member(task: &ObsidianTask) -> DedupMemberV1 {
    DedupMemberV1 {
        id: task.id.0.clone(),
        description: task.description.clone(),
        location: format!("{}:{}", task.file_path, task.line_number),
        due: task.due.as_ref().map(format_day),
        status: task.status.as_str().to_string(),
    }
}

fn rem_member(task: &RemindersTask) -> DedupMemberV1 {
    DedupMemberV1 {
        id: task.id.0.clone(),
        description: task.title.clone(),
        location: task.list_name.clone(),
        due: task.due.as_ref().map(format_day),
        status: task.status.as_str().to_string(),
    }
}

/// Within-store duplicate clusters keyed by normalized description. Tasks
/// participating in any link (existing or newly proposed) never enter a
/// cluster; they have a legitimate counterpart, not a duplicate.
pub fn find_duplicate_clusters(
    obs_tasks: &[ObsidianTask],
    rem_tasks: &[RemindersTask],
    linked_ids: &BTreeSet<String>,
) -> Vec<DedupClusterV1> {
    let mut clusters = Vec::new();

    let mut obs_groups: BTreeMap<String, Vec<DedupMemberV1>> = BTreeMap::new();
    for task in obs_tasks {
        if linked_ids.contains(&task.id.0) {
            continue;
        }
        let normalized = normalize_description(&task.description);
        if normalized.is_empty() {
            continue;
        }
        obs_groups.entry(normalized).or_default().push(obs_member(task));
    }
    for (normalized, mut members) in obs_groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| a.id.cmp(&b.id));
        clusters.push(DedupClusterV1 {
            cluster_id: cluster_id(Side::Obs, &normalized),
            store: Side::Obs,
            normalized,
            members,
        });
    }

    let mut rem_groups: BTreeMap<String, Vec<DedupMemberV1>> = BTreeMap::new();
    for task in rem_tasks {
        if linked_ids.contains(&task.id.0) {
            continue;
        }
        let normalized = normalize_description(&task.title);
        if normalized.is_empty() {
            continue;
        }
        rem_groups.entry(normalized).or_default().push(rem_member(task));
    }
    for (normalized, mut members) in rem_groups {
        if members.len() < 2 {
            continue;
        }
        members.sort_by(|a, b| a.id.cmp(&b.id));
        clusters.push(DedupClusterV1 {
            cluster_id: cluster_id(Side::Rem, &normalized),
            store: Side::Rem,
            normalized,
            members,
        });
    }

    clusters.sort_by(|a, b| (a.store, &a.normalized).cmp(&(b.store, &b.normalized)));
    clusters
}

/// Deterministic automatic disposition: keep each cluster's smallest
/// member id.
pub fn auto_decisions(clusters: &[DedupClusterV1]) -> BTreeMap<String, Vec<String>> {
    let mut decisions = BTreeMap::new();
    for cluster in clusters {
        if let Some(keep) = cluster.members.iter().map(|m| m.id.clone()).min() {
            decisions.insert(cluster.cluster_id.clone(), vec![keep]);
        }
    }
    decisions
}

/// Expand a decision vector into deletions of the non-kept members.
/// Clusters without a decision are left untouched.
pub fn dedup_deletes(
    clusters: &[DedupClusterV1],
    decisions: &BTreeMap<String, Vec<String>>,
) -> Vec<(Side, String)> {
    let mut deletes = Vec::new();
    for cluster in clusters {
        let Some(kept) = decisions.get(&cluster.cluster_id) else {
            continue;
        };
        for member in &cluster.members {
            if !kept.contains(&member.id) {
                deletes.push((cluster.store, member.id.clone()));
            }
        }
    }
    deletes.sort();
    deletes
}
