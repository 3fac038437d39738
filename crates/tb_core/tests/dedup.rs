use std::collections::BTreeSet;
use tb_core::dedup::{auto_decisions, dedup_deletes, find_duplicate_clusters};
use tb_core::models::{ObsidianTask, RemindersTask, TaskStatus, Timestamp};
use tb_core::plan::Side;
use tb_core::text::normalize_description;
use tb_core::types::{ListId, ObsId, RemId, VaultId};

fn obs_task(id: &str, description: &str) -> ObsidianTask {
    ObsidianTask {
        id: ObsId(id.to_string()),
        vault_id: VaultId("vault-1".to_string()),
        file_path: "daily.md".to_string(),
        line_number: 7,
        block_id: Some(id.to_string()),
        status: TaskStatus::Todo,
        description: description.to_string(),
        raw_line: format!("- [ ] {description}"),
        due: None,
        completion_date: None,
        priority: None,
        tags: Vec::new(),
        notes: None,
        created_at: Timestamp::Absent,
        modified_at: Timestamp::Absent,
    }
}

fn rem_task(id: &str, title: &str) -> RemindersTask {
    RemindersTask {
        id: RemId(id.to_string()),
        list_id: ListId("L-default".to_string()),
        list_name: "Default".to_string(),
        status: TaskStatus::Todo,
        title: title.to_string(),
        due: None,
        priority: None,
        notes: None,
        tags: Vec::new(),
        created_at: Timestamp::Absent,
        modified_at: Timestamp::Absent,
    }
}

#[test]
fn normalizer_contract_checkbox_case_and_whitespace() {
    assert_eq!(normalize_description("- [x]  Call   Alice "), "call alice");
    assert_eq!(normalize_description("* [ ] Call Alice"), "call alice");
    assert_eq!(normalize_description("CALL ALICE"), "call alice");
    // Punctuation is significant: these are not duplicates.
    assert_ne!(
        normalize_description("call alice!"),
        normalize_description("call alice")
    );
}

#[test]
fn linked_tasks_never_appear_in_clusters() {
    let linked = obs_task("o5a", "Call Alice");
    let dup_b = obs_task("o5b", "Call Alice");
    let dup_c = obs_task("o5c", "call   alice");
    let excluded: BTreeSet<String> = ["o5a".to_string()].into_iter().collect();

    let clusters = find_duplicate_clusters(&[linked, dup_b, dup_c], &[], &excluded);
    assert_eq!(clusters.len(), 1);
    let member_ids: Vec<&str> = clusters[0].members.iter().map(|m| m.id.as_str()).collect();
    assert_eq!(member_ids, vec!["o5b", "o5c"]);
}

#[test]
fn clusters_are_scoped_to_one_store() {
    let clusters = find_duplicate_clusters(
        &[obs_task("o1", "Pay rent"), obs_task("o2", "Pay rent")],
        &[rem_task("r1", "Pay rent"), rem_task("r2", "Pay rent")],
        &BTreeSet::new(),
    );
    assert_eq!(clusters.len(), 2);
    assert_eq!(clusters[0].store, Side::Obs);
    assert_eq!(clusters[1].store, Side::Rem);
    for cluster in &clusters {
        assert_eq!(cluster.members.len(), 2);
        assert_eq!(cluster.normalized, "pay rent");
    }
}

#[test]
fn singleton_groups_are_not_reported() {
    let clusters = find_duplicate_clusters(
        &[obs_task("o1", "Pay rent"), obs_task("o2", "Buy milk")],
        &[],
        &BTreeSet::new(),
    );
    assert!(clusters.is_empty());
}

#[test]
fn auto_decisions_keep_the_smallest_id_and_delete_the_rest() {
    let clusters = find_duplicate_clusters(
        &[
            obs_task("o-c", "Water plants"),
            obs_task("o-a", "Water plants"),
            obs_task("o-b", "Water plants"),
        ],
        &[],
        &BTreeSet::new(),
    );
    let decisions = auto_decisions(&clusters);
    let deletes = dedup_deletes(&clusters, &decisions);
    assert_eq!(
        deletes,
        vec![
            (Side::Obs, "o-b".to_string()),
            (Side::Obs, "o-c".to_string()),
        ]
    );
}

#[test]
fn clusters_without_a_decision_emit_no_deletes() {
    let clusters = find_duplicate_clusters(
        &[obs_task("o1", "Pay rent"), obs_task("o2", "Pay rent")],
        &[],
        &BTreeSet::new(),
    );
    let deletes = dedup_deletes(&clusters, &std::collections::BTreeMap::new());
    assert!(deletes.is_empty());
}
