use chrono::{TimeZone, Utc};
use tb_core::models::{ObsidianTask, RemindersTask, TaskStatus, Timestamp};
use tb_core::plan::Side;
use tb_core::resolver::{resolve_pair, FieldValue, SyncField};
use tb_core::types::{ListId, ObsId, RemId, VaultId};

fn obs_task(description: &str, status: TaskStatus, modified_at: Timestamp) -> ObsidianTask {
    ObsidianTask {
        id: ObsId("o1".to_string()),
        vault_id: VaultId("vault-1".to_string()),
        file_path: "tasks.md".to_string(),
        line_number: 3,
        block_id: Some("o1".to_string()),
        status,
        description: description.to_string(),
        raw_line: format!("- [ ] {description}"),
        due: None,
        completion_date: None,
        priority: None,
        tags: Vec::new(),
        notes: None,
        created_at: Timestamp::Absent,
        modified_at,
    }
}

fn rem_task(title: &str, status: TaskStatus, modified_at: Timestamp) -> RemindersTask {
    RemindersTask {
        id: RemId("r1".to_string()),
        list_id: ListId("L-default".to_string()),
        list_name: "Default".to_string(),
        status,
        title: title.to_string(),
        due: None,
        priority: None,
        notes: None,
        tags: Vec::new(),
        created_at: Timestamp::Absent,
        modified_at,
    }
}

fn native(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> Timestamp {
    Timestamp::Native(Utc.with_ymd_and_hms(y, mo, d, h, mi, 0).unwrap())
}

#[test]
fn reminders_completion_wins_with_later_native_timestamp() {
    // The string side parses, the native side is a datetime value; the
    // native one is one hour later and must take the status field.
    let obs = obs_task(
        "Ship the report",
        TaskStatus::Todo,
        Timestamp::Iso("2025-01-08T10:00:00Z".to_string()),
    );
    let rem = rem_task("Ship the report", TaskStatus::Done, native(2025, 1, 8, 11, 0));

    let outcome = resolve_pair(&obs, &rem);
    assert_eq!(outcome.fields.len(), 1);
    let resolution = &outcome.fields[0];
    assert_eq!(resolution.field, SyncField::Status);
    assert_eq!(resolution.winner, Side::Rem);
    assert_eq!(resolution.value, FieldValue::Status(TaskStatus::Done));
}

#[test]
fn equal_timestamps_fall_back_to_obsidian() {
    let obs = obs_task(
        "Water plants",
        TaskStatus::Todo,
        Timestamp::Iso("2025-01-08T10:00:00Z".to_string()),
    );
    let rem = rem_task("Water plants", TaskStatus::Done, native(2025, 1, 8, 10, 0));

    let outcome = resolve_pair(&obs, &rem);
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].winner, Side::Obs);
    assert_eq!(outcome.fields[0].value, FieldValue::Status(TaskStatus::Todo));
}

#[test]
fn unparseable_obsidian_timestamp_is_absent_not_earlier() {
    let obs = obs_task(
        "Review budget",
        TaskStatus::Todo,
        Timestamp::Iso("last tuesday".to_string()),
    );
    let rem = rem_task("Review budget", TaskStatus::Done, native(2025, 1, 8, 11, 0));

    let outcome = resolve_pair(&obs, &rem);
    assert!(outcome
        .diagnostics
        .iter()
        .any(|d| d.code == "timestamp_unparseable"));
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].winner, Side::Rem);
}

#[test]
fn both_timestamps_missing_keeps_obsidian_content() {
    let obs = obs_task("Plan the trip", TaskStatus::Todo, Timestamp::Absent);
    let mut rem = rem_task("Plan the holiday trip", TaskStatus::Todo, Timestamp::Absent);
    rem.title = "Plan the holiday trip".to_string();

    let outcome = resolve_pair(&obs, &rem);
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].field, SyncField::Description);
    assert_eq!(outcome.fields[0].winner, Side::Obs);
    assert_eq!(
        outcome.fields[0].value,
        FieldValue::Text("Plan the trip".to_string())
    );
}

#[test]
fn parallel_tag_edits_resolve_by_union() {
    let mut obs = obs_task("Refactor parser", TaskStatus::Todo, Timestamp::Absent);
    obs.tags = vec!["#work".to_string(), "#rust".to_string()];
    let mut rem = rem_task("Refactor parser", TaskStatus::Todo, Timestamp::Absent);
    rem.tags = vec!["#rust".to_string(), "#urgent".to_string()];

    let outcome = resolve_pair(&obs, &rem);
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].field, SyncField::Tags);
    assert_eq!(
        outcome.fields[0].value,
        FieldValue::Tags(vec![
            "#work".to_string(),
            "#rust".to_string(),
            "#urgent".to_string()
        ])
    );
}

#[test]
fn one_sided_tags_follow_the_timestamp_rule() {
    let obs = obs_task("Weekly review", TaskStatus::Todo, Timestamp::Absent);
    let mut rem = rem_task("Weekly review", TaskStatus::Todo, Timestamp::Absent);
    rem.tags = vec!["#gtd".to_string()];

    // No winner evidence: Obsidian's (empty) tag set stands.
    let outcome = resolve_pair(&obs, &rem);
    assert_eq!(outcome.fields.len(), 1);
    assert_eq!(outcome.fields[0].winner, Side::Obs);
    assert_eq!(outcome.fields[0].value, FieldValue::Tags(Vec::new()));
}

#[test]
fn identical_pair_resolves_clean() {
    let obs = obs_task(
        "Buy milk",
        TaskStatus::Todo,
        Timestamp::Iso("2025-01-08T10:00:00Z".to_string()),
    );
    let rem = rem_task("Buy milk", TaskStatus::Todo, native(2025, 1, 9, 9, 0));
    let outcome = resolve_pair(&obs, &rem);
    assert!(outcome.is_clean());
}
