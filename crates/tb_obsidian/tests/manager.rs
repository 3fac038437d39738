use std::fs;
use std::path::Path;
use tb_core::models::TaskStatus;
use tb_core::plan::{DueChangeV1, NewTaskFieldsV1, TaskChangesV1};
use tb_core::store_traits::ObsidianStore;
use tb_core::types::VaultId;
use tb_obsidian::VaultManager;

fn vault_id() -> VaultId {
    VaultId("vault-1".to_string())
}

fn manager(root: &Path) -> VaultManager {
    VaultManager::new(vault_id(), root.to_path_buf())
}

#[test]
fn listing_assigns_missing_block_ids_and_writes_them_back() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("daily.md"),
        "# Today\n- [ ] Buy milk\n- [x] Water plants ^seed42\n",
    )
    .expect("write fixture");

    let mut store = manager(dir.path());
    let tasks = store.list_tasks(&vault_id()).expect("list tasks");
    assert_eq!(tasks.len(), 2);
    for task in &tasks {
        assert!(task.block_id.is_some(), "every task gets a block id");
        assert!(!task.id.0.is_empty());
    }

    // The assigned id must now be anchored in the file itself.
    let rewritten = fs::read_to_string(dir.path().join("daily.md")).expect("read back");
    let first_task_line = rewritten
        .lines()
        .find(|line| line.contains("Buy milk"))
        .expect("task line present");
    assert!(first_task_line.contains('^'), "line: {first_task_line}");

    // A second listing is stable.
    let again = store.list_tasks(&vault_id()).expect("list again");
    assert_eq!(
        tasks.iter().map(|t| t.id.clone()).collect::<Vec<_>>(),
        again.iter().map(|t| t.id.clone()).collect::<Vec<_>>()
    );
}

#[test]
fn dot_directories_are_not_scanned() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::create_dir_all(dir.path().join(".obsidian")).expect("mkdir");
    fs::write(
        dir.path().join(".obsidian/cache.md"),
        "- [ ] Not a real task\n",
    )
    .expect("write cache");
    fs::write(dir.path().join("real.md"), "- [ ] Real task ^a1\n").expect("write real");

    let mut store = manager(dir.path());
    let tasks = store.list_tasks(&vault_id()).expect("list tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].description, "Real task");
}

#[test]
fn update_rewrites_the_located_line_in_place() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("tasks.md"),
        "- [ ] Review budget 📅 2025-01-10 #work ^bb11\n- [ ] Unrelated ^cc22\n",
    )
    .expect("write fixture");

    let mut store = manager(dir.path());
    let tasks = store.list_tasks(&vault_id()).expect("list tasks");
    let target = tasks
        .iter()
        .find(|t| t.description == "Review budget")
        .expect("target task");

    let changes = TaskChangesV1 {
        status: Some(TaskStatus::Done),
        due: Some(DueChangeV1 {
            value: Some("2025-01-12".to_string()),
        }),
        ..TaskChangesV1::default()
    };
    store.update_task(target, &changes).expect("update");

    let content = fs::read_to_string(dir.path().join("tasks.md")).expect("read back");
    let line = content
        .lines()
        .find(|l| l.contains("Review budget"))
        .expect("line present");
    assert!(line.contains("[x]"), "line: {line}");
    assert!(line.contains("📅 2025-01-12"), "line: {line}");
    assert!(line.ends_with("^bb11"), "block id preserved: {line}");
    assert!(content.contains("- [ ] Unrelated ^cc22"));
}

#[test]
fn create_appends_under_the_requested_heading() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("inbox.md"),
        "# Inbox\n\n## Reminders\n\n## Other\n",
    )
    .expect("write fixture");

    let mut store = manager(dir.path());
    let fields = NewTaskFieldsV1 {
        description: "Imported task".to_string(),
        status: TaskStatus::Todo,
        due: Some("2025-03-01".to_string()),
        priority: None,
        tags: vec!["#from-reminders".to_string()],
        notes: None,
    };
    let created = store
        .create_task(&vault_id(), "inbox.md", Some("Reminders"), &fields)
        .expect("create");
    assert!(created.block_id.is_some());
    assert_eq!(created.file_path, "inbox.md");

    let content = fs::read_to_string(dir.path().join("inbox.md")).expect("read back");
    let lines: Vec<&str> = content.lines().collect();
    let heading_idx = lines
        .iter()
        .position(|l| *l == "## Reminders")
        .expect("heading");
    assert!(lines[heading_idx + 1].contains("Imported task"));
    assert!(lines[heading_idx + 1].contains("#from-reminders"));
}

#[test]
fn create_into_a_missing_file_creates_it() {
    let dir = tempfile::tempdir().expect("tempdir");
    let mut store = manager(dir.path());
    let fields = NewTaskFieldsV1 {
        description: "First task".to_string(),
        status: TaskStatus::Todo,
        due: None,
        priority: None,
        tags: Vec::new(),
        notes: None,
    };
    let created = store
        .create_task(&vault_id(), "AppleRemindersInbox.md", None, &fields)
        .expect("create");
    assert_eq!(created.line_number, 1);
    assert!(dir.path().join("AppleRemindersInbox.md").exists());
}

#[test]
fn delete_removes_exactly_the_anchored_line() {
    let dir = tempfile::tempdir().expect("tempdir");
    fs::write(
        dir.path().join("tasks.md"),
        "- [ ] Keep me ^keep1\n- [ ] Delete me ^gone1\n",
    )
    .expect("write fixture");

    let mut store = manager(dir.path());
    let tasks = store.list_tasks(&vault_id()).expect("list tasks");
    let target = tasks
        .iter()
        .find(|t| t.description == "Delete me")
        .expect("target task");
    store.delete_task(target).expect("delete");

    let content = fs::read_to_string(dir.path().join("tasks.md")).expect("read back");
    assert!(content.contains("Keep me"));
    assert!(!content.contains("Delete me"));
}
