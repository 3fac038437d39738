use std::fs;
use std::process::Command;

fn write_fixture(root: &std::path::Path) {
    let vault_root = root.join("vault");
    fs::create_dir_all(&vault_root).expect("mkdir vault");
    fs::write(
        vault_root.join("tasks.md"),
        "- [ ] Buy milk 📅 2025-01-15 ^aa11\n",
    )
    .expect("write tasks");

    let snapshot = serde_json::json!({
        "schema_version": 1,
        "lists": [{ "list_id": "L-default", "name": "Default" }],
        "reminders": [{
            "item_id": "R-1",
            "list_id": "L-default",
            "title": "Buy milk",
            "completed": false,
            "due": "2025-01-15",
            "priority": 0
        }]
    });
    fs::write(
        root.join("reminders_snapshot.json"),
        serde_json::to_vec_pretty(&snapshot).expect("json"),
    )
    .expect("write snapshot");

    let config = serde_json::json!({
        "schema_version": 2,
        "vaults": [{
            "vault_id": "vault-1",
            "name": "Test",
            "path": vault_root,
            "is_default": true
        }],
        "default_vault_id": "vault-1",
        "lists": [{ "list_id": "L-default", "name": "Default" }],
        "vault_mappings": [{ "vault_id": "vault-1", "default_list_id": "L-default" }],
        "tag_routes": [],
        "list_routes": [],
        "inbox_file": "AppleRemindersInbox.md",
        "links_dir": "links",
        "reminders_snapshot": "reminders_snapshot.json",
        "min_score_milli": 750,
        "days_tolerance": 1,
        "include_completed": false,
        "enable_deduplication": true,
        "dedup_auto_apply": false,
        "gateway_timeout_ms": 300000
    });
    fs::write(
        root.join("taskbridge.json"),
        serde_json::to_vec_pretty(&config).expect("json"),
    )
    .expect("write config");
}

#[test]
fn cli_dry_run_sync_exits_zero_and_persists_the_match() {
    let root = tempfile::tempdir().expect("tempdir").keep();
    write_fixture(&root);

    let bin = env!("CARGO_BIN_EXE_taskbridge");
    let output = Command::new(bin)
        .args([
            "--config",
            root.join("taskbridge.json").to_str().expect("path"),
            "sync",
        ])
        .output()
        .expect("run sync");
    assert!(
        output.status.success(),
        "stdout: {}\nstderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );

    let links = root.join("links/sync_links_vault-1.json");
    assert!(links.exists(), "link file persisted");
    let text = fs::read_to_string(links).expect("read links");
    assert!(text.contains("\"obs_id\":\"aa11\""));
    assert!(text.contains("\"rem_id\":\"R-1\""));
}

#[test]
fn cli_missing_config_exits_with_code_two() {
    let root = tempfile::tempdir().expect("tempdir").keep();
    let bin = env!("CARGO_BIN_EXE_taskbridge");
    let output = Command::new(bin)
        .args([
            "--config",
            root.join("nope.json").to_str().expect("path"),
            "sync",
        ])
        .output()
        .expect("run sync");
    assert_eq!(output.status.code(), Some(2));
    assert!(String::from_utf8_lossy(&output.stderr).contains("TB_CONFIG_MISSING"));
}

#[test]
fn cli_config_init_refuses_to_overwrite() {
    let root = tempfile::tempdir().expect("tempdir").keep();
    let config_path = root.join("fresh.json");
    let bin = env!("CARGO_BIN_EXE_taskbridge");

    let first = Command::new(bin)
        .args(["--config", config_path.to_str().expect("path"), "config", "init"])
        .output()
        .expect("config init");
    assert!(first.status.success());
    assert!(config_path.exists());

    let second = Command::new(bin)
        .args(["--config", config_path.to_str().expect("path"), "config", "init"])
        .output()
        .expect("config init again");
    assert_eq!(second.status.code(), Some(2));
}
