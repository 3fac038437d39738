use std::path::Path;
use tb_core::app_error::{AppError, AppResult};
use tb_core::config::{config_load, SyncConfigV2, VaultConfigV1};
use tb_core::engine::{run_sync, Direction, SyncOptions, SyncReportV1};
use tb_core::types::{ListId, VaultId};
use tb_obsidian::VaultManager;
use tb_reminders::FileGateway;

pub fn resolve_vault<'a>(
    config: &'a SyncConfigV2,
    wanted: Option<&str>,
) -> AppResult<&'a VaultConfigV1> {
    let vault = match wanted {
        Some(needle) => config.vault_by_name_or_id(needle),
        None => config.default_vault(),
    };
    vault.ok_or_else(|| {
        AppError::new(
            "TB_CONFIG_NO_VAULT",
            "config",
            "no vault configured or the requested vault is unknown",
            false,
            serde_json::json!({ "requested": wanted }),
        )
    })
}

#[allow(clippy::too_many_arguments)]
pub fn execute_sync(
    config_path: &str,
    vault: Option<&str>,
    apply: bool,
    direction: Direction,
    list_ids: &[String],
    no_dedup: bool,
    dedup_auto_apply: bool,
    now_ms: i64,
) -> AppResult<SyncReportV1> {
    let config_path = Path::new(config_path);
    let config = config_load(config_path)?;
    let vault = resolve_vault(&config, vault)?;
    let vault_id = VaultId(vault.vault_id.clone());

    let mut obs_store = VaultManager::new(vault_id.clone(), vault.path.clone().into());
    let mut gateway = FileGateway::new(config.snapshot_path(config_path));

    let options = SyncOptions {
        apply,
        direction: Some(direction),
        list_ids: if list_ids.is_empty() {
            None
        } else {
            Some(list_ids.iter().map(|id| ListId(id.clone())).collect())
        },
        no_dedup,
        dedup_auto_apply,
        ..SyncOptions::default()
    };

    let links_path = config.links_path(config_path, &vault.vault_id);
    run_sync(
        &mut obs_store,
        &mut gateway,
        &config,
        &links_path,
        &vault_id,
        &options,
        now_ms,
    )
}

#[allow(clippy::too_many_arguments)]
pub fn run_sync_command(
    config_path: &str,
    vault: Option<&str>,
    apply: bool,
    direction: Direction,
    list_ids: &[String],
    no_dedup: bool,
    dedup_auto_apply: bool,
    verbose: bool,
    now_ms: i64,
) -> AppResult<SyncReportV1> {
    let report = execute_sync(
        config_path,
        vault,
        apply,
        direction,
        list_ids,
        no_dedup,
        dedup_auto_apply,
        now_ms,
    )?;

    if verbose {
        println!(
            "{}",
            serde_json::to_string_pretty(&report).unwrap_or_else(|_| "{}".to_string())
        );
    } else {
        print_summary(&report);
    }
    Ok(report)
}

fn print_summary(report: &SyncReportV1) {
    let mode = if report.dry_run { "dry-run" } else { "apply" };
    println!(
        "sync {} ({}, direction={})",
        report.vault_id,
        mode,
        report.direction.as_str()
    );
    println!(
        "  tasks: {} obsidian, {} reminders (lists: {})",
        report.obs_tasks,
        report.rem_tasks,
        report.queried_lists.join(", ")
    );
    println!(
        "  links: {} total, {} new, {} recovered, {} retired",
        report.links_total, report.links_created, report.links_recovered, report.links_retired
    );
    println!(
        "  plan: {} updates ({} obs / {} rem), {} creates ({} obs / {} rem), {} deletes",
        report.counts.updates_obs + report.counts.updates_rem,
        report.counts.updates_obs,
        report.counts.updates_rem,
        report.counts.creates_obs + report.counts.creates_rem,
        report.counts.creates_obs,
        report.counts.creates_rem,
        report.counts.deletes_obs + report.counts.deletes_rem
    );
    if report.counts.dedup_clusters > 0 {
        println!("  dedup: {} duplicate clusters", report.counts.dedup_clusters);
    }
    for diagnostic in &report.diagnostics {
        println!("  note[{}]: {}", diagnostic.code, diagnostic.message);
    }
    for failure in &report.failures {
        println!(
            "  failed {} {} {}: {} ({})",
            failure.op,
            failure.store.as_str(),
            failure.id,
            failure.message,
            failure.error_code
        );
    }
    if report.partial {
        println!("  result: partial apply");
    }
}
