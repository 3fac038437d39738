use crate::commands::sync::execute_sync;
use tb_core::app_error::AppResult;
use tb_core::engine::Direction;

/// Report-only duplicate listing: a dry-run with dedup enabled, printing
/// only the cluster section.
pub fn run_dedupe(
    config_path: &str,
    vault: Option<&str>,
    verbose: bool,
    now_ms: i64,
) -> AppResult<()> {
    let report = execute_sync(
        config_path,
        vault,
        false,
        Direction::Both,
        &[],
        false,
        false,
        now_ms,
    )?;
    if report.dedup_clusters.is_empty() {
        println!("no duplicate clusters found");
        return Ok(());
    }
    for cluster in &report.dedup_clusters {
        println!(
            "cluster {} [{}] \"{}\" ({} members)",
            cluster.cluster_id,
            cluster.store.as_str(),
            cluster.normalized,
            cluster.members.len()
        );
        for member in &cluster.members {
            if verbose {
                println!(
                    "  {} @ {} (status={}, due={})",
                    member.id,
                    member.location,
                    member.status,
                    member.due.as_deref().unwrap_or("-")
                );
            } else {
                println!("  {} @ {}", member.id, member.location);
            }
        }
    }
    Ok(())
}
