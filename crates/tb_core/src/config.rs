use crate::app_error::{AppError, AppResult};
use crate::routes::{ListRouteV1, TagRouteV1, VaultMappingV1};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_MIN_SCORE_MILLI: u32 = 750;
pub const DEFAULT_DAYS_TOLERANCE: i64 = 1;
pub const DEFAULT_GATEWAY_TIMEOUT_MS: u64 = 300_000;
pub const DEFAULT_INBOX_FILE: &str = "AppleRemindersInbox.md";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultConfigV1 {
    pub vault_id: String,
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub is_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ListConfigV1 {
    pub list_id: String,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SyncConfigV2 {
    pub schema_version: u32,
    #[serde(default)]
    pub vaults: Vec<VaultConfigV1>,
    #[serde(default)]
    pub default_vault_id: Option<String>,
    #[serde(default)]
    pub lists: Vec<ListConfigV1>,
    #[serde(default)]
    pub vault_mappings: Vec<VaultMappingV1>,
    #[serde(default)]
    pub tag_routes: Vec<TagRouteV1>,
    #[serde(default)]
    pub list_routes: Vec<ListRouteV1>,
    pub inbox_file: String,
    pub links_dir: String,
    pub reminders_snapshot: String,
    pub min_score_milli: u32,
    pub days_tolerance: i64,
    #[serde(default)]
    pub include_completed: bool,
    #[serde(default = "default_true")]
    pub enable_deduplication: bool,
    #[serde(default)]
    pub dedup_auto_apply: bool,
    pub gateway_timeout_ms: u64,
}

fn default_true() -> bool {
    true
}

// Earlier deployments predate routing; their files carry neither routes
// nor mappings and upgrade in memory.
#[derive(Debug, Clone, Deserialize)]
struct LegacySyncConfigV1 {
    #[serde(default)]
    vaults: Vec<VaultConfigV1>,
    #[serde(default)]
    default_vault_id: Option<String>,
    #[serde(default)]
    lists: Vec<ListConfigV1>,
    #[serde(default)]
    default_list_id: Option<String>,
    #[serde(default)]
    inbox_file: Option<String>,
    #[serde(default)]
    links_dir: Option<String>,
    #[serde(default)]
    min_score_milli: Option<u32>,
    #[serde(default)]
    days_tolerance: Option<i64>,
    #[serde(default)]
    include_completed: bool,
}

impl Default for SyncConfigV2 {
    fn default() -> Self {
        Self {
            schema_version: 2,
            vaults: Vec::new(),
            default_vault_id: None,
            lists: Vec::new(),
            vault_mappings: Vec::new(),
            tag_routes: Vec::new(),
            list_routes: Vec::new(),
            inbox_file: DEFAULT_INBOX_FILE.to_string(),
            links_dir: "links".to_string(),
            reminders_snapshot: "reminders_snapshot.json".to_string(),
            min_score_milli: DEFAULT_MIN_SCORE_MILLI,
            days_tolerance: DEFAULT_DAYS_TOLERANCE,
            include_completed: false,
            enable_deduplication: true,
            dedup_auto_apply: false,
            gateway_timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
        }
    }
}

impl SyncConfigV2 {
    pub fn default_vault(&self) -> Option<&VaultConfigV1> {
        if self.vaults.is_empty() {
            return None;
        }
        if let Some(vault) = self.vaults.iter().find(|v| v.is_default) {
            return Some(vault);
        }
        if let Some(wanted) = &self.default_vault_id {
            if let Some(vault) = self.vaults.iter().find(|v| &v.vault_id == wanted) {
                return Some(vault);
            }
        }
        self.vaults.first()
    }

    pub fn vault_by_name_or_id(&self, needle: &str) -> Option<&VaultConfigV1> {
        self.vaults
            .iter()
            .find(|v| v.vault_id == needle || v.name == needle)
    }

    pub fn known_list_ids(&self) -> std::collections::BTreeSet<String> {
        self.lists.iter().map(|l| l.list_id.clone()).collect()
    }

    pub fn min_score(&self) -> f64 {
        f64::from(self.min_score_milli) / 1000.0
    }

    /// Per-vault link file under `links_dir`, resolved against the config
    /// file's own directory when relative.
    pub fn links_path(&self, config_path: &Path, vault_id: &str) -> PathBuf {
        let dir = PathBuf::from(&self.links_dir);
        let dir = if dir.is_absolute() {
            dir
        } else {
            config_path.parent().unwrap_or(Path::new(".")).join(dir)
        };
        dir.join(format!("sync_links_{vault_id}.json"))
    }

    /// The bridge snapshot the host-side exporter maintains, resolved
    /// against the config file's own directory when relative.
    pub fn snapshot_path(&self, config_path: &Path) -> PathBuf {
        let path = PathBuf::from(&self.reminders_snapshot);
        if path.is_absolute() {
            path
        } else {
            config_path.parent().unwrap_or(Path::new(".")).join(path)
        }
    }
}

fn config_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "config", message, false, details)
}

pub fn config_load(config_path: &Path) -> AppResult<SyncConfigV2> {
    let bytes = fs::read(config_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            config_error(
                "TB_CONFIG_MISSING",
                "configuration file is missing",
                serde_json::json!({ "path": config_path }),
            )
        } else {
            config_error(
                "TB_CONFIG_INVALID",
                "failed to read configuration file",
                serde_json::json!({ "error": e.to_string(), "path": config_path }),
            )
        }
    })?;

    let value: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| {
        config_error(
            "TB_CONFIG_INVALID",
            "failed to parse configuration file",
            serde_json::json!({ "error": e.to_string(), "path": config_path }),
        )
    })?;

    let schema_version = value
        .get("schema_version")
        .and_then(|v| v.as_u64())
        .ok_or_else(|| {
            config_error(
                "TB_CONFIG_INVALID",
                "config schema_version missing or invalid",
                serde_json::json!({ "path": config_path }),
            )
        })? as u32;

    match schema_version {
        1 => {
            let legacy: LegacySyncConfigV1 = serde_json::from_value(value).map_err(|e| {
                config_error(
                    "TB_CONFIG_INVALID",
                    "failed to parse legacy config schema v1",
                    serde_json::json!({ "error": e.to_string(), "path": config_path }),
                )
            })?;
            let defaults = SyncConfigV2::default();
            let mut upgraded = SyncConfigV2 {
                schema_version: 2,
                vaults: legacy.vaults,
                default_vault_id: legacy.default_vault_id,
                lists: legacy.lists,
                vault_mappings: Vec::new(),
                tag_routes: Vec::new(),
                list_routes: Vec::new(),
                inbox_file: legacy.inbox_file.unwrap_or(defaults.inbox_file),
                links_dir: legacy.links_dir.unwrap_or(defaults.links_dir),
                reminders_snapshot: defaults.reminders_snapshot,
                min_score_milli: legacy.min_score_milli.unwrap_or(DEFAULT_MIN_SCORE_MILLI),
                days_tolerance: legacy.days_tolerance.unwrap_or(DEFAULT_DAYS_TOLERANCE),
                include_completed: legacy.include_completed,
                enable_deduplication: true,
                dedup_auto_apply: false,
                gateway_timeout_ms: DEFAULT_GATEWAY_TIMEOUT_MS,
            };
            // v1 kept a single global default list; express it as a
            // mapping for every known vault.
            if let Some(default_list) = legacy.default_list_id {
                for vault in &upgraded.vaults {
                    upgraded.vault_mappings.push(VaultMappingV1 {
                        vault_id: vault.vault_id.clone(),
                        default_list_id: default_list.clone(),
                    });
                }
            }
            Ok(upgraded)
        }
        2 => serde_json::from_value(value).map_err(|e| {
            config_error(
                "TB_CONFIG_INVALID",
                "failed to parse config schema v2",
                serde_json::json!({ "error": e.to_string(), "path": config_path }),
            )
        }),
        _ => Err(config_error(
            "TB_CONFIG_UNSUPPORTED_VERSION",
            "unsupported config schema_version",
            serde_json::json!({ "expected": [1, 2], "actual": schema_version }),
        )),
    }
}

pub fn config_save(config_path: &Path, config: &SyncConfigV2) -> AppResult<()> {
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            config_error(
                "TB_CONFIG_WRITE_FAILED",
                "failed to create config directory",
                serde_json::json!({ "error": e.to_string(), "path": parent }),
            )
        })?;
    }
    let bytes = serde_json::to_vec_pretty(config).map_err(|e| {
        config_error(
            "TB_CONFIG_WRITE_FAILED",
            "failed to serialize config",
            serde_json::json!({ "error": e.to_string() }),
        )
    })?;
    fs::write(config_path, bytes).map_err(|e| {
        config_error(
            "TB_CONFIG_WRITE_FAILED",
            "failed to write config file",
            serde_json::json!({ "error": e.to_string(), "path": config_path }),
        )
    })?;
    Ok(())
}
