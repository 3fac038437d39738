use std::path::Path;
use tb_core::app_error::{AppError, AppResult};
use tb_core::config::{config_load, config_save, SyncConfigV2};

pub fn run_init(config_path: &str) -> AppResult<()> {
    let path = Path::new(config_path);
    if path.exists() {
        return Err(AppError::new(
            "TB_CONFIG_EXISTS",
            "config",
            "refusing to overwrite an existing configuration file",
            false,
            serde_json::json!({ "path": path }),
        ));
    }
    let config = SyncConfigV2::default();
    config_save(path, &config)?;
    println!("config written: {}", path.display());
    Ok(())
}

pub fn run_show(config_path: &str) -> AppResult<()> {
    let config = config_load(Path::new(config_path))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&config).unwrap_or_else(|_| "{}".to_string())
    );
    Ok(())
}
