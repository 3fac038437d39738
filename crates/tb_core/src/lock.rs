use crate::app_error::{AppError, AppResult};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Advisory exclusive lock over a link file. The lock is a sibling
/// `.lock` file created with `create_new`; holding it spans the whole run
/// and it is removed on drop. A second run against the same vault fails
/// fast with `TB_LINK_LOCK_BUSY`.
#[derive(Debug)]
pub struct LinkLock {
    lock_path: PathBuf,
}

fn lock_error(code: &str, message: &str, retryable: bool, details: serde_json::Value) -> AppError {
    AppError::new(code, "lock", message, retryable, details)
}

pub fn acquire_link_lock(links_path: &Path) -> AppResult<LinkLock> {
    let lock_path = links_path.with_extension("lock");
    if let Some(parent) = lock_path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            lock_error(
                "TB_LINK_LOCK_FAILED",
                "failed to create link lock directory",
                false,
                serde_json::json!({ "error": e.to_string(), "path": parent }),
            )
        })?;
    }
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&lock_path)
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::AlreadyExists {
                lock_error(
                    "TB_LINK_LOCK_BUSY",
                    "another sync run holds the link lock",
                    true,
                    serde_json::json!({ "path": lock_path }),
                )
            } else {
                lock_error(
                    "TB_LINK_LOCK_FAILED",
                    "failed to create link lock file",
                    false,
                    serde_json::json!({ "error": e.to_string(), "path": lock_path }),
                )
            }
        })?;
    let _ = writeln!(file, "{}", std::process::id());
    Ok(LinkLock { lock_path })
}

impl Drop for LinkLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.lock_path);
    }
}
