use crate::parser::{format_task_line, ParsedTaskLine, TaskLineParser};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use tb_core::app_error::{AppError, AppResult};
use tb_core::models::{parse_day, ObsidianTask, Timestamp};
use tb_core::plan::{NewTaskFieldsV1, TaskChangesV1};
use tb_core::store_traits::ObsidianStore;
use tb_core::types::{ObsId, VaultId};
use uuid::Uuid;
use walkdir::WalkDir;

fn obsidian_error(code: &str, message: &str, details: serde_json::Value) -> AppError {
    AppError::new(code, "obsidian", message, false, details)
}

fn file_mtime_iso(path: &Path) -> Timestamp {
    match fs::metadata(path).and_then(|meta| meta.modified()) {
        Ok(mtime) => {
            let datetime: DateTime<Utc> = mtime.into();
            Timestamp::Iso(datetime.to_rfc3339_opts(SecondsFormat::Secs, true))
        }
        Err(_) => Timestamp::Absent,
    }
}

fn write_atomic(path: &Path, content: &str) -> AppResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| {
            obsidian_error(
                "TB_OBSIDIAN_WRITE_FAILED",
                "failed to create markdown parent directory",
                serde_json::json!({ "error": e.to_string(), "path": parent }),
            )
        })?;
    }
    let tmp_path = path.with_extension("md.tmp");
    fs::write(&tmp_path, content).map_err(|e| {
        obsidian_error(
            "TB_OBSIDIAN_WRITE_FAILED",
            "failed to write markdown temp file",
            serde_json::json!({ "error": e.to_string(), "path": tmp_path }),
        )
    })?;
    fs::rename(&tmp_path, path).map_err(|e| {
        obsidian_error(
            "TB_OBSIDIAN_WRITE_FAILED",
            "failed to rename markdown temp file into place",
            serde_json::json!({ "error": e.to_string(), "from": tmp_path, "to": path }),
        )
    })?;
    Ok(())
}

fn new_block_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// Markdown-side task manager for one vault root. The stable task id is
/// the block id anchored to the line; a task read without one gets an id
/// assigned and written back before the snapshot is returned.
pub struct VaultManager {
    vault_id: VaultId,
    root: PathBuf,
    parser: TaskLineParser,
}

impl VaultManager {
    pub fn new(vault_id: VaultId, root: PathBuf) -> Self {
        Self {
            vault_id,
            root,
            parser: TaskLineParser::new(),
        }
    }

    fn check_vault(&self, vault_id: &VaultId) -> AppResult<()> {
        if vault_id != &self.vault_id {
            return Err(obsidian_error(
                "TB_OBSIDIAN_VAULT_UNKNOWN",
                "manager serves a different vault",
                serde_json::json!({ "expected": self.vault_id.0, "actual": vault_id.0 }),
            ));
        }
        Ok(())
    }

    fn markdown_files(&self) -> Vec<PathBuf> {
        let mut files: Vec<PathBuf> = WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|entry| {
                // Skip hidden trees such as .obsidian, but never the root
                // itself.
                entry.depth() == 0
                    || !entry
                        .file_name()
                        .to_str()
                        .map(|name| name.starts_with('.'))
                        .unwrap_or(false)
            })
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.path().to_path_buf())
            .filter(|path| path.extension().and_then(|ext| ext.to_str()) == Some("md"))
            .collect();
        files.sort();
        files
    }

    fn read_file(&self, path: &Path) -> AppResult<String> {
        fs::read_to_string(path).map_err(|e| {
            obsidian_error(
                "TB_OBSIDIAN_READ_FAILED",
                "failed to read markdown file",
                serde_json::json!({ "error": e.to_string(), "path": path }),
            )
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .to_string()
    }

    /// Re-locate a task line by its block id; the line number captured at
    /// collect time is only a fallback hint.
    fn locate_line(&self, lines: &[String], task: &ObsidianTask) -> Option<usize> {
        let anchor = task.block_id.as_deref()?;
        let suffix = format!("^{anchor}");
        lines.iter().position(|line| {
            line.trim_end().ends_with(&suffix) && self.parser.parse(line).is_some()
        })
    }

    fn task_from_parsed(
        &self,
        parsed: &ParsedTaskLine,
        relative: &str,
        line_number: usize,
        modified_at: &Timestamp,
    ) -> ObsidianTask {
        ObsidianTask {
            id: ObsId(parsed.block_id.clone().unwrap_or_default()),
            vault_id: self.vault_id.clone(),
            file_path: relative.to_string(),
            line_number,
            block_id: parsed.block_id.clone(),
            status: parsed.status,
            description: parsed.description.clone(),
            raw_line: parsed.raw_line.clone(),
            due: parsed.due,
            completion_date: parsed.completion_date,
            priority: parsed.priority,
            tags: parsed.tags.clone(),
            notes: None,
            created_at: Timestamp::Absent,
            modified_at: modified_at.clone(),
        }
    }
}

impl ObsidianStore for VaultManager {
    fn list_tasks(&mut self, vault_id: &VaultId) -> AppResult<Vec<ObsidianTask>> {
        self.check_vault(vault_id)?;
        let mut tasks = Vec::new();
        for path in self.markdown_files() {
            let content = self.read_file(&path)?;
            let mut lines: Vec<String> = content.lines().map(|line| line.to_string()).collect();
            let mut assigned = false;

            for idx in 0..lines.len() {
                let Some(parsed) = self.parser.parse(&lines[idx]) else {
                    continue;
                };
                if parsed.block_id.is_none() {
                    let block_id = new_block_id();
                    let rewritten = format!("{} ^{}", lines[idx].trim_end(), block_id);
                    lines[idx] = rewritten;
                    assigned = true;
                }
            }

            if assigned {
                let mut updated = lines.join("\n");
                if content.ends_with('\n') {
                    updated.push('\n');
                }
                write_atomic(&path, &updated)?;
            }

            let relative = self.relative_path(&path);
            let modified_at = file_mtime_iso(&path);
            for (idx, line) in lines.iter().enumerate() {
                if let Some(parsed) = self.parser.parse(line) {
                    tasks.push(self.task_from_parsed(&parsed, &relative, idx + 1, &modified_at));
                }
            }
        }
        Ok(tasks)
    }

    fn update_task(&mut self, task: &ObsidianTask, changes: &TaskChangesV1) -> AppResult<()> {
        let path = self.root.join(&task.file_path);
        let content = self.read_file(&path)?;
        let mut lines: Vec<String> = content.lines().map(|line| line.to_string()).collect();
        let idx = self.locate_line(&lines, task).ok_or_else(|| {
            obsidian_error(
                "TB_OBSIDIAN_TASK_NOT_FOUND",
                "task block id not found in file",
                serde_json::json!({ "path": task.file_path, "block_id": task.block_id }),
            )
        })?;
        let parsed = self.parser.parse(&lines[idx]).ok_or_else(|| {
            obsidian_error(
                "TB_OBSIDIAN_TASK_NOT_FOUND",
                "located line no longer parses as a task",
                serde_json::json!({ "path": task.file_path, "line": idx + 1 }),
            )
        })?;

        let status = changes.status.unwrap_or(parsed.status);
        let description = changes
            .description
            .clone()
            .unwrap_or_else(|| parsed.description.clone());
        let due = match &changes.due {
            Some(change) => change.value.as_deref().and_then(parse_day),
            None => parsed.due,
        };
        let priority = match &changes.priority {
            Some(change) => change.value,
            None => parsed.priority,
        };
        let tags = changes.tags.clone().unwrap_or_else(|| parsed.tags.clone());

        lines[idx] = format_task_line(
            &parsed.indent,
            status,
            &description,
            parsed.completion_date.as_ref(),
            priority,
            due.as_ref(),
            &tags,
            parsed.block_id.as_deref(),
        );

        let mut updated = lines.join("\n");
        if content.ends_with('\n') {
            updated.push('\n');
        }
        write_atomic(&path, &updated)
    }

    fn create_task(
        &mut self,
        vault_id: &VaultId,
        target_file: &str,
        heading: Option<&str>,
        fields: &NewTaskFieldsV1,
    ) -> AppResult<ObsidianTask> {
        self.check_vault(vault_id)?;
        let path = self.root.join(target_file);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(obsidian_error(
                    "TB_OBSIDIAN_READ_FAILED",
                    "failed to read create target file",
                    serde_json::json!({ "error": e.to_string(), "path": path }),
                ))
            }
        };

        let block_id = new_block_id();
        let due = fields.due.as_deref().and_then(parse_day);
        let line = format_task_line(
            "",
            fields.status,
            &fields.description,
            None,
            fields.priority,
            due.as_ref(),
            &fields.tags,
            Some(&block_id),
        );

        let mut lines: Vec<String> = content.lines().map(|l| l.to_string()).collect();
        let insert_at = heading.and_then(|wanted| {
            lines
                .iter()
                .position(|l| {
                    let trimmed = l.trim_start();
                    trimmed.starts_with('#') && trimmed.trim_start_matches('#').trim() == wanted
                })
                .map(|idx| idx + 1)
        });
        let line_number = match insert_at {
            Some(idx) => {
                lines.insert(idx, line.clone());
                idx + 1
            }
            None => {
                if let Some(wanted) = heading {
                    // Configured heading is absent; create it at the end.
                    if !lines.is_empty() {
                        lines.push(String::new());
                    }
                    lines.push(format!("## {wanted}"));
                }
                lines.push(line.clone());
                lines.len()
            }
        };

        let mut updated = lines.join("\n");
        updated.push('\n');
        write_atomic(&path, &updated)?;

        let parsed = self.parser.parse(&line).ok_or_else(|| {
            obsidian_error(
                "TB_OBSIDIAN_WRITE_FAILED",
                "created task line does not parse",
                serde_json::json!({ "line": line }),
            )
        })?;
        let relative = self.relative_path(&path);
        let modified_at = file_mtime_iso(&path);
        let mut task = self.task_from_parsed(&parsed, &relative, line_number, &modified_at);
        task.notes = fields.notes.clone();
        Ok(task)
    }

    fn delete_task(&mut self, task: &ObsidianTask) -> AppResult<()> {
        let path = self.root.join(&task.file_path);
        let content = self.read_file(&path)?;
        let mut lines: Vec<String> = content.lines().map(|line| line.to_string()).collect();
        let idx = self.locate_line(&lines, task).ok_or_else(|| {
            obsidian_error(
                "TB_OBSIDIAN_TASK_NOT_FOUND",
                "task block id not found in file",
                serde_json::json!({ "path": task.file_path, "block_id": task.block_id }),
            )
        })?;
        lines.remove(idx);
        let mut updated = lines.join("\n");
        if content.ends_with('\n') && !updated.is_empty() {
            updated.push('\n');
        }
        write_atomic(&path, &updated)
    }
}
