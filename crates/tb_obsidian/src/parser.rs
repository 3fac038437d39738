use regex::Regex;
use tb_core::models::{format_day, parse_day, Priority, TaskStatus};
use chrono::NaiveDate;

pub const PRIORITY_HIGH_MARK: &str = "⏫";
pub const PRIORITY_MEDIUM_MARK: &str = "🔼";
pub const PRIORITY_LOW_MARK: &str = "🔽";

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedTaskLine {
    pub indent: String,
    pub status: TaskStatus,
    pub description: String,
    pub block_id: Option<String>,
    pub due: Option<NaiveDate>,
    pub completion_date: Option<NaiveDate>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub raw_line: String,
}

/// Token scanner for one Markdown task line: checkbox, trailing block id,
/// completion and due date emoji tokens, priority emoji, and `#tags`.
pub struct TaskLineParser {
    task_re: Regex,
    block_id_re: Regex,
    due_re: Regex,
    completion_re: Regex,
    priority_re: Regex,
    tag_re: Regex,
}

impl Default for TaskLineParser {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskLineParser {
    pub fn new() -> Self {
        Self {
            task_re: Regex::new(r"^(\s*)[-*]\s+\[([xX ])\]\s+(.*)$").expect("valid regex"),
            block_id_re: Regex::new(r"\^([a-zA-Z0-9-]+)\s*$").expect("valid regex"),
            due_re: Regex::new(r"📅\s*(\d{4}-\d{1,2}-\d{1,2})").expect("valid regex"),
            completion_re: Regex::new(r"✅\s*(\d{4}-\d{1,2}-\d{1,2})").expect("valid regex"),
            priority_re: Regex::new(r"(⏫|🔼|🔽)").expect("valid regex"),
            tag_re: Regex::new(r"#([a-zA-Z0-9_\-/]+)").expect("valid regex"),
        }
    }

    pub fn parse(&self, line: &str) -> Option<ParsedTaskLine> {
        let caps = self.task_re.captures(line)?;
        let indent = caps.get(1).map(|m| m.as_str()).unwrap_or("").to_string();
        let status = if caps
            .get(2)
            .map(|m| m.as_str().eq_ignore_ascii_case("x"))
            .unwrap_or(false)
        {
            TaskStatus::Done
        } else {
            TaskStatus::Todo
        };
        let mut content = caps.get(3).map(|m| m.as_str()).unwrap_or("").to_string();

        let (block_id, block_start) = match self.block_id_re.captures(&content) {
            Some(caps) => (
                Some(caps.get(1).expect("block id group").as_str().to_string()),
                Some(caps.get(0).expect("block id match").start()),
            ),
            None => (None, None),
        };
        if let Some(start) = block_start {
            content.truncate(start);
            let kept = content.trim_end().len();
            content.truncate(kept);
        }

        let completion_date = self
            .completion_re
            .captures(&content)
            .and_then(|caps| parse_day(caps.get(1).expect("date group").as_str()));
        content = self.completion_re.replace_all(&content, "").trim().to_string();

        let due = self
            .due_re
            .captures(&content)
            .and_then(|caps| parse_day(caps.get(1).expect("date group").as_str()));
        content = self.due_re.replace_all(&content, "").trim().to_string();

        let priority = self.priority_re.captures(&content).and_then(|caps| {
            match caps.get(1).expect("priority group").as_str() {
                PRIORITY_HIGH_MARK => Some(Priority::High),
                PRIORITY_MEDIUM_MARK => Some(Priority::Medium),
                PRIORITY_LOW_MARK => Some(Priority::Low),
                _ => None,
            }
        });
        content = self.priority_re.replace_all(&content, "").trim().to_string();

        let mut tags = Vec::new();
        for caps in self.tag_re.captures_iter(&content) {
            tags.push(format!("#{}", caps.get(1).expect("tag group").as_str()));
        }
        let description = self.tag_re.replace_all(&content, "").trim().to_string();

        Some(ParsedTaskLine {
            indent,
            status,
            description,
            block_id,
            due,
            completion_date,
            priority,
            tags,
            raw_line: line.to_string(),
        })
    }
}

/// Inverse of `TaskLineParser::parse`: description first, then completion
/// date, priority, due date, tags, and block id, matching the token order
/// the vault's other tasks carry.
pub fn format_task_line(
    indent: &str,
    status: TaskStatus,
    description: &str,
    completion_date: Option<&NaiveDate>,
    priority: Option<Priority>,
    due: Option<&NaiveDate>,
    tags: &[String],
    block_id: Option<&str>,
) -> String {
    let status_char = match status {
        TaskStatus::Done => 'x',
        TaskStatus::Todo => ' ',
    };
    let mut parts = vec![format!("{indent}- [{status_char}]")];
    if !description.is_empty() {
        parts.push(description.to_string());
    }
    if let Some(date) = completion_date {
        parts.push(format!("✅ {}", format_day(date)));
    }
    if let Some(priority) = priority {
        let mark = match priority {
            Priority::High => PRIORITY_HIGH_MARK,
            Priority::Medium => PRIORITY_MEDIUM_MARK,
            Priority::Low => PRIORITY_LOW_MARK,
        };
        parts.push(mark.to_string());
    }
    if let Some(date) = due {
        parts.push(format!("📅 {}", format_day(date)));
    }
    for tag in tags {
        if tag.starts_with('#') {
            parts.push(tag.clone());
        } else {
            parts.push(format!("#{tag}"));
        }
    }
    if let Some(block_id) = block_id {
        parts.push(format!("^{block_id}"));
    }
    parts.join(" ")
}
