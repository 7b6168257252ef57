use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::Serialize;
use serde_yaml::Value;
use ulid::Ulid;

use crate::error::{Result, StoreError};

/// Lifecycle state of a task. The persisted spelling is the kebab-case name,
/// used both in status-index filenames and on the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Status {
    Draft,
    Open,
    InProgress,
    Closed,
}

impl Status {
    pub const ALL: [Status; 4] = [Status::Draft, Status::Open, Status::InProgress, Status::Closed];

    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Draft => "draft",
            Status::Open => "open",
            Status::InProgress => "in-progress",
            Status::Closed => "closed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "draft" => Ok(Status::Draft),
            "open" => Ok(Status::Open),
            "in-progress" => Ok(Status::InProgress),
            "closed" => Ok(Status::Closed),
            other => Err(StoreError::InvalidInput(format!(
                "unknown status {other:?} (expected draft, open, in-progress or closed)"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Task {
    pub id: String,
    pub title: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    #[serde(rename = "dependsOn", skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
    pub status: Status,
}

/// The portion of a task persisted in its `.task` file. Status lives in the
/// status index, id in the file path; neither is repeated in the file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TaskFile {
    pub title: String,
    pub assignee: Option<String>,
    pub depends_on: Vec<String>,
    pub description: String,
}

impl Task {
    pub fn is_top_level(&self) -> bool {
        !self.id.contains('/')
    }

    pub fn from_file(id: String, status: Status, file: TaskFile) -> Task {
        Task {
            id,
            title: file.title,
            description: file.description,
            assignee: file.assignee,
            depends_on: file.depends_on,
            status,
        }
    }

    pub fn to_file(&self) -> TaskFile {
        TaskFile {
            title: self.title.clone(),
            assignee: self.assignee.clone(),
            depends_on: self.depends_on.clone(),
            description: self.description.clone(),
        }
    }
}

/// New opaque task token. Uniqueness is statistical; the core never reads
/// structure out of a token beyond the `/` join convention for subtasks.
pub fn generate_id() -> String {
    Ulid::new().to_string().to_lowercase()
}

const DELIMITER: &str = "---";

/// Render a task file: front matter block, blank line, description body.
/// Field order is fixed for diff-friendliness.
pub fn encode(file: &TaskFile) -> String {
    let mut lines = Vec::new();
    lines.push(DELIMITER.to_string());
    lines.push(format!("title: {}", quote(&file.title)));
    if let Some(assignee) = &file.assignee {
        lines.push(format!("assignee: {}", quote(assignee)));
    }
    if !file.depends_on.is_empty() {
        lines.push("dependsOn:".to_string());
        for dep in &file.depends_on {
            lines.push(format!("  - {}", quote(dep)));
        }
    }
    lines.push(DELIMITER.to_string());
    lines.push(String::new());
    let mut text = lines.join("\n");
    text.push('\n');
    text.push_str(&file.description);
    text.push('\n');
    text
}

/// Parse a task file. Missing optional fields decode to absent. Fails when
/// the front matter delimiter is missing or unterminated.
pub fn decode(text: &str) -> std::result::Result<TaskFile, FrontMatterError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.first().map(|line| line.trim()) != Some(DELIMITER) {
        return Err(FrontMatterError::MissingDelimiter);
    }
    let end = lines
        .iter()
        .enumerate()
        .skip(1)
        .find(|(_, line)| line.trim() == DELIMITER)
        .map(|(idx, _)| idx)
        .ok_or(FrontMatterError::MissingDelimiter)?;

    let front = lines[1..end].join("\n");
    let mut body = &lines[end + 1..];
    if body.first().map(|line| line.is_empty()).unwrap_or(false) {
        body = &body[1..];
    }
    let description = body.join("\n");

    let data: Value =
        serde_yaml::from_str(&front).map_err(|err| FrontMatterError::Yaml(err.to_string()))?;
    let title = string_field(&data, "title").unwrap_or_default();
    let assignee = string_field(&data, "assignee");
    let depends_on = list_field(&data, "dependsOn");

    Ok(TaskFile {
        title,
        assignee,
        depends_on,
        description,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum FrontMatterError {
    #[error("missing front matter delimiter")]
    MissingDelimiter,
    #[error("invalid front matter: {0}")]
    Yaml(String),
}

pub fn read_task_file(path: &Path) -> Result<TaskFile> {
    let text = std::fs::read_to_string(path)?;
    decode(&text).map_err(|_| StoreError::MalformedTaskFile(path.to_path_buf()))
}

pub fn write_task_file(path: &Path, file: &TaskFile) -> Result<()> {
    std::fs::write(path, encode(file))?;
    Ok(())
}

pub fn tasks_to_json(tasks: &[Task]) -> String {
    serde_json::to_string_pretty(tasks).unwrap_or_else(|_| "[]".to_string())
}

/// YAML double-quoted scalar; round-trips through `serde_yaml`.
fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    for ch in value.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out.push('"');
    out
}

fn string_field(data: &Value, key: &str) -> Option<String> {
    match data.get(key) {
        Some(Value::String(value)) => Some(value.clone()),
        Some(Value::Number(value)) => Some(value.to_string()),
        _ => None,
    }
}

fn list_field(data: &Value, key: &str) -> Vec<String> {
    match data.get(key) {
        Some(Value::Sequence(seq)) => seq
            .iter()
            .filter_map(|item| match item {
                Value::String(value) => Some(value.trim().to_string()),
                _ => None,
            })
            .filter(|item| !item.is_empty())
            .collect(),
        Some(Value::String(value)) if !value.trim().is_empty() => {
            vec![value.trim().to_string()]
        }
        _ => Vec::new(),
    }
}
