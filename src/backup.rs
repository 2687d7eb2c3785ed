//! Full JSON backups of a user's data, and restoring from them.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Result, TaskflowError};
use crate::models::{Schedule, Task};
use crate::stats::{ProgressRecord, SessionActivity, StatsRecord};
use crate::storage::{KeyValueStore, TaskRepository};

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Backup {
    pub tasks: Vec<Task>,
    pub progress: Option<ProgressRecord>,
    pub stats: Option<StatsRecord>,
    pub session_info: Option<SessionActivity>,
    pub backup_date: DateTime<Utc>,
    pub user_id: String,
}

/// Collects the repository's tasks and last saved snapshots.
pub fn create_backup<S: KeyValueStore>(repo: &TaskRepository<S>, now: DateTime<Utc>) -> Backup {
    Backup {
        tasks: repo.tasks().to_vec(),
        progress: repo.progress(),
        stats: repo.stats(),
        session_info: repo.session_activity(),
        backup_date: now,
        user_id: repo.user_id().to_string(),
    }
}

/// Outcome of reading a backup: the usable tasks and how many entries were dropped.
#[derive(Debug)]
pub struct Restored {
    pub tasks: Vec<Task>,
    pub skipped: usize,
}

/// Reads tasks from a backup document or a bare JSON array of tasks.
///
/// Entries need a `title`, an `id` and a `created_at`; anything else is
/// dropped. A missing `updated_at` defaults to `created_at`. Records in the
/// loose format of older exports (plain `start_date`/`due_date` strings,
/// non-UUID ids) are converted.
pub fn read_backup(text: &str) -> Result<Restored> {
    let root: Value = serde_json::from_str(text)?;
    let entries = match &root {
        Value::Array(items) => items.as_slice(),
        Value::Object(map) => match map.get("tasks") {
            Some(Value::Array(items)) => items.as_slice(),
            _ => return Err(TaskflowError::Import("backup has no 'tasks' array".into())),
        },
        _ => return Err(TaskflowError::Import("expected a JSON object or array".into())),
    };

    let mut tasks = Vec::new();
    let mut skipped = 0;
    for (i, entry) in entries.iter().enumerate() {
        match convert_entry(entry) {
            Some(task) => tasks.push(task),
            None => {
                warn!("Skipping backup entry {}: missing or invalid fields", i);
                skipped += 1;
            }
        }
    }
    Ok(Restored { tasks, skipped })
}

fn convert_entry(entry: &Value) -> Option<Task> {
    let obj = entry.as_object()?;
    let title = obj.get("title")?.as_str()?.trim();
    let raw_id = obj.get("id")?;
    let created_at = parse_timestamp(obj.get("created_at")?.as_str()?)?;
    if title.is_empty() {
        return None;
    }

    if obj.contains_key("kind") {
        if let Ok(task) = serde_json::from_value::<Task>(entry.clone()) {
            return Some(task);
        }
    }

    let id = match raw_id {
        Value::String(s) => Uuid::parse_str(s).unwrap_or_else(|_| {
            debug!("Replacing non-UUID id '{}'", s);
            Uuid::new_v4()
        }),
        _ => Uuid::new_v4(),
    };
    let text = |key: &str| obj.get(key).and_then(Value::as_str).filter(|s| !s.trim().is_empty());
    let date = |key: &str| text(key).and_then(parse_date);

    let schedule = match Schedule::from_dates(date("start_date"), date("due_date")) {
        Ok(s) => s,
        Err(e) => {
            warn!("Entry '{}': {}", title, e);
            return None;
        }
    };

    let mut task = Task::new(title, created_at);
    task.id = id;
    task.description = text("description").map(str::to_string);
    task.priority = text("priority").and_then(|p| p.parse().ok()).unwrap_or_default();
    task.status = text("status").and_then(|s| s.parse().ok()).unwrap_or_default();
    task.schedule = schedule;
    task.updated_at = text("updated_at").and_then(parse_timestamp).unwrap_or(created_at);
    Some(task)
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s.trim()) {
        return Some(dt.with_timezone(&Utc));
    }
    parse_date(s).map(|d| d.and_time(NaiveTime::MIN).and_utc())
}

/// Reads `YYYY-MM-DD`, or the date part of an RFC 3339 timestamp.
fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(d);
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc).date_naive())
}
