use std::cmp::Ordering;
use std::str::FromStr;

use crate::error::TaskflowError;
use crate::models::{Priority, Status, Task};

/// Sort orders offered by the task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Newest first.
    #[default]
    Created,
    /// Earliest due date first, undated tasks last.
    Due,
    /// High priority first.
    Priority,
    /// Todo, then in progress, then completed.
    Status,
}

impl FromStr for SortKey {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "created" | "created_at" => Ok(SortKey::Created),
            "due" | "due_date" => Ok(SortKey::Due),
            "priority" => Ok(SortKey::Priority),
            "status" => Ok(SortKey::Status),
            _ => Err(TaskflowError::InvalidValue { field: "sort", value: s.to_string() }),
        }
    }
}

/// Search and filter criteria for the task list.
#[derive(Debug, Clone, Default)]
pub struct TaskQuery {
    /// Case-insensitive match against title and description.
    pub search: Option<String>,
    pub status: Option<Status>,
    pub priority: Option<Priority>,
    pub sort: SortKey,
}

impl TaskQuery {
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(term) = self.search.as_deref().map(str::to_lowercase) {
            let in_title = task.title.to_lowercase().contains(&term);
            let in_desc = task
                .description
                .as_deref()
                .is_some_and(|d| d.to_lowercase().contains(&term));
            if !in_title && !in_desc {
                return false;
            }
        }
        self.status.map_or(true, |s| task.status == s)
            && self.priority.map_or(true, |p| task.priority == p)
    }

    /// Filters and sorts `tasks`. The sort is stable.
    pub fn apply<'a>(&self, tasks: &'a [Task]) -> Vec<&'a Task> {
        let mut out: Vec<&Task> = tasks.iter().filter(|t| self.matches(t)).collect();
        out.sort_by(|a, b| compare(self.sort, a, b));
        out
    }
}

pub fn compare(key: SortKey, a: &Task, b: &Task) -> Ordering {
    match key {
        SortKey::Created => b.created_at.cmp(&a.created_at),
        SortKey::Due => match (a.due_date(), b.due_date()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortKey::Priority => b.priority.weight().cmp(&a.priority.weight()),
        SortKey::Status => a.status.weight().cmp(&b.status.weight()),
    }
}
