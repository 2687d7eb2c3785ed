use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Result, TaskflowError};

/// Task priority. Defaults to `Medium`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Ordering weight used when sorting by priority (high first).
    pub fn weight(self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "low" | "l" => Ok(Priority::Low),
            "medium" | "med" | "m" | "normal" => Ok(Priority::Medium),
            "high" | "h" => Ok(Priority::High),
            _ => Err(TaskflowError::InvalidValue { field: "priority", value: s.to_string() }),
        }
    }
}

/// Workflow status of a task. Defaults to `Todo`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    #[default]
    Todo,
    InProgress,
    Completed,
}

impl Status {
    /// Ordering weight used when sorting by status (todo first).
    pub fn weight(self) -> u8 {
        match self {
            Status::Todo => 1,
            Status::InProgress => 2,
            Status::Completed => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Todo => "todo",
            Status::InProgress => "in_progress",
            Status::Completed => "completed",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Status {
    type Err = TaskflowError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "todo" | "open" => Ok(Status::Todo),
            "in_progress" | "inprogress" | "doing" | "started" => Ok(Status::InProgress),
            "completed" | "complete" | "done" => Ok(Status::Completed),
            _ => Err(TaskflowError::InvalidValue { field: "status", value: s.to_string() }),
        }
    }
}

/// When a task happens.
///
/// Replaces the loose optional `start_date`/`due_date` pair: a start date can
/// only exist together with a due date, and a ranged schedule always satisfies
/// `start_date <= due_date`.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case", try_from = "RawSchedule")]
pub enum Schedule {
    #[default]
    Unscheduled,
    SingleDay {
        due_date: NaiveDate,
    },
    Ranged {
        start_date: NaiveDate,
        due_date: NaiveDate,
    },
}

/// Stored form of a [`Schedule`], checked on the way in.
#[derive(Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum RawSchedule {
    Unscheduled,
    SingleDay { due_date: NaiveDate },
    Ranged { start_date: NaiveDate, due_date: NaiveDate },
}

impl TryFrom<RawSchedule> for Schedule {
    type Error = TaskflowError;

    fn try_from(raw: RawSchedule) -> Result<Self> {
        match raw {
            RawSchedule::Unscheduled => Ok(Schedule::Unscheduled),
            RawSchedule::SingleDay { due_date } => Ok(Schedule::SingleDay { due_date }),
            RawSchedule::Ranged { start_date, due_date } => Schedule::from_dates(Some(start_date), Some(due_date)),
        }
    }
}

impl Schedule {
    /// Builds a schedule from an optional start/due pair, rejecting inverted ranges.
    pub fn from_dates(start: Option<NaiveDate>, due: Option<NaiveDate>) -> Result<Self> {
        match (start, due) {
            (None, None) => Ok(Schedule::Unscheduled),
            (None, Some(due_date)) => Ok(Schedule::SingleDay { due_date }),
            (Some(_), None) => Err(TaskflowError::MissingDueDate),
            (Some(start), Some(due)) if start > due => {
                Err(TaskflowError::InvalidDateRange { start, due })
            }
            (Some(start_date), Some(due_date)) => Ok(Schedule::Ranged { start_date, due_date }),
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Ranged { start_date, .. } => Some(*start_date),
            _ => None,
        }
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        match self {
            Schedule::Unscheduled => None,
            Schedule::SingleDay { due_date } | Schedule::Ranged { due_date, .. } => Some(*due_date),
        }
    }
}

/// Represents a single task.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Opaque identifier assigned at creation.
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub status: Status,
    #[serde(flatten)]
    pub schedule: Schedule,
    pub created_at: DateTime<Utc>,
    /// Refreshed on every mutation. For completed tasks this doubles as the completion time.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Creates a todo task with medium priority and no dates.
    pub fn new(title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            description: None,
            priority: Priority::default(),
            status: Status::default(),
            schedule: Schedule::Unscheduled,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.schedule.start_date()
    }

    pub fn due_date(&self) -> Option<NaiveDate> {
        self.schedule.due_date()
    }

    pub fn is_completed(&self) -> bool {
        self.status == Status::Completed
    }

    /// First eight characters of the id, enough to address a task from the CLI.
    pub fn short_id(&self) -> String {
        self.id.simple().to_string()[..8].to_string()
    }

    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}
