use chrono::NaiveDate;

use crate::models::Task;

/// The effective date interval a task occupies on the calendar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskSpan {
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Inclusive day count, never below 1.
    pub days: i64,
    pub is_multi_day: bool,
}

impl TaskSpan {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// True if the span touches the inclusive interval `[from, to]`.
    pub fn intersects(&self, from: NaiveDate, to: NaiveDate) -> bool {
        self.start <= to && self.end >= from
    }
}

/// Resolves the calendar span of a task.
///
/// Without a due date the task sits on its creation day. With one, the span
/// runs from the explicit start date (or the creation day) to the due date.
/// Only tasks with an explicit start date can be multi-day: a lone far-off
/// due date still renders as a single-day task on that date.
pub fn resolve(task: &Task) -> TaskSpan {
    let created = task.created_at.date_naive();
    let Some(end) = task.due_date() else {
        return TaskSpan { start: created, end: created, days: 1, is_multi_day: false };
    };

    let start = task.start_date().unwrap_or(created);
    let days = duration_days(start, end);

    TaskSpan {
        start,
        end,
        days,
        is_multi_day: days > 1 && task.start_date().is_some(),
    }
}

/// Inclusive day count between two dates, never below 1.
pub fn duration_days(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(1)
}
