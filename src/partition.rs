use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::duration::{resolve, TaskSpan};
use crate::models::Task;

/// A multi-day task together with its resolved span.
#[derive(Debug, Clone, Copy)]
pub struct SpanningTask<'a> {
    pub task: &'a Task,
    pub span: TaskSpan,
}

/// Tasks of one visible window, split into per-day buckets and spanning bars.
#[derive(Debug, Default)]
pub struct Partition<'a> {
    /// One entry per window date, possibly empty. Keys iterate in date order.
    pub daily: BTreeMap<NaiveDate, Vec<&'a Task>>,
    /// Every multi-day task, whether or not it touches the window.
    pub spanning: Vec<SpanningTask<'a>>,
}

impl<'a> Partition<'a> {
    pub fn tasks_on(&self, date: NaiveDate) -> &[&'a Task] {
        self.daily.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Spanning tasks that touch the inclusive interval `[from, to]`.
    pub fn spanning_within(&self, from: NaiveDate, to: NaiveDate) -> Vec<SpanningTask<'a>> {
        self.spanning
            .iter()
            .filter(|s| s.span.intersects(from, to))
            .copied()
            .collect()
    }
}

/// Splits `tasks` into day buckets for `window` and a list of spanning tasks.
///
/// Single-day tasks land in the bucket of their due date. Undated tasks and
/// tasks due outside the window are left out. Input order is kept inside
/// each bucket.
pub fn partition<'a>(tasks: &'a [Task], window: &[NaiveDate]) -> Partition<'a> {
    let mut daily: BTreeMap<NaiveDate, Vec<&'a Task>> =
        window.iter().map(|d| (*d, Vec::new())).collect();
    let mut spanning = Vec::new();

    for task in tasks {
        let span = resolve(task);
        if span.is_multi_day {
            spanning.push(SpanningTask { task, span });
            continue;
        }
        if let Some(due) = task.due_date() {
            if let Some(bucket) = daily.get_mut(&due) {
                bucket.push(task);
            }
        }
    }

    Partition { daily, spanning }
}
