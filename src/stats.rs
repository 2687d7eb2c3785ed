//! Progress and productivity statistics.
//!
//! Everything here is a pure function of the task collection and the current
//! time. Snapshots are recomputed from scratch on every save and never
//! updated incrementally.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::layout::WeekStart;
use crate::models::{Priority, Status, Task};

/// Task counts per priority.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PriorityBreakdown {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

/// Counts and completion rate over the whole collection.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Progress {
    pub total: usize,
    pub completed: usize,
    pub in_progress: usize,
    pub todo: usize,
    pub overdue: usize,
    /// Rounded percentage in `0..=100`.
    pub completion_rate: u32,
    pub priority: PriorityBreakdown,
    pub today_tasks: usize,
    pub this_week_tasks: usize,
}

/// Derived productivity metrics.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct Stats {
    pub monthly_completed: usize,
    /// Mean days from creation to completion, one decimal.
    pub avg_completion_time: f64,
    /// Rounded percentage in `0..=100`.
    pub on_time_rate: u32,
    pub productivity_score: u32,
    pub work_streak: u32,
    /// Estimated hours across all tasks.
    pub total_time_spent: u32,
}

/// Activity of the current session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SessionActivity {
    pub last_activity: DateTime<Utc>,
    pub task_count: usize,
    pub completed_in_session: usize,
    pub created_in_session: usize,
    pub session_id: String,
    pub user_id: String,
}

/// Progress as written to storage, stamped with when and by which session.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ProgressRecord {
    #[serde(flatten)]
    pub progress: Progress,
    pub last_updated: DateTime<Utc>,
    pub total_tasks: usize,
    pub session_id: String,
}

/// Stats as written to storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StatsRecord {
    #[serde(flatten)]
    pub stats: Stats,
    pub last_calculated: DateTime<Utc>,
    pub session_id: String,
}

/// Difference between the latest progress and the one saved in the progress history.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionComparison {
    pub current: ProgressRecord,
    pub previous: ProgressRecord,
    pub elapsed: Duration,
    pub tasks_difference: i64,
    pub completion_difference: i64,
}

pub fn compute_progress(tasks: &[Task], now: DateTime<Utc>) -> Progress {
    let today = now.date_naive();
    let (week_start, week_end) = week_range(today);

    let count = |f: &dyn Fn(&Task) -> bool| tasks.iter().filter(|t| f(t)).count();

    let total = tasks.len();
    let completed = count(&|t| t.status == Status::Completed);

    Progress {
        total,
        completed,
        in_progress: count(&|t| t.status == Status::InProgress),
        todo: count(&|t| t.status == Status::Todo),
        overdue: count(&|t| is_overdue(t, today)),
        completion_rate: percent(completed, total),
        priority: PriorityBreakdown {
            high: count(&|t| t.priority == Priority::High),
            medium: count(&|t| t.priority == Priority::Medium),
            low: count(&|t| t.priority == Priority::Low),
        },
        today_tasks: count(&|t| t.due_date() == Some(today)),
        this_week_tasks: count(&|t| {
            t.due_date().is_some_and(|d| week_start <= d && d <= week_end)
        }),
    }
}

pub fn compute_stats(tasks: &[Task], now: DateTime<Utc>) -> Stats {
    let completed: Vec<&Task> = tasks.iter().filter(|t| t.is_completed()).collect();

    let monthly_completed = completed
        .iter()
        .filter(|t| t.updated_at.year() == now.year() && t.updated_at.month() == now.month())
        .count();

    let avg_completion_time = if completed.is_empty() {
        0.0
    } else {
        let total_ms: i64 = completed
            .iter()
            .map(|t| (t.updated_at - t.created_at).num_milliseconds())
            .sum();
        let days = total_ms as f64 / completed.len() as f64 / 86_400_000.0;
        (days * 10.0).round() / 10.0
    };

    let on_time = completed.iter().filter(|t| is_on_time(t)).count();
    let on_time_rate = if completed.is_empty() {
        0.0
    } else {
        on_time as f64 / completed.len() as f64 * 100.0
    };

    let completion_rate = percent(completed.len(), tasks.len()) as f64;

    Stats {
        monthly_completed,
        avg_completion_time,
        on_time_rate: on_time_rate.round() as u32,
        productivity_score: productivity_score(completion_rate, on_time_rate),
        work_streak: work_streak(tasks),
        total_time_spent: total_time_spent(tasks),
    }
}

/// `round(0.6 × completion rate + 0.4 × on-time rate)`.
pub fn productivity_score(completion_rate: f64, on_time_rate: f64) -> u32 {
    (completion_rate * 0.6 + on_time_rate * 0.4).round() as u32
}

/// Longest run of consecutive calendar days with at least one completion.
pub fn work_streak(tasks: &[Task]) -> u32 {
    let mut dates: Vec<NaiveDate> = tasks
        .iter()
        .filter(|t| t.is_completed())
        .map(|t| t.updated_at.date_naive())
        .collect();
    dates.sort();
    dates.dedup();

    if dates.is_empty() {
        return 0;
    }

    let mut best = 1;
    let mut current = 1;
    for pair in dates.windows(2) {
        if (pair[1] - pair[0]).num_days() == 1 {
            current += 1;
            best = best.max(current);
        } else {
            current = 1;
        }
    }
    best
}

/// Rough effort estimate: 1h per task, 2h for medium, 3h for high priority,
/// one extra hour for long descriptions.
pub fn total_time_spent(tasks: &[Task]) -> u32 {
    tasks
        .iter()
        .map(|t| {
            let base = match t.priority {
                Priority::High => 3,
                Priority::Medium => 2,
                Priority::Low => 1,
            };
            let long = t.description.as_ref().is_some_and(|d| d.chars().count() > 100);
            base + u32::from(long)
        })
        .sum()
}

pub fn compute_session(
    tasks: &[Task],
    session_start: DateTime<Utc>,
    session_id: &str,
    user_id: &str,
    now: DateTime<Utc>,
) -> SessionActivity {
    SessionActivity {
        last_activity: now,
        task_count: tasks.len(),
        completed_in_session: tasks
            .iter()
            .filter(|t| t.is_completed() && t.updated_at >= session_start)
            .count(),
        created_in_session: tasks.iter().filter(|t| t.created_at >= session_start).count(),
        session_id: session_id.to_string(),
        user_id: user_id.to_string(),
    }
}

pub fn compare(current: &ProgressRecord, previous: &ProgressRecord) -> SessionComparison {
    SessionComparison {
        current: current.clone(),
        previous: previous.clone(),
        elapsed: current.last_updated - previous.last_updated,
        tasks_difference: current.total_tasks as i64 - previous.total_tasks as i64,
        completion_difference: current.progress.completed as i64 - previous.progress.completed as i64,
    }
}

/// Not completed and due before today.
pub fn is_overdue(task: &Task, today: NaiveDate) -> bool {
    !task.is_completed() && task.due_date().is_some_and(|d| d < today)
}

/// Completed tasks without a due date always count as on time.
pub fn is_on_time(task: &Task) -> bool {
    match task.due_date() {
        Some(due) => task.updated_at.date_naive() <= due,
        None => true,
    }
}

/// The Sunday-based week containing `today`.
pub fn week_range(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = WeekStart::Sunday.week_of(today);
    (start, start + Duration::days(6))
}

fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        0
    } else {
        (part as f64 / total as f64 * 100.0).round() as u32
    }
}
