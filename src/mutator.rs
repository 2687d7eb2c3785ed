//! Task creation, edits and the drag/resize gesture state machine.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::duration::resolve;
use crate::error::{Result, TaskflowError};
use crate::models::{Priority, Schedule, Status, Task};

/// Fields for a new task.
#[derive(Debug, Clone, Default)]
pub struct TaskDraft {
    pub title: String,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub start_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
}

/// A partial update. `None` leaves a field untouched; `Some(None)` clears an optional one.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub priority: Option<Priority>,
    pub status: Option<Status>,
    pub start_date: Option<Option<NaiveDate>>,
    pub due_date: Option<Option<NaiveDate>>,
}

impl TaskPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.priority.is_none()
            && self.status.is_none()
            && self.start_date.is_none()
            && self.due_date.is_none()
    }
}

/// Builds a validated task with a fresh id and timestamps.
pub fn create_task(draft: TaskDraft, now: DateTime<Utc>) -> Result<Task> {
    let title = validate_title(&draft.title)?;
    let schedule = Schedule::from_dates(draft.start_date, draft.due_date)?;

    let mut task = Task::new(title, now);
    task.description = draft.description.filter(|d| !d.trim().is_empty());
    task.priority = draft.priority.unwrap_or_default();
    task.status = draft.status.unwrap_or_default();
    task.schedule = schedule;
    Ok(task)
}

/// Applies `patch` to `task`. Nothing is changed when validation fails.
pub fn apply_patch(task: &mut Task, patch: TaskPatch, now: DateTime<Utc>) -> Result<()> {
    let title = match &patch.title {
        Some(t) => Some(validate_title(t)?),
        None => None,
    };
    let start = patch.start_date.unwrap_or(task.start_date());
    let due = patch.due_date.unwrap_or(task.due_date());
    let schedule = Schedule::from_dates(start, due)?;

    if let Some(t) = title {
        task.title = t;
    }
    if let Some(d) = patch.description {
        task.description = d.filter(|d| !d.trim().is_empty());
    }
    if let Some(p) = patch.priority {
        task.priority = p;
    }
    if let Some(s) = patch.status {
        task.status = s;
    }
    task.schedule = schedule;
    task.touch(now);
    Ok(())
}

pub fn set_status(task: &mut Task, status: Status, now: DateTime<Utc>) {
    task.status = status;
    task.touch(now);
}

/// Moves a task so that it lands on `date`.
///
/// Ranged tasks keep their length and start on `date`; everything else just
/// gets `date` as its due date. Returns `false`, leaving the task untouched,
/// when the moved range would run past the last representable date.
pub fn drop_task(task: &mut Task, date: NaiveDate, now: DateTime<Utc>) -> bool {
    let schedule = match task.schedule {
        Schedule::Ranged { start_date, due_date } => {
            let Some(due_date) = date.checked_add_signed(due_date - start_date) else {
                debug!(task = %task.id, %date, "drop out of range");
                return false;
            };
            Schedule::Ranged { start_date: date, due_date }
        }
        Schedule::SingleDay { .. } | Schedule::Unscheduled => Schedule::SingleDay { due_date: date },
    };
    task.schedule = schedule;
    task.touch(now);
    true
}

/// Which edge of a bar is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeEdge {
    Start,
    End,
}

/// Computes the dates a resize by `days_delta` would produce, or `None` if it
/// would invert the range, leave the calendar or the task has no due date.
pub fn resized_dates(task: &Task, edge: ResizeEdge, days_delta: i64) -> Option<(NaiveDate, NaiveDate)> {
    task.due_date()?;
    let span = resolve(task);
    let delta = Duration::try_days(days_delta)?;

    match edge {
        ResizeEdge::End => {
            let new_end = span.end.checked_add_signed(delta)?;
            (new_end >= span.start).then_some((span.start, new_end))
        }
        ResizeEdge::Start => {
            let new_start = span.start.checked_add_signed(delta)?;
            (new_start <= span.end).then_some((new_start, span.end))
        }
    }
}

/// Resizes one edge of a task. Returns `false`, leaving the task untouched,
/// when the new range would be inverted.
pub fn resize_task(task: &mut Task, edge: ResizeEdge, days_delta: i64, now: DateTime<Utc>) -> bool {
    match resized_dates(task, edge, days_delta) {
        Some((start_date, due_date)) => {
            task.schedule = Schedule::Ranged { start_date, due_date };
            task.touch(now);
            true
        }
        None => {
            debug!(task = %task.id, ?edge, days_delta, "resize rejected");
            false
        }
    }
}

/// Converts a horizontal pointer movement to whole days.
pub fn pixels_to_days(delta_x: f64, day_width: f64) -> i64 {
    if day_width <= 0.0 || !delta_x.is_finite() {
        return 0;
    }
    (delta_x / day_width).round() as i64
}

/// Current pointer gesture on the timeline.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    #[default]
    Idle,
    Dragging {
        task_id: Uuid,
    },
    Resizing {
        task_id: Uuid,
        edge: ResizeEdge,
        origin_x: f64,
        /// The task as it was when the gesture began.
        snapshot: Box<Task>,
        /// Day delta already applied, to skip repeated moves within the same day.
        applied: i64,
    },
}

/// Tracks one drag or resize gesture at a time.
#[derive(Debug, Default)]
pub struct GestureController {
    gesture: Gesture,
}

impl GestureController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle
    }

    /// Starts dragging `task_id`. Ignored while a resize is running.
    pub fn begin_drag(&mut self, task_id: Uuid) -> bool {
        if matches!(self.gesture, Gesture::Resizing { .. }) {
            return false;
        }
        self.gesture = Gesture::Dragging { task_id };
        true
    }

    /// Finishes a drag by dropping the dragged task on `date`.
    pub fn drop_on(&mut self, tasks: &mut [Task], date: NaiveDate, now: DateTime<Utc>) -> Option<Uuid> {
        let Gesture::Dragging { task_id } = self.gesture else {
            return None;
        };
        self.gesture = Gesture::Idle;
        let task = tasks.iter_mut().find(|t| t.id == task_id)?;
        if !drop_task(task, date, now) {
            return None;
        }
        debug!(task = %task_id, %date, "task dropped");
        Some(task_id)
    }

    pub fn begin_resize(&mut self, task: &Task, edge: ResizeEdge, origin_x: f64) {
        self.gesture = Gesture::Resizing {
            task_id: task.id,
            edge,
            origin_x,
            snapshot: Box::new(task.clone()),
            applied: 0,
        };
    }

    /// Handles a pointer move during a resize.
    ///
    /// The delta is measured from where the gesture began and applied to the
    /// task as it was then. Returns `true` if the task changed.
    pub fn pointer_move(&mut self, tasks: &mut [Task], x: f64, day_width: f64, now: DateTime<Utc>) -> bool {
        let Gesture::Resizing { task_id, edge, origin_x, snapshot, applied } = &mut self.gesture else {
            return false;
        };
        let days = pixels_to_days(x - *origin_x, day_width);
        if days == *applied {
            return false;
        }
        // Back at the origin: restore the original dates.
        let schedule = if days == 0 {
            snapshot.schedule
        } else {
            match resized_dates(&**snapshot, *edge, days) {
                Some((start_date, due_date)) => Schedule::Ranged { start_date, due_date },
                None => return false,
            }
        };
        let Some(task) = tasks.iter_mut().find(|t| t.id == *task_id) else {
            return false;
        };
        task.schedule = schedule;
        task.touch(now);
        *applied = days;
        true
    }

    /// Ends whatever gesture is running.
    pub fn pointer_up(&mut self) {
        self.gesture = Gesture::Idle;
    }
}

fn validate_title(title: &str) -> Result<String> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(TaskflowError::EmptyTitle);
    }
    Ok(trimmed.to_string())
}
