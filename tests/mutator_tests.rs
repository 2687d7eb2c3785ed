use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use taskflow::error::TaskflowError;
use taskflow::models::{Priority, Schedule, Status, Task};
use taskflow::mutator::{
    apply_patch, create_task, drop_task, pixels_to_days, resize_task, Gesture, GestureController, ResizeEdge,
    TaskDraft, TaskPatch,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn scheduled(title: &str, schedule: Schedule) -> Task {
    let mut t = Task::new(title, at(2024, 6, 1));
    t.schedule = schedule;
    t
}

#[test]
fn test_create_task_defaults() {
    let draft = TaskDraft { title: "  Write report  ".into(), ..TaskDraft::default() };
    let task = create_task(draft, at(2024, 6, 1)).unwrap();
    assert_eq!(task.title, "Write report");
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.status, Status::Todo);
    assert_eq!(task.schedule, Schedule::Unscheduled);
    assert_eq!(task.created_at, task.updated_at);
}

#[test]
fn test_create_task_validation() {
    let empty = TaskDraft { title: "   ".into(), ..TaskDraft::default() };
    assert!(matches!(create_task(empty, at(2024, 6, 1)), Err(TaskflowError::EmptyTitle)));

    let inverted = TaskDraft {
        title: "Trip".into(),
        start_date: Some(date(2024, 6, 5)),
        due_date: Some(date(2024, 6, 1)),
        ..TaskDraft::default()
    };
    assert!(matches!(
        create_task(inverted, at(2024, 6, 1)),
        Err(TaskflowError::InvalidDateRange { .. })
    ));

    let no_due = TaskDraft { title: "Trip".into(), start_date: Some(date(2024, 6, 5)), ..TaskDraft::default() };
    assert!(matches!(create_task(no_due, at(2024, 6, 1)), Err(TaskflowError::MissingDueDate)));
}

#[test]
fn test_rejected_patch_leaves_task_untouched() {
    let mut task = scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) });
    let before = task.clone();

    let patch = TaskPatch {
        title: Some("Renamed".into()),
        due_date: Some(Some(date(2024, 6, 1))),
        ..TaskPatch::default()
    };
    assert!(apply_patch(&mut task, patch, at(2024, 6, 2)).is_err());
    assert_eq!(task, before);
}

#[test]
fn test_patch_clears_dates_and_touches() {
    let mut task = scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) });
    let patch = TaskPatch {
        start_date: Some(None),
        description: Some(Some("pack bags".into())),
        ..TaskPatch::default()
    };
    apply_patch(&mut task, patch, at(2024, 6, 2)).unwrap();
    assert_eq!(task.schedule, Schedule::SingleDay { due_date: date(2024, 6, 5) });
    assert_eq!(task.description.as_deref(), Some("pack bags"));
    assert_eq!(task.updated_at, at(2024, 6, 2));
}

#[test]
fn test_drop_preserves_range_length() {
    let mut task = scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) });
    assert!(drop_task(&mut task, date(2024, 6, 10), at(2024, 6, 2)));
    assert_eq!(task.schedule, Schedule::Ranged { start_date: date(2024, 6, 10), due_date: date(2024, 6, 12) });
    assert_eq!(task.updated_at, at(2024, 6, 2));
}

#[test]
fn test_drop_sets_due_date_of_single_day_tasks() {
    let mut single = scheduled("Call", Schedule::SingleDay { due_date: date(2024, 6, 3) });
    drop_task(&mut single, date(2024, 6, 7), at(2024, 6, 2));
    assert_eq!(single.schedule, Schedule::SingleDay { due_date: date(2024, 6, 7) });

    let mut undated = scheduled("Idea", Schedule::Unscheduled);
    drop_task(&mut undated, date(2024, 6, 7), at(2024, 6, 2));
    assert_eq!(undated.due_date(), Some(date(2024, 6, 7)));
    assert_eq!(undated.start_date(), None);
}

#[test]
fn test_resize_end_below_start_is_ignored() {
    let mut task = scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) });
    let before = task.clone();
    assert!(!resize_task(&mut task, ResizeEdge::End, -3, at(2024, 6, 2)));
    assert_eq!(task, before);

    assert!(resize_task(&mut task, ResizeEdge::End, -2, at(2024, 6, 2)));
    assert_eq!(task.due_date(), Some(date(2024, 6, 3)));
}

#[test]
fn test_resize_start_past_end_is_ignored() {
    let mut task = scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) });
    assert!(!resize_task(&mut task, ResizeEdge::Start, 3, at(2024, 6, 2)));
    assert!(resize_task(&mut task, ResizeEdge::Start, -2, at(2024, 6, 2)));
    assert_eq!(task.start_date(), Some(date(2024, 6, 1)));
    assert_eq!(task.due_date(), Some(date(2024, 6, 5)));
}

#[test]
fn test_resize_past_calendar_limits_is_ignored() {
    let range = Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 3) };
    let mut task = scheduled("Trip", range);
    assert!(!resize_task(&mut task, ResizeEdge::End, 200_000_000, at(2024, 6, 2)));
    assert!(!resize_task(&mut task, ResizeEdge::Start, -200_000_000, at(2024, 6, 2)));
    assert!(!resize_task(&mut task, ResizeEdge::End, i64::MAX, at(2024, 6, 2)));
    assert_eq!(task.schedule, range);
    assert_eq!(task.updated_at, at(2024, 6, 1));
}

#[test]
fn test_drop_near_last_date_is_refused() {
    let range = Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 3) };
    let mut task = scheduled("Trip", range);
    assert!(!drop_task(&mut task, NaiveDate::MAX, at(2024, 6, 2)));
    assert_eq!(task.schedule, range);

    let mut controller = GestureController::new();
    assert!(controller.begin_drag(task.id));
    let mut tasks = vec![task];
    assert_eq!(controller.drop_on(&mut tasks, NaiveDate::MAX, at(2024, 6, 2)), None);
    assert_eq!(tasks[0].schedule, range);
    assert!(controller.is_idle());

    // Single-day tasks have no length to carry over.
    let mut single = scheduled("Call", Schedule::SingleDay { due_date: date(2024, 6, 3) });
    assert!(drop_task(&mut single, NaiveDate::MAX, at(2024, 6, 2)));
}

#[test]
fn test_resize_single_day_becomes_ranged_from_resolved_start() {
    // Created 2024-06-01, so the resolved span starts there.
    let mut task = scheduled("Report", Schedule::SingleDay { due_date: date(2024, 6, 3) });
    assert!(resize_task(&mut task, ResizeEdge::End, 2, at(2024, 6, 2)));
    assert_eq!(task.schedule, Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 5) });
}

#[test]
fn test_resize_without_due_date_is_ignored() {
    let mut task = scheduled("Idea", Schedule::Unscheduled);
    assert!(!resize_task(&mut task, ResizeEdge::End, 2, at(2024, 6, 2)));
    assert_eq!(task.schedule, Schedule::Unscheduled);
}

#[test]
fn test_pixels_to_days_rounds() {
    assert_eq!(pixels_to_days(149.0, 100.0), 1);
    assert_eq!(pixels_to_days(150.0, 100.0), 2);
    assert_eq!(pixels_to_days(-160.0, 100.0), -2);
    assert_eq!(pixels_to_days(40.0, 100.0), 0);
    assert_eq!(pixels_to_days(500.0, 0.0), 0);
}

#[test]
fn test_resize_gesture_measures_from_snapshot() {
    let mut tasks = vec![scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) })];
    let original = tasks[0].schedule;
    let mut gesture = GestureController::new();

    gesture.begin_resize(&tasks[0], ResizeEdge::End, 300.0);
    assert!(matches!(gesture.gesture(), Gesture::Resizing { .. }));

    // Less than half a day: nothing happens.
    assert!(!gesture.pointer_move(&mut tasks, 340.0, 100.0, at(2024, 6, 2)));
    assert_eq!(tasks[0].schedule, original);

    assert!(gesture.pointer_move(&mut tasks, 400.0, 100.0, at(2024, 6, 2)));
    assert_eq!(tasks[0].due_date(), Some(date(2024, 6, 6)));

    // Same day delta again is ignored.
    assert!(!gesture.pointer_move(&mut tasks, 420.0, 100.0, at(2024, 6, 2)));

    assert!(gesture.pointer_move(&mut tasks, 500.0, 100.0, at(2024, 6, 2)));
    assert_eq!(tasks[0].due_date(), Some(date(2024, 6, 7)));

    // Inverting the range is refused and keeps the last valid state.
    assert!(!gesture.pointer_move(&mut tasks, -100.0, 100.0, at(2024, 6, 2)));
    assert_eq!(tasks[0].due_date(), Some(date(2024, 6, 7)));

    // Back at the origin restores the original dates.
    assert!(gesture.pointer_move(&mut tasks, 300.0, 100.0, at(2024, 6, 2)));
    assert_eq!(tasks[0].schedule, original);

    gesture.pointer_up();
    assert!(gesture.is_idle());
}

#[test]
fn test_drag_gesture() {
    let mut tasks = vec![scheduled("Call", Schedule::SingleDay { due_date: date(2024, 6, 3) })];
    let id = tasks[0].id;
    let mut gesture = GestureController::new();

    assert_eq!(gesture.drop_on(&mut tasks, date(2024, 6, 9), at(2024, 6, 2)), None);

    assert!(gesture.begin_drag(id));
    assert_eq!(gesture.drop_on(&mut tasks, date(2024, 6, 9), at(2024, 6, 2)), Some(id));
    assert_eq!(tasks[0].due_date(), Some(date(2024, 6, 9)));
    assert!(gesture.is_idle());
}

#[test]
fn test_drag_refused_while_resizing() {
    let tasks = vec![scheduled("Trip", Schedule::Ranged { start_date: date(2024, 6, 3), due_date: date(2024, 6, 5) })];
    let mut gesture = GestureController::new();
    gesture.begin_resize(&tasks[0], ResizeEdge::Start, 0.0);
    assert!(!gesture.begin_drag(tasks[0].id));
    assert!(matches!(gesture.gesture(), Gesture::Resizing { edge: ResizeEdge::Start, .. }));
}
