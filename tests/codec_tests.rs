use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use taskflow::backup::{create_backup, read_backup};
use taskflow::ical::{escape_text, export_ical, parse_ical, priority_from_number, unescape_text};
use taskflow::models::{Priority, Schedule, Status, Task};
use taskflow::mutator::TaskDraft;
use taskflow::storage::{MemoryStore, TaskRepository};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

#[test]
fn test_export_ical_document() {
    let mut task = Task::new("Write; report, v2", at(2024, 6, 1));
    task.description = Some("line one\nline two".into());
    task.priority = Priority::High;
    task.status = Status::InProgress;
    task.schedule = Schedule::SingleDay { due_date: date(2024, 6, 10) };

    let ics = export_ical(std::slice::from_ref(&task), at(2024, 6, 2));

    assert!(ics.starts_with("BEGIN:VCALENDAR\r\nVERSION:2.0\r\nPRODID:-//TaskFlow//Task Management//EN\r\n"));
    assert!(ics.ends_with("END:VCALENDAR\r\n"));
    assert!(ics.contains(&format!("UID:taskflow-{}@taskflow.app\r\n", task.id)));
    assert!(ics.contains("DTSTAMP:20240602T120000Z\r\n"));
    assert!(ics.contains("DTSTART:20240610T000000Z\r\n"));
    assert!(ics.contains("DTEND:20240610T010000Z\r\n"));
    assert!(ics.contains("SUMMARY:Write\\; report\\, v2\r\n"));
    assert!(ics.contains("DESCRIPTION:line one\\nline two\r\n"));
    assert!(ics.contains("PRIORITY:1\r\n"));
    assert!(ics.contains("STATUS:IN-PROCESS\r\n"));
    assert!(ics.contains("CATEGORIES:TaskFlow,HIGH\r\n"));
}

#[test]
fn test_undated_task_exports_at_now() {
    let task = Task::new("Someday", at(2024, 6, 1));
    let ics = export_ical(&[task], at(2024, 6, 2));
    assert!(ics.contains("DTSTART:20240602T120000Z\r\n"));
    assert!(ics.contains("DTEND:20240602T130000Z\r\n"));
}

#[test]
fn test_ical_round_trip_loses_start_date() {
    let mut task = Task::new("Conference", at(2024, 6, 1));
    task.description = Some("Bring badge, laptop".into());
    task.priority = Priority::Low;
    task.status = Status::Completed;
    task.schedule = Schedule::Ranged { start_date: date(2024, 6, 10), due_date: date(2024, 6, 12) };

    let ics = export_ical(&[task.clone()], at(2024, 6, 2));
    let imported = parse_ical(&ics, at(2024, 6, 3));

    assert_eq!(imported.len(), 1);
    let back = &imported[0];
    assert_eq!(back.title, task.title);
    assert_eq!(back.description, task.description);
    assert_eq!(back.priority, Priority::Low);
    assert_eq!(back.status, Status::Completed);
    assert_eq!(back.schedule, Schedule::SingleDay { due_date: date(2024, 6, 12) });
    assert_eq!(back.start_date(), None);
    assert_ne!(back.id, task.id);
}

#[test]
fn test_parse_ical_variants() {
    let ics = "BEGIN:VCALENDAR\n\
               BEGIN:VEVENT\n\
               SUMMARY:All day\n\
               DTSTART;VALUE=DATE:20240610\n\
               PRIORITY:4\n\
               END:VEVENT\n\
               BEGIN:VEVENT\n\
               DESCRIPTION:no summary here\n\
               END:VEVENT\n\
               BEGIN:VEVENT\n\
               SUMMARY:Folded\n \
               title\n\
               DTSTART:garbage\n\
               PRIORITY:high\n\
               STATUS:NEEDS-ACTION\n\
               END:VEVENT\n\
               END:VCALENDAR\n";

    let tasks = parse_ical(ics, at(2024, 6, 1));
    assert_eq!(tasks.len(), 2);

    assert_eq!(tasks[0].title, "All day");
    assert_eq!(tasks[0].due_date(), Some(date(2024, 6, 10)));
    assert_eq!(tasks[0].priority, Priority::Medium);

    assert_eq!(tasks[1].title, "Foldedtitle");
    assert_eq!(tasks[1].schedule, Schedule::Unscheduled);
    assert_eq!(tasks[1].priority, Priority::Medium);
    assert_eq!(tasks[1].status, Status::Todo);
}

#[test]
fn test_priority_buckets() {
    assert_eq!(priority_from_number("1"), Priority::High);
    assert_eq!(priority_from_number("3"), Priority::High);
    assert_eq!(priority_from_number("5"), Priority::Medium);
    assert_eq!(priority_from_number("6"), Priority::Medium);
    assert_eq!(priority_from_number("9"), Priority::Low);
    assert_eq!(priority_from_number("x"), Priority::Medium);
}

#[test]
fn test_text_escaping() {
    let raw = "a\\b;c,d\ne";
    assert_eq!(escape_text(raw), "a\\\\b\\;c\\,d\\ne");
    assert_eq!(unescape_text(&escape_text(raw)), raw);
}

#[test]
fn test_backup_restore_round_trip() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let trip = TaskDraft {
        title: "Trip".into(),
        start_date: Some(date(2024, 6, 3)),
        due_date: Some(date(2024, 6, 5)),
        ..TaskDraft::default()
    };
    repo.create(trip, at(2024, 6, 1)).unwrap();
    repo.create(TaskDraft { title: "Call".into(), ..TaskDraft::default() }, at(2024, 6, 1)).unwrap();

    let backup = create_backup(&repo, at(2024, 6, 2));
    assert_eq!(backup.user_id, "alice");
    assert!(backup.progress.is_some());
    assert!(backup.session_info.is_some());

    let json = serde_json::to_string(&backup).unwrap();
    let restored = read_backup(&json).unwrap();
    assert_eq!(restored.skipped, 0);
    assert_eq!(restored.tasks, repo.tasks().to_vec());
}

#[test]
fn test_restore_loose_task_array() {
    let json = r#"[
        {"id": "1718000000000", "title": "Legacy trip", "priority": "high", "status": "in_progress",
         "start_date": "2024-06-01", "due_date": "2024-06-03", "created_at": "2024-05-20T08:00:00Z"},
        {"id": "2", "title": "No created_at"},
        {"id": "3", "title": "Inverted", "start_date": "2024-06-05", "due_date": "2024-06-01",
         "created_at": "2024-05-20T08:00:00Z"},
        {"id": "4", "title": "   ", "created_at": "2024-05-20T08:00:00Z"}
    ]"#;

    let restored = read_backup(json).unwrap();
    assert_eq!(restored.tasks.len(), 1);
    assert_eq!(restored.skipped, 3);

    let t = &restored.tasks[0];
    assert_eq!(t.title, "Legacy trip");
    assert_eq!(t.priority, Priority::High);
    assert_eq!(t.status, Status::InProgress);
    assert_eq!(t.schedule, Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 3) });
    assert_eq!(t.updated_at, t.created_at);
}

#[test]
fn test_restore_rejects_non_task_documents() {
    assert!(read_backup(r#"{"something": 1}"#).is_err());
    assert!(read_backup("42").is_err());
    assert!(read_backup("not json").is_err());
}

#[test]
fn test_restore_skips_inverted_typed_range() {
    let json = r#"{"tasks": [
        {"id": "0a6f2d9e-1c3b-4e5f-8a7b-9c0d1e2f3a4b", "title": "Backwards", "kind": "ranged",
         "start_date": "2024-06-05", "due_date": "2024-06-01",
         "created_at": "2024-05-20T08:00:00Z", "updated_at": "2024-05-20T08:00:00Z"},
        {"id": "1b7a3e0f-2d4c-4f60-9b8c-0d1e2f3a4b5c", "title": "Forwards", "kind": "ranged",
         "start_date": "2024-06-01", "due_date": "2024-06-05",
         "created_at": "2024-05-20T08:00:00Z", "updated_at": "2024-05-20T08:00:00Z"}
    ]}"#;

    let restored = read_backup(json).unwrap();
    assert_eq!(restored.skipped, 1);
    assert_eq!(restored.tasks.len(), 1);
    assert_eq!(restored.tasks[0].title, "Forwards");
    assert_eq!(
        restored.tasks[0].schedule,
        Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 5) }
    );
}

#[test]
fn test_schedule_json_rejects_inverted_range() {
    let inverted = r#"{"kind": "ranged", "start_date": "2024-06-05", "due_date": "2024-06-01"}"#;
    assert!(serde_json::from_str::<Schedule>(inverted).is_err());

    let single = r#"{"kind": "single_day", "due_date": "2024-06-01"}"#;
    assert_eq!(
        serde_json::from_str::<Schedule>(single).unwrap(),
        Schedule::SingleDay { due_date: date(2024, 6, 1) }
    );

    let ranged = Schedule::Ranged { start_date: date(2024, 6, 1), due_date: date(2024, 6, 1) };
    let text = serde_json::to_string(&ranged).unwrap();
    assert_eq!(serde_json::from_str::<Schedule>(&text).unwrap(), ranged);
}
