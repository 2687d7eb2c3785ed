use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use taskflow::error::TaskflowError;
use taskflow::models::{Status, Task};
use taskflow::mutator::{TaskDraft, TaskPatch};
use taskflow::storage::{FileStore, KeyValueStore, MemoryStore, TaskRepository, HISTORY_LIMIT};
use uuid::Uuid;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn draft(title: &str) -> TaskDraft {
    TaskDraft { title: title.into(), ..TaskDraft::default() }
}

#[test]
fn test_create_saves_all_snapshots() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    repo.create(draft("First"), at(2024, 6, 1)).unwrap();
    repo.create(draft("Second"), at(2024, 6, 2)).unwrap();

    // Newest first.
    assert_eq!(repo.tasks()[0].title, "Second");

    let store = repo.store();
    for key in ["tasks_alice", "progress_alice", "stats_alice", "session_data_alice"] {
        assert!(store.get(key).unwrap().is_some(), "missing {}", key);
    }

    let progress = repo.progress().unwrap();
    assert_eq!(progress.total_tasks, 2);
    assert_eq!(progress.session_id, repo.session().id);
    assert_eq!(repo.session_activity().unwrap().created_in_session, 2);
}

#[test]
fn test_tasks_survive_reopen_and_stay_per_user() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let id = repo.create(draft("Persist me"), at(2024, 6, 1)).unwrap().id;

    let reopened = TaskRepository::open(repo.store().clone(), "alice", at(2024, 6, 2)).unwrap();
    assert_eq!(reopened.tasks().len(), 1);
    assert_eq!(reopened.tasks()[0].id, id);
    assert_ne!(reopened.session().id, repo.session().id);

    let other = TaskRepository::open(repo.store().clone(), "bob", at(2024, 6, 2)).unwrap();
    assert!(other.tasks().is_empty());
}

#[test]
fn test_corrupt_task_list_loads_empty() {
    let mut store = MemoryStore::new();
    store.set("tasks_alice", "{ not json").unwrap();
    let repo = TaskRepository::open(store, "alice", at(2024, 6, 1)).unwrap();
    assert!(repo.tasks().is_empty());
}

#[test]
fn test_stored_inverted_range_is_dropped_on_load() {
    let good = Task::new("Good", at(2024, 6, 1));
    let mut bad = serde_json::to_value(Task::new("Backwards", at(2024, 6, 1))).unwrap();
    bad["kind"] = "ranged".into();
    bad["start_date"] = "2024-06-05".into();
    bad["due_date"] = "2024-06-01".into();
    let list = serde_json::Value::Array(vec![bad, serde_json::to_value(&good).unwrap()]);

    let mut store = MemoryStore::new();
    store.set("tasks_alice", &list.to_string()).unwrap();
    let repo = TaskRepository::open(store, "alice", at(2024, 6, 2)).unwrap();

    assert_eq!(repo.tasks().len(), 1);
    assert_eq!(repo.tasks()[0], good);
}

#[test]
fn test_find_by_prefix() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let mut a = Task::new("a", at(2024, 6, 1));
    a.id = Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000001").unwrap();
    let mut b = Task::new("b", at(2024, 6, 1));
    b.id = Uuid::parse_str("aaaaaaaa-0000-4000-8000-000000000002").unwrap();
    let mut c = Task::new("c", at(2024, 6, 1));
    c.id = Uuid::parse_str("bbbbbbbb-0000-4000-8000-000000000003").unwrap();
    repo.replace_all(vec![a, b, c], at(2024, 6, 1)).unwrap();

    assert_eq!(repo.find("bbbb").unwrap().title, "c");
    assert_eq!(repo.find("AAAAAAAA-0000-4000-8000-000000000002").unwrap().title, "b");
    assert!(matches!(repo.find("aaaa"), Err(TaskflowError::AmbiguousId(_))));
    assert!(matches!(repo.find("cccc"), Err(TaskflowError::TaskNotFound(_))));
    assert!(matches!(repo.find(""), Err(TaskflowError::TaskNotFound(_))));
}

#[test]
fn test_invalid_update_is_not_saved() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let created = TaskDraft {
        title: "Trip".into(),
        start_date: Some(date(2024, 6, 3)),
        due_date: Some(date(2024, 6, 5)),
        ..TaskDraft::default()
    };
    let id = repo.create(created, at(2024, 6, 1)).unwrap().id.to_string();

    let patch = TaskPatch { due_date: Some(Some(date(2024, 6, 1))), ..TaskPatch::default() };
    assert!(repo.update(&id, patch, at(2024, 6, 2)).is_err());

    let reopened = TaskRepository::open(repo.store().clone(), "alice", at(2024, 6, 3)).unwrap();
    assert_eq!(reopened.tasks()[0].due_date(), Some(date(2024, 6, 5)));
    assert_eq!(reopened.tasks()[0].updated_at, at(2024, 6, 1));
}

#[test]
fn test_status_delete_and_clear() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let id = repo.create(draft("One"), at(2024, 6, 1)).unwrap().id.to_string();
    repo.create(draft("Two"), at(2024, 6, 1)).unwrap();

    let done = repo.set_status(&id, Status::Completed, at(2024, 6, 2)).unwrap();
    assert!(done.is_completed());
    assert_eq!(done.updated_at, at(2024, 6, 2));
    assert_eq!(repo.progress().unwrap().progress.completion_rate, 50);

    let removed = repo.delete(&id, at(2024, 6, 2)).unwrap();
    assert_eq!(removed.title, "One");
    assert_eq!(repo.tasks().len(), 1);

    assert_eq!(repo.clear(at(2024, 6, 2)).unwrap(), 1);
    assert!(repo.tasks().is_empty());
    assert_eq!(repo.progress().unwrap().total_tasks, 0);
}

#[test]
fn test_modify_saves_only_on_change() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    let id = repo.create(draft("One"), at(2024, 6, 1)).unwrap().id;

    assert!(!repo.modify(id, at(2024, 6, 2), |_| false).unwrap());
    assert!(repo.modify(id, at(2024, 6, 2), |t| {
        t.title = "Renamed".into();
        true
    })
    .unwrap());
    let stored = repo.store().get("tasks_alice").unwrap().unwrap();
    assert!(stored.contains("Renamed"));

    assert!(matches!(repo.modify(Uuid::new_v4(), at(2024, 6, 2), |_| true), Err(TaskflowError::TaskNotFound(_))));
}

#[test]
fn test_session_comparison_against_previous_session() {
    let mut first = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 6, 1)).unwrap();
    first.create(draft("One"), at(2024, 6, 1)).unwrap();
    first.create(draft("Two"), at(2024, 6, 1)).unwrap();
    assert!(first.session_comparison().is_none());

    let mut second = TaskRepository::open(first.store().clone(), "alice", at(2024, 6, 3)).unwrap();
    assert_eq!(second.progress_history().len(), 1);

    let id = second.create(draft("Three"), at(2024, 6, 3)).unwrap().id.to_string();
    second.set_status(&id, Status::Completed, at(2024, 6, 3)).unwrap();

    let cmp = second.session_comparison().unwrap();
    assert_eq!(cmp.tasks_difference, 1);
    assert_eq!(cmp.completion_difference, 1);
    assert_eq!(cmp.elapsed, Duration::days(2));
}

#[test]
fn test_progress_history_is_capped() {
    let mut repo = TaskRepository::open(MemoryStore::new(), "alice", at(2024, 1, 1)).unwrap();
    repo.create(draft("One"), at(2024, 1, 1)).unwrap();

    let mut now = at(2024, 1, 1);
    for _ in 0..HISTORY_LIMIT + 5 {
        now += Duration::hours(1);
        let mut next = TaskRepository::open(repo.store().clone(), "alice", now).unwrap();
        next.save(now).unwrap();
        repo = next;
    }
    assert_eq!(repo.progress_history().len(), HISTORY_LIMIT);
}

#[test]
fn test_file_store_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let mut store = FileStore::new(dir.path().join("data"));

    assert_eq!(store.get("tasks_alice").unwrap(), None);
    store.set("tasks_alice", "[]").unwrap();
    assert!(dir.path().join("data").join("tasks_alice.json").exists());
    assert_eq!(store.get("tasks_alice").unwrap().as_deref(), Some("[]"));

    // Path separators never escape the directory.
    store.set("../evil", "x").unwrap();
    assert!(dir.path().join("data").join(".._evil.json").exists());

    store.remove("tasks_alice").unwrap();
    assert_eq!(store.get("tasks_alice").unwrap(), None);
    store.remove("tasks_alice").unwrap();
}
