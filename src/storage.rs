//! Key-value persistence and the per-user task repository.
//!
//! Every value is a JSON snapshot rewritten wholesale. Keys are namespaced
//! by user id: `tasks_<uid>`, `progress_<uid>`, `stats_<uid>`,
//! `session_data_<uid>` and `progress_history_<uid>`.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Result, TaskflowError};
use crate::models::{Status, Task};
use crate::mutator::{apply_patch, create_task, set_status, TaskDraft, TaskPatch};
use crate::stats::{
    compare, compute_progress, compute_session, compute_stats, ProgressRecord, SessionActivity,
    SessionComparison, StatsRecord,
};

/// Number of progress snapshots kept in the history.
pub const HISTORY_LIMIT: usize = 50;

/// A string key-value store, the persistence seam of the repository.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Stores each key as `<key>.json` inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || "-_.@".contains(c) { c } else { '_' })
            .collect();
        self.dir.join(format!("{}.json", name))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }
        let mut f = OpenOptions::new().read(true).open(&path)?;
        let mut s = String::new();
        f.read_to_string(&mut s)?;
        Ok(Some(s))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let mut f = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(self.path_for(key))?;
        f.write_all(value.as_bytes())?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        let path = self.path_for(key);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

/// In-memory store, mostly for tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// A progress snapshot archived in the history.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub record: ProgressRecord,
    pub saved_at: DateTime<Utc>,
}

/// The session a repository was opened in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub started_at: DateTime<Utc>,
}

impl Session {
    pub fn start(now: DateTime<Utc>) -> Self {
        let suffix = Uuid::new_v4().simple().to_string();
        Self {
            id: format!("session_{}_{}", now.timestamp_millis(), &suffix[..9]),
            started_at: now,
        }
    }
}

/// The task collection of one user, persisted through a [`KeyValueStore`].
///
/// The in-memory list is the source of truth; every mutation saves the whole
/// list and recomputes the derived snapshots.
pub struct TaskRepository<S: KeyValueStore> {
    store: S,
    user_id: String,
    session: Session,
    tasks: Vec<Task>,
}

impl<S: KeyValueStore> TaskRepository<S> {
    /// Loads the user's tasks and archives the previously saved progress.
    pub fn open(store: S, user_id: impl Into<String>, now: DateTime<Utc>) -> Result<Self> {
        let mut repo = Self {
            store,
            user_id: user_id.into(),
            session: Session::start(now),
            tasks: Vec::new(),
        };
        repo.tasks = repo.load_tasks();
        debug!(user = %repo.user_id, count = repo.tasks.len(), "tasks loaded");

        if let Some(previous) = repo.progress() {
            if !repo.tasks.is_empty() {
                info!(
                    "Previous session: {} tasks, {}% complete, {} overdue (updated {})",
                    previous.total_tasks,
                    previous.progress.completion_rate,
                    previous.progress.overdue,
                    previous.last_updated
                );
                repo.push_history(previous, now)?;
            }
        }
        Ok(repo)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn tasks_key(&self) -> String {
        format!("tasks_{}", self.user_id)
    }

    pub fn progress_key(&self) -> String {
        format!("progress_{}", self.user_id)
    }

    pub fn stats_key(&self) -> String {
        format!("stats_{}", self.user_id)
    }

    pub fn session_key(&self) -> String {
        format!("session_data_{}", self.user_id)
    }

    pub fn history_key(&self) -> String {
        format!("progress_history_{}", self.user_id)
    }

    /// Finds a task by full id or unique id prefix.
    pub fn find(&self, id: &str) -> Result<&Task> {
        let idx = self.index_of(id)?;
        Ok(&self.tasks[idx])
    }

    pub fn get(&self, id: Uuid) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    /// Creates a task at the front of the list and saves.
    pub fn create(&mut self, draft: TaskDraft, now: DateTime<Utc>) -> Result<&Task> {
        let task = create_task(draft, now)?;
        debug!(task = %task.id, title = %task.title, "task created");
        self.tasks.insert(0, task);
        self.save(now)?;
        Ok(&self.tasks[0])
    }

    pub fn update(&mut self, id: &str, patch: TaskPatch, now: DateTime<Utc>) -> Result<&Task> {
        let idx = self.index_of(id)?;
        apply_patch(&mut self.tasks[idx], patch, now)?;
        self.save(now)?;
        Ok(&self.tasks[idx])
    }

    pub fn set_status(&mut self, id: &str, status: Status, now: DateTime<Utc>) -> Result<&Task> {
        let idx = self.index_of(id)?;
        set_status(&mut self.tasks[idx], status, now);
        self.save(now)?;
        Ok(&self.tasks[idx])
    }

    /// Runs `f` on a task and saves if it reports a change.
    pub fn modify<F>(&mut self, id: Uuid, now: DateTime<Utc>, f: F) -> Result<bool>
    where
        F: FnOnce(&mut Task) -> bool,
    {
        let task = self
            .tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| TaskflowError::TaskNotFound(id.to_string()))?;
        let changed = f(task);
        if changed {
            self.save(now)?;
        }
        Ok(changed)
    }

    /// Gives mutable access to the whole list; the caller must [`save`](Self::save) afterwards.
    pub fn tasks_mut(&mut self) -> &mut [Task] {
        &mut self.tasks
    }

    pub fn delete(&mut self, id: &str, now: DateTime<Utc>) -> Result<Task> {
        let idx = self.index_of(id)?;
        let removed = self.tasks.remove(idx);
        self.save(now)?;
        Ok(removed)
    }

    pub fn clear(&mut self, now: DateTime<Utc>) -> Result<usize> {
        let n = self.tasks.len();
        self.tasks.clear();
        self.save(now)?;
        Ok(n)
    }

    /// Replaces the whole collection, as done by a restore.
    pub fn replace_all(&mut self, tasks: Vec<Task>, now: DateTime<Utc>) -> Result<()> {
        self.tasks = tasks;
        self.save(now)
    }

    /// Appends tasks to the front of the collection, as done by an import.
    pub fn extend(&mut self, tasks: Vec<Task>, now: DateTime<Utc>) -> Result<usize> {
        let n = tasks.len();
        self.tasks.splice(0..0, tasks);
        self.save(now)?;
        Ok(n)
    }

    /// Writes the task list and recomputed progress, stats and session snapshots.
    pub fn save(&mut self, now: DateTime<Utc>) -> Result<()> {
        let progress = ProgressRecord {
            progress: compute_progress(&self.tasks, now),
            last_updated: now,
            total_tasks: self.tasks.len(),
            session_id: self.session.id.clone(),
        };
        let stats = StatsRecord {
            stats: compute_stats(&self.tasks, now),
            last_calculated: now,
            session_id: self.session.id.clone(),
        };
        let activity = compute_session(
            &self.tasks,
            self.session.started_at,
            &self.session.id,
            &self.user_id,
            now,
        );

        let (tasks_key, progress_key) = (self.tasks_key(), self.progress_key());
        let (stats_key, session_key) = (self.stats_key(), self.session_key());
        write_json(&mut self.store, &tasks_key, &self.tasks)?;
        write_json(&mut self.store, &progress_key, &progress)?;
        write_json(&mut self.store, &stats_key, &stats)?;
        write_json(&mut self.store, &session_key, &activity)?;
        debug!(user = %self.user_id, count = self.tasks.len(), "tasks saved");
        Ok(())
    }

    /// Last saved progress snapshot, if any.
    pub fn progress(&self) -> Option<ProgressRecord> {
        self.read_json(&self.progress_key())
    }

    pub fn stats(&self) -> Option<StatsRecord> {
        self.read_json(&self.stats_key())
    }

    pub fn session_activity(&self) -> Option<SessionActivity> {
        self.read_json(&self.session_key())
    }

    pub fn progress_history(&self) -> Vec<HistoryEntry> {
        self.read_json(&self.history_key()).unwrap_or_default()
    }

    /// Compares the current progress with the newest archived snapshot written
    /// by a different session.
    pub fn session_comparison(&self) -> Option<SessionComparison> {
        let current = self.progress()?;
        let history = self.progress_history();
        let previous = history
            .iter()
            .rev()
            .find(|h| h.record.session_id != current.session_id)?;
        Some(compare(&current, &previous.record))
    }

    fn push_history(&mut self, record: ProgressRecord, now: DateTime<Utc>) -> Result<()> {
        let mut history = self.progress_history();
        history.push(HistoryEntry { record, saved_at: now });
        if history.len() > HISTORY_LIMIT {
            let excess = history.len() - HISTORY_LIMIT;
            history.drain(..excess);
        }
        let key = self.history_key();
        write_json(&mut self.store, &key, &history)
    }

    fn index_of(&self, id: &str) -> Result<usize> {
        let needle = id.trim().to_lowercase().replace('-', "");
        if needle.is_empty() {
            return Err(TaskflowError::TaskNotFound(id.to_string()));
        }
        let mut matches = self
            .tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.id.simple().to_string().starts_with(&needle));
        match (matches.next(), matches.next()) {
            (Some((idx, _)), None) => Ok(idx),
            (Some(_), Some(_)) => Err(TaskflowError::AmbiguousId(id.to_string())),
            (None, _) => Err(TaskflowError::TaskNotFound(id.to_string())),
        }
    }

    /// Reads and parses a key. Missing keys and unreadable values yield `None`.
    /// Reads the stored task list, dropping records that fail validation.
    fn load_tasks(&self) -> Vec<Task> {
        let key = self.tasks_key();
        let Some(entries) = self.read_json::<Vec<serde_json::Value>>(&key) else {
            return Vec::new();
        };
        entries
            .into_iter()
            .enumerate()
            .filter_map(|(i, entry)| match serde_json::from_value::<Task>(entry) {
                Ok(task) => Some(task),
                Err(e) => {
                    warn!("Dropping stored task {} in '{}': {}", i, key, e);
                    None
                }
            })
            .collect()
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.store.get(key) {
            Ok(Some(s)) if !s.trim().is_empty() => match serde_json::from_str(&s) {
                Ok(v) => Some(v),
                Err(e) => {
                    warn!("Failed to parse stored '{}': {}", key, e);
                    None
                }
            },
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read stored '{}': {}", key, e);
                None
            }
        }
    }
}

fn write_json<S: KeyValueStore, T: Serialize + ?Sized>(store: &mut S, key: &str, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    store.set(key, &s)
}
