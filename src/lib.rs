//! # TaskFlow
//!
//! A task manager with calendar and timeline views. Tasks carry an optional
//! due date and, for multi-day work, a start date. The same collection is
//! shown as a list, a month calendar with spanning bars, and a zoomable week
//! timeline where tasks can be dragged and resized.
//!
//! ## Features
//!
//! *   **Multi-day tasks**: A start and due date turn a task into a bar that spans every day in between.
//! *   **Calendar and timeline**: Month grid and a zoomable week window, with spanning tasks stacked into lanes.
//! *   **Drag and resize**: Move a task to another day or stretch either edge of its range.
//! *   **Progress and statistics**: Completion rate, overdue count, on-time rate, work streak and a productivity score.
//! *   **Sessions**: Every run is a session; progress is compared against the previous one.
//! *   **Import/Export**: iCalendar export and import, JSON backup and restore.
//!
//! ## Data Storage
//!
//! Data is kept per user as JSON files in the local data directory:
//! *   Linux: `~/.local/share/taskflow/`
//! *   macOS: `~/Library/Application Support/taskflow/`
//! *   Windows: `%LOCALAPPDATA%\taskflow\`
//!
//! Override the directory with `TASKFLOW_DATA_DIR` and the user with
//! `TASKFLOW_USER` or `--user`.

pub mod backup;
pub mod commands;
pub mod config;
pub mod duration;
pub mod error;
pub mod ical;
pub mod layout;
pub mod models;
pub mod mutator;
pub mod partition;
pub mod query;
pub mod stats;
pub mod storage;
pub mod tui;
