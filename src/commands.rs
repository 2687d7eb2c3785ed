use std::fs;
use std::io::{self, Write};
use std::path::Path;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};
use tracing::info;
use uuid::Uuid;

use crate::backup::{create_backup, read_backup};
use crate::duration::resolve;
use crate::error::{Result, TaskflowError};
use crate::ical::{export_ical, parse_ical};
use crate::layout::{grid_days, layout_row, month_grid, Row, Stacking, TimelineWindow, WeekStart};
use crate::models::{Priority, Status, Task};
use crate::mutator::{resize_task, GestureController, ResizeEdge, TaskDraft, TaskPatch};
use crate::partition::{partition, Partition};
use crate::query::TaskQuery;
use crate::stats::{compute_progress, compute_stats, is_overdue};
use crate::storage::{KeyValueStore, TaskRepository};

/// Parses a `YYYY-MM-DD` date argument.
pub fn parse_date_arg(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| TaskflowError::InvalidDate(s.to_string()))
}

/// Parses an optional date argument for edits: `none` (or an empty string) clears the date.
pub fn parse_optional_date_arg(s: &str) -> Result<Option<NaiveDate>> {
    match s.trim().to_lowercase().as_str() {
        "" | "none" | "-" => Ok(None),
        _ => parse_date_arg(s).map(Some),
    }
}

/// Human readable distance to a due date.
pub fn time_left(due: NaiveDate, today: NaiveDate) -> String {
    let days_left = (due - today).num_days();
    if days_left < 0 {
        format!("{}d overdue", days_left.abs())
    } else if days_left == 0 {
        "Today".to_string()
    } else {
        format!("{}d", days_left)
    }
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn status_color(status: Status) -> Color {
    match status {
        Status::Completed => Color::Green,
        Status::InProgress => Color::Blue,
        Status::Todo => Color::Reset,
    }
}

/// Adds a new task.
pub fn cmd_add<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    title: String,
    description: Option<String>,
    priority: Option<Priority>,
    start: Option<String>,
    due: Option<String>,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<Uuid> {
    let draft = TaskDraft {
        title,
        description,
        priority,
        status: None,
        start_date: start.as_deref().map(parse_date_arg).transpose()?,
        due_date: due.as_deref().map(parse_date_arg).transpose()?,
    };
    let task = repo.create(draft, now)?;
    if !silent {
        println!("Task added (id = {})", task.short_id());
    }
    Ok(task.id)
}

/// Edits an existing task's details.
///
/// Dates accept `none` to clear them. The edit is rejected as a whole if the
/// resulting start date would fall after the due date.
pub fn cmd_edit<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: &str,
    title: Option<String>,
    description: Option<String>,
    priority: Option<Priority>,
    status: Option<Status>,
    start: Option<String>,
    due: Option<String>,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<()> {
    let patch = TaskPatch {
        title,
        description: description.map(|d| Some(d).filter(|d| !d.is_empty())),
        priority,
        status,
        start_date: start.as_deref().map(parse_optional_date_arg).transpose()?,
        due_date: due.as_deref().map(parse_optional_date_arg).transpose()?,
    };
    if patch.is_empty() {
        if !silent {
            println!("Nothing to change.");
        }
        return Ok(());
    }
    let task = repo.update(id, patch, now)?;
    if !silent {
        println!("Task {} updated.", task.short_id());
    }
    Ok(())
}

/// Sets the status of a task.
pub fn cmd_set_status<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: &str,
    status: Status,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<()> {
    let task = repo.set_status(id, status, now)?;
    if !silent {
        println!("Task {} marked as {}.", task.short_id(), status);
    }
    Ok(())
}

/// Removes a task by id.
pub fn cmd_remove<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: &str,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<()> {
    let removed = repo.delete(id, now)?;
    if !silent {
        println!("Task {} removed.", removed.short_id());
    }
    Ok(())
}

/// Deletes every task of the current user.
pub fn cmd_clear<S: KeyValueStore>(repo: &mut TaskRepository<S>, force: bool, now: DateTime<Utc>) -> Result<()> {
    if !force {
        print!(
            "Are you sure you want to delete all {} tasks of '{}'? This cannot be undone. [y/N] ",
            repo.tasks().len(),
            repo.user_id()
        );
        io::stdout().flush()?;
        let mut input = String::new();
        io::stdin().read_line(&mut input)?;
        if input.trim().to_lowercase() != "y" {
            println!("Aborted.");
            return Ok(());
        }
    }
    let n = repo.clear(now)?;
    println!("Removed {} tasks.", n);
    Ok(())
}

/// Drags a task onto `date`. Ranged tasks keep their length.
pub fn cmd_move<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: &str,
    date: &str,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<()> {
    let date = parse_date_arg(date)?;
    let task_id = repo.find(id)?.id;

    let mut gesture = GestureController::new();
    gesture.begin_drag(task_id);
    if gesture.drop_on(repo.tasks_mut(), date, now).is_none() {
        return Err(TaskflowError::InvalidValue { field: "move target", value: date.to_string() });
    }
    repo.save(now)?;

    if !silent {
        let task = repo.find(id)?;
        let span = resolve(task);
        println!("Task {} now spans {} .. {}.", task.short_id(), span.start, span.end);
    }
    Ok(())
}

/// Moves one edge of a task by `days`. Resizes that would put the start after
/// the end are ignored.
pub fn cmd_resize<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    id: &str,
    edge: ResizeEdge,
    days: i64,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<bool> {
    let task_id = repo.find(id)?.id;
    let changed = repo.modify(task_id, now, |t| resize_task(t, edge, days, now))?;
    if !silent {
        let task = repo.find(id)?;
        let span = resolve(task);
        if changed {
            println!("Task {} now spans {} .. {} ({} days).", task.short_id(), span.start, span.end, span.days);
        } else {
            println!("Task {} unchanged ({} .. {}).", task.short_id(), span.start, span.end);
        }
    }
    Ok(changed)
}

/// Lists tasks in a formatted table.
pub fn cmd_list<S: KeyValueStore>(repo: &TaskRepository<S>, query: &TaskQuery, now: DateTime<Utc>) {
    let tasks = query.apply(repo.tasks());
    if tasks.is_empty() {
        println!("No tasks found.");
        return;
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(vec![
            Cell::new("ID").add_attribute(Attribute::Bold),
            Cell::new("Title").add_attribute(Attribute::Bold),
            Cell::new("Priority").add_attribute(Attribute::Bold),
            Cell::new("Status").add_attribute(Attribute::Bold),
            Cell::new("Start").add_attribute(Attribute::Bold),
            Cell::new("Due").add_attribute(Attribute::Bold),
            Cell::new("Days").add_attribute(Attribute::Bold),
            Cell::new("Time Left").add_attribute(Attribute::Bold),
        ]);

    let today = now.date_naive();

    for t in tasks {
        let span = resolve(t);
        let overdue = is_overdue(t, today);
        let time_left_str = match t.due_date() {
            Some(_) if t.is_completed() => "-".to_string(),
            Some(due) => time_left(due, today),
            None => String::new(),
        };

        table.add_row(vec![
            Cell::new(t.short_id()),
            Cell::new(&t.title),
            Cell::new(t.priority).fg(priority_color(t.priority)),
            Cell::new(t.status).fg(status_color(t.status)),
            Cell::new(t.start_date().map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(t.due_date().map(|d| d.to_string()).unwrap_or_default()),
            Cell::new(if span.is_multi_day { span.days.to_string() } else { String::new() }),
            Cell::new(time_left_str).fg(if overdue { Color::Red } else { Color::Reset }),
        ]);
    }

    println!("{table}");
}

/// Prints every field of one task.
pub fn cmd_show<S: KeyValueStore>(repo: &TaskRepository<S>, id: &str) -> Result<()> {
    let t = repo.find(id)?;
    let span = resolve(t);

    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.add_row(vec!["ID".to_string(), t.id.to_string()]);
    table.add_row(vec!["Title".to_string(), t.title.clone()]);
    table.add_row(vec!["Description".to_string(), t.description.clone().unwrap_or_default()]);
    table.add_row(vec!["Priority".to_string(), t.priority.to_string()]);
    table.add_row(vec!["Status".to_string(), t.status.to_string()]);
    table.add_row(vec!["Span".to_string(), format!("{} .. {} ({} days)", span.start, span.end, span.days)]);
    table.add_row(vec!["Multi-day".to_string(), span.is_multi_day.to_string()]);
    table.add_row(vec!["Created".to_string(), t.created_at.to_rfc3339()]);
    table.add_row(vec!["Updated".to_string(), t.updated_at.to_rfc3339()]);
    println!("{table}");
    Ok(())
}

/// Text lines for each day column of a row: the day header, one line per
/// spanning-bar lane, then the single-day tasks of that day.
pub fn day_column_lines(row: &Row, part: &Partition<'_>, month: Option<u32>, today: NaiveDate) -> Vec<Vec<String>> {
    let spanning = part.spanning_within(row.start, row.end);
    let placements = layout_row(row, &spanning, Stacking::default());

    row.days
        .iter()
        .enumerate()
        .map(|(col, day)| {
            let mut lines = Vec::new();
            let marker = if *day == today { "*" } else { "" };
            let header = if month.is_some_and(|m| m != day.month()) {
                format!("({}){}", day.day(), marker)
            } else {
                format!("{}{}", day.day(), marker)
            };
            lines.push(header);

            for p in &placements {
                if col < p.start_index || col > p.end_index {
                    lines.push(String::new());
                    continue;
                }
                let title = spanning
                    .iter()
                    .find(|s| s.task.id == p.task_id)
                    .map(|s| s.task.title.as_str())
                    .unwrap_or("");
                let mut seg = String::new();
                if col == p.start_index {
                    if p.continues_left {
                        seg.push('◀');
                    }
                    seg.push_str(title);
                } else {
                    seg.push_str("━━━");
                }
                if col == p.end_index && p.continues_right {
                    seg.push('▶');
                }
                lines.push(seg);
            }

            for t in part.tasks_on(*day) {
                let mark = if t.is_completed() { "✓" } else { "•" };
                lines.push(format!("{} {}", mark, t.title));
            }
            lines
        })
        .collect()
}

fn weekday_headers(days: &[NaiveDate]) -> Vec<Cell> {
    days.iter()
        .map(|d| Cell::new(d.format("%a").to_string()).add_attribute(Attribute::Bold))
        .collect()
}

/// Prints a month grid with spanning tasks drawn as bars across the days.
pub fn cmd_calendar<S: KeyValueStore>(
    repo: &TaskRepository<S>,
    year: i32,
    month: u32,
    week_start: WeekStart,
    now: DateTime<Utc>,
) -> Result<()> {
    let weeks = month_grid(year, month, week_start)
        .ok_or_else(|| TaskflowError::InvalidDate(format!("{}-{:02}", year, month)))?;
    let days = grid_days(&weeks);
    let part = partition(repo.tasks(), &days);
    let today = now.date_naive();

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(weekday_headers(&weeks[0].days));

    for week in &weeks {
        let columns = day_column_lines(week, &part, Some(month), today);
        table.add_row(columns.into_iter().map(|lines| Cell::new(lines.join("\n"))).collect::<Vec<_>>());
    }

    println!("{}-{:02}", year, month);
    println!("{table}");
    if !part.spanning.is_empty() {
        println!("Spanning tasks: {}", part.spanning.len());
    }
    Ok(())
}

/// Prints the zoomable week timeline around `anchor`.
pub fn cmd_timeline<S: KeyValueStore>(repo: &TaskRepository<S>, anchor: NaiveDate, zoom: f64, now: DateTime<Utc>) {
    let window = TimelineWindow::new(anchor, zoom);
    let row = window.row();
    let part = partition(repo.tasks(), &row.days);

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(weekday_headers(&row.days));
    let columns = day_column_lines(&row, &part, None, now.date_naive());
    table.add_row(columns.into_iter().map(|lines| Cell::new(lines.join("\n"))).collect::<Vec<_>>());

    println!("{} .. {} (zoom {})", row.start, row.end, window.zoom);
    println!("{table}");
}

/// Prints the progress snapshot.
pub fn cmd_progress<S: KeyValueStore>(repo: &TaskRepository<S>, now: DateTime<Utc>) {
    let p = compute_progress(repo.tasks(), now);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Total".to_string(), p.total.to_string()]);
    table.add_row(vec!["Completed".to_string(), p.completed.to_string()]);
    table.add_row(vec!["In progress".to_string(), p.in_progress.to_string()]);
    table.add_row(vec!["Todo".to_string(), p.todo.to_string()]);
    table.add_row(vec!["Overdue".to_string(), p.overdue.to_string()]);
    table.add_row(vec!["Completion rate".to_string(), format!("{}%", p.completion_rate)]);
    table.add_row(vec![
        "Priority (high/medium/low)".to_string(),
        format!("{}/{}/{}", p.priority.high, p.priority.medium, p.priority.low),
    ]);
    table.add_row(vec!["Due today".to_string(), p.today_tasks.to_string()]);
    table.add_row(vec!["Due this week".to_string(), p.this_week_tasks.to_string()]);
    println!("{table}");
}

/// Prints the productivity statistics.
pub fn cmd_stats<S: KeyValueStore>(repo: &TaskRepository<S>, now: DateTime<Utc>) {
    let s = compute_stats(repo.tasks(), now);
    let mut table = Table::new();
    table.load_preset(UTF8_FULL).set_header(vec!["Metric", "Value"]);
    table.add_row(vec!["Completed this month".to_string(), s.monthly_completed.to_string()]);
    table.add_row(vec!["Avg. completion time".to_string(), format!("{:.1} days", s.avg_completion_time)]);
    table.add_row(vec!["On-time rate".to_string(), format!("{}%", s.on_time_rate)]);
    table.add_row(vec!["Productivity score".to_string(), s.productivity_score.to_string()]);
    table.add_row(vec!["Work streak".to_string(), format!("{} days", s.work_streak)]);
    table.add_row(vec!["Estimated effort".to_string(), format!("{}h", s.total_time_spent)]);
    println!("{table}");
}

/// Prints the last session's activity and how progress moved since the previous session.
pub fn cmd_session<S: KeyValueStore>(repo: &TaskRepository<S>) {
    match repo.session_activity() {
        Some(a) => {
            println!("Last activity:        {}", a.last_activity.to_rfc3339());
            println!("Tasks:                {}", a.task_count);
            println!("Completed in session: {}", a.completed_in_session);
            println!("Created in session:   {}", a.created_in_session);
        }
        None => println!("No session data yet."),
    }
    if let Some(c) = repo.session_comparison() {
        println!(
            "Since previous session ({}h ago): {:+} tasks, {:+} completed, completion {}% -> {}%",
            c.elapsed.num_hours(),
            c.tasks_difference,
            c.completion_difference,
            c.previous.progress.completion_rate,
            c.current.progress.completion_rate,
        );
    }
}

/// Writes all tasks as an iCalendar file. `-` writes to stdout.
pub fn cmd_export_ical<S: KeyValueStore>(repo: &TaskRepository<S>, path: Option<&Path>, now: DateTime<Utc>) -> Result<()> {
    let content = export_ical(repo.tasks(), now);
    match path {
        Some(p) if p.as_os_str() == "-" => print!("{}", content),
        Some(p) => {
            fs::write(p, content)?;
            println!("Exported {} tasks to {}", repo.tasks().len(), p.display());
        }
        None => {
            let name = format!("taskflow-tasks-{}.ics", now.format("%Y-%m-%d"));
            fs::write(&name, content)?;
            println!("Exported {} tasks to {}", repo.tasks().len(), name);
        }
    }
    Ok(())
}

/// Adds the events of an iCalendar file as new tasks.
pub fn cmd_import_ical<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    path: &Path,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let tasks: Vec<Task> = parse_ical(&text, now);
    let n = repo.extend(tasks, now)?;
    info!(count = n, path = %path.display(), "iCalendar imported");
    if !silent {
        println!("Imported {} tasks.", n);
    }
    Ok(n)
}

/// Writes a JSON backup of tasks and snapshots. `-` writes to stdout.
pub fn cmd_backup<S: KeyValueStore>(repo: &TaskRepository<S>, path: Option<&Path>, now: DateTime<Utc>) -> Result<()> {
    let backup = create_backup(repo, now);
    let json = serde_json::to_string_pretty(&backup)?;
    match path {
        Some(p) if p.as_os_str() == "-" => println!("{}", json),
        Some(p) => {
            fs::write(p, json)?;
            println!("Backup written to {}", p.display());
        }
        None => {
            let name = format!("taskflow-backup-{}.json", now.format("%Y-%m-%d"));
            fs::write(&name, json)?;
            println!("Backup written to {}", name);
        }
    }
    Ok(())
}

/// Replaces all tasks with the ones found in a backup file.
pub fn cmd_restore<S: KeyValueStore>(
    repo: &mut TaskRepository<S>,
    path: &Path,
    now: DateTime<Utc>,
    silent: bool,
) -> Result<usize> {
    let text = fs::read_to_string(path)?;
    let restored = read_backup(&text)?;
    let n = restored.tasks.len();
    repo.replace_all(restored.tasks, now)?;
    if !silent {
        println!("Restored {} tasks ({} skipped).", n, restored.skipped);
    }
    Ok(n)
}
