use chrono::Utc;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::Text,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{App, InputField, InputMode, ViewMode};
use crate::commands::{day_column_lines, time_left};
use crate::duration::resolve;
use crate::layout::{self, grid_days, month_grid};
use crate::models::{Priority, Status};
use crate::partition::partition;
use crate::stats::{compute_progress, compute_stats, is_overdue};
use crate::storage::KeyValueStore;

pub fn ui<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // View
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    match app.view_mode {
        ViewMode::Tasks => render_tasks(f, app, chunks[0]),
        ViewMode::Calendar => render_calendar(f, app, chunks[0]),
        ViewMode::Timeline => render_timeline(f, app, chunks[0]),
        ViewMode::Stats => render_stats(f, app, chunks[0]),
    }

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | n: Title | e: Desc | t: Due | b: Start | p: Prio | s: Start work | Space: Done | d: Del | c: Toggle Done | o: Sort | /: Search | v: View",
            ViewMode::Calendar => "q: Quit | h/l: Month | g: Today | v: View",
            ViewMode::Timeline => "q: Quit | j/k: Select | h/l: Scroll | +/-: Zoom | </>: Move | [/]: Start edge | {/}: End edge | Space: Done | g: Today | v: View",
            ViewMode::Stats => "q: Quit | v: View",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step (empty skips optional steps) | Esc: Cancel",
    };

    let help_block = match &app.message {
        Some(msg) => Block::default().borders(Borders::ALL).title(msg.as_str()).title_style(Style::default().fg(Color::Red)),
        None => Block::default().borders(Borders::ALL),
    };
    let help = Paragraph::new(help_text).style(Style::default().fg(Color::Gray)).block(help_block);
    f.render_widget(help, chunks[1]);

    // Render Input Box if needed
    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => match app.add_state.step {
                0 => "Add Task: Enter Title",
                1 => "Add Task: Enter Due Date (YYYY-MM-DD, Optional)",
                2 => "Add Task: Enter Start Date (YYYY-MM-DD, Optional)",
                3 => "Add Task: Enter Priority (low/medium/high, Optional)",
                _ => "Add Task",
            },
            InputMode::Editing => match app.input_field {
                InputField::Title => "Edit Title",
                InputField::Description => "Edit Description",
                InputField::Due => "Edit Due Date (YYYY-MM-DD, none to clear)",
                InputField::Start => "Edit Start Date (YYYY-MM-DD, none to clear)",
                InputField::Search => "Search",
                InputField::None => "Edit",
            },
            InputMode::Normal => "",
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));
        f.render_widget(input, area);
    }
}

fn header_style() -> Style {
    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
}

fn priority_color(priority: Priority) -> Color {
    match priority {
        Priority::High => Color::Red,
        Priority::Medium => Color::Yellow,
        Priority::Low => Color::Green,
    }
}

fn render_tasks<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    let today = app.today();

    let rows: Vec<Row> = app
        .visible_tasks()
        .into_iter()
        .map(|t| {
            let span = resolve(t);
            let time_left_str = match t.due_date() {
                Some(_) if t.is_completed() => "-".to_string(),
                Some(due) => time_left(due, today),
                None => String::new(),
            };
            let style = if t.is_completed() {
                Style::default().fg(Color::DarkGray)
            } else if is_overdue(t, today) {
                Style::default().fg(Color::Red)
            } else {
                Style::default()
            };
            let status_style = match t.status {
                Status::Completed => Style::default().fg(Color::Green),
                Status::InProgress => Style::default().fg(Color::Blue),
                Status::Todo => Style::default(),
            };

            Row::new(vec![
                Cell::from(t.short_id()),
                Cell::from(t.title.clone()),
                Cell::from(t.priority.to_string()).style(Style::default().fg(priority_color(t.priority))),
                Cell::from(t.status.to_string()).style(status_style),
                Cell::from(t.start_date().map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(t.due_date().map(|d| d.to_string()).unwrap_or_default()),
                Cell::from(if span.is_multi_day { span.days.to_string() } else { String::new() }),
                Cell::from(time_left_str),
            ])
            .style(style)
        })
        .collect();

    let widths = [
        Constraint::Length(9),
        Constraint::Min(20),
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(5),
        Constraint::Length(12),
    ];

    let mut title = format!("TaskFlow - Tasks ({}, sorted by {:?})", app.repo.user_id(), app.query.sort);
    if let Some(search) = &app.query.search {
        title.push_str(&format!(" [search: {}]", search));
    }

    let table = Table::new(rows, widths)
        .header(
            Row::new(vec!["ID", "Title", "Priority", "Status", "Start", "Due", "Days", "Time Left"])
                .style(header_style())
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title(title))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");

    f.render_stateful_widget(table, area, &mut app.state);
}

/// Renders one strip of days as a table row whose cells hold the day's lines.
fn day_row<'a>(lines: Vec<Vec<String>>) -> Row<'a> {
    let height = lines.iter().map(Vec::len).max().unwrap_or(1) as u16;
    Row::new(lines.into_iter().map(|l| Cell::from(Text::from(l.join("\n"))))).height(height.max(1) + 1)
}

fn day_headers<'a>(days: &[chrono::NaiveDate]) -> Row<'a> {
    Row::new(days.iter().map(|d| Cell::from(d.format("%a").to_string()))).style(header_style())
}

fn render_calendar<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    let (year, month) = app.calendar_month;
    let Some(weeks) = month_grid(year, month, app.week_start) else {
        return;
    };
    let days = grid_days(&weeks);
    let part = partition(app.repo.tasks(), &days);
    let today = app.today();

    let rows: Vec<Row> = weeks
        .iter()
        .map(|week| day_row(day_column_lines(week, &part, Some(month), today)))
        .collect();
    let widths = vec![Constraint::Ratio(1, 7); 7];

    let table = Table::new(rows, widths)
        .header(day_headers(&weeks[0].days))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title(format!("TaskFlow - Calendar {}-{:02}", year, month)),
        );
    f.render_widget(table, area);
}

fn render_timeline<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let row: layout::Row = app.timeline.row();
    let part = partition(app.repo.tasks(), &row.days);
    let today = app.today();
    let n = row.len() as u32;

    let strip = Table::new(vec![day_row(day_column_lines(&row, &part, None, today))], vec![Constraint::Ratio(1, n); row.len()])
        .header(day_headers(&row.days))
        .block(Block::default().borders(Borders::ALL).title(format!(
            "TaskFlow - Timeline {} .. {} (zoom {}x)",
            row.start, row.end, app.timeline.zoom
        )));
    f.render_widget(strip, chunks[0]);

    let rows: Vec<Row> = app
        .timeline_tasks()
        .into_iter()
        .map(|t| {
            let span = resolve(t);
            Row::new(vec![
                Cell::from(t.short_id()),
                Cell::from(t.title.clone()),
                Cell::from(span.start.to_string()),
                Cell::from(span.end.to_string()),
                Cell::from(span.days.to_string()),
                Cell::from(t.status.to_string()),
            ])
        })
        .collect();
    let widths = [
        Constraint::Length(9),
        Constraint::Min(20),
        Constraint::Length(11),
        Constraint::Length(11),
        Constraint::Length(5),
        Constraint::Length(12),
    ];
    let list = Table::new(rows, widths)
        .header(
            Row::new(vec!["ID", "Title", "From", "To", "Days", "Status"])
                .style(header_style())
                .bottom_margin(1),
        )
        .block(Block::default().borders(Borders::ALL).title("Tasks in window"))
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray))
        .highlight_symbol(">> ");
    f.render_stateful_widget(list, chunks[1], &mut app.timeline_state);
}

fn render_stats<S: KeyValueStore>(f: &mut Frame, app: &mut App<S>, area: Rect) {
    let now = Utc::now();
    let p = compute_progress(app.repo.tasks(), now);
    let s = compute_stats(app.repo.tasks(), now);

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let progress_lines = vec![
        format!("Total:            {}", p.total),
        format!("Completed:        {}", p.completed),
        format!("In progress:      {}", p.in_progress),
        format!("Todo:             {}", p.todo),
        format!("Overdue:          {}", p.overdue),
        format!("Completion rate:  {}%", p.completion_rate),
        format!("High/Med/Low:     {}/{}/{}", p.priority.high, p.priority.medium, p.priority.low),
        format!("Due today:        {}", p.today_tasks),
        format!("Due this week:    {}", p.this_week_tasks),
    ];
    let mut stats_lines = vec![
        format!("Completed this month:  {}", s.monthly_completed),
        format!("Avg. completion time:  {:.1} days", s.avg_completion_time),
        format!("On-time rate:          {}%", s.on_time_rate),
        format!("Productivity score:    {}", s.productivity_score),
        format!("Work streak:           {} days", s.work_streak),
        format!("Estimated effort:      {}h", s.total_time_spent),
    ];
    if let Some(c) = app.repo.session_comparison() {
        stats_lines.push(String::new());
        stats_lines.push(format!(
            "Since last session: {:+} tasks, {:+} completed",
            c.tasks_difference, c.completion_difference
        ));
    }

    f.render_widget(
        Paragraph::new(progress_lines.join("\n")).block(Block::default().borders(Borders::ALL).title("Progress")),
        chunks[0],
    );
    f.render_widget(
        Paragraph::new(stats_lines.join("\n")).block(Block::default().borders(Borders::ALL).title("Statistics")),
        chunks[1],
    );
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
