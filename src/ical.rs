//! iCalendar (RFC 5545) export and import.
//!
//! Each task becomes one `VEVENT` anchored on its due date with a one hour
//! window. Import reads `DTSTART` back as the due date, so date ranges do not
//! survive a round trip.

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use tracing::warn;

use crate::models::{Priority, Schedule, Status, Task};

const PRODID: &str = "-//TaskFlow//Task Management//EN";
const STAMP_FORMAT: &str = "%Y%m%dT%H%M%SZ";

/// Renders `tasks` as a `VCALENDAR` document with CRLF line endings.
pub fn export_ical(tasks: &[Task], now: DateTime<Utc>) -> String {
    let stamp = now.format(STAMP_FORMAT).to_string();
    let mut lines: Vec<String> = vec![
        "BEGIN:VCALENDAR".into(),
        "VERSION:2.0".into(),
        format!("PRODID:{}", PRODID),
        "CALSCALE:GREGORIAN".into(),
        "METHOD:PUBLISH".into(),
    ];

    for task in tasks {
        let start = match task.due_date() {
            Some(d) => d.and_time(NaiveTime::MIN).and_utc(),
            None => now,
        };
        let end = start + Duration::hours(1);

        lines.push("BEGIN:VEVENT".into());
        lines.push(format!("UID:taskflow-{}@taskflow.app", task.id));
        lines.push(format!("DTSTAMP:{}", stamp));
        lines.push(format!("DTSTART:{}", start.format(STAMP_FORMAT)));
        lines.push(format!("DTEND:{}", end.format(STAMP_FORMAT)));
        lines.push(format!("SUMMARY:{}", escape_text(&task.title)));
        lines.push(format!(
            "DESCRIPTION:{}",
            escape_text(task.description.as_deref().unwrap_or(""))
        ));
        lines.push(format!("PRIORITY:{}", priority_number(task.priority)));
        lines.push(format!("STATUS:{}", ical_status(task.status)));
        lines.push(format!("CATEGORIES:TaskFlow,{}", task.priority.as_str().to_uppercase()));
        lines.push("END:VEVENT".into());
    }

    lines.push("END:VCALENDAR".into());
    let mut out = lines.join("\r\n");
    out.push_str("\r\n");
    out
}

/// Parses every `VEVENT` in `text` into a new task. Events without a summary are skipped.
pub fn parse_ical(text: &str, now: DateTime<Utc>) -> Vec<Task> {
    text.split("BEGIN:VEVENT")
        .skip(1)
        .filter_map(|chunk| {
            let body = chunk.split("END:VEVENT").next().unwrap_or("");
            parse_event(body, now)
        })
        .collect()
}

fn parse_event(body: &str, now: DateTime<Utc>) -> Option<Task> {
    let mut task = Task::new("", now);

    for line in unfold(body) {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        // Property parameters such as `DTSTART;VALUE=DATE` are ignored.
        let name = key.split(';').next().unwrap_or(key).trim().to_uppercase();
        let value = value.trim();

        match name.as_str() {
            "SUMMARY" => task.title = unescape_text(value),
            "DESCRIPTION" => {
                let d = unescape_text(value);
                task.description = if d.is_empty() { None } else { Some(d) };
            }
            "DTSTART" => match parse_ical_date(value) {
                Some(d) => task.schedule = Schedule::SingleDay { due_date: d },
                None => warn!("Ignoring unreadable DTSTART '{}'", value),
            },
            "PRIORITY" => task.priority = priority_from_number(value),
            "STATUS" => task.status = status_from_ical(value),
            _ => {}
        }
    }

    if task.title.trim().is_empty() {
        None
    } else {
        Some(task)
    }
}

/// Joins folded continuation lines and drops blank ones.
fn unfold(body: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in body.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        if let Some(rest) = raw.strip_prefix(' ').or_else(|| raw.strip_prefix('\t')) {
            if let Some(last) = lines.last_mut() {
                last.push_str(rest);
                continue;
            }
        }
        if !raw.trim().is_empty() {
            lines.push(raw.to_string());
        }
    }
    lines
}

/// Accepts `YYYYMMDDTHHMMSSZ`, `YYYYMMDDTHHMMSS`, `YYYYMMDD` and RFC 3339.
pub fn parse_ical_date(value: &str) -> Option<NaiveDate> {
    let v = value.trim();
    if let Some(stamp) = v.strip_suffix('Z') {
        if let Ok(dt) = NaiveDateTime::parse_from_str(stamp, "%Y%m%dT%H%M%S") {
            return Some(dt.date());
        }
    }
    if let Ok(dt) = NaiveDateTime::parse_from_str(v, "%Y%m%dT%H%M%S") {
        return Some(dt.date());
    }
    if let Ok(d) = NaiveDate::parse_from_str(v, "%Y%m%d") {
        return Some(d);
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(v) {
        return Some(dt.with_timezone(&Utc).date_naive());
    }
    NaiveDate::parse_from_str(v, "%Y-%m-%d").ok()
}

pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ';' => out.push_str("\\;"),
            ',' => out.push_str("\\,"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            _ => out.push(c),
        }
    }
    out
}

pub fn unescape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') | Some('N') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub fn priority_number(priority: Priority) -> u8 {
    match priority {
        Priority::High => 1,
        Priority::Medium => 5,
        Priority::Low => 9,
    }
}

/// 1-3 is high, 4-6 medium, anything else low. Unparseable values count as medium.
pub fn priority_from_number(value: &str) -> Priority {
    match value.trim().parse::<i32>() {
        Ok(n) if n <= 3 => Priority::High,
        Ok(n) if n <= 6 => Priority::Medium,
        Ok(_) => Priority::Low,
        Err(_) => Priority::Medium,
    }
}

pub fn ical_status(status: Status) -> &'static str {
    match status {
        Status::Completed => "COMPLETED",
        Status::InProgress => "IN-PROCESS",
        Status::Todo => "NEEDS-ACTION",
    }
}

pub fn status_from_ical(value: &str) -> Status {
    match value.trim() {
        "COMPLETED" => Status::Completed,
        "IN-PROCESS" => Status::InProgress,
        _ => Status::Todo,
    }
}
