use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::partition::SpanningTask;

/// Vertical distance between stacked spanning bars, in pixels.
pub const DEFAULT_ROW_HEIGHT: f64 = 60.0;
/// Gap above the first stacked bar, in pixels.
pub const DEFAULT_TOP_PADDING: f64 = 10.0;

pub const MIN_ZOOM: f64 = 0.5;
pub const MAX_ZOOM: f64 = 3.0;
pub const ZOOM_STEP: f64 = 0.5;

/// First day of a displayed week.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WeekStart {
    #[default]
    Sunday,
    Monday,
}

impl WeekStart {
    pub fn weekday(self) -> Weekday {
        match self {
            WeekStart::Sunday => Weekday::Sun,
            WeekStart::Monday => Weekday::Mon,
        }
    }

    /// The first day of the week containing `date`.
    pub fn week_of(self, date: NaiveDate) -> NaiveDate {
        let offset = match self {
            WeekStart::Sunday => date.weekday().num_days_from_sunday(),
            WeekStart::Monday => date.weekday().num_days_from_monday(),
        };
        date - Duration::days(offset as i64)
    }
}

/// One horizontal strip of consecutive days: a calendar week or a timeline window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub days: Vec<NaiveDate>,
}

impl Row {
    /// Builds a row of `len` consecutive days starting at `start`. `len` must be at least 1.
    pub fn from_start(start: NaiveDate, len: usize) -> Self {
        let days: Vec<NaiveDate> = (0..len.max(1))
            .map(|i| start + Duration::days(i as i64))
            .collect();
        let end = days[days.len() - 1];
        Self { start, end, days }
    }

    pub fn len(&self) -> usize {
        self.days.len()
    }

    pub fn is_empty(&self) -> bool {
        self.days.is_empty()
    }
}

/// Where a spanning bar is drawn inside a row, as percentages of the row width.
#[derive(Debug, Clone, PartialEq)]
pub struct SpanPlacement {
    pub task_id: Uuid,
    pub left_percent: f64,
    pub width_percent: f64,
    /// The task started in an earlier row.
    pub continues_left: bool,
    /// The task ends in a later row.
    pub continues_right: bool,
    /// Stacking slot inside the row, in intersection order.
    pub lane: usize,
    /// Vertical offset in pixels for `lane`.
    pub offset: f64,
    pub start_index: usize,
    pub end_index: usize,
}

/// Pixel metrics for stacking bars.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stacking {
    pub row_height: f64,
    pub top_padding: f64,
}

impl Default for Stacking {
    fn default() -> Self {
        Self { row_height: DEFAULT_ROW_HEIGHT, top_padding: DEFAULT_TOP_PADDING }
    }
}

/// Places every spanning task that intersects `row`.
///
/// Bars are stacked sequentially in the order given, one lane each. There is
/// no packing of non-overlapping bars into a shared lane.
pub fn layout_row(row: &Row, spanning: &[SpanningTask<'_>], stacking: Stacking) -> Vec<SpanPlacement> {
    if row.is_empty() {
        return Vec::new();
    }
    let len = row.len();
    let last = len - 1;

    spanning
        .iter()
        .filter(|s| s.span.intersects(row.start, row.end))
        .enumerate()
        .map(|(lane, s)| {
            let start_index = if s.span.start < row.start {
                0
            } else {
                row.days.iter().position(|d| *d == s.span.start).unwrap_or(0)
            };
            let end_index = if s.span.end > row.end {
                last
            } else {
                row.days.iter().position(|d| *d == s.span.end).unwrap_or(last).min(last)
            };
            let end_index = end_index.max(start_index);

            SpanPlacement {
                task_id: s.task.id,
                left_percent: start_index as f64 / len as f64 * 100.0,
                width_percent: (end_index - start_index + 1) as f64 / len as f64 * 100.0,
                continues_left: s.span.start < row.start,
                continues_right: s.span.end > row.end,
                lane,
                offset: lane as f64 * stacking.row_height + stacking.top_padding,
                start_index,
                end_index,
            }
        })
        .collect()
}

/// The weeks shown for a month view, including leading and trailing days of
/// neighbouring months so that every row is a full week.
pub fn month_grid(year: i32, month: u32, week_start: WeekStart) -> Option<Vec<Row>> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;
    let next_month = if month == 12 {
        NaiveDate::from_ymd_opt(year + 1, 1, 1)?
    } else {
        NaiveDate::from_ymd_opt(year, month + 1, 1)?
    };
    let last = next_month.pred_opt()?;

    let mut weeks = Vec::new();
    let mut cursor = week_start.week_of(first);
    while cursor <= last {
        weeks.push(Row::from_start(cursor, 7));
        cursor += Duration::days(7);
    }
    Some(weeks)
}

/// Every day of a month grid, in display order.
pub fn grid_days(weeks: &[Row]) -> Vec<NaiveDate> {
    weeks.iter().flat_map(|w| w.days.iter().copied()).collect()
}

/// The zoomable week window of the timeline view.
///
/// A zoom of 1 shows a full Monday-based week; larger zooms show fewer days
/// centred inside that week.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineWindow {
    pub anchor: NaiveDate,
    pub zoom: f64,
}

impl TimelineWindow {
    pub fn new(anchor: NaiveDate, zoom: f64) -> Self {
        Self { anchor, zoom: clamp_zoom(zoom) }
    }

    pub fn week_start(&self) -> NaiveDate {
        WeekStart::Monday.week_of(self.anchor)
    }

    /// Number of visible day columns, `floor(7 / zoom)`.
    pub fn visible_len(&self) -> usize {
        ((7.0 / self.zoom).floor() as usize).max(1)
    }

    pub fn row(&self) -> Row {
        let len = self.visible_len();
        let lead = (7_i64 - len as i64).div_euclid(2);
        Row::from_start(self.week_start() + Duration::days(lead), len)
    }

    /// Moves the window by one screenful of days in `direction` (+1 / -1).
    /// The window stays put at the edges of the calendar.
    pub fn navigate(&mut self, direction: i64) {
        let target = self
            .visible_len()
            .checked_mul(direction.unsigned_abs() as usize)
            .and_then(|n| i64::try_from(n).ok())
            .and_then(Duration::try_days)
            .and_then(|step| {
                if direction < 0 {
                    self.anchor.checked_sub_signed(step)
                } else {
                    self.anchor.checked_add_signed(step)
                }
            });
        // A full window of valid dates must surround the anchor.
        let margin = Duration::days(28);
        if let Some(anchor) = target.filter(|a| {
            a.checked_add_signed(margin).is_some() && a.checked_sub_signed(margin).is_some()
        }) {
            self.anchor = anchor;
        }
    }

    pub fn set_zoom(&mut self, zoom: f64) {
        self.zoom = clamp_zoom(zoom);
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    pub fn go_to(&mut self, date: NaiveDate) {
        self.anchor = date;
    }
}

fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}
