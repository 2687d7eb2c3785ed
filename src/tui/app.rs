use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use ratatui::widgets::TableState;
use tracing::warn;
use uuid::Uuid;

use crate::commands::{cmd_add, cmd_edit, parse_date_arg};
use crate::config::Settings;
use crate::error::Result;
use crate::layout::{TimelineWindow, WeekStart};
use crate::models::{Priority, Schedule, Status, Task};
use crate::mutator::{GestureController, ResizeEdge, TaskPatch};
use crate::partition::partition;
use crate::query::{SortKey, TaskQuery};
use crate::storage::{KeyValueStore, TaskRepository};

/// Pixel width of one day column used to drive keyboard resizes through the gesture controller.
const DAY_WIDTH: f64 = 100.0;

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ViewMode {
    Tasks,
    Calendar,
    Timeline,
    Stats,
}

impl ViewMode {
    pub fn title(self) -> &'static str {
        match self {
            ViewMode::Tasks => "Tasks",
            ViewMode::Calendar => "Calendar",
            ViewMode::Timeline => "Timeline",
            ViewMode::Stats => "Stats",
        }
    }
}

#[derive(PartialEq)]
pub enum InputField {
    None,
    Title,
    Description,
    Due,
    Start,
    Search,
}

/// State for the multi-step "Add Task" wizard.
#[derive(Default)]
pub struct AddState {
    pub title: String,
    pub due: Option<String>,
    pub start: Option<String>,
    pub step: usize, // 0: Title, 1: Due, 2: Start, 3: Priority
}

pub struct App<S: KeyValueStore> {
    pub repo: TaskRepository<S>,
    /// Ids of the tasks shown in the list view, in display order.
    pub visible: Vec<Uuid>,
    pub state: TableState,
    pub timeline_state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<Uuid>,
    pub add_state: AddState,
    pub show_completed: bool,
    pub query: TaskQuery,
    pub default_priority: Priority,
    pub week_start: WeekStart,
    pub calendar_month: (i32, u32),
    pub timeline: TimelineWindow,
    pub gesture: GestureController,
    /// Feedback shown in the help bar, such as a rejected edit.
    pub message: Option<String>,
}

impl<S: KeyValueStore> App<S> {
    pub fn new(repo: TaskRepository<S>, settings: &Settings, now: DateTime<Utc>) -> App<S> {
        let today = now.date_naive();
        let mut app = App {
            repo,
            visible: Vec::new(),
            state: TableState::default(),
            timeline_state: TableState::default(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            show_completed: false,
            query: TaskQuery::default(),
            default_priority: settings.default_priority,
            week_start: settings.calendar_week_start,
            calendar_month: (today.year(), today.month()),
            timeline: TimelineWindow::new(today, settings.timeline_zoom),
            gesture: GestureController::new(),
            message: None,
        };
        app.reload();
        app
    }

    /// Rebuilds the list view from the repository.
    pub fn reload(&mut self) {
        let show_completed = self.show_completed;
        self.visible = self
            .query
            .apply(self.repo.tasks())
            .into_iter()
            .filter(|t| show_completed || !t.is_completed())
            .map(|t| t.id)
            .collect();
        clamp_selection(&mut self.state, self.visible.len());
        let timeline_len = self.timeline_tasks().len();
        clamp_selection(&mut self.timeline_state, timeline_len);
    }

    pub fn visible_tasks(&self) -> Vec<&Task> {
        self.visible.iter().filter_map(|id| self.repo.get(*id)).collect()
    }

    /// Tasks touching the timeline window: spanning bars first, then single-day tasks by date.
    pub fn timeline_tasks(&self) -> Vec<&Task> {
        let row = self.timeline.row();
        let part = partition(self.repo.tasks(), &row.days);
        let mut out: Vec<&Task> = part.spanning_within(row.start, row.end).iter().map(|s| s.task).collect();
        for tasks in part.daily.values() {
            out.extend(tasks.iter().copied());
        }
        out
    }

    pub fn selected_id(&self) -> Option<Uuid> {
        match self.view_mode {
            ViewMode::Tasks => self.state.selected().and_then(|i| self.visible.get(i).copied()),
            ViewMode::Timeline => self
                .timeline_state
                .selected()
                .and_then(|i| self.timeline_tasks().get(i).map(|t| t.id)),
            _ => None,
        }
    }

    fn list_len(&self) -> Option<usize> {
        match self.view_mode {
            ViewMode::Tasks => Some(self.visible.len()),
            ViewMode::Timeline => Some(self.timeline_tasks().len()),
            _ => None,
        }
    }

    fn list_state(&mut self) -> &mut TableState {
        match self.view_mode {
            ViewMode::Timeline => &mut self.timeline_state,
            _ => &mut self.state,
        }
    }

    /// Selects the next item in the current list.
    pub fn next(&mut self) {
        let Some(len) = self.list_len() else { return };
        let state = self.list_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(i) if i >= len - 1 => 0,
            Some(i) => i + 1,
            None => 0,
        };
        state.select(Some(i));
    }

    /// Selects the previous item in the current list.
    pub fn previous(&mut self) {
        let Some(len) = self.list_len() else { return };
        let state = self.list_state();
        if len == 0 {
            return;
        }
        let i = match state.selected() {
            Some(0) | None => len - 1,
            Some(i) => i - 1,
        };
        state.select(Some(i));
    }

    /// Cycles through the views.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Calendar,
            ViewMode::Calendar => ViewMode::Timeline,
            ViewMode::Timeline => ViewMode::Stats,
            ViewMode::Stats => ViewMode::Tasks,
        };
        self.reload();
    }

    /// Toggles the selected task between completed and todo.
    pub fn complete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let completed = self.repo.get(id).is_some_and(Task::is_completed);
        let status = if completed { Status::Todo } else { Status::Completed };
        self.set_status(id, status);
    }

    pub fn start_selected(&mut self) {
        if let Some(id) = self.selected_id() {
            self.set_status(id, Status::InProgress);
        }
    }

    fn set_status(&mut self, id: Uuid, status: Status) {
        let result = self.repo.set_status(&id.to_string(), status, Utc::now()).map(|_| ());
        self.report(result);
        self.reload();
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let result = self.repo.delete(&id.to_string(), Utc::now());
        self.report(result);
        self.reload();
    }

    /// Cycles the selected task's priority low -> medium -> high.
    pub fn cycle_priority(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let Some(task) = self.repo.get(id) else { return };
        let priority = match task.priority {
            Priority::Low => Priority::Medium,
            Priority::Medium => Priority::High,
            Priority::High => Priority::Low,
        };
        let patch = TaskPatch { priority: Some(priority), ..TaskPatch::default() };
        let result = self.repo.update(&id.to_string(), patch, Utc::now()).map(|_| ());
        self.report(result);
        self.reload();
    }

    /// Toggles the visibility of completed tasks.
    pub fn toggle_completed(&mut self) {
        self.show_completed = !self.show_completed;
        self.reload();
    }

    pub fn cycle_sort(&mut self) {
        self.query.sort = match self.query.sort {
            SortKey::Created => SortKey::Due,
            SortKey::Due => SortKey::Priority,
            SortKey::Priority => SortKey::Status,
            SortKey::Status => SortKey::Created,
        };
        self.reload();
    }

    pub fn shift_month(&mut self, delta: i32) {
        let (year, month) = self.calendar_month;
        let index = year * 12 + month as i32 - 1 + delta;
        self.calendar_month = (index.div_euclid(12), index.rem_euclid(12) as u32 + 1);
    }

    pub fn shift_timeline(&mut self, direction: i64) {
        self.timeline.navigate(direction);
        self.reload();
    }

    pub fn zoom(&mut self, zoom_in: bool) {
        if zoom_in {
            self.timeline.zoom_in();
        } else {
            self.timeline.zoom_out();
        }
        self.reload();
    }

    pub fn go_to_today(&mut self) {
        let today = Utc::now().date_naive();
        self.calendar_month = (today.year(), today.month());
        self.timeline.go_to(today);
        self.reload();
    }

    /// Drags the selected task `days` days, dropping it on its shifted start.
    pub fn move_selected(&mut self, days: i64) {
        let Some(id) = self.selected_id() else { return };
        let Some(task) = self.repo.get(id) else { return };
        let anchor = match task.schedule {
            Schedule::Ranged { start_date, .. } => start_date,
            Schedule::SingleDay { due_date } => due_date,
            Schedule::Unscheduled => self.timeline.anchor,
        };
        let Some(target) = Duration::try_days(days).and_then(|d| anchor.checked_add_signed(d)) else {
            self.message = Some("Move ignored".to_string());
            return;
        };

        let now = Utc::now();
        if !self.gesture.begin_drag(id) {
            return;
        }
        if self.gesture.drop_on(self.repo.tasks_mut(), target, now).is_some() {
            let result = self.repo.save(now);
            self.report(result);
        } else {
            self.message = Some("Move ignored".to_string());
        }
        self.reload();
    }

    /// Resizes one edge of the selected task by `days` through a simulated pointer gesture.
    pub fn resize_selected(&mut self, edge: ResizeEdge, days: i64) {
        let Some(id) = self.selected_id() else { return };
        let Some(task) = self.repo.get(id).cloned() else { return };

        let now = Utc::now();
        self.gesture.begin_resize(&task, edge, 0.0);
        let changed = self
            .gesture
            .pointer_move(self.repo.tasks_mut(), days as f64 * DAY_WIDTH, DAY_WIDTH, now);
        self.gesture.pointer_up();

        if changed {
            let result = self.repo.save(now);
            self.report(result);
        } else {
            self.message = Some("Resize ignored".to_string());
        }
        self.reload();
    }

    /// Initiates the "Add Task" wizard.
    pub fn start_add(&mut self) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState::default();
        self.input_buffer.clear();
        self.message = None;
    }

    /// Initiates editing of a specific field for the selected task, or the search filter.
    pub fn start_edit(&mut self, field: InputField) {
        self.message = None;
        if field == InputField::Search {
            self.input_buffer = self.query.search.clone().unwrap_or_default();
            self.input_mode = InputMode::Editing;
            self.input_field = field;
            return;
        }
        let Some(id) = self.selected_id() else { return };
        let Some(t) = self.repo.get(id) else { return };

        self.input_buffer = match field {
            InputField::Title => t.title.clone(),
            InputField::Description => t.description.clone().unwrap_or_default(),
            InputField::Due => t.due_date().map(|d| d.to_string()).unwrap_or_default(),
            InputField::Start => t.start_date().map(|d| d.to_string()).unwrap_or_default(),
            InputField::Search | InputField::None => String::new(),
        };
        self.target_id = Some(id);
        self.input_mode = InputMode::Editing;
        self.input_field = field;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    /// Handles text input based on the current mode.
    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Normal => {}
        }
    }

    /// Handles input for the "Add Task" wizard.
    fn handle_adding_input(&mut self) {
        let input = self.input_buffer.trim().to_string();
        match self.add_state.step {
            0 => {
                // Title
                if !input.is_empty() {
                    self.add_state.title = input;
                    self.add_state.step += 1;
                }
            }
            1 => {
                // Due, optional
                if input.is_empty() {
                    self.add_state.step = 3;
                } else if parse_date_arg(&input).is_ok() {
                    self.add_state.due = Some(input);
                    self.add_state.step += 1;
                } else {
                    self.message = Some(format!("Invalid date '{}'", input));
                }
            }
            2 => {
                // Start, optional
                if input.is_empty() {
                    self.add_state.step += 1;
                } else if parse_date_arg(&input).is_ok() {
                    self.add_state.start = Some(input);
                    self.add_state.step += 1;
                } else {
                    self.message = Some(format!("Invalid date '{}'", input));
                }
            }
            3 => {
                // Priority, optional
                let priority = if input.is_empty() {
                    Some(self.default_priority)
                } else {
                    match input.parse::<Priority>() {
                        Ok(p) => Some(p),
                        Err(e) => {
                            self.message = Some(e.to_string());
                            self.input_buffer.clear();
                            return;
                        }
                    }
                };
                let result = cmd_add(
                    &mut self.repo,
                    self.add_state.title.clone(),
                    None,
                    priority,
                    self.add_state.start.clone(),
                    self.add_state.due.clone(),
                    Utc::now(),
                    true,
                )
                .map(|_| ());
                self.report(result);
                self.input_mode = InputMode::Normal;
                self.reload();
            }
            _ => {}
        }
        self.input_buffer.clear();
    }

    /// Handles input for the "Edit Task" mode.
    fn handle_editing_input(&mut self) {
        let value = self.input_buffer.clone();
        if self.input_field == InputField::Search {
            self.query.search = Some(value).filter(|v| !v.trim().is_empty());
        } else if let Some(id) = self.target_id {
            let id = id.to_string();
            let now = Utc::now();
            let result = match self.input_field {
                InputField::Title => cmd_edit(&mut self.repo, &id, Some(value), None, None, None, None, None, now, true),
                InputField::Description => {
                    cmd_edit(&mut self.repo, &id, None, Some(value), None, None, None, None, now, true)
                }
                InputField::Start => cmd_edit(&mut self.repo, &id, None, None, None, None, Some(value), None, now, true),
                InputField::Due => cmd_edit(&mut self.repo, &id, None, None, None, None, None, Some(value), now, true),
                InputField::Search | InputField::None => Ok(()),
            };
            self.report(result);
        }
        self.cancel_input();
        self.reload();
    }

    fn report(&mut self, result: Result<impl Sized>) {
        if let Err(e) = result {
            warn!("{}", e);
            self.message = Some(e.to_string());
        }
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

fn clamp_selection(state: &mut TableState, len: usize) {
    if len == 0 {
        state.select(None);
    } else if let Some(i) = state.selected() {
        if i >= len {
            state.select(Some(len - 1));
        }
    } else {
        state.select(Some(0));
    }
}
