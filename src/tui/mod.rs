pub mod app;
pub mod ui;

use std::{error::Error, io};

use chrono::Utc;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};

use crate::config::Settings;
use crate::mutator::ResizeEdge;
use crate::storage::{KeyValueStore, TaskRepository};
use app::{App, InputField, InputMode, ViewMode};
use ui::ui;

pub fn run_tui<S: KeyValueStore>(repo: TaskRepository<S>, settings: Settings) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(repo, &settings, Utc::now());

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        println!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend, S: KeyValueStore>(terminal: &mut Terminal<B>, app: &mut App<S>) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        match app.input_mode {
            InputMode::Normal => {
                match (app.view_mode, key.code) {
                    (_, KeyCode::Char('q')) => return Ok(()),
                    (_, KeyCode::Char('v')) | (_, KeyCode::Tab) => app.toggle_view(),
                    (_, KeyCode::Down) | (_, KeyCode::Char('j')) => app.next(),
                    (_, KeyCode::Up) | (_, KeyCode::Char('k')) => app.previous(),
                    (_, KeyCode::Char('g')) => app.go_to_today(),
                    (ViewMode::Tasks | ViewMode::Timeline, KeyCode::Char(' ')) => app.complete_selected(),

                    (ViewMode::Tasks, KeyCode::Char('a')) => app.start_add(),
                    (ViewMode::Tasks, KeyCode::Char('s')) => app.start_selected(),
                    (ViewMode::Tasks, KeyCode::Char('d')) | (ViewMode::Tasks, KeyCode::Delete) => app.delete_selected(),
                    (ViewMode::Tasks, KeyCode::Char('n')) => app.start_edit(InputField::Title),
                    (ViewMode::Tasks, KeyCode::Char('e')) => app.start_edit(InputField::Description),
                    (ViewMode::Tasks, KeyCode::Char('t')) => app.start_edit(InputField::Due),
                    (ViewMode::Tasks, KeyCode::Char('b')) => app.start_edit(InputField::Start),
                    (ViewMode::Tasks, KeyCode::Char('/')) => app.start_edit(InputField::Search),
                    (ViewMode::Tasks, KeyCode::Char('p')) => app.cycle_priority(),
                    (ViewMode::Tasks, KeyCode::Char('c')) => app.toggle_completed(),
                    (ViewMode::Tasks, KeyCode::Char('o')) => app.cycle_sort(),

                    (ViewMode::Calendar, KeyCode::Left) | (ViewMode::Calendar, KeyCode::Char('h')) => app.shift_month(-1),
                    (ViewMode::Calendar, KeyCode::Right) | (ViewMode::Calendar, KeyCode::Char('l')) => app.shift_month(1),

                    (ViewMode::Timeline, KeyCode::Left) | (ViewMode::Timeline, KeyCode::Char('h')) => app.shift_timeline(-1),
                    (ViewMode::Timeline, KeyCode::Right) | (ViewMode::Timeline, KeyCode::Char('l')) => app.shift_timeline(1),
                    (ViewMode::Timeline, KeyCode::Char('+')) | (ViewMode::Timeline, KeyCode::Char('=')) => app.zoom(true),
                    (ViewMode::Timeline, KeyCode::Char('-')) => app.zoom(false),
                    (ViewMode::Timeline, KeyCode::Char('<')) => app.move_selected(-1),
                    (ViewMode::Timeline, KeyCode::Char('>')) => app.move_selected(1),
                    (ViewMode::Timeline, KeyCode::Char('[')) => app.resize_selected(ResizeEdge::Start, -1),
                    (ViewMode::Timeline, KeyCode::Char(']')) => app.resize_selected(ResizeEdge::Start, 1),
                    (ViewMode::Timeline, KeyCode::Char('{')) => app.resize_selected(ResizeEdge::End, -1),
                    (ViewMode::Timeline, KeyCode::Char('}')) => app.resize_selected(ResizeEdge::End, 1),
                    _ => {}
                }
            }
            InputMode::Editing | InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => {
                    app.input_buffer.push(c);
                }
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
