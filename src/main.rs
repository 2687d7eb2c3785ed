use std::io;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;

use chrono::{Datelike, Utc};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::{generate, Shell};
use tracing_subscriber::EnvFilter;

use taskflow::commands::*;
use taskflow::config::{data_dir, open_log_file, Config};
use taskflow::error::Result;
use taskflow::layout::WeekStart;
use taskflow::models::{Priority, Status};
use taskflow::mutator::ResizeEdge;
use taskflow::query::{SortKey, TaskQuery};
use taskflow::storage::{FileStore, TaskRepository};
use taskflow::tui::run_tui;

/// Environment variable holding the log filter, e.g. `TASKFLOW_LOG=debug`.
const LOG_ENV: &str = "TASKFLOW_LOG";

#[derive(Parser)]
#[command(name = "taskflow")]
#[command(about = "Task manager with calendar and timeline views", long_about = None)]
struct Cli {
    /// Act as this user (defaults to TASKFLOW_USER, then the settings file, then "demo")
    #[arg(short, long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[arg(short = 'D', long)]
        description: Option<String>,
        /// low, medium or high
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Start date in YYYY-MM-DD (requires --due)
        #[arg(short, long)]
        start: Option<String>,
        /// Due date in YYYY-MM-DD
        #[arg(short, long)]
        due: Option<String>,
    },
    /// List tasks
    List {
        /// Only tasks whose title or description contains this text
        #[arg(short = 'q', long)]
        search: Option<String>,
        #[arg(short, long)]
        status: Option<Status>,
        #[arg(short, long)]
        priority: Option<Priority>,
        /// created, due, priority or status
        #[arg(long, default_value = "created")]
        sort: SortKey,
    },
    /// Show every field of a task
    Show { id: String },
    /// Edit a task. Dates accept "none" to clear them
    Edit {
        id: String,
        #[arg(short, long)]
        title: Option<String>,
        #[arg(short = 'D', long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<Priority>,
        #[arg(long)]
        status: Option<Status>,
        #[arg(short, long)]
        start: Option<String>,
        #[arg(short, long)]
        due: Option<String>,
    },
    /// Mark a task as in progress
    Start { id: String },
    /// Mark a task as complete
    Complete { id: String },
    /// Mark a task as todo again
    Reopen { id: String },
    /// Remove a task
    Remove { id: String },
    /// Delete all tasks of the current user
    Clear {
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Move a task to another day, keeping the length of ranged tasks
    Move {
        id: String,
        /// Target date in YYYY-MM-DD
        date: String,
    },
    /// Move the start or end of a task by a number of days
    Resize {
        id: String,
        #[arg(value_enum)]
        edge: Edge,
        /// Days to move the edge by (negative moves it earlier)
        #[arg(allow_negative_numbers = true)]
        days: i64,
    },
    /// Show a month calendar
    Calendar {
        /// Year (defaults to the current one)
        #[arg(short, long)]
        year: Option<i32>,
        /// Month 1-12 (defaults to the current one)
        #[arg(short, long)]
        month: Option<u32>,
        /// Start weeks on Monday instead of the configured day
        #[arg(long)]
        monday: bool,
    },
    /// Show the week timeline
    Timeline {
        /// Any date inside the wanted week (defaults to today)
        #[arg(short, long)]
        date: Option<String>,
        /// Zoom factor between 0.5 and 3
        #[arg(short, long)]
        zoom: Option<f64>,
    },
    /// Show task progress
    Progress,
    /// Show productivity statistics
    Stats,
    /// Show session activity and the change since the previous session
    Session,
    /// Export tasks as iCalendar
    ExportIcal {
        /// Output file, "-" for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import tasks from an iCalendar file
    ImportIcal { file: PathBuf },
    /// Write a JSON backup
    Backup {
        /// Output file, "-" for stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Replace all tasks with those in a JSON backup
    Restore { file: PathBuf },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

#[derive(Clone, Copy, ValueEnum)]
enum Edge {
    Start,
    End,
}

impl From<Edge> for ResizeEdge {
    fn from(edge: Edge) -> Self {
        match edge {
            Edge::Start => ResizeEdge::Start,
            Edge::End => ResizeEdge::End,
        }
    }
}

/// Installs the log subscriber when `TASKFLOW_LOG` is set.
///
/// The TUI draws on the terminal, so in that mode records go to
/// `taskflow.log` in the data directory instead of stderr.
fn init_logging(tui: bool) {
    if std::env::var(LOG_ENV).is_err() {
        return;
    }
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if tui {
        match open_log_file(&data_dir()) {
            Ok(file) => builder.with_writer(Mutex::new(file)).with_ansi(false).init(),
            Err(e) => eprintln!("Logging disabled: {}", e),
        }
    } else {
        builder.with_writer(io::stderr).init();
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(matches!(cli.command, None | Some(Commands::Ui)));

    if let Some(Commands::Completions { shell }) = &cli.command {
        let shell_enum = match shell.as_str() {
            "bash" => Shell::Bash,
            "zsh" => Shell::Zsh,
            "fish" => Shell::Fish,
            "powershell" => Shell::PowerShell,
            "elvish" => Shell::Elvish,
            _ => {
                eprintln!("Unsupported shell: {}", shell);
                process::exit(2);
            }
        };
        let mut cmd = Cli::command();
        generate(shell_enum, &mut cmd, "taskflow", &mut io::stdout());
        return;
    }

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = Config::load(cli.user);
    let now = Utc::now();
    tracing::debug!(dir = %config.data_dir.display(), user = %config.user_id, "configuration loaded");
    let mut repo = TaskRepository::open(FileStore::new(config.data_dir.clone()), config.user_id.clone(), now)?;

    match cli.command {
        Some(Commands::Add { title, description, priority, start, due }) => {
            let priority = priority.or(Some(config.settings.default_priority));
            cmd_add(&mut repo, title, description, priority, start, due, now, false)?;
        }
        Some(Commands::List { search, status, priority, sort }) => {
            let query = TaskQuery { search, status, priority, sort };
            cmd_list(&repo, &query, now);
        }
        Some(Commands::Show { id }) => cmd_show(&repo, &id)?,
        Some(Commands::Edit { id, title, description, priority, status, start, due }) => {
            cmd_edit(&mut repo, &id, title, description, priority, status, start, due, now, false)?
        }
        Some(Commands::Start { id }) => cmd_set_status(&mut repo, &id, Status::InProgress, now, false)?,
        Some(Commands::Complete { id }) => cmd_set_status(&mut repo, &id, Status::Completed, now, false)?,
        Some(Commands::Reopen { id }) => cmd_set_status(&mut repo, &id, Status::Todo, now, false)?,
        Some(Commands::Remove { id }) => cmd_remove(&mut repo, &id, now, false)?,
        Some(Commands::Clear { force }) => cmd_clear(&mut repo, force, now)?,
        Some(Commands::Move { id, date }) => cmd_move(&mut repo, &id, &date, now, false)?,
        Some(Commands::Resize { id, edge, days }) => {
            cmd_resize(&mut repo, &id, edge.into(), days, now, false)?;
        }
        Some(Commands::Calendar { year, month, monday }) => {
            let today = now.date_naive();
            let week_start = if monday { WeekStart::Monday } else { config.settings.calendar_week_start };
            cmd_calendar(
                &repo,
                year.unwrap_or(today.year()),
                month.unwrap_or(today.month()),
                week_start,
                now,
            )?;
        }
        Some(Commands::Timeline { date, zoom }) => {
            let anchor = match date {
                Some(d) => parse_date_arg(&d)?,
                None => now.date_naive(),
            };
            cmd_timeline(&repo, anchor, zoom.unwrap_or(config.settings.timeline_zoom), now);
        }
        Some(Commands::Progress) => cmd_progress(&repo, now),
        Some(Commands::Stats) => cmd_stats(&repo, now),
        Some(Commands::Session) => cmd_session(&repo),
        Some(Commands::ExportIcal { output }) => cmd_export_ical(&repo, output.as_deref(), now)?,
        Some(Commands::ImportIcal { file }) => {
            cmd_import_ical(&mut repo, &file, now, false)?;
        }
        Some(Commands::Backup { output }) => cmd_backup(&repo, output.as_deref(), now)?,
        Some(Commands::Restore { file }) => {
            cmd_restore(&mut repo, &file, now, false)?;
        }
        Some(Commands::Completions { .. }) => {}
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(repo, config.settings) {
                eprintln!("Error running TUI: {}", e);
            }
        }
    }
    Ok(())
}
