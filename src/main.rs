//! coltab - Terminal table with formula-bound columns
//!
//! Columns can be bound to an expression over two source columns; bound
//! columns are recomputed row by row on demand and, while auto-update is
//! on, on a fixed timer.

use std::fs::File;
use std::io;
use std::sync::Mutex;
use std::time::Instant;

use clap::Parser;
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing_subscriber::EnvFilter;

use coltab::application::{App, AppMode, AutoUpdateTimer, Config};
use coltab::domain::{FormulaCatalog, Project};
use coltab::infrastructure::FileRepository;
use coltab::presentation::{render_ui, InputHandler, NON_TABLE_ROWS};

/// Entry point for the coltab terminal application.
///
/// Parses the command line, validates the formula catalog, sets up the
/// terminal and runs the main event loop until the user quits.
///
/// # Errors
///
/// Returns an error if the log file cannot be created, the built-in
/// catalog is invalid, or terminal setup fails.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::parse();
    init_logging(&config)?;

    let catalog = FormulaCatalog::builtin()?;
    let mut project = Project::new();
    project.set_auto_update(!config.no_auto_update);

    let mut app = App::new(project, catalog);
    if let Some(path) = &config.project {
        let filename = path.display().to_string();
        let result = FileRepository::load_project(path);
        app.set_load_result(filename, result);
    }
    tracing::info!(
        interval_ms = config.interval_ms,
        auto_update = app.project.auto_update_enabled(),
        "starting"
    );

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut timer = AutoUpdateTimer::new(config.interval(), Instant::now());
    let res = run_app(&mut terminal, &mut app, &mut timer);

    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        tracing::error!(%err, "terminal error");
        println!("{err:?}");
    }

    Ok(())
}

/// Sends logs to `--log-file` when given; the terminal belongs to the UI.
fn init_logging(config: &Config) -> io::Result<()> {
    let Some(path) = &config.log_file else {
        return Ok(());
    };
    let file = File::create(path)?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Main application event loop.
///
/// Waits for input no longer than the time left until the next auto-update
/// tick. Continues running until the user presses 'q' in normal mode.
///
/// # Errors
///
/// Returns an IO error if terminal operations fail.
fn run_app<B: Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    timer: &mut AutoUpdateTimer,
) -> io::Result<()> {
    loop {
        let size = terminal.size()?;
        app.update_viewport_size(size.height.saturating_sub(NON_TABLE_ROWS) as usize);
        terminal.draw(|f| render_ui(f, app))?;

        if event::poll(timer.time_until_due(Instant::now()))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') if app.mode == AppMode::Normal => return Ok(()),
                        _ => InputHandler::handle_key_event(app, key.code, key.modifiers),
                    }
                }
            }
        }

        if timer.fire_if_due(Instant::now()) {
            app.on_tick();
        }
    }
}
