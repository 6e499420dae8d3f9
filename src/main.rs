// ============================================================================
// QUICKNOTES - Quick capture notes in the terminal
// ============================================================================
//
// MODULE STRUCTURE:
// note      - The persisted Note record
// dates     - Relative day labels and time captions
// view      - filter -> partition(pinned) -> group(by date)
// store     - NoteStore: owns the collection, persists every mutation
// card      - Per-note edit state and the two-step delete guard
// markup    - Lightweight markup rendering for note text
// app       - Event handling and focus/selection state
// ui        - Drawing
// config    - Paths and constants
// logging   - File-backed log output
// ============================================================================

mod app;
mod card;
mod config;
mod dates;
mod logging;
mod markup;
mod note;
mod store;
mod ui;
mod view;

use std::fs;
use std::io;
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use log::info;
use ratatui::{Terminal, backend::CrosstermBackend};

use crate::app::App;
use crate::config::{Config, MAX_FILE_SIZE, TICK_RATE};
use crate::store::{FileStorage, NoteStore, SystemClock};

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err:?}");
    }
}

fn run() -> Result<()> {
    let config = Config::from_env()?;
    fs::create_dir_all(&config.data_dir)?;
    if let Err(err) = logging::init_logging(&config) {
        eprintln!("warning: logging disabled: {err:#}");
    }
    info!("starting, data in {}", config.data_dir.display());

    let storage = FileStorage::new(config.storage_path(), MAX_FILE_SIZE);
    let store = NoteStore::load(Box::new(storage), Box::new(SystemClock));
    let mut app = App::new(store);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, event::EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app);

    disable_raw_mode().ok();
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        event::DisableMouseCapture
    )
    .ok();
    terminal.show_cursor().ok();

    info!("exiting with {} notes", app.store.len());
    res
}

fn run_app(terminal: &mut Terminal<CrosstermBackend<io::Stdout>>, app: &mut App) -> Result<()> {
    let mut last_tick = Instant::now();

    loop {
        terminal.draw(|frame| ui::draw(frame, app))?;

        let timeout = TICK_RATE
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::from_secs(0));

        if event::poll(timeout)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    if app.handle_key(key, Instant::now()) {
                        break;
                    }
                }
                Event::Mouse(mouse) => app.handle_mouse(mouse),
                _ => {}
            }
        }

        if last_tick.elapsed() >= TICK_RATE {
            app.on_tick(Instant::now());
            last_tick = Instant::now();
        }
    }

    Ok(())
}
