//! Interactive demo: runs the scripted engine in a real terminal.
//!
//! Arrow keys move the selection, Enter commits, `q`/Esc quits. On quit the
//! session is checkpointed to the state file and picked up again on the
//! next launch; a corrupt or incompatible state file silently starts a
//! fresh session.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::cursor::{Hide, MoveTo, Show};
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use crossterm::style::{Color as TermColor, Print, ResetColor, SetBackgroundColor, SetForegroundColor};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::{execute, queue};
use tracing::{info, warn};

use gridcast::engine::{SCREEN_COLUMNS, SCREEN_LINES};
use gridcast::{
    Caret, Color, Frame, InputSymbol, Mode, SavedSession, ScriptedEngine, SessionEvent,
    SessionWorker, Status,
};

#[derive(Debug, Parser)]
#[command(name = "gridcast", version, about = "Terminal-grid session demo")]
struct Args {
    /// Seed for a fresh session (default: derived from the clock)
    #[arg(long)]
    seed: Option<u64>,

    /// Engine mode for a fresh session
    #[arg(long, value_enum, default_value_t = ModeArg::Normal)]
    mode: ModeArg,

    /// Session state file (default: under the user data directory)
    #[arg(long)]
    state_file: Option<PathBuf>,

    /// Ignore any saved state and start over
    #[arg(long)]
    fresh: bool,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum ModeArg {
    Normal,
    Endless,
}

impl From<ModeArg> for Mode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::Normal => Mode::Normal,
            ModeArg::Endless => Mode::Endless,
        }
    }
}

enum Start {
    Resume(SavedSession),
    Fresh { mode: Mode, seed: u64 },
}

enum UiExit {
    Quit,
    Ended,
    RestoreFailed,
}

fn main() -> Result<()> {
    let args = Args::parse();
    let data_dir = data_dir()?;
    init_logging(&data_dir)?;
    let state_file = args
        .state_file
        .clone()
        .unwrap_or_else(|| data_dir.join("session.json"));

    let mut start = load_plan(&args, &state_file);
    loop {
        let worker = match start {
            Start::Resume(saved) => {
                let engine = ScriptedEngine::new(saved.mode(), saved.seed());
                SessionWorker::resume(saved, engine)
            }
            Start::Fresh { mode, seed } => {
                info!(seed, "starting fresh session");
                SessionWorker::spawn(
                    ScriptedEngine::new(mode, seed),
                    mode,
                    seed,
                    SCREEN_COLUMNS,
                    SCREEN_LINES,
                    Some(InputSymbol::Confirm),
                )
            }
        };

        match run_ui(&worker)? {
            UiExit::Quit => {
                let saved = worker.save();
                worker.shutdown();
                fs::write(&state_file, saved.encode())
                    .with_context(|| format!("writing state file {}", state_file.display()))?;
                info!(state_file = %state_file.display(), "session saved");
                println!("Session saved.");
                return Ok(());
            }
            UiExit::Ended => {
                worker.shutdown();
                let _ = fs::remove_file(&state_file);
                println!("Session ended.");
                return Ok(());
            }
            UiExit::RestoreFailed => {
                worker.shutdown();
                let _ = fs::remove_file(&state_file);
                start = Start::Fresh {
                    mode: args.mode.into(),
                    seed: args.seed.unwrap_or_else(clock_seed),
                };
            }
        }
    }
}

/// Decide between resuming the saved session and starting fresh.
fn load_plan(args: &Args, state_file: &Path) -> Start {
    let fresh = Start::Fresh {
        mode: args.mode.into(),
        seed: args.seed.unwrap_or_else(clock_seed),
    };
    if args.fresh {
        return fresh;
    }
    let bytes = match fs::read(state_file) {
        Ok(bytes) => bytes,
        Err(_) => return fresh,
    };
    match SavedSession::decode(&bytes) {
        Ok(saved) => {
            info!(seed = saved.seed(), "resuming saved session");
            Start::Resume(saved)
        }
        Err(error) => {
            // Recoverable by design: pretend there was no state file.
            warn!(%error, "saved session unusable, starting fresh");
            fresh
        }
    }
}

fn clock_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0x5eed)
}

fn data_dir() -> Result<PathBuf> {
    let dir = dirs::data_local_dir()
        .context("no local data directory")?
        .join("gridcast");
    fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
    Ok(dir)
}

fn init_logging(data_dir: &Path) -> Result<()> {
    let log_file = fs::File::create(data_dir.join("gridcast.log"))
        .context("creating log file")?;
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Arc::new(log_file))
        .with_ansi(false)
        .init();
    Ok(())
}

/// Raw-mode/alternate-screen guard; restores the terminal even on panic.
struct RawScreen;

impl RawScreen {
    fn enter() -> Result<Self> {
        enable_raw_mode().context("enabling raw mode")?;
        execute!(io::stdout(), EnterAlternateScreen, Hide)?;
        Ok(RawScreen)
    }
}

impl Drop for RawScreen {
    fn drop(&mut self) {
        let _ = execute!(io::stdout(), LeaveAlternateScreen, Show, ResetColor);
        let _ = disable_raw_mode();
    }
}

fn run_ui(worker: &SessionWorker) -> Result<UiExit> {
    let _screen = RawScreen::enter()?;
    let mut out = io::stdout();

    loop {
        while let Ok(session_event) = worker.events().try_recv() {
            match session_event {
                SessionEvent::Frame { frame, caret } => {
                    draw_frame(&mut out, &frame, caret)?;
                    worker.frame_presented();
                }
                SessionEvent::Status(Status::SessionEnded) => return Ok(UiExit::Ended),
                SessionEvent::Status(_) => {}
                SessionEvent::RestoreFailed(error) => {
                    warn!(%error, "restore failed mid-flight");
                    return Ok(UiExit::RestoreFailed);
                }
                SessionEvent::Exited => return Ok(UiExit::Ended),
            }
        }

        if !event::poll(Duration::from_millis(16))? {
            continue;
        }
        if let Event::Key(key) = event::read()? {
            if key.kind == KeyEventKind::Release {
                continue;
            }
            let symbol = match key.code {
                KeyCode::Char('q') | KeyCode::Esc => return Ok(UiExit::Quit),
                KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                    return Ok(UiExit::Quit)
                }
                KeyCode::Up => InputSymbol::Up,
                KeyCode::Down => InputSymbol::Down,
                KeyCode::Enter => InputSymbol::Confirm,
                _ => InputSymbol::Other,
            };
            // A `false` here just means the worker was mid-drain; dropping
            // the keypress is the intended behavior.
            worker.send_input(symbol);
        }
    }
}

/// Paint one frame, batching style changes per run of same-styled cells.
fn draw_frame(out: &mut io::Stdout, frame: &Frame, caret: Caret) -> Result<()> {
    queue!(out, Hide)?;
    let mut style: Option<(Color, Color)> = None;

    for line in 0..frame.rows() {
        queue!(out, MoveTo(0, line as u16))?;
        let mut run = String::new();
        for cell in frame.row(line) {
            let cell_style = (cell.foreground, cell.background);
            if style != Some(cell_style) {
                if !run.is_empty() {
                    queue!(out, Print(&run))?;
                    run.clear();
                }
                queue!(
                    out,
                    SetForegroundColor(term_color(cell.foreground)),
                    SetBackgroundColor(term_color(cell.background))
                )?;
                style = Some(cell_style);
            }
            run.push(cell.ch);
        }
        if !run.is_empty() {
            queue!(out, Print(&run))?;
        }
    }

    queue!(out, MoveTo(caret.column as u16, caret.line as u16), Show)?;
    out.flush()?;
    Ok(())
}

fn term_color(color: Color) -> TermColor {
    match color {
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::White => TermColor::Grey,
        Color::Gray => TermColor::DarkGrey,
        Color::BrightRed => TermColor::Red,
        Color::BrightGreen => TermColor::Green,
        Color::BrightYellow => TermColor::Yellow,
        Color::BrightBlue => TermColor::Blue,
        Color::BrightMagenta => TermColor::Magenta,
        Color::BrightCyan => TermColor::Cyan,
        Color::BrightWhite => TermColor::White,
    }
}
