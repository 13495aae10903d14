//! ttop — a terminal-based Linux system monitor.
//!
//! Renders live CPU, memory, network, and per-process statistics inside a
//! ratatui TUI on a self-tuning update period, with keyboard-driven
//! sorting, filtering, paging and a per-process detail pane.

mod app;
mod config;
mod errlog;
mod fmt;
mod sampler;
mod signal;
mod theme;
mod ui;

use std::process::ExitCode;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;

use app::App;
use config::Config;
use theme::Theme;

/// Longest single input-poll slice during the idle wait.
const SLICE: Duration = Duration::from_millis(500);

/// Slice while the filter prompt is open, to keep typing snappy.
const FILTER_SLICE: Duration = Duration::from_millis(50);

/// Poll timeout while blocked on a too-small terminal.
const RESIZE_POLL: Duration = Duration::from_millis(250);

#[derive(Parser)]
#[command(name = "ttop", version, about = "Terminal system monitor")]
struct Cli {
    /// Log debug records to error.log in addition to errors.
    #[arg(long)]
    debug: bool,
}

fn main() -> ExitCode {
    if std::env::consts::OS != "linux" {
        eprintln!("ttop does not support this platform.");
        return ExitCode::FAILURE;
    }
    let cli = Cli::parse();
    match start(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("ttop: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn start(cli: Cli) -> Result<()> {
    let cfg_dir = Config::dir().context("cannot resolve a config directory")?;
    let cfg_path = Config::path().context("cannot resolve a config directory")?;
    std::fs::create_dir_all(cfg_dir.join("themes"))
        .with_context(|| format!("creating {}", cfg_dir.display()))?;

    let cfg = Config::load(&cfg_path)?;
    if cfg.error_logging || cli.debug {
        errlog::ErrLog::install(&cfg_dir.join("error.log"), cli.debug)?;
    }

    // Seed the themes directory with an editable copy of the built-in
    // colors on first run.
    let sample_theme = cfg_dir.join("themes").join("default.theme");
    if !sample_theme.exists() {
        let _ = std::fs::write(&sample_theme, Theme::default().emit_canonical());
    }
    let theme = Theme::load(&cfg_dir.join("themes"), &cfg.color_theme);
    signal::install();

    let mut app = App::new(cfg, theme, cli.debug);
    let mut terminal = ratatui::init();
    let result = run(&mut terminal, &mut app);
    ratatui::restore();
    log::logger().flush();

    if let Err(err) = app.cfg.save(&cfg_path) {
        eprintln!("ttop: saving config: {err:#}");
    }
    result
}

/// The frame loop: sample, render, emit, then wait out the period in
/// input-poll slices.
fn run(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    let size = terminal.size()?;
    app.resize(size.width, size.height);
    app.update_clock();

    // Let the first delta-based samples see a nonzero interval.
    std::thread::sleep(sysinfo::MINIMUM_CPU_UPDATE_INTERVAL);

    while app.running && !signal::quit_requested() {
        if signal::take_sleepy() {
            suspend(terminal, app)?;
            continue;
        }
        if signal::take_awake() {
            app.resized = true;
        }

        let ts_start = Instant::now();
        if app.resized {
            let (cols, rows) = app.term;
            app.resize(cols, rows);
        }

        // Too small to render: prompt and wait for a better size.
        if !ui::layout::valid(app.term.0, app.term.1) {
            terminal.draw(|f| ui::draw(f, app))?;
            if event::poll(RESIZE_POLL)? {
                dispatch(terminal, app, event::read()?)?;
            }
            continue;
        }

        if !app.sample_frame() {
            // A mid-frame resize aborted sampling; restart with the new
            // geometry.
            continue;
        }
        terminal.draw(|f| ui::draw(f, app))?;
        app.note_frame_cost(ts_start.elapsed().as_millis() as u64);

        // Keys stashed by mid-frame polls take effect before the wait.
        while let Some(ev) = app.pending.pop_front() {
            dispatch(terminal, app, ev)?;
        }

        idle_wait(terminal, app, ts_start)?;
    }
    Ok(())
}

/// Splits the remainder of the period into bounded poll slices, repainting
/// the clock when its string changes.
fn idle_wait(terminal: &mut DefaultTerminal, app: &mut App, ts_start: Instant) -> Result<()> {
    loop {
        if !app.running || app.resized || signal::quit_requested() {
            return Ok(());
        }
        if signal::take_sleepy() {
            return suspend(terminal, app);
        }
        let elapsed = ts_start.elapsed().as_millis() as u64;
        if elapsed >= app.cfg.update_ms {
            return Ok(());
        }
        let cap = if app.proc.filter_editing {
            FILTER_SLICE
        } else {
            SLICE
        };
        let slice = Duration::from_millis(app.cfg.update_ms - elapsed).min(cap);
        if event::poll(slice)? {
            dispatch(terminal, app, event::read()?)?;
        }
        if app.update_clock() {
            terminal.draw(|f| ui::draw(f, app))?;
        }
    }
}

/// Routes one event; table-altering keys repaint immediately so navigation
/// never waits for the scheduler.
fn dispatch(terminal: &mut DefaultTerminal, app: &mut App, ev: Event) -> Result<()> {
    match ev {
        Event::Resize(cols, rows) => {
            app.term = (cols, rows);
            app.resized = true;
        }
        Event::Key(key) if key.kind == KeyEventKind::Press => {
            if app.handle_key(key) {
                terminal.draw(|f| ui::draw(f, app))?;
            }
        }
        _ => {}
    }
    Ok(())
}

/// SIGTSTP: detach the UI and stop; execution resumes here after SIGCONT.
fn suspend(terminal: &mut DefaultTerminal, app: &mut App) -> Result<()> {
    ratatui::restore();
    unsafe {
        libc::raise(libc::SIGSTOP);
    }
    *terminal = ratatui::init();
    app.resized = true;
    Ok(())
}
