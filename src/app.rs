//! Application state.
//!
//! [`App`] is the one context value threaded through sampling and
//! rendering: configuration, theme, the four domain samplers, cached panel
//! graphs, layout, UI flags, and the key handling that mutates them. No
//! module-level mutable state exists outside the signal flags.

use std::collections::VecDeque;
use std::time::Duration;

use chrono::Local;
use crossterm::event::{Event, KeyCode, KeyEvent};
use sysinfo::{System, Users};

use crate::config::{Config, UPDATE_MS_MAX, UPDATE_MS_MIN};
use crate::sampler::cpu::CpuSampler;
use crate::sampler::mem::MemSampler;
use crate::sampler::net::NetSampler;
use crate::sampler::process::ProcSampler;
use crate::theme::Theme;
use crate::ui::Panels;
use crate::ui::layout::{self, PanelLayout};

/// Options shown in the options dialog, in display order.
pub const OPTION_KEYS: [&str; 9] = [
    "color_theme",
    "update_ms",
    "proc_sorting",
    "proc_reversed",
    "check_temp",
    "draw_clock",
    "background_update",
    "custom_cpu_name",
    "error_logging",
];

/// Frames with no idle time left before the period widens.
const LATE_FRAMES_BACKOFF: u8 = 5;

/// Active overlay window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Overlay {
    None,
    Menu {
        selected: usize,
    },
    Help,
    Options {
        selected: usize,
        editing: bool,
    },
    Confirm {
        pid: u32,
        name: String,
        sig: i32,
        sig_name: &'static str,
    },
}

pub struct App {
    pub debug: bool,
    pub cfg: Config,
    pub theme: Theme,
    pub sys: System,
    pub users: Users,
    pub cpu: CpuSampler,
    pub mem: MemSampler,
    pub net: NetSampler,
    pub proc: ProcSampler,
    pub panels: Panels,
    pub layout: PanelLayout,
    pub overlay: Overlay,
    /// Whether the event loop should keep running.
    pub running: bool,
    /// A resize arrived; the next frame recomputes layout first.
    pub resized: bool,
    /// Latest known terminal size.
    pub term: (u16, u16),
    /// Rendered clock string, compared between idle slices.
    pub clock: String,
    /// Events stashed by mid-frame polls, drained after the frame.
    pub pending: VecDeque<Event>,
    late_frames: u8,
}

impl App {
    pub fn new(cfg: Config, theme: Theme, debug: bool) -> App {
        let mut sys = System::new_all();
        sys.refresh_all();
        let users = Users::new_with_refreshed_list();
        let cpu = CpuSampler::new(&sys, cfg.check_temp, &cfg.custom_cpu_name);

        App {
            debug,
            theme,
            sys,
            users,
            cpu,
            mem: MemSampler::new(),
            net: NetSampler::new(),
            proc: ProcSampler::new(),
            panels: Panels::new(),
            layout: PanelLayout::default(),
            overlay: Overlay::None,
            running: true,
            resized: false,
            term: (0, 0),
            clock: String::new(),
            pending: VecDeque::new(),
            late_frames: 0,
            cfg,
        }
    }

    // ── Geometry ────────────────────────────────────────────

    /// Recomputes layout and ring bounds, and rebuilds every graph.
    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.term = (cols, rows);
        self.layout = layout::compute(
            cols,
            rows,
            self.cpu.threads,
            self.cpu.check_temp,
            self.proc.detailed_pid.is_some(),
        );
        self.cpu.set_graph_width(self.layout.cpu_graph_width());
        self.net.set_graph_width(self.layout.net_graph_width());
        self.proc.set_geometry(
            self.layout.table_rows(),
            self.layout.detail_graph_width(),
            self.layout.detail_graph_width(),
        );
        self.panels.cpu.rebuild(&self.layout, &self.cpu);
        self.panels.net.rebuild(&self.layout, &self.net);
        self.panels.proc.rebuild(&self.layout, &self.proc);
        self.resized = false;
    }

    /// Re-runs layout at the current size (detail pane toggled, meter
    /// columns changed).
    fn relayout(&mut self) {
        let (cols, rows) = self.term;
        if cols > 0 {
            self.resize(cols, rows);
        }
    }

    // ── Frame ───────────────────────────────────────────────

    /// Samples all domains in fixed order, updating each panel's graph
    /// cache in between. Returns false when a mid-frame resize aborted the
    /// frame; the scheduler restarts it after relayout.
    pub fn sample_frame(&mut self) -> bool {
        let _ = self.proc.sample(
            &mut self.sys,
            &self.users,
            self.mem.total,
            self.cpu.threads,
            self.cfg.proc_sorting,
            self.cfg.proc_reversed,
        );
        self.panels.proc.update(&self.proc);
        if self.absorb_events() {
            return false;
        }

        self.cpu.sample();
        self.panels.cpu.update(&self.cpu);
        if self.absorb_events() {
            return false;
        }

        self.mem.sample();
        if self.absorb_events() {
            return false;
        }

        self.net.sample();
        self.panels.net.update(&mut self.net);
        true
    }

    /// Stashes any waiting events; returns true when one was a resize
    /// (which aborts the in-progress frame).
    fn absorb_events(&mut self) -> bool {
        while crossterm::event::poll(Duration::ZERO).unwrap_or(false) {
            match crossterm::event::read() {
                Ok(Event::Resize(w, h)) => {
                    self.term = (w, h);
                    self.resized = true;
                }
                Ok(ev) => self.pending.push_back(ev),
                Err(_) => break,
            }
        }
        self.resized
    }

    /// Tracks frames whose sampling+rendering consumed the whole period;
    /// five in a row widen the period by 100 ms.
    pub fn note_frame_cost(&mut self, spent_ms: u64) {
        if spent_ms >= self.cfg.update_ms {
            self.late_frames += 1;
            if self.late_frames >= LATE_FRAMES_BACKOFF {
                self.cfg.update_ms = (self.cfg.update_ms + 100).min(UPDATE_MS_MAX);
                self.late_frames = 0;
            }
        } else {
            self.late_frames = 0;
        }
    }

    /// Refreshes the clock string; true when the glyph needs a repaint.
    pub fn update_clock(&mut self) -> bool {
        let next = clock_string(&self.cfg.draw_clock);
        if next != self.clock {
            self.clock = next;
            true
        } else {
            false
        }
    }

    // ── Keys ────────────────────────────────────────────────

    /// Applies one keystroke. Returns true when the process panel should
    /// repaint immediately instead of waiting for the frame scheduler.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if self.proc.filter_editing && matches!(self.overlay, Overlay::None) {
            return self.handle_filter_key(key);
        }
        match &self.overlay {
            Overlay::None => self.handle_main_key(key),
            Overlay::Help => {
                if matches!(
                    key.code,
                    KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('h') | KeyCode::F(1)
                ) {
                    self.overlay = Overlay::None;
                }
                false
            }
            Overlay::Menu { selected } => {
                let selected = *selected;
                self.handle_menu_key(key, selected)
            }
            Overlay::Options { selected, editing } => {
                let (selected, editing) = (*selected, *editing);
                self.handle_options_key(key, selected, editing)
            }
            Overlay::Confirm { pid, sig, .. } => {
                let (pid, sig) = (*pid, *sig);
                self.handle_confirm_key(key, pid, sig)
            }
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => self.proc.filter_editing = false,
            KeyCode::Backspace => {
                self.proc.filter.pop();
            }
            KeyCode::Char(c) => self.proc.filter.push(c),
            _ => return false,
        }
        true
    }

    fn handle_main_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') | KeyCode::Char('Q') => {
                self.running = false;
                false
            }
            KeyCode::Up => {
                self.proc.move_selection(-1);
                true
            }
            KeyCode::Down => {
                self.proc.move_selection(1);
                true
            }
            KeyCode::Enter => {
                if self.proc.toggle_detail() {
                    self.relayout();
                }
                true
            }
            KeyCode::PageUp => {
                self.proc.page_up();
                true
            }
            KeyCode::PageDown => {
                self.proc.page_down();
                true
            }
            KeyCode::Home => {
                self.proc.first_page();
                true
            }
            KeyCode::End => {
                self.proc.last_page();
                true
            }
            KeyCode::Left => {
                self.cfg.proc_sorting = self.cfg.proc_sorting.prev();
                true
            }
            KeyCode::Right => {
                self.cfg.proc_sorting = self.cfg.proc_sorting.next();
                true
            }
            KeyCode::Char('r') | KeyCode::Char('R') => {
                self.cfg.proc_reversed = !self.cfg.proc_reversed;
                true
            }
            KeyCode::Char('f') | KeyCode::Char('F') => {
                self.proc.filter_editing = true;
                true
            }
            KeyCode::Char('c') | KeyCode::Char('C') => {
                self.proc.filter.clear();
                true
            }
            KeyCode::Char('t') | KeyCode::Char('T') => {
                self.confirm_signal(libc::SIGTERM, "SIGTERM")
            }
            KeyCode::Char('k') | KeyCode::Char('K') => {
                self.confirm_signal(libc::SIGKILL, "SIGKILL")
            }
            KeyCode::Char('i') | KeyCode::Char('I') => self.confirm_signal(libc::SIGINT, "SIGINT"),
            KeyCode::Char('+') | KeyCode::Char('a') | KeyCode::Char('A') => {
                self.adjust_update_ms(100);
                false
            }
            KeyCode::Char('-') | KeyCode::Char('s') | KeyCode::Char('S') => {
                self.adjust_update_ms(-100);
                false
            }
            KeyCode::Char('h') | KeyCode::Char('H') | KeyCode::F(1) => {
                self.overlay = Overlay::Help;
                false
            }
            KeyCode::Char('o') | KeyCode::Char('O') | KeyCode::F(2) => {
                self.overlay = Overlay::Options {
                    selected: 0,
                    editing: false,
                };
                false
            }
            KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Esc => {
                self.overlay = Overlay::Menu { selected: 0 };
                false
            }
            _ => false,
        }
    }

    fn confirm_signal(&mut self, sig: i32, sig_name: &'static str) -> bool {
        if let Some((pid, name)) = self.proc.signal_target() {
            self.overlay = Overlay::Confirm {
                pid,
                name,
                sig,
                sig_name,
            };
        }
        false
    }

    fn handle_confirm_key(&mut self, key: KeyEvent, pid: u32, sig: i32) -> bool {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => {
                self.proc.send_signal(pid, sig);
                self.overlay = Overlay::None;
                true
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                self.overlay = Overlay::None;
                false
            }
            _ => false,
        }
    }

    fn handle_menu_key(&mut self, key: KeyEvent, selected: usize) -> bool {
        let items = crate::ui::dialogs::menu_len();
        match key.code {
            KeyCode::Up => {
                self.overlay = Overlay::Menu {
                    selected: selected.saturating_sub(1),
                };
            }
            KeyCode::Down => {
                self.overlay = Overlay::Menu {
                    selected: (selected + 1).min(items - 1),
                };
            }
            KeyCode::Enter => match selected {
                0 => {
                    self.overlay = Overlay::Options {
                        selected: 0,
                        editing: false,
                    }
                }
                1 => self.overlay = Overlay::Help,
                _ => self.running = false,
            },
            KeyCode::Esc | KeyCode::Char('m') | KeyCode::Char('M') | KeyCode::Char('q') => {
                self.overlay = Overlay::None;
            }
            _ => {}
        }
        false
    }

    fn handle_options_key(&mut self, key: KeyEvent, selected: usize, editing: bool) -> bool {
        let option = OPTION_KEYS[selected.min(OPTION_KEYS.len() - 1)];
        if editing {
            match key.code {
                KeyCode::Enter | KeyCode::Esc => {
                    self.overlay = Overlay::Options {
                        selected,
                        editing: false,
                    };
                    self.apply_option_side_effects(option);
                }
                KeyCode::Backspace => {
                    if let Some(s) = self.option_text_mut(option) {
                        s.pop();
                    }
                }
                KeyCode::Char(c) => {
                    if let Some(s) = self.option_text_mut(option) {
                        s.push(c);
                    }
                }
                _ => {}
            }
            return false;
        }
        match key.code {
            KeyCode::Up => {
                self.overlay = Overlay::Options {
                    selected: selected.saturating_sub(1),
                    editing: false,
                };
            }
            KeyCode::Down => {
                self.overlay = Overlay::Options {
                    selected: (selected + 1).min(OPTION_KEYS.len() - 1),
                    editing: false,
                };
            }
            KeyCode::Left => self.option_adjust(option, -1),
            KeyCode::Right => self.option_adjust(option, 1),
            KeyCode::Enter if self.option_text_mut(option).is_some() => {
                self.overlay = Overlay::Options {
                    selected,
                    editing: true,
                };
            }
            KeyCode::Esc
            | KeyCode::Char('o')
            | KeyCode::Char('O')
            | KeyCode::F(2)
            | KeyCode::Char('q') => {
                self.overlay = Overlay::None;
            }
            _ => {}
        }
        false
    }

    // ── Options ─────────────────────────────────────────────

    /// Display value for the options dialog.
    pub fn option_value(&self, key: &str) -> String {
        match key {
            "color_theme" => self.cfg.color_theme.clone(),
            "update_ms" => self.cfg.update_ms.to_string(),
            "proc_sorting" => self.cfg.proc_sorting.label().to_owned(),
            "proc_reversed" => self.cfg.proc_reversed.to_string(),
            "check_temp" => self.cfg.check_temp.to_string(),
            "draw_clock" => self.cfg.draw_clock.clone(),
            "background_update" => self.cfg.background_update.to_string(),
            "custom_cpu_name" => self.cfg.custom_cpu_name.clone(),
            "error_logging" => self.cfg.error_logging.to_string(),
            _ => String::new(),
        }
    }

    /// Free-text options editable with Enter.
    fn option_text_mut(&mut self, key: &str) -> Option<&mut String> {
        match key {
            "draw_clock" => Some(&mut self.cfg.draw_clock),
            "custom_cpu_name" => Some(&mut self.cfg.custom_cpu_name),
            _ => None,
        }
    }

    /// Cycles or steps one option with the arrow keys.
    fn option_adjust(&mut self, key: &str, dir: i32) {
        match key {
            "color_theme" => self.cycle_theme(dir),
            "update_ms" => self.adjust_update_ms(dir as i64 * 100),
            "proc_sorting" => {
                self.cfg.proc_sorting = if dir < 0 {
                    self.cfg.proc_sorting.prev()
                } else {
                    self.cfg.proc_sorting.next()
                };
            }
            "proc_reversed" => self.cfg.proc_reversed = !self.cfg.proc_reversed,
            "check_temp" => {
                self.cfg.check_temp = !self.cfg.check_temp;
                self.apply_option_side_effects(key);
            }
            "background_update" => self.cfg.background_update = !self.cfg.background_update,
            "error_logging" => {
                self.cfg.error_logging = !self.cfg.error_logging;
                self.apply_option_side_effects(key);
            }
            _ => {}
        }
    }

    /// Re-applies config values that feed live state.
    fn apply_option_side_effects(&mut self, key: &str) {
        match key {
            "custom_cpu_name" => {
                if !self.cfg.custom_cpu_name.is_empty() {
                    self.cpu.model = self.cfg.custom_cpu_name.clone();
                }
            }
            "check_temp" => {
                self.cpu.check_temp = self.cfg.check_temp;
                // Meter columns widen or narrow with temperatures.
                self.relayout();
            }
            "error_logging" => {
                log::set_max_level(if self.debug {
                    log::LevelFilter::Debug
                } else if self.cfg.error_logging {
                    log::LevelFilter::Error
                } else {
                    log::LevelFilter::Off
                });
            }
            _ => {}
        }
    }

    fn cycle_theme(&mut self, dir: i32) {
        let Some(themes_dir) = Config::dir().map(|d| d.join("themes")) else {
            return;
        };
        let names = Theme::available(&themes_dir);
        let current = names
            .iter()
            .position(|n| *n == self.cfg.color_theme)
            .unwrap_or(0);
        let next = (current as i32 + dir).rem_euclid(names.len() as i32) as usize;
        self.cfg.color_theme = names[next].clone();
        self.theme = Theme::load(&themes_dir, &self.cfg.color_theme);
    }

    fn adjust_update_ms(&mut self, delta: i64) {
        let next = self.cfg.update_ms as i64 + delta;
        self.cfg.update_ms = next.clamp(UPDATE_MS_MIN as i64, UPDATE_MS_MAX as i64) as u64;
    }
}

/// Formats the clock, returning an empty string for an empty or invalid
/// strftime spec.
fn clock_string(spec: &str) -> String {
    if spec.is_empty() {
        return String::new();
    }
    let items: Vec<chrono::format::Item> = chrono::format::StrftimeItems::new(spec).collect();
    if items
        .iter()
        .any(|i| matches!(i, chrono::format::Item::Error))
    {
        return String::new();
    }
    Local::now().format_with_items(items.into_iter()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn app() -> App {
        App::new(Config::default(), Theme::default(), false)
    }

    #[test]
    fn five_late_frames_widen_the_period() {
        let mut app = app();
        app.cfg.update_ms = 2500;
        for _ in 0..4 {
            app.note_frame_cost(3000);
            assert_eq!(app.cfg.update_ms, 2500);
        }
        app.note_frame_cost(3000);
        assert_eq!(app.cfg.update_ms, 2600);
    }

    #[test]
    fn a_fast_frame_resets_the_late_streak() {
        let mut app = app();
        app.cfg.update_ms = 1000;
        for _ in 0..4 {
            app.note_frame_cost(1500);
        }
        app.note_frame_cost(10);
        for _ in 0..4 {
            app.note_frame_cost(1500);
        }
        assert_eq!(app.cfg.update_ms, 1000);
    }

    #[test]
    fn quit_key_stops_the_loop() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('q')));
        assert!(!app.running);
    }

    #[test]
    fn filter_keys_edit_and_close() {
        let mut app = app();
        app.handle_key(key(KeyCode::Char('f')));
        assert!(app.proc.filter_editing);
        for c in "bash".chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(app.proc.filter, "bash");
        app.handle_key(key(KeyCode::Backspace));
        assert_eq!(app.proc.filter, "bas");
        app.handle_key(key(KeyCode::Enter));
        assert!(!app.proc.filter_editing);
        app.handle_key(key(KeyCode::Char('c')));
        assert!(app.proc.filter.is_empty());
    }

    #[test]
    fn sort_keys_cycle_and_reverse() {
        let mut app = app();
        let before = app.cfg.proc_sorting;
        app.handle_key(key(KeyCode::Right));
        assert_eq!(app.cfg.proc_sorting, before.next());
        app.handle_key(key(KeyCode::Left));
        assert_eq!(app.cfg.proc_sorting, before);
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.cfg.proc_reversed);
    }

    #[test]
    fn update_ms_adjustment_clamps() {
        let mut app = app();
        app.cfg.update_ms = UPDATE_MS_MIN;
        app.handle_key(key(KeyCode::Char('-')));
        assert_eq!(app.cfg.update_ms, UPDATE_MS_MIN);
        app.handle_key(key(KeyCode::Char('+')));
        assert_eq!(app.cfg.update_ms, UPDATE_MS_MIN + 100);
    }

    #[test]
    fn menu_navigates_to_help() {
        let mut app = app();
        app.handle_key(key(KeyCode::Esc));
        assert!(matches!(app.overlay, Overlay::Menu { .. }));
        app.handle_key(key(KeyCode::Down));
        app.handle_key(key(KeyCode::Enter));
        assert_eq!(app.overlay, Overlay::Help);
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn clock_handles_empty_and_plain_specs() {
        assert_eq!(clock_string(""), "");
        assert_eq!(clock_string("fixed"), "fixed");
        assert!(!clock_string("%X").is_empty());
    }
}
