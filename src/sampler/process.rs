//! Process sampler and table state.
//!
//! Snapshots the process list, replaces the snapshot's smoothed cpu% with
//! delta accounting from `/proc/<pid>/stat`, and owns everything the table
//! needs between frames: sort order, filter, pagination, selection, the
//! pinned detail process, per-PID micro-graph rings, and the periodic
//! garbage collection of per-PID state.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::time::{Duration, Instant};

use sysinfo::{Pid, ProcessRefreshKind, ProcessesToUpdate, System, UpdateKind, Users};

use crate::config::SortField;
use crate::fmt;
use crate::sampler::{push_bounded, rebound};

/// Frames a PID stays eligible for a micro-graph after its last nonzero
/// tick delta.
const ACTIVITY_TTL: u8 = 5;

/// Frames between `/proc` garbage-collection sweeps.
const GC_EVERY: u64 = 100;

/// Micro-graph ring bound (5 visible cells, doubled like the big graphs).
const MICRO_HISTORY: usize = 10;

/// Rows between pending-input probes during tick accounting.
const INPUT_CHECK_EVERY: usize = 16;

/// One table row.
#[derive(Debug, Clone, Default)]
pub struct ProcRow {
    pub pid: u32,
    pub name: String,
    /// Argv tail, empty for kernel threads.
    pub arguments: String,
    pub threads: u32,
    pub user: String,
    pub mem_percent: f32,
    /// Delta-accounted cpu% in tenths, capped at `1000·threads`.
    pub cpu_tenths: u32,
    /// Smoothed cpu% from the snapshot source, for the lazy sort.
    pub lazy_cpu: f32,
}

impl ProcRow {
    /// One-decimal display form of the cpu column.
    pub fn cpu_string(&self) -> String {
        format!("{}.{}", self.cpu_tenths / 10, self.cpu_tenths % 10)
    }
}

/// Extended information for the pinned process.
#[derive(Debug, Clone, Default)]
pub struct Detail {
    pub pid: u32,
    pub name: String,
    pub cmdline: String,
    pub status: String,
    pub elapsed: String,
    pub parent_pid: Option<u32>,
    pub parent_name: String,
    pub user: String,
    pub threads: u32,
    pub mem_percent: f32,
    pub mem_string: String,
}

pub struct ProcSampler {
    /// Sorted, filtered rows; the pinned PID is appended when the filter
    /// or the snapshot missed it.
    pub rows: Vec<ProcRow>,
    pub pages: usize,
    /// 1-based current page.
    pub page: usize,
    /// 1-based row within the page; 0 means no selection.
    pub selected: usize,
    pub filter: String,
    pub filter_editing: bool,
    pub detailed_pid: Option<u32>,
    pub detail: Option<Detail>,
    /// Set when the pinned PID disappears from the system.
    pub detailed_killed: bool,
    /// Detail-pane cpu ring (bounded at twice the detail graph width).
    pub detail_cpu: VecDeque<u8>,
    /// Detail-pane memory ring (bounded at the mini-graph width).
    pub detail_mem: VecDeque<u8>,
    rows_per_page: usize,
    prev_ticks: HashMap<u32, u64>,
    activity: HashMap<u32, u8>,
    micro: HashMap<u32, VecDeque<u8>>,
    prev_ts: Option<Instant>,
    frame: u64,
    hz: u64,
    detail_cpu_cap: usize,
    detail_mem_cap: usize,
}

impl ProcSampler {
    pub fn new() -> ProcSampler {
        ProcSampler {
            rows: Vec::new(),
            pages: 1,
            page: 1,
            selected: 0,
            filter: String::new(),
            filter_editing: false,
            detailed_pid: None,
            detail: None,
            detailed_killed: false,
            detail_cpu: VecDeque::new(),
            detail_mem: VecDeque::new(),
            rows_per_page: 1,
            prev_ticks: HashMap::new(),
            activity: HashMap::new(),
            micro: HashMap::new(),
            prev_ts: None,
            frame: 0,
            hz: clock_ticks(),
            detail_cpu_cap: 40,
            detail_mem_cap: 20,
        }
    }

    /// Rows shown on the current page.
    pub fn visible_rows(&self) -> &[ProcRow] {
        let start = (self.page - 1) * self.rows_per_page;
        let end = (start + self.rows_per_page).min(self.rows.len());
        &self.rows[start.min(self.rows.len())..end]
    }

    pub fn micro_graph(&self, pid: u32) -> Option<&VecDeque<u8>> {
        self.micro.get(&pid)
    }

    /// Called on layout changes: rows per table page and detail ring caps.
    pub fn set_geometry(&mut self, rows_per_page: usize, detail_graph_w: usize, detail_mini_w: usize) {
        self.rows_per_page = rows_per_page.max(1);
        self.detail_cpu_cap = (detail_graph_w * 2).max(2);
        self.detail_mem_cap = detail_mini_w.max(2);
        rebound(&mut self.detail_cpu, self.detail_cpu_cap);
        rebound(&mut self.detail_mem, self.detail_mem_cap);
        self.clamp_view();
    }

    /// Samples the table. Returns false when pending input cut the tick
    /// accounting short; the remaining rows keep their smoothed values
    /// until the next frame.
    pub fn sample(
        &mut self,
        sys: &mut System,
        users: &Users,
        total_memory: u64,
        cpu_threads: usize,
        sorting: SortField,
        reversed: bool,
    ) -> bool {
        sys.refresh_processes_specifics(
            ProcessesToUpdate::All,
            true,
            ProcessRefreshKind::nothing()
                .with_cpu()
                .with_memory()
                .with_cmd(UpdateKind::OnlyIfNotSet)
                .with_user(UpdateKind::OnlyIfNotSet),
        );

        let now = Instant::now();
        let elapsed_ms = self
            .prev_ts
            .map(|ts| now.duration_since(ts).as_millis() as u64)
            .unwrap_or(0);

        let mut rows: Vec<ProcRow> = sys
            .processes()
            .values()
            .map(|p| {
                let user = p
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|u| u.name().to_owned())
                    .unwrap_or_default();
                ProcRow {
                    pid: p.pid().as_u32(),
                    name: p.name().to_string_lossy().into_owned(),
                    arguments: argv_tail(p.cmd()),
                    threads: p.tasks().map_or(1, |t| t.len().max(1)) as u32,
                    user,
                    mem_percent: mem_percent(p.memory(), total_memory),
                    cpu_tenths: (p.cpu_usage() * 10.0).max(0.0) as u32,
                    lazy_cpu: p.cpu_usage(),
                }
            })
            .collect();

        // Accurate cpu% from /proc/<pid>/stat, with an input early-exit so
        // a keystroke never waits behind a long table.
        let mut completed = true;
        let mut fresh_ticks: HashMap<u32, u64> = HashMap::with_capacity(rows.len());
        for (i, row) in rows.iter_mut().enumerate() {
            if i % INPUT_CHECK_EVERY == INPUT_CHECK_EVERY - 1 && input_pending() {
                completed = false;
                break;
            }
            let Ok(stat) = fs::read_to_string(format!("/proc/{}/stat", row.pid)) else {
                continue;
            };
            let Some(ticks) = stat_ticks(&stat) else {
                continue;
            };
            fresh_ticks.insert(row.pid, ticks);

            let Some(prev) = self.prev_ticks.get(&row.pid) else {
                continue;
            };
            if elapsed_ms == 0 {
                continue;
            }
            let delta = ticks.saturating_sub(*prev);
            row.cpu_tenths = cpu_tenths(delta, self.hz, elapsed_ms, cpu_threads);

            if delta > 0 {
                self.activity.insert(row.pid, ACTIVITY_TTL);
            }
        }
        self.prev_ticks.extend(fresh_ticks);
        self.prev_ts = Some(now);

        // Age activity entries and extend micro-graphs of live ones.
        self.activity.retain(|_, ttl| {
            *ttl -= 1;
            *ttl > 0
        });
        for row in &rows {
            if self.activity.contains_key(&row.pid) {
                let ring = self.micro.entry(row.pid).or_default();
                push_bounded(ring, (row.cpu_tenths / 10).min(100) as u8, MICRO_HISTORY);
            }
        }

        sort_rows(&mut rows, sorting, reversed);
        if !self.filter.is_empty() {
            rows.retain(|row| row_matches(row, &self.filter));
        }
        self.append_pinned(&mut rows, sys, users, total_memory);
        self.rows = rows;
        self.clamp_view();

        self.update_detail(sys, total_memory);

        self.frame += 1;
        if self.frame % GC_EVERY == 0 {
            let alive = scan_proc_pids();
            self.retain_alive(&alive);
        }
        completed
    }

    /// Keeps the pinned PID in the sample even when the filter or the
    /// snapshot missed it.
    fn append_pinned(
        &mut self,
        rows: &mut Vec<ProcRow>,
        sys: &System,
        users: &Users,
        total_memory: u64,
    ) {
        let Some(pid) = self.detailed_pid else {
            return;
        };
        if rows.iter().any(|r| r.pid == pid) {
            return;
        }
        match sys.process(Pid::from_u32(pid)) {
            Some(p) => {
                let user = p
                    .user_id()
                    .and_then(|uid| users.get_user_by_id(uid))
                    .map(|u| u.name().to_owned())
                    .unwrap_or_default();
                rows.push(ProcRow {
                    pid,
                    name: p.name().to_string_lossy().into_owned(),
                    arguments: argv_tail(p.cmd()),
                    threads: p.tasks().map_or(1, |t| t.len().max(1)) as u32,
                    user,
                    mem_percent: mem_percent(p.memory(), total_memory),
                    cpu_tenths: (p.cpu_usage() * 10.0).max(0.0) as u32,
                    lazy_cpu: p.cpu_usage(),
                });
            }
            None => self.detailed_killed = true,
        }
    }

    fn update_detail(&mut self, sys: &System, total_memory: u64) {
        let Some(pid) = self.detailed_pid else {
            return;
        };
        let row_tenths = self
            .rows
            .iter()
            .find(|r| r.pid == pid)
            .map(|r| r.cpu_tenths)
            .unwrap_or(0);
        push_bounded(
            &mut self.detail_cpu,
            (row_tenths / 10).min(100) as u8,
            self.detail_cpu_cap,
        );

        let Some(p) = sys.process(Pid::from_u32(pid)) else {
            self.detailed_killed = true;
            return;
        };
        let parent_pid = p.parent().map(|pp| pp.as_u32());
        let parent_name = parent_pid
            .and_then(|pp| sys.process(Pid::from_u32(pp)))
            .map(|pp| pp.name().to_string_lossy().into_owned())
            .unwrap_or_default();
        let mem_pct = mem_percent(p.memory(), total_memory);
        push_bounded(
            &mut self.detail_mem,
            (mem_pct as u8).min(100),
            self.detail_mem_cap,
        );

        let cmdline = fs::read_to_string(format!("/proc/{pid}/cmdline"))
            .map(|raw| {
                raw.split('\0')
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .unwrap_or_default();

        self.detail = Some(Detail {
            pid,
            name: p.name().to_string_lossy().into_owned(),
            cmdline,
            status: p.status().to_string(),
            elapsed: fmt::elapsed(p.run_time()),
            parent_pid,
            parent_name,
            user: self
                .rows
                .iter()
                .find(|r| r.pid == pid)
                .map(|r| r.user.clone())
                .unwrap_or_default(),
            threads: p.tasks().map_or(1, |t| t.len().max(1)) as u32,
            mem_percent: mem_pct,
            mem_string: fmt::human_bytes(p.memory()),
        });
    }

    // ── Interaction ─────────────────────────────────────────

    /// Moves the selection, clamped into the current page.
    pub fn move_selection(&mut self, delta: i32) {
        let max = self.visible_rows().len();
        let next = (self.selected as i32 + delta).clamp(0, max as i32);
        self.selected = next as usize;
    }

    pub fn page_up(&mut self) {
        self.page = self.page.saturating_sub(1).max(1);
        self.clamp_view();
    }

    pub fn page_down(&mut self) {
        self.page = (self.page + 1).min(self.pages);
        self.clamp_view();
    }

    pub fn first_page(&mut self) {
        self.page = 1;
        self.clamp_view();
    }

    pub fn last_page(&mut self) {
        self.page = self.pages;
        self.clamp_view();
    }

    /// PID of the selected row, if any.
    pub fn selected_pid(&self) -> Option<u32> {
        if self.selected == 0 {
            return None;
        }
        self.visible_rows().get(self.selected - 1).map(|r| r.pid)
    }

    /// Pins the selected process to the detail pane; pinning the pinned
    /// PID again (or toggling with no selection) closes the pane. Returns
    /// true when the pane opened or closed.
    pub fn toggle_detail(&mut self) -> bool {
        let pin = match (self.selected_pid(), self.detailed_pid) {
            (Some(pid), Some(current)) if pid == current => None,
            (Some(pid), _) => Some(pid),
            (None, Some(_)) => None,
            (None, None) => return false,
        };
        self.detailed_pid = pin;
        self.detail = None;
        self.detailed_killed = false;
        self.detail_cpu.clear();
        self.detail_mem.clear();
        true
    }

    /// Signal target: the selected row, or the pinned process.
    pub fn signal_target(&self) -> Option<(u32, String)> {
        if let Some(pid) = self.selected_pid() {
            let name = self
                .rows
                .iter()
                .find(|r| r.pid == pid)
                .map(|r| r.name.clone())
                .unwrap_or_default();
            return Some((pid, name));
        }
        self.detailed_pid.map(|pid| {
            let name = self
                .detail
                .as_ref()
                .map(|d| d.name.clone())
                .unwrap_or_default();
            (pid, name)
        })
    }

    /// Delivers `sig` to the target process.
    pub fn send_signal(&self, pid: u32, sig: i32) {
        let ret = unsafe { libc::kill(pid as libc::pid_t, sig) };
        if ret != 0 {
            log::error!("kill({pid}, {sig}) failed");
        }
    }

    /// Re-derives pages and clamps page and selection after any change to
    /// the row set or geometry.
    fn clamp_view(&mut self) {
        self.pages = self.rows.len().div_ceil(self.rows_per_page).max(1);
        self.page = self.page.clamp(1, self.pages);
        let max = self.visible_rows().len().min(self.rows_per_page);
        self.selected = self.selected.min(max);
    }

    /// Drops per-PID state for PIDs no longer present.
    fn retain_alive(&mut self, alive: &HashSet<u32>) {
        self.prev_ticks.retain(|pid, _| alive.contains(pid));
        self.activity.retain(|pid, _| alive.contains(pid));
        self.micro.retain(|pid, _| alive.contains(pid));
        if let Some(pid) = self.detailed_pid {
            if !alive.contains(&pid) {
                self.detailed_killed = true;
            }
        }
    }
}

// ── Helpers ─────────────────────────────────────────────────

/// `Δticks·1000·1000 / (HZ·Δms·threads)`, already in display tenths,
/// capped at `1000·threads` (100% per logical CPU).
fn cpu_tenths(d_ticks: u64, hz: u64, elapsed_ms: u64, threads: usize) -> u32 {
    let den = hz * elapsed_ms * threads.max(1) as u64;
    if den == 0 {
        return 0;
    }
    let tenths = d_ticks.saturating_mul(1_000_000) / den;
    tenths.min(1000 * threads.max(1) as u64) as u32
}

/// utime+stime (fields 14 and 15) from a `/proc/<pid>/stat` line. The comm
/// field may contain spaces and parentheses, so parsing starts after the
/// last `)`.
fn stat_ticks(stat: &str) -> Option<u64> {
    let rest = stat.rsplit_once(')')?.1;
    let fields: Vec<&str> = rest.split_whitespace().collect();
    let utime: u64 = fields.get(11)?.parse().ok()?;
    let stime: u64 = fields.get(12)?.parse().ok()?;
    Some(utime + stime)
}

fn sort_rows(rows: &mut [ProcRow], field: SortField, reversed: bool) {
    rows.sort_by(|a, b| {
        let ord = match field {
            SortField::Pid => a.pid.cmp(&b.pid).reverse(),
            SortField::Program => a.name.to_lowercase().cmp(&b.name.to_lowercase()).reverse(),
            SortField::Arguments => a.arguments.cmp(&b.arguments).reverse(),
            SortField::Threads => a.threads.cmp(&b.threads).reverse(),
            SortField::User => a.user.cmp(&b.user).reverse(),
            SortField::Memory => a
                .mem_percent
                .partial_cmp(&b.mem_percent)
                .unwrap_or(std::cmp::Ordering::Equal)
                .reverse(),
            SortField::CpuLazy => a
                .lazy_cpu
                .partial_cmp(&b.lazy_cpu)
                .unwrap_or(std::cmp::Ordering::Equal)
                .reverse(),
            SortField::CpuResponsive => a.cpu_tenths.cmp(&b.cpu_tenths).reverse(),
        };
        if reversed { ord.reverse() } else { ord }
    });
}

fn row_matches(row: &ProcRow, filter: &str) -> bool {
    row.name.contains(filter)
        || row.arguments.contains(filter)
        || row.user.contains(filter)
        || row.pid.to_string().contains(filter)
}

fn argv_tail(cmd: &[std::ffi::OsString]) -> String {
    cmd.iter()
        .skip(1)
        .map(|s| s.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}

fn mem_percent(bytes: u64, total: u64) -> f32 {
    if total == 0 {
        return 0.0;
    }
    (bytes as f64 * 100.0 / total as f64) as f32
}

/// Numeric entries under `/proc`.
fn scan_proc_pids() -> HashSet<u32> {
    let mut alive = HashSet::new();
    if let Ok(entries) = fs::read_dir("/proc") {
        for entry in entries.flatten() {
            if let Ok(pid) = entry.file_name().to_string_lossy().parse::<u32>() {
                alive.insert(pid);
            }
        }
    }
    alive
}

/// True when a keystroke (or any other event) is waiting.
fn input_pending() -> bool {
    crossterm::event::poll(Duration::ZERO).unwrap_or(false)
}

fn clock_ticks() -> u64 {
    let hz = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if hz > 0 { hz as u64 } else { 100 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pid: u32, name: &str, cpu_tenths: u32) -> ProcRow {
        ProcRow {
            pid,
            name: name.to_owned(),
            cpu_tenths,
            ..ProcRow::default()
        }
    }

    #[test]
    fn cpu_tenths_reference_vector() {
        // 500 ticks over 1000 ms, HZ=100, 8 threads → 62.5%.
        assert_eq!(cpu_tenths(500, 100, 1000, 8), 625);
    }

    #[test]
    fn cpu_tenths_is_capped_per_thread_count() {
        assert_eq!(cpu_tenths(u64::MAX / 2, 100, 1000, 8), 8000);
        assert_eq!(cpu_tenths(0, 100, 0, 8), 0);
    }

    #[test]
    fn stat_ticks_survives_hostile_comm() {
        let stat = "1234 (we(ird) name)) R 1 1 1 0 -1 4194560 100 0 0 0 300 200 0 0 \
                    20 0 8 0 12345 1000000 100 18446744073709551615";
        assert_eq!(stat_ticks(stat), Some(500));
    }

    #[test]
    fn pagination_law() {
        let mut proc = ProcSampler::new();
        proc.rows = (0..45).map(|i| row(i, "p", 0)).collect();
        proc.rows_per_page = 20;
        proc.clamp_view();
        // pages = ⌈rows/per_page⌉
        assert_eq!(proc.pages, 3);
        proc.page = 99;
        proc.clamp_view();
        assert_eq!(proc.page, 3);
        assert_eq!(proc.visible_rows().len(), 5);
    }

    #[test]
    fn selection_clamped_to_page() {
        let mut proc = ProcSampler::new();
        proc.rows = (0..10).map(|i| row(i, "p", 0)).collect();
        proc.rows_per_page = 20;
        proc.selected = 15;
        proc.clamp_view();
        assert!(proc.selected <= proc.visible_rows().len());
        proc.move_selection(100);
        assert_eq!(proc.selected, 10);
        proc.move_selection(-100);
        assert_eq!(proc.selected, 0);
    }

    #[test]
    fn sort_defaults_descending_and_reverses() {
        let mut rows = vec![row(1, "a", 10), row(2, "b", 30), row(3, "c", 20)];
        sort_rows(&mut rows, SortField::CpuResponsive, false);
        assert_eq!(rows[0].pid, 2);
        sort_rows(&mut rows, SortField::CpuResponsive, true);
        assert_eq!(rows[0].pid, 1);
        sort_rows(&mut rows, SortField::Pid, false);
        assert_eq!(rows[0].pid, 3);
    }

    #[test]
    fn filter_matches_name_args_user_pid() {
        let mut r = row(4242, "bash", 0);
        r.arguments = "-lc make".into();
        r.user = "alice".into();
        assert!(row_matches(&r, "bash"));
        assert!(row_matches(&r, "make"));
        assert!(row_matches(&r, "alice"));
        assert!(row_matches(&r, "4242"));
        assert!(!row_matches(&r, "zsh"));
    }

    #[test]
    fn gc_drops_dead_pid_state() {
        let mut proc = ProcSampler::new();
        proc.prev_ticks.insert(100, 5);
        proc.prev_ticks.insert(200, 5);
        proc.micro.insert(100, VecDeque::from([1]));
        proc.activity.insert(200, 3);
        proc.detailed_pid = Some(200);

        let alive: HashSet<u32> = [100].into_iter().collect();
        proc.retain_alive(&alive);

        assert!(proc.prev_ticks.contains_key(&100));
        assert!(!proc.prev_ticks.contains_key(&200));
        assert!(!proc.activity.contains_key(&200));
        assert!(proc.detailed_killed);
    }

    #[test]
    fn pinned_pid_survives_filter() {
        let mut sys = System::new_all();
        sys.refresh_all();
        let users = Users::new_with_refreshed_list();
        let me = std::process::id();

        let total = sys.total_memory();
        let mut proc = ProcSampler::new();
        proc.set_geometry(20, 20, 10);
        proc.detailed_pid = Some(me);
        proc.filter = "no-process-will-ever-match-this".into();
        proc.sample(&mut sys, &users, total, 4, SortField::Pid, false);
        assert!(proc.rows.iter().any(|r| r.pid == me));
        assert!(proc.detail.is_some());

        // Clearing the filter brings the full table back.
        proc.filter.clear();
        proc.sample(&mut sys, &users, total, 4, SortField::Pid, false);
        assert!(proc.rows.len() > 1);
    }

    #[test]
    fn micro_ring_stays_bounded() {
        let mut ring = VecDeque::new();
        for i in 0..50u8 {
            push_bounded(&mut ring, i, MICRO_HISTORY);
        }
        assert!(ring.len() <= MICRO_HISTORY);
    }

    #[test]
    fn cpu_string_has_one_decimal() {
        assert_eq!(row(1, "p", 625).cpu_string(), "62.5");
        assert_eq!(row(1, "p", 0).cpu_string(), "0.0");
    }
}
