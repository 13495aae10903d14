//! CPU sampler.
//!
//! Aggregate and per-thread usage from `/proc/stat` tick deltas, current
//! frequency from cpuinfo (cpufreq fallback), load average and uptime, and
//! optional per-thread temperatures mapped from the hwmon components.

use std::collections::VecDeque;
use std::fs;

use sysinfo::{Components, System};

use crate::fmt;
use crate::sampler::{push_bounded, rebound};

/// Ring bound for each per-thread usage history.
const THREAD_HISTORY: usize = 20;

/// Ring bound for each per-thread temperature history.
const TEMP_HISTORY: usize = 15;

/// Fallback thresholds when the package component reports none.
const DEFAULT_TEMP_HIGH: i16 = 80;
const DEFAULT_TEMP_CRIT: i16 = 95;

/// Busy/idle tick counters of one stat row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Ticks {
    busy: u64,
    idle: u64,
}

pub struct CpuSampler {
    /// Logical CPU count.
    pub threads: usize,
    /// Physical core count, for mapping core temps onto hyperthreads.
    pub cores: usize,
    /// Model string shown in the panel title.
    pub model: String,
    /// Usage percentages; index 0 is the aggregate, 1..=threads per thread.
    pub usage: Vec<u8>,
    /// Aggregate usage ring feeding the panel graph.
    pub history: VecDeque<u8>,
    /// Per-thread usage rings feeding the meter column mini graphs.
    pub thread_history: Vec<VecDeque<u8>>,
    /// Formatted current frequency, empty when unreadable.
    pub freq: String,
    pub load_avg: [f64; 3],
    pub uptime_secs: u64,
    /// Temperature collection stays off for the run once it fails.
    pub check_temp: bool,
    /// Celsius; index 0 is the package, 1..=threads per thread.
    pub temps: Vec<i16>,
    pub temp_history: Vec<VecDeque<u8>>,
    pub temp_high: i16,
    pub temp_crit: i16,
    components: Components,
    prev: Vec<Ticks>,
    history_cap: usize,
}

impl CpuSampler {
    pub fn new(sys: &System, check_temp: bool, custom_name: &str) -> CpuSampler {
        let threads = sys.cpus().len().max(1);
        let cores = core_count().unwrap_or(threads).max(1);
        let model = if custom_name.is_empty() {
            sys.cpus()
                .first()
                .map(|c| c.brand().trim().to_owned())
                .unwrap_or_default()
        } else {
            custom_name.to_owned()
        };

        let mut sampler = CpuSampler {
            threads,
            cores,
            model,
            usage: vec![0; threads + 1],
            history: VecDeque::new(),
            thread_history: vec![VecDeque::new(); threads],
            freq: String::new(),
            load_avg: [0.0; 3],
            uptime_secs: 0,
            check_temp,
            temps: vec![0; threads + 1],
            temp_history: vec![VecDeque::new(); threads + 1],
            temp_high: DEFAULT_TEMP_HIGH,
            temp_crit: DEFAULT_TEMP_CRIT,
            components: Components::new_with_refreshed_list(),
            prev: Vec::new(),
            history_cap: 160,
        };
        if sampler.check_temp {
            sampler.probe_thresholds();
        }
        sampler
    }

    /// Caps the aggregate ring at twice the graph width.
    pub fn set_graph_width(&mut self, width: usize) {
        self.history_cap = (width * 2).max(2);
        rebound(&mut self.history, self.history_cap);
    }

    pub fn sample(&mut self) {
        match fs::read_to_string("/proc/stat") {
            Ok(text) => self.update_usage(&text),
            Err(err) => log::error!("/proc/stat: {err}"),
        }
        self.freq = read_frequency().map(fmt::frequency).unwrap_or_default();
        let load = System::load_average();
        self.load_avg = [load.one, load.five, load.fifteen];
        self.uptime_secs = System::uptime();
        if self.check_temp {
            self.sample_temps();
        }
    }

    /// Applies one `/proc/stat` snapshot, updating usage and rings.
    fn update_usage(&mut self, stat: &str) {
        let now = parse_stat(stat);
        if now.is_empty() {
            log::error!("/proc/stat: no cpu rows");
            return;
        }

        if self.prev.len() == now.len() {
            for (i, (prev, cur)) in self.prev.iter().zip(&now).enumerate() {
                if i < self.usage.len() {
                    self.usage[i] = usage_percent(*prev, *cur);
                }
            }
        }
        self.prev = now;

        push_bounded(&mut self.history, self.usage[0], self.history_cap);
        for (i, ring) in self.thread_history.iter_mut().enumerate() {
            push_bounded(ring, self.usage[i + 1], THREAD_HISTORY);
        }
    }

    /// Reads high/crit once from the package component.
    fn probe_thresholds(&mut self) {
        let package = self
            .components
            .iter()
            .find(|c| c.label().contains("Package"));
        match package {
            Some(pkg) => {
                if let Some(high) = pkg.max() {
                    if high > 0.0 {
                        self.temp_high = high as i16;
                    }
                }
                if let Some(crit) = pkg.critical() {
                    self.temp_crit = crit as i16;
                }
            }
            None => {
                // No recognizable sensor layout; give up for the run.
                self.check_temp = false;
            }
        }
    }

    fn sample_temps(&mut self) {
        self.components.refresh(true);
        let mut seen = false;
        for component in self.components.iter() {
            let label = component.label();
            let Some(temp) = component.temperature().map(|t| t as i16) else {
                continue;
            };
            if label.contains("Package") {
                self.temps[0] = temp;
                seen = true;
            } else if let Some(core) = core_index(label) {
                if core < self.cores && core + 1 <= self.threads {
                    self.temps[core + 1] = temp;
                    // Mirror onto the sibling hyperthread.
                    if self.threads == self.cores * 2 {
                        self.temps[core + 1 + self.cores] = temp;
                    }
                    seen = true;
                }
            }
        }
        if !seen {
            self.check_temp = false;
            log::error!("temperature components disappeared, disabling");
            return;
        }
        for (i, ring) in self.temp_history.iter_mut().enumerate() {
            let norm = (self.temps[i].max(0) as u64 * 100 / self.temp_crit.max(1) as u64).min(100);
            push_bounded(ring, norm as u8, TEMP_HISTORY);
        }
    }
}

/// `100·(Δbusy − Δidle)/Δbusy`, clamped to 0..=100.
fn usage_percent(prev: Ticks, cur: Ticks) -> u8 {
    let d_busy = cur.busy.saturating_sub(prev.busy);
    let d_idle = cur.idle.saturating_sub(prev.idle);
    if d_busy == 0 {
        return 0;
    }
    (100 * d_busy.saturating_sub(d_idle) / d_busy).min(100) as u8
}

/// Extracts busy/idle tick pairs from `/proc/stat`, aggregate row first.
fn parse_stat(text: &str) -> Vec<Ticks> {
    let mut rows = Vec::new();
    for line in text.lines() {
        if !line.starts_with("cpu") {
            break;
        }
        let mut fields = line.split_whitespace().skip(1);
        let mut take = || fields.next().and_then(|f| f.parse::<u64>().ok());
        let (Some(user), Some(nice), Some(system), Some(idle)) =
            (take(), take(), take(), take())
        else {
            continue;
        };
        rows.push(Ticks {
            busy: user + nice + system + idle,
            idle,
        });
    }
    rows
}

/// Parses `Core N` style labels.
fn core_index(label: &str) -> Option<usize> {
    let rest = label.split("Core").nth(1)?;
    rest.trim().parse().ok()
}

/// Physical cores as distinct `core id` values in cpuinfo.
fn core_count() -> Option<usize> {
    let cpuinfo = fs::read_to_string("/proc/cpuinfo").ok()?;
    let mut ids: Vec<&str> = cpuinfo
        .lines()
        .filter(|l| l.starts_with("core id"))
        .filter_map(|l| l.split(':').nth(1))
        .map(str::trim)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    if ids.is_empty() { None } else { Some(ids.len()) }
}

/// `cpu MHz` from cpuinfo, falling back to the cpufreq scaling file (kHz).
fn read_frequency() -> Option<f64> {
    if let Ok(cpuinfo) = fs::read_to_string("/proc/cpuinfo") {
        for line in cpuinfo.lines() {
            if line.starts_with("cpu MHz") {
                if let Some(mhz) = line
                    .split(':')
                    .nth(1)
                    .and_then(|v| v.trim().parse::<f64>().ok())
                {
                    return Some(mhz);
                }
            }
        }
    }
    fs::read_to_string("/sys/devices/system/cpu/cpu0/cpufreq/scaling_cur_freq")
        .ok()?
        .trim()
        .parse::<f64>()
        .ok()
        .map(|khz| khz / 1000.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const STAT_A: &str = "\
cpu  100 0 100 800 0 0 0 0 0 0
cpu0 50 0 50 400 0 0 0 0 0 0
cpu1 50 0 50 400 0 0 0 0 0 0
intr 12345
";

    const STAT_B: &str = "\
cpu  500 0 300 1000 0 0 0 0 0 0
cpu0 250 0 150 500 0 0 0 0 0 0
cpu1 250 0 150 500 0 0 0 0 0 0
intr 12345
";

    fn sampler(threads: usize) -> CpuSampler {
        CpuSampler {
            threads,
            cores: threads,
            model: String::new(),
            usage: vec![0; threads + 1],
            history: VecDeque::new(),
            thread_history: vec![VecDeque::new(); threads],
            freq: String::new(),
            load_avg: [0.0; 3],
            uptime_secs: 0,
            check_temp: false,
            temps: vec![0; threads + 1],
            temp_history: vec![VecDeque::new(); threads + 1],
            temp_high: DEFAULT_TEMP_HIGH,
            temp_crit: DEFAULT_TEMP_CRIT,
            components: Components::new(),
            prev: Vec::new(),
            history_cap: 160,
        }
    }

    #[test]
    fn parses_cpu_rows_only() {
        let rows = parse_stat(STAT_A);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], Ticks { busy: 1000, idle: 800 });
    }

    #[test]
    fn delta_formula_matches_reference_vector() {
        // Busy delta 800, idle delta 200 over one period → 75%.
        let prev = Ticks { busy: 1000, idle: 300 };
        let cur = Ticks { busy: 1800, idle: 500 };
        assert_eq!(usage_percent(prev, cur), 75);
    }

    #[test]
    fn usage_is_clamped() {
        let zero = usage_percent(Ticks { busy: 10, idle: 0 }, Ticks { busy: 10, idle: 5 });
        assert_eq!(zero, 0);
        let idle_heavy = usage_percent(
            Ticks { busy: 0, idle: 0 },
            Ticks { busy: 100, idle: 900 },
        );
        assert_eq!(idle_heavy, 0);
    }

    #[test]
    fn two_snapshots_update_all_threads() {
        let mut s = sampler(2);
        s.update_usage(STAT_A);
        s.update_usage(STAT_B);
        // Aggregate: Δbusy 800, Δidle 200 → 75.
        assert_eq!(s.usage[0], 75);
        assert_eq!(s.usage[1], 75);
        assert_eq!(s.usage[2], 75);
        for pct in &s.usage {
            assert!(*pct <= 100);
        }
    }

    #[test]
    fn rings_stay_bounded() {
        let mut s = sampler(2);
        s.set_graph_width(4);
        for _ in 0..50 {
            s.update_usage(STAT_A);
            s.update_usage(STAT_B);
        }
        assert!(s.history.len() <= 8);
        for ring in &s.thread_history {
            assert!(ring.len() <= THREAD_HISTORY);
        }
    }

    #[test]
    fn core_labels() {
        assert_eq!(core_index("coretemp Core 3"), Some(3));
        assert_eq!(core_index("Core 11"), Some(11));
        assert_eq!(core_index("k10temp Tctl"), None);
    }
}
