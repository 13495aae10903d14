//! Memory and disk sampler.
//!
//! `/proc/meminfo` percentages refreshed every fifth frame to amortize the
//! parse, swap only when the kernel reports any, and mounted filesystems
//! minus the pseudo mounts nobody wants in a usage column.

use std::fs;

use sysinfo::Disks;

/// Frames between meminfo refreshes.
const REFRESH_EVERY: u8 = 5;

/// Filesystems excluded from the disk column.
const EXCLUDED_FS: [&str; 4] = ["squashfs", "tmpfs", "devtmpfs", "overlay"];

#[derive(Debug, Clone, Default)]
pub struct DiskRow {
    pub name: String,
    pub total: u64,
    pub used: u64,
    pub free: u64,
    pub used_percent: u8,
    pub free_percent: u8,
}

pub struct MemSampler {
    /// Bytes.
    pub total: u64,
    pub used: u64,
    pub available: u64,
    pub free: u64,
    pub cached: u64,
    pub used_percent: u8,
    pub available_percent: u8,
    pub free_percent: u8,
    pub cached_percent: u8,
    pub swap_total: u64,
    pub swap_used: u64,
    pub swap_free: u64,
    pub swap_used_percent: u8,
    pub swap_free_percent: u8,
    /// False until the kernel reports SwapTotal > 0.
    pub has_swap: bool,
    pub disks: Vec<DiskRow>,
    counter: u8,
    disks_handle: Disks,
}

impl MemSampler {
    pub fn new() -> MemSampler {
        let mut sampler = MemSampler {
            total: 0,
            used: 0,
            available: 0,
            free: 0,
            cached: 0,
            used_percent: 0,
            available_percent: 0,
            free_percent: 0,
            cached_percent: 0,
            swap_total: 0,
            swap_used: 0,
            swap_free: 0,
            swap_used_percent: 0,
            swap_free_percent: 0,
            has_swap: false,
            disks: Vec::new(),
            counter: 0,
            disks_handle: Disks::new_with_refreshed_list(),
        };
        sampler.refresh();
        sampler
    }

    /// Counts down the refresh interval; most frames are free. Returns
    /// true on the frames where the sample was actually refreshed (the
    /// renderer's dirty flag).
    pub fn sample(&mut self) -> bool {
        if self.counter > 0 {
            self.counter -= 1;
            return false;
        }
        self.counter = REFRESH_EVERY - 1;
        self.refresh();
        true
    }

    fn refresh(&mut self) {
        match fs::read_to_string("/proc/meminfo") {
            Ok(text) => self.apply_meminfo(&text),
            Err(err) => log::error!("/proc/meminfo: {err}"),
        }
        self.refresh_disks();
    }

    /// Applies one meminfo snapshot. Fields that fail to parse keep their
    /// previous values.
    fn apply_meminfo(&mut self, text: &str) {
        let field = |name: &str| -> Option<u64> {
            text.lines()
                .find(|l| l.starts_with(name))?
                .split_whitespace()
                .nth(1)?
                .parse::<u64>()
                .ok()
                .map(|kb| kb * 1024)
        };

        if let Some(total) = field("MemTotal:") {
            self.total = total;
        }
        if let Some(available) = field("MemAvailable:") {
            self.available = available;
        }
        if let Some(free) = field("MemFree:") {
            self.free = free;
        }
        if let Some(cached) = field("Cached:") {
            self.cached = cached;
        }
        if self.total > 0 {
            self.used = self.total.saturating_sub(self.available);
            self.used_percent = percent(self.used, self.total);
            self.available_percent = percent(self.available, self.total);
            self.free_percent = percent(self.free, self.total);
            self.cached_percent = percent(self.cached, self.total);
        }

        if let Some(swap_total) = field("SwapTotal:") {
            self.swap_total = swap_total;
        }
        self.has_swap = self.swap_total > 0;
        if self.has_swap {
            if let Some(swap_free) = field("SwapFree:") {
                self.swap_free = swap_free;
            }
            self.swap_used = self.swap_total.saturating_sub(self.swap_free);
            self.swap_used_percent = percent(self.swap_used, self.swap_total);
            self.swap_free_percent = percent(self.swap_free, self.swap_total);
        }
    }

    fn refresh_disks(&mut self) {
        self.disks_handle.refresh(true);
        self.disks = self
            .disks_handle
            .iter()
            .filter(|d| {
                let fs_name = d.file_system().to_string_lossy();
                !EXCLUDED_FS.iter().any(|ex| fs_name == *ex)
            })
            .map(|d| {
                let total = d.total_space();
                let free = d.available_space();
                let used = total.saturating_sub(free);
                DiskRow {
                    name: mount_name(&d.mount_point().to_string_lossy()),
                    total,
                    used,
                    free,
                    used_percent: percent(used, total),
                    free_percent: percent(free, total),
                }
            })
            .filter(|row| row.total > 0)
            .collect();
    }
}

fn percent(part: u64, whole: u64) -> u8 {
    if whole == 0 {
        return 0;
    }
    (part.saturating_mul(100) / whole).min(100) as u8
}

/// Mount basename; `/` becomes "root".
fn mount_name(mount: &str) -> String {
    match mount.trim_end_matches('/').rsplit('/').next() {
        Some("") | None => "root".to_owned(),
        Some(name) => name.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare() -> MemSampler {
        MemSampler {
            total: 0,
            used: 0,
            available: 0,
            free: 0,
            cached: 0,
            used_percent: 0,
            available_percent: 0,
            free_percent: 0,
            cached_percent: 0,
            swap_total: 0,
            swap_used: 0,
            swap_free: 0,
            swap_used_percent: 0,
            swap_free_percent: 0,
            has_swap: false,
            disks: Vec::new(),
            counter: 0,
            disks_handle: Disks::new(),
        }
    }

    #[test]
    fn meminfo_reference_vector() {
        let mut mem = bare();
        mem.apply_meminfo(
            "MemTotal: 8000 kB\nMemFree: 1000 kB\nMemAvailable: 2000 kB\nCached: 1500 kB\n",
        );
        assert_eq!(mem.used, 6000 * 1024);
        assert_eq!(mem.used_percent, 75);
        assert_eq!(mem.available_percent, 25);
        assert!(!mem.has_swap);
    }

    #[test]
    fn swap_populated_when_present() {
        let mut mem = bare();
        mem.apply_meminfo(
            "MemTotal: 8000 kB\nMemAvailable: 4000 kB\nMemFree: 100 kB\nCached: 10 kB\n\
             SwapTotal: 2000 kB\nSwapFree: 500 kB\n",
        );
        assert!(mem.has_swap);
        assert_eq!(mem.swap_used, 1500 * 1024);
        assert_eq!(mem.swap_used_percent, 75);
        assert_eq!(mem.swap_free_percent, 25);
    }

    #[test]
    fn parse_failure_retains_previous_values() {
        let mut mem = bare();
        mem.apply_meminfo("MemTotal: 8000 kB\nMemAvailable: 2000 kB\n");
        let before = mem.used_percent;
        mem.apply_meminfo("MemTotal: garbage kB\nMemAvailable:\n");
        assert_eq!(mem.used_percent, before);
        assert_eq!(mem.total, 8000 * 1024);
    }

    #[test]
    fn refresh_counter_amortizes() {
        let mut mem = bare();
        mem.counter = REFRESH_EVERY - 1;
        for _ in 0..REFRESH_EVERY - 1 {
            assert!(!mem.sample());
        }
        // The fifth frame hits the kernel again.
        assert!(mem.sample());
    }

    #[test]
    fn mount_names() {
        assert_eq!(mount_name("/"), "root");
        assert_eq!(mount_name("/home"), "home");
        assert_eq!(mount_name("/var/lib/docker"), "docker");
    }
}
