//! Network sampler.
//!
//! Byte counters for the default-route interface from `/proc/net/dev`,
//! diffed into bytes/sec. Each direction keeps an adaptive vertical scale
//! for its graph: five consecutive over-scale frames raise it, five
//! consecutive deep-idle frames drop it back toward the recent peak. The
//! hysteresis keeps the graph from oscillating on bursty links.

use std::collections::VecDeque;
use std::fs;
use std::time::Instant;

use crate::sampler::{push_bounded, rebound};

/// Hard floor for the graph scale.
pub const GRAPH_MAX_FLOOR: u64 = 10 * 1024;

/// Initial graph scale.
const GRAPH_MAX_INIT: u64 = 50 * 1024;

/// Consecutive frames before a rescale in either direction.
const RESCALE_STREAK: u8 = 5;

/// One traffic direction.
pub struct Direction {
    /// Current speed in bytes/sec.
    pub speed: u64,
    /// Lifetime byte counter from the kernel.
    pub total: u64,
    /// Session peak speed.
    pub peak: u64,
    /// Current vertical scale of the graph; never below the floor.
    pub graph_max: u64,
    /// Speed ring feeding the graph.
    pub history: VecDeque<u64>,
    prev_bytes: Option<u64>,
    prev_ts: Option<Instant>,
    new_max_streak: u8,
    new_low_streak: u8,
    redraw: bool,
    history_cap: usize,
}

impl Direction {
    fn new() -> Direction {
        Direction {
            speed: 0,
            total: 0,
            peak: 0,
            graph_max: GRAPH_MAX_INIT,
            history: VecDeque::new(),
            prev_bytes: None,
            prev_ts: None,
            new_max_streak: 0,
            new_low_streak: 0,
            redraw: false,
            history_cap: 160,
        }
    }

    /// One-shot rescale flag, consumed by the net panel renderer.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    fn observe(&mut self, bytes: u64, now: Instant) {
        let elapsed_ms = self
            .prev_ts
            .map(|ts| now.duration_since(ts).as_millis() as u64)
            .unwrap_or(0);
        let prev = self.prev_bytes;
        self.prev_bytes = Some(bytes);
        self.prev_ts = Some(now);
        self.total = bytes;

        let (Some(prev), true) = (prev, elapsed_ms > 0) else {
            return;
        };
        self.advance(bytes.saturating_sub(prev) * 1000 / elapsed_ms);
    }

    /// Feeds one computed speed sample through ring and auto-scale state.
    fn advance(&mut self, speed: u64) {
        self.speed = speed;
        self.peak = self.peak.max(speed);
        push_bounded(&mut self.history, speed, self.history_cap);

        if speed > self.graph_max {
            self.new_max_streak += 1;
            self.new_low_streak = self.new_low_streak.saturating_sub(1);
        } else if self.graph_max > GRAPH_MAX_FLOOR && speed < self.graph_max / 8 {
            self.new_low_streak += 1;
            self.new_max_streak = self.new_max_streak.saturating_sub(1);
        }

        if self.new_max_streak >= RESCALE_STREAK {
            self.graph_max = (self.peak + self.peak / 2).max(GRAPH_MAX_FLOOR);
            self.new_max_streak = 0;
            self.new_low_streak = 0;
            self.redraw = true;
        } else if self.new_low_streak >= RESCALE_STREAK && self.history.len() > 5 {
            // Re-derive the peak from the visible window before dropping.
            self.peak = self.history.iter().copied().max().unwrap_or(0);
            self.graph_max = (self.peak * 3).max(GRAPH_MAX_FLOOR);
            self.new_max_streak = 0;
            self.new_low_streak = 0;
            self.redraw = true;
        }
    }

    fn set_history_cap(&mut self, cap: usize) {
        self.history_cap = cap.max(2);
        rebound(&mut self.history, self.history_cap);
    }
}

pub struct NetSampler {
    /// Default-route interface, resolved once at startup.
    pub iface: String,
    pub rx: Direction,
    pub tx: Direction,
}

impl NetSampler {
    pub fn new() -> NetSampler {
        let iface = default_iface().unwrap_or_default();
        if iface.is_empty() {
            log::error!("no default route interface, network panel will stay empty");
        }
        NetSampler {
            iface,
            rx: Direction::new(),
            tx: Direction::new(),
        }
    }

    /// Caps both speed rings at twice the graph width.
    pub fn set_graph_width(&mut self, width: usize) {
        self.rx.set_history_cap(width * 2);
        self.tx.set_history_cap(width * 2);
    }

    pub fn sample(&mut self) {
        if self.iface.is_empty() {
            return;
        }
        let text = match fs::read_to_string("/proc/net/dev") {
            Ok(text) => text,
            Err(err) => {
                log::error!("/proc/net/dev: {err}");
                return;
            }
        };
        let Some((rx_bytes, tx_bytes)) = iface_counters(&text, &self.iface) else {
            log::error!("interface {} missing from /proc/net/dev", self.iface);
            return;
        };
        let now = Instant::now();
        self.rx.observe(rx_bytes, now);
        self.tx.observe(tx_bytes, now);
    }
}

/// Receive/transmit byte counters for `iface`.
fn iface_counters(net_dev: &str, iface: &str) -> Option<(u64, u64)> {
    for line in net_dev.lines().skip(2) {
        let Some((name, rest)) = line.split_once(':') else {
            continue;
        };
        if name.trim() != iface {
            continue;
        }
        let fields: Vec<&str> = rest.split_whitespace().collect();
        // Fields 0 and 8: rx bytes, tx bytes.
        let rx = fields.first()?.parse().ok()?;
        let tx = fields.get(8)?.parse().ok()?;
        return Some((rx, tx));
    }
    None
}

/// Interface of the default route (destination 00000000).
fn default_iface() -> Option<String> {
    let route = fs::read_to_string("/proc/net/route").ok()?;
    for line in route.lines().skip(1) {
        let mut fields = line.split_whitespace();
        let iface = fields.next()?;
        if fields.next() == Some("00000000") {
            return Some(iface.to_owned());
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_from_counter_delta() {
        let mut dir = Direction::new();
        // prev=1000, new=1001000, Δms=1000 → 1_000_000 B/s.
        dir.advance(1_001_000u64.saturating_sub(1000) * 1000 / 1000);
        assert_eq!(dir.speed, 1_000_000);
        assert_eq!(crate::fmt::human_byte_rate(dir.speed), "976.5 KiB/s");
    }

    #[test]
    fn five_high_frames_raise_the_scale() {
        let mut dir = Direction::new();
        for _ in 0..RESCALE_STREAK - 1 {
            dir.advance(200 * 1024);
            assert_eq!(dir.graph_max, GRAPH_MAX_INIT);
            assert!(!dir.redraw);
        }
        dir.advance(200 * 1024);
        assert_eq!(dir.graph_max, 200 * 1024 + 100 * 1024);
        assert!(dir.take_redraw());
        assert!(!dir.take_redraw());
    }

    #[test]
    fn five_low_frames_drop_the_scale() {
        let mut dir = Direction::new();
        // Push the scale up first.
        for _ in 0..RESCALE_STREAK {
            dir.advance(1024 * 1024);
        }
        assert!(dir.graph_max > GRAPH_MAX_INIT);
        let _ = dir.take_redraw();
        // Then idle below an eighth of the scale.
        for _ in 0..RESCALE_STREAK {
            dir.advance(10);
        }
        // Peak re-derives from the visible window.
        assert_eq!(dir.graph_max, dir.peak * 3);
        assert!(dir.take_redraw());
    }

    #[test]
    fn scale_never_drops_below_floor() {
        let mut dir = Direction::new();
        dir.graph_max = GRAPH_MAX_FLOOR + 1;
        for _ in 0..20 {
            dir.advance(1);
        }
        assert!(dir.graph_max >= GRAPH_MAX_FLOOR);
    }

    #[test]
    fn mixed_traffic_does_not_rescale() {
        let mut dir = Direction::new();
        for i in 0..20 {
            // Alternate between over and under; streaks never reach five.
            let speed = if i % 2 == 0 { GRAPH_MAX_INIT * 2 } else { 100 };
            dir.advance(speed);
        }
        assert_eq!(dir.graph_max, GRAPH_MAX_INIT);
        assert!(!dir.take_redraw());
    }

    #[test]
    fn history_ring_stays_bounded() {
        let mut dir = Direction::new();
        dir.set_history_cap(8);
        for i in 0..100 {
            dir.advance(i);
        }
        assert!(dir.history.len() <= 8);
    }

    #[test]
    fn parses_net_dev_counters() {
        let text = "\
Inter-|   Receive                                                |  Transmit
 face |bytes    packets errs drop fifo frame compressed multicast|bytes    packets errs drop fifo colls carrier compressed
    lo: 1234567    9999    0    0    0     0          0         0  1234567    9999    0    0    0     0       0          0
  eth0: 99887766   1000    0    0    0     0          0         0  55443322    900    0    0    0     0       0          0
";
        assert_eq!(iface_counters(text, "eth0"), Some((99_887_766, 55_443_322)));
        assert_eq!(iface_counters(text, "wlan0"), None);
    }
}
