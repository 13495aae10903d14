//! Config file load/save.
//!
//! One `key="value"` pair per line, `#` comments, with a versioned header.
//! Unknown keys are ignored and invalid values fall back to their defaults,
//! so a config written by a newer build still loads. A version-mismatched
//! header triggers regeneration that preserves every recognized value.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;

/// Bounds for `update_ms` (100 ms to 24 h).
pub const UPDATE_MS_MIN: u64 = 100;
pub const UPDATE_MS_MAX: u64 = 86_400_000;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ── Sort columns ────────────────────────────────────────────

/// Process-table sort column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Pid,
    Program,
    Arguments,
    Threads,
    User,
    Memory,
    /// Smoothed cpu% as reported by the snapshot source.
    CpuLazy,
    /// Delta-accounted cpu% of the current frame.
    CpuResponsive,
}

impl SortField {
    pub const ALL: [SortField; 8] = [
        SortField::Pid,
        SortField::Program,
        SortField::Arguments,
        SortField::Threads,
        SortField::User,
        SortField::Memory,
        SortField::CpuLazy,
        SortField::CpuResponsive,
    ];

    /// Config-file spelling.
    pub fn label(self) -> &'static str {
        match self {
            SortField::Pid => "pid",
            SortField::Program => "program",
            SortField::Arguments => "arguments",
            SortField::Threads => "threads",
            SortField::User => "user",
            SortField::Memory => "memory",
            SortField::CpuLazy => "cpu lazy",
            SortField::CpuResponsive => "cpu responsive",
        }
    }

    pub fn parse(s: &str) -> Option<SortField> {
        Self::ALL.into_iter().find(|f| f.label() == s)
    }

    /// Column header carrying the sort indicator.
    pub fn header(self) -> &'static str {
        match self {
            SortField::Pid => "Pid:",
            SortField::Program => "Program:",
            SortField::Arguments => "Arguments:",
            SortField::Threads => "Threads:",
            SortField::User => "User:",
            SortField::Memory => "Mem%",
            SortField::CpuLazy | SortField::CpuResponsive => "Cpu%",
        }
    }

    pub fn next(self) -> SortField {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> SortField {
        let i = Self::ALL.iter().position(|f| *f == self).unwrap_or(0);
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }
}

// ── Config ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Theme file stem under the themes directory, or "Default".
    pub color_theme: String,
    /// Target sample period in milliseconds.
    pub update_ms: u64,
    pub proc_sorting: SortField,
    pub proc_reversed: bool,
    pub check_temp: bool,
    /// strftime-style clock format; empty disables the clock.
    pub draw_clock: String,
    /// Keep refreshing graphs while a dialog is open.
    pub background_update: bool,
    /// Overrides the detected CPU model name when non-empty.
    pub custom_cpu_name: String,
    pub error_logging: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            color_theme: "Default".into(),
            update_ms: 2500,
            proc_sorting: SortField::CpuLazy,
            proc_reversed: false,
            check_temp: true,
            draw_clock: "%X".into(),
            background_update: true,
            custom_cpu_name: String::new(),
            error_logging: true,
        }
    }
}

impl Config {
    /// `~/.config/ttop`, if a config directory can be resolved at all.
    pub fn dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("ttop"))
    }

    pub fn path() -> Option<PathBuf> {
        Self::dir().map(|d| d.join("ttop.cfg"))
    }

    /// Loads the config from `path`, creating it from defaults on first run
    /// and rewriting it when the header version does not match.
    pub fn load(path: &Path) -> anyhow::Result<Config> {
        if !path.exists() {
            let cfg = Config::default();
            cfg.save(path)?;
            return Ok(cfg);
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let (cfg, version_ok) = Config::parse(&text);
        if !version_ok {
            cfg.save(path)?;
        }
        Ok(cfg)
    }

    /// Parses config text over defaults. The second value is false when the
    /// header is missing or carries another version.
    pub fn parse(text: &str) -> (Config, bool) {
        let mut cfg = Config::default();
        let mut version_ok = false;
        for line in text.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("#?") {
                version_ok = rest.contains(&format!("v. {VERSION}"));
                continue;
            }
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            cfg.set(key.trim(), value.trim().trim_matches('"'));
        }
        (cfg, version_ok)
    }

    /// Applies one key. Returns false for unknown keys or rejected values.
    pub fn set(&mut self, key: &str, value: &str) -> bool {
        match key {
            "color_theme" => self.color_theme = value.to_owned(),
            "update_ms" => match value.parse() {
                Ok(ms) => self.update_ms = clamp_update_ms(ms),
                Err(_) => return false,
            },
            "proc_sorting" => match SortField::parse(value) {
                Some(f) => self.proc_sorting = f,
                None => return false,
            },
            "proc_reversed" => return parse_bool(value, &mut self.proc_reversed),
            "check_temp" => return parse_bool(value, &mut self.check_temp),
            "draw_clock" => self.draw_clock = value.to_owned(),
            "background_update" => return parse_bool(value, &mut self.background_update),
            "custom_cpu_name" => self.custom_cpu_name = value.to_owned(),
            "error_logging" => return parse_bool(value, &mut self.error_logging),
            _ => return false,
        }
        true
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, self.emit())
            .with_context(|| format!("writing config {}", path.display()))
    }

    fn emit(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("#? Config file for ttop v. {VERSION}\n\n"));
        out.push_str("#* Color theme: file stem in the themes directory, or \"Default\"\n");
        out.push_str(&format!("color_theme=\"{}\"\n\n", self.color_theme));
        out.push_str("#* Update time in milliseconds, 100 up to 86400000\n");
        out.push_str(&format!("update_ms=\"{}\"\n\n", self.update_ms));
        out.push_str(
            "#* Processes sorting: \"pid\", \"program\", \"arguments\", \"threads\", \
             \"user\", \"memory\", \"cpu lazy\", \"cpu responsive\"\n",
        );
        out.push_str(&format!("proc_sorting=\"{}\"\n\n", self.proc_sorting.label()));
        out.push_str("#* Reverse the sorting order\n");
        out.push_str(&format!("proc_reversed=\"{}\"\n\n", self.proc_reversed));
        out.push_str("#* Collect CPU temperatures\n");
        out.push_str(&format!("check_temp=\"{}\"\n\n", self.check_temp));
        out.push_str("#* Clock format in strftime syntax, empty to disable\n");
        out.push_str(&format!("draw_clock=\"{}\"\n\n", self.draw_clock));
        out.push_str("#* Update graphs while a dialog is showing\n");
        out.push_str(&format!(
            "background_update=\"{}\"\n\n",
            self.background_update
        ));
        out.push_str("#* Custom CPU model name, empty to use the detected one\n");
        out.push_str(&format!("custom_cpu_name=\"{}\"\n\n", self.custom_cpu_name));
        out.push_str("#* Write errors to error.log in the config directory\n");
        out.push_str(&format!("error_logging=\"{}\"\n", self.error_logging));
        out
    }
}

fn clamp_update_ms(ms: u64) -> u64 {
    ms.clamp(UPDATE_MS_MIN, UPDATE_MS_MAX)
}

fn parse_bool(value: &str, target: &mut bool) -> bool {
    match value {
        "true" => *target = true,
        "false" => *target = false,
        _ => return false,
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_through_emit() {
        let mut cfg = Config::default();
        cfg.update_ms = 1800;
        cfg.proc_sorting = SortField::Memory;
        cfg.proc_reversed = true;
        cfg.custom_cpu_name = "Ryzen 7".into();
        let (parsed, version_ok) = Config::parse(&cfg.emit());
        assert!(version_ok);
        assert_eq!(parsed, cfg);
    }

    #[test]
    fn update_ms_is_clamped() {
        let mut cfg = Config::default();
        cfg.set("update_ms", "5");
        assert_eq!(cfg.update_ms, UPDATE_MS_MIN);
        cfg.set("update_ms", "999999999999");
        assert_eq!(cfg.update_ms, UPDATE_MS_MAX);
    }

    #[test]
    fn bad_values_keep_defaults() {
        let (cfg, _) = Config::parse(
            "update_ms=\"soon\"\nproc_sorting=\"alphabetical\"\ncheck_temp=\"maybe\"\n",
        );
        assert_eq!(cfg.update_ms, Config::default().update_ms);
        assert_eq!(cfg.proc_sorting, SortField::CpuLazy);
        assert!(cfg.check_temp);
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let (cfg, version_ok) = Config::parse("shiny_new_option=\"yes\"\n");
        assert_eq!(cfg, Config::default());
        assert!(!version_ok);
    }

    #[test]
    fn version_header_detected() {
        let text = format!("#? Config file for ttop v. {}\n", env!("CARGO_PKG_VERSION"));
        assert!(Config::parse(&text).1);
        assert!(!Config::parse("#? Config file for ttop v. 0.0.0\n").1);
    }

    #[test]
    fn sort_field_cycle_is_closed() {
        let mut f = SortField::Pid;
        for _ in 0..SortField::ALL.len() {
            f = f.next();
        }
        assert_eq!(f, SortField::Pid);
        assert_eq!(SortField::Pid.prev(), SortField::CpuResponsive);
    }
}
