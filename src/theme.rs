//! Theme files and color ramps.
//!
//! Themes are shell-style `theme[key]="value"` assignments; colors come as
//! 6-hex `#RRGGBB`, 2-hex `#GG` greyscale, or three space-separated
//! decimals. Graph and meter colors are 101-entry ramps indexed by
//! percentage, interpolated piecewise-linearly start→mid→end.

use std::fs;
use std::path::Path;

use ratatui::style::Color;

// ── Colors ──────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r, g, b }
    }

    pub fn color(self) -> Color {
        Color::Rgb(self.r, self.g, self.b)
    }

    /// Accepts `#RRGGBB`, `#GG` (greyscale) or `"R G B"` decimals.
    pub fn parse(s: &str) -> Option<Rgb> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return match hex.len() {
                6 => {
                    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
                    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
                    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
                    Some(Rgb::new(r, g, b))
                }
                2 => {
                    let v = u8::from_str_radix(hex, 16).ok()?;
                    Some(Rgb::new(v, v, v))
                }
                _ => None,
            };
        }
        let mut parts = s.split_whitespace();
        let r = parts.next()?.parse().ok()?;
        let g = parts.next()?.parse().ok()?;
        let b = parts.next()?.parse().ok()?;
        if parts.next().is_some() {
            return None;
        }
        Some(Rgb::new(r, g, b))
    }

    /// Canonical decimal form.
    fn emit(self) -> String {
        format!("{} {} {}", self.r, self.g, self.b)
    }

    fn halved(self) -> Rgb {
        Rgb::new(self.r / 2, self.g / 2, self.b / 2)
    }

    fn brightness(self) -> u32 {
        self.r as u32 + self.g as u32 + self.b as u32
    }
}

// ── Ramps ───────────────────────────────────────────────────

/// Gradient endpoints as declared in a theme file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RampSpec {
    pub start: Rgb,
    pub mid: Option<Rgb>,
    pub end: Option<Rgb>,
}

impl RampSpec {
    const fn gradient(start: Rgb, mid: Rgb, end: Rgb) -> RampSpec {
        RampSpec {
            start,
            mid: Some(mid),
            end: Some(end),
        }
    }

    /// The declared mid, or `end/2` when the ramp brightens, else `start/2`.
    fn effective_mid(&self) -> Rgb {
        if let Some(mid) = self.mid {
            return mid;
        }
        match self.end {
            Some(end) if end.brightness() > self.start.brightness() => end.halved(),
            _ => self.start.halved(),
        }
    }
}

/// A 101-entry RGB table indexed by percentage 0..=100.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ramp {
    spec: RampSpec,
    colors: Box<[Rgb; 101]>,
}

impl Ramp {
    pub fn build(spec: RampSpec) -> Ramp {
        let mut colors = Box::new([spec.start; 101]);
        if let Some(end) = spec.end {
            let mid = spec.effective_mid();
            for (i, slot) in colors.iter_mut().enumerate() {
                *slot = if i <= 50 {
                    lerp(spec.start, mid, i as i32, 50)
                } else {
                    lerp(mid, end, i as i32 - 50, 50)
                };
            }
        }
        Ramp {
            spec,
            colors,
        }
    }

    /// Color at `pct`, clamped into 0..=100.
    pub fn color(&self, pct: usize) -> Color {
        self.colors[pct.min(100)].color()
    }

    pub fn spec(&self) -> &RampSpec {
        &self.spec
    }
}

fn lerp(from: Rgb, to: Rgb, num: i32, den: i32) -> Rgb {
    let chan = |f: u8, t: u8| {
        let v = f as i32 + (t as i32 - f as i32) * num / den;
        v.clamp(0, 255) as u8
    };
    Rgb::new(
        chan(from.r, to.r),
        chan(from.g, to.g),
        chan(from.b, to.b),
    )
}

// ── Theme ───────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub name: String,
    /// Terminal default background when unset.
    pub main_bg: Option<Rgb>,
    pub main_fg: Rgb,
    pub title: Rgb,
    pub hi_fg: Rgb,
    pub inactive_fg: Rgb,
    pub selected_fg: Rgb,
    pub selected_bg: Rgb,
    pub proc_misc: Rgb,
    pub div_line: Rgb,
    pub cpu_box: Rgb,
    pub mem_box: Rgb,
    pub net_box: Rgb,
    pub proc_box: Rgb,
    pub temp: Ramp,
    pub cpu: Ramp,
    pub upload: Ramp,
    pub download: Ramp,
    pub used: Ramp,
    pub available: Ramp,
    pub cached: Ramp,
    pub free: Ramp,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            name: "Default".into(),
            main_bg: None,
            main_fg: Rgb::new(0xcc, 0xcc, 0xcc),
            title: Rgb::new(0xee, 0xee, 0xee),
            hi_fg: Rgb::new(0x90, 0x90, 0x90),
            inactive_fg: Rgb::new(0x40, 0x40, 0x40),
            selected_fg: Rgb::new(0xee, 0xee, 0xee),
            selected_bg: Rgb::new(0x7e, 0x26, 0x26),
            proc_misc: Rgb::new(0x0d, 0xe7, 0x56),
            div_line: Rgb::new(0x30, 0x30, 0x30),
            cpu_box: Rgb::new(0x3d, 0x7b, 0x46),
            mem_box: Rgb::new(0x8a, 0x88, 0x2e),
            net_box: Rgb::new(0x42, 0x3b, 0xa5),
            proc_box: Rgb::new(0x92, 0x35, 0x35),
            temp: Ramp::build(RampSpec::gradient(
                Rgb::new(0x48, 0x97, 0xd4),
                Rgb::new(0x54, 0x74, 0xe8),
                Rgb::new(0xff, 0x40, 0xb6),
            )),
            cpu: Ramp::build(RampSpec::gradient(
                Rgb::new(0x50, 0xf0, 0x95),
                Rgb::new(0xf2, 0xe2, 0x66),
                Rgb::new(0xfa, 0x1e, 0x1e),
            )),
            upload: Ramp::build(RampSpec::gradient(
                Rgb::new(0x51, 0x05, 0x54),
                Rgb::new(0x7d, 0x41, 0x80),
                Rgb::new(0xdc, 0xaf, 0xde),
            )),
            download: Ramp::build(RampSpec::gradient(
                Rgb::new(0x23, 0x1a, 0x63),
                Rgb::new(0x4f, 0x43, 0xa3),
                Rgb::new(0xb0, 0xa9, 0xde),
            )),
            used: Ramp::build(RampSpec::gradient(
                Rgb::new(0x3b, 0x1f, 0x1c),
                Rgb::new(0xd9, 0x62, 0x6d),
                Rgb::new(0xff, 0x47, 0x69),
            )),
            available: Ramp::build(RampSpec::gradient(
                Rgb::new(0x29, 0x21, 0x07),
                Rgb::new(0xff, 0xd7, 0x7a),
                Rgb::new(0xff, 0xb8, 0x14),
            )),
            cached: Ramp::build(RampSpec::gradient(
                Rgb::new(0x0b, 0x1a, 0x29),
                Rgb::new(0x74, 0xe6, 0xfc),
                Rgb::new(0x26, 0xc5, 0xff),
            )),
            free: Ramp::build(RampSpec::gradient(
                Rgb::new(0x22, 0x30, 0x14),
                Rgb::new(0xb5, 0xe6, 0x85),
                Rgb::new(0xdc, 0xff, 0x85),
            )),
        }
    }
}

impl Theme {
    /// Loads `name` from the themes directory, falling back to the built-in
    /// default when the name is "Default" or the file cannot be used.
    pub fn load(themes_dir: &Path, name: &str) -> Theme {
        if name == "Default" {
            return Theme::default();
        }
        let path = themes_dir.join(format!("{}.theme", name.trim_end_matches(".theme")));
        match fs::read_to_string(&path) {
            Ok(text) => Theme::parse(name, &text),
            Err(err) => {
                log::error!("theme {}: {err}", path.display());
                Theme::default()
            }
        }
    }

    /// Theme names available for cycling: "Default" plus every `*.theme`
    /// file stem found in the themes directory, sorted.
    pub fn available(themes_dir: &Path) -> Vec<String> {
        let mut names = vec!["Default".to_owned()];
        if let Ok(entries) = fs::read_dir(themes_dir) {
            let mut stems: Vec<String> = entries
                .flatten()
                .filter_map(|e| {
                    let name = e.file_name().to_string_lossy().into_owned();
                    name.strip_suffix(".theme").map(str::to_owned)
                })
                .collect();
            stems.sort();
            names.extend(stems);
        }
        names
    }

    /// Parses theme text over the defaults; unknown keys are ignored.
    pub fn parse(name: &str, text: &str) -> Theme {
        let mut theme = Theme {
            name: name.to_owned(),
            ..Theme::default()
        };

        let get = |key: &str| -> Option<Rgb> {
            for line in text.lines() {
                let line = line.trim();
                let rest = line.strip_prefix("theme[").unwrap_or(line);
                let Some((k, v)) = rest.split_once('=') else {
                    continue;
                };
                if k.trim_end_matches(']').trim() == key {
                    return Rgb::parse(v.trim().trim_matches('"'));
                }
            }
            None
        };

        theme.main_bg = get("main_bg");
        for (slot, key) in [
            (&mut theme.main_fg, "main_fg"),
            (&mut theme.title, "title"),
            (&mut theme.hi_fg, "hi_fg"),
            (&mut theme.inactive_fg, "inactive_fg"),
            (&mut theme.selected_fg, "selected_fg"),
            (&mut theme.selected_bg, "selected_bg"),
            (&mut theme.proc_misc, "proc_misc"),
            (&mut theme.div_line, "div_line"),
            (&mut theme.cpu_box, "cpu_box"),
            (&mut theme.mem_box, "mem_box"),
            (&mut theme.net_box, "net_box"),
            (&mut theme.proc_box, "proc_box"),
        ] {
            if let Some(rgb) = get(key) {
                *slot = rgb;
            }
        }

        for (slot, key) in [
            (&mut theme.temp, "temp"),
            (&mut theme.cpu, "cpu"),
            (&mut theme.upload, "upload"),
            (&mut theme.download, "download"),
            (&mut theme.used, "used"),
            (&mut theme.available, "available"),
            (&mut theme.cached, "cached"),
            (&mut theme.free, "free"),
        ] {
            let start = get(&format!("{key}_start"));
            let mid = get(&format!("{key}_mid"));
            let end = get(&format!("{key}_end"));
            if let Some(start) = start {
                *slot = Ramp::build(RampSpec { start, mid, end });
            } else if mid.is_some() || end.is_some() {
                // A ramp needs at least its start; partial declarations
                // keep the default.
                log::error!("theme {name}: ramp {key} missing {key}_start");
            }
        }

        theme
    }

    /// Canonical form: every color as `theme[key]="R G B"`. Parsing the
    /// emission yields identical colors and ramps.
    pub fn emit_canonical(&self) -> String {
        let mut out = String::new();
        if let Some(bg) = self.main_bg {
            out.push_str(&format!("theme[main_bg]=\"{}\"\n", bg.emit()));
        }
        for (rgb, key) in [
            (self.main_fg, "main_fg"),
            (self.title, "title"),
            (self.hi_fg, "hi_fg"),
            (self.inactive_fg, "inactive_fg"),
            (self.selected_fg, "selected_fg"),
            (self.selected_bg, "selected_bg"),
            (self.proc_misc, "proc_misc"),
            (self.div_line, "div_line"),
            (self.cpu_box, "cpu_box"),
            (self.mem_box, "mem_box"),
            (self.net_box, "net_box"),
            (self.proc_box, "proc_box"),
        ] {
            out.push_str(&format!("theme[{key}]=\"{}\"\n", rgb.emit()));
        }
        for (ramp, key) in [
            (&self.temp, "temp"),
            (&self.cpu, "cpu"),
            (&self.upload, "upload"),
            (&self.download, "download"),
            (&self.used, "used"),
            (&self.available, "available"),
            (&self.cached, "cached"),
            (&self.free, "free"),
        ] {
            let spec = ramp.spec();
            out.push_str(&format!("theme[{key}_start]=\"{}\"\n", spec.start.emit()));
            if let Some(mid) = spec.mid {
                out.push_str(&format!("theme[{key}_mid]=\"{}\"\n", mid.emit()));
            }
            if let Some(end) = spec.end {
                out.push_str(&format!("theme[{key}_end]=\"{}\"\n", end.emit()));
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_all_color_forms() {
        assert_eq!(Rgb::parse("#ff40b6"), Some(Rgb::new(255, 64, 182)));
        assert_eq!(Rgb::parse("#cc"), Some(Rgb::new(204, 204, 204)));
        assert_eq!(Rgb::parse("12 200 3"), Some(Rgb::new(12, 200, 3)));
        assert_eq!(Rgb::parse("#ffff"), None);
        assert_eq!(Rgb::parse("1 2"), None);
        assert_eq!(Rgb::parse("300 0 0"), None);
    }

    #[test]
    fn ramp_hits_declared_endpoints() {
        let ramp = Ramp::build(RampSpec::gradient(
            Rgb::new(0, 0, 0),
            Rgb::new(100, 100, 100),
            Rgb::new(200, 200, 200),
        ));
        assert_eq!(ramp.color(0), Rgb::new(0, 0, 0).color());
        assert_eq!(ramp.color(50), Rgb::new(100, 100, 100).color());
        assert_eq!(ramp.color(100), Rgb::new(200, 200, 200).color());
        // Out-of-range indices clamp.
        assert_eq!(ramp.color(250), Rgb::new(200, 200, 200).color());
    }

    #[test]
    fn missing_mid_derives_from_brighter_endpoint() {
        let rising = Ramp::build(RampSpec {
            start: Rgb::new(10, 10, 10),
            mid: None,
            end: Some(Rgb::new(200, 100, 50)),
        });
        assert_eq!(rising.color(50), Rgb::new(100, 50, 25).color());

        let falling = Ramp::build(RampSpec {
            start: Rgb::new(200, 100, 50),
            mid: None,
            end: Some(Rgb::new(10, 10, 10)),
        });
        assert_eq!(falling.color(50), Rgb::new(100, 50, 25).color());
    }

    #[test]
    fn single_color_ramp_is_flat() {
        let ramp = Ramp::build(RampSpec {
            start: Rgb::new(80, 90, 100),
            mid: None,
            end: None,
        });
        assert_eq!(ramp.color(0), ramp.color(100));
    }

    #[test]
    fn theme_file_overrides_defaults() {
        let text = r##"
            # demo theme
            theme[main_bg]="#101010"
            theme[main_fg]="#ee"
            theme[cpu_start]="0 255 0"
            theme[cpu_end]="#ff0000"
        "##;
        let theme = Theme::parse("demo", text);
        assert_eq!(theme.main_bg, Some(Rgb::new(16, 16, 16)));
        assert_eq!(theme.main_fg, Rgb::new(238, 238, 238));
        assert_eq!(theme.cpu.color(0), Rgb::new(0, 255, 0).color());
        assert_eq!(theme.cpu.color(100), Rgb::new(255, 0, 0).color());
        // Untouched ramps keep defaults.
        assert_eq!(theme.temp, Theme::default().temp);
    }

    #[test]
    fn canonical_roundtrip_preserves_ramps() {
        let text = r##"
            theme[main_fg]="#d0d0d0"
            theme[used_start]="#3b1f1c"
            theme[used_end]="#ff4769"
        "##;
        let once = Theme::parse("t", text);
        let twice = Theme::parse("t", &once.emit_canonical());
        assert_eq!(once.main_fg, twice.main_fg);
        assert_eq!(once.used, twice.used);
        assert_eq!(once.cpu, twice.cpu);
        assert_eq!(once.main_bg, twice.main_bg);
    }
}
