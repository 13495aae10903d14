//! Error-log backend for the `log` facade.
//!
//! Appends `HH:MM:SS LEVEL: …` lines to `error.log` in the config
//! directory. Three consecutive records originating from the same source
//! line collapse into a single entry marked as muted; further repeats are
//! dropped until a record from a different line arrives.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record};

/// Repeats from one source line before the entry is muted.
const MUTE_AFTER: u32 = 3;

struct Inner {
    file: File,
    last_location: String,
    repeats: u32,
}

/// File logger behind [`log::set_boxed_logger`].
pub struct ErrLog {
    inner: Mutex<Inner>,
}

impl ErrLog {
    /// Opens (or creates) `path` for appending and installs the logger.
    ///
    /// `debug` widens the level filter from `Error` to `Debug`.
    pub fn install(path: &Path, debug: bool) -> anyhow::Result<()> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let logger = ErrLog {
            inner: Mutex::new(Inner {
                file,
                last_location: String::new(),
                repeats: 0,
            }),
        };
        log::set_boxed_logger(Box::new(logger))?;
        log::set_max_level(if debug {
            LevelFilter::Debug
        } else {
            LevelFilter::Error
        });
        Ok(())
    }

    fn write_record(inner: &mut Inner, record: &Record) {
        let location = format!(
            "{}:{}",
            record.file().unwrap_or("?"),
            record.line().unwrap_or(0)
        );

        if location == inner.last_location {
            inner.repeats += 1;
            match inner.repeats.cmp(&MUTE_AFTER) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    let _ = writeln!(
                        inner.file,
                        "{} {}: {} (muted: repeating)",
                        Local::now().format("%H:%M:%S"),
                        record.level(),
                        record.args()
                    );
                    return;
                }
                std::cmp::Ordering::Greater => return,
            }
        } else {
            inner.last_location = location;
            inner.repeats = 1;
        }

        let _ = writeln!(
            inner.file,
            "{} {}: {}",
            Local::now().format("%H:%M:%S"),
            record.level(),
            record.args()
        );
    }
}

impl Log for ErrLog {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        if let Ok(mut inner) = self.inner.lock() {
            Self::write_record(&mut inner, record);
        }
    }

    fn flush(&self) {
        if let Ok(mut inner) = self.inner.lock() {
            let _ = inner.file.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use log::Level;

    fn write(inner: &mut Inner, line: u32, msg: &str) {
        ErrLog::write_record(
            inner,
            &Record::builder()
                .level(Level::Error)
                .file(Some("sampler/cpu.rs"))
                .line(Some(line))
                .args(format_args!("{msg}"))
                .build(),
        );
    }

    fn logged_lines(name: &str, run: impl FnOnce(&mut Inner)) -> Vec<String> {
        let dir = std::env::temp_dir().join(format!("ttop-errlog-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(format!("{name}.log"));
        let _ = std::fs::remove_file(&path);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .unwrap();
        let mut inner = Inner {
            file,
            last_location: String::new(),
            repeats: 0,
        };
        run(&mut inner);
        inner.file.flush().unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);
        text.lines().map(str::to_owned).collect()
    }

    #[test]
    fn repeated_source_line_collapses_after_three() {
        let lines = logged_lines("mute", |inner| {
            for _ in 0..6 {
                write(inner, 42, "stat read failed");
            }
        });
        // Two plain entries, one muted marker, then silence.
        assert_eq!(lines.len(), 3);
        assert!(lines[2].ends_with("(muted: repeating)"));
    }

    #[test]
    fn different_line_resets_mute() {
        let lines = logged_lines("reset", |inner| {
            for _ in 0..4 {
                write(inner, 42, "stat read failed");
            }
            write(inner, 99, "meminfo short");
            write(inner, 42, "stat read failed");
        });
        assert_eq!(lines.len(), 5);
        assert!(lines[3].contains("meminfo short"));
        assert!(lines[4].contains("stat read failed"));
    }
}
