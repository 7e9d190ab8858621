//! Session logger for engine and CLI events.
//!
//! One file per run, truncated at [`init`]:
//!   Windows:  `%APPDATA%\Retouch\retouch.log`
//!   Linux:    `~/.local/share/Retouch/retouch.log`
//!   macOS:    `~/Library/Application Support/Retouch/retouch.log`
//!
//! Lines below the minimum [`LogLevel`] are dropped; the CLI lowers the
//! threshold to `Info` with `--verbose`. Before `init` every macro is a
//! no-op, so library users and tests never touch the filesystem.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Mutex, OnceLock};
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Info = 0,
    Warn = 1,
    Error = 2,
}

impl LogLevel {
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    fn from_u8(v: u8) -> Self {
        match v {
            0 => LogLevel::Info,
            1 => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

static LOG_FILE: OnceLock<Mutex<File>> = OnceLock::new();
static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();
static MIN_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

/// Path of the current session log, if one was opened.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

pub fn min_level() -> LogLevel {
    LogLevel::from_u8(MIN_LEVEL.load(Ordering::Relaxed))
}

/// Change the threshold at runtime.
pub fn set_min_level(level: LogLevel) {
    MIN_LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Would a line at `level` be written under the current threshold?
pub fn enabled(level: LogLevel) -> bool {
    level >= min_level()
}

/// `[HH:MM:SS] [LEVEL] msg`
pub fn format_line(secs_since_epoch: u64, level: LogLevel, msg: &str) -> String {
    format!("[{}] [{}] {}", clock(secs_since_epoch), level.tag(), msg)
}

/// Write one line at `level`. I/O errors are ignored.
pub fn write(level: LogLevel, msg: &str) {
    if !enabled(level) {
        return;
    }
    let Some(mutex) = LOG_FILE.get() else { return };
    if let Ok(mut file) = mutex.lock() {
        let _ = writeln!(file, "{}", format_line(now_secs(), level, msg));
    }
}

#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Info, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Warn, &format!($($arg)*));
    };
}

#[macro_export]
macro_rules! log_err {
    ($($arg:tt)*) => {
        $crate::logger::write($crate::logger::LogLevel::Error, &format!($($arg)*));
    };
}

/// Open (or truncate) the session log with threshold `min`, and mirror
/// panics into it. Call once at startup.
pub fn init(min: LogLevel) {
    set_min_level(min);
    let path = data_dir().join("Retouch").join("retouch.log");

    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }

    let file = match OpenOptions::new().create(true).write(true).truncate(true).open(&path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            return;
        }
    };
    let _ = LOG_PATH.set(path);
    if LOG_FILE.set(Mutex::new(file)).is_err() {
        return;
    }

    if let Some(mutex) = LOG_FILE.get()
        && let Ok(mut f) = mutex.lock()
    {
        let _ = writeln!(f, "=== Retouch session (unix {}), level >= {} ===", now_secs(), min.tag());
    }

    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        write(LogLevel::Error, &format!("panic: {}", info));
        prev(info);
    }));
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home).join("Library").join("Application Support");
        }
    }
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    PathBuf::from(".")
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// HH:MM:SS within the UTC day.
fn clock(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", (secs % 86400) / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_ordered() {
        assert!(LogLevel::Error > LogLevel::Warn);
        assert!(LogLevel::Warn > LogLevel::Info);
        for l in [LogLevel::Info, LogLevel::Warn, LogLevel::Error] {
            assert_eq!(LogLevel::from_u8(l as u8), l);
        }
    }

    #[test]
    fn threshold_filters_lower_levels() {
        set_min_level(LogLevel::Warn);
        assert!(!enabled(LogLevel::Info));
        assert!(enabled(LogLevel::Warn));
        assert!(enabled(LogLevel::Error));
        set_min_level(LogLevel::Info);
        assert!(enabled(LogLevel::Info));
        set_min_level(LogLevel::Warn);
    }

    #[test]
    fn line_format() {
        // 1970-01-02 01:02:03 UTC
        let secs = 86400 + 3600 + 2 * 60 + 3;
        assert_eq!(format_line(secs, LogLevel::Warn, "crop skipped"), "[01:02:03] [WARN] crop skipped");
    }

    #[test]
    fn writing_before_init_is_silent() {
        log_err!("nothing to see {}", 1);
        assert!(log_path().is_none());
    }
}
