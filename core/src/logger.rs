//! Debug logger
//!
//! Keeps the most recent entries in memory and optionally appends every entry
//! to a `debug.log` file. Nothing is written to stdout so the conversation on
//! the console stays clean.

use chrono::Local;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

const MAX_ENTRIES: usize = 1000;

pub struct DebugLogEntry {
    pub timestamp: String,
    pub level: String,
    pub module: String,
    pub message: String,
}

impl DebugLogEntry {
    fn render(&self) -> String {
        format!(
            "[{}] [{}] [{}] {}",
            self.timestamp, self.level, self.module, self.message
        )
    }
}

pub struct DebugLogger {
    ring_buffer: VecDeque<DebugLogEntry>,
    max_entries: usize,
    file_path: Option<PathBuf>,
}

static LOGGER: OnceLock<Mutex<DebugLogger>> = OnceLock::new();

fn get_logger() -> &'static Mutex<DebugLogger> {
    LOGGER.get_or_init(|| Mutex::new(DebugLogger::new(MAX_ENTRIES)))
}

impl DebugLogger {
    pub fn new(max_entries: usize) -> Self {
        Self {
            ring_buffer: VecDeque::with_capacity(max_entries),
            max_entries,
            file_path: None,
        }
    }

    pub fn set_file_path(&mut self, path: PathBuf) {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        self.file_path = Some(path);
    }

    pub fn file_path(&self) -> Option<&Path> {
        self.file_path.as_deref()
    }

    pub fn log(&mut self, level: &str, module: &str, message: &str) {
        let entry = DebugLogEntry {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S%.3f").to_string(),
            level: level.to_string(),
            module: module.to_string(),
            message: message.to_string(),
        };

        if let Some(path) = &self.file_path {
            if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
                let _ = writeln!(file, "{}", entry.render());
            }
        }

        if self.ring_buffer.len() >= self.max_entries {
            self.ring_buffer.pop_front();
        }
        self.ring_buffer.push_back(entry);
    }

    /// Most recent `n` entries, newest first
    pub fn get_recent(&self, n: usize) -> Vec<String> {
        self.ring_buffer
            .iter()
            .rev()
            .take(n)
            .map(DebugLogEntry::render)
            .collect()
    }
}

/// Default directory for the log file (`~/.local/share/consolegpt` on Linux)
pub fn default_log_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("consolegpt"))
}

/// Start appending entries to `<data_dir>/debug.log`
pub fn init(data_dir: PathBuf) {
    get_logger().lock().set_file_path(data_dir.join("debug.log"));
}

pub fn log(level: &str, module: &str, message: impl Into<String>) {
    get_logger().lock().log(level, module, &message.into());
}

#[macro_export]
macro_rules! debug_log {
    ($($arg:tt)*) => {
        $crate::logger::log("DEBUG", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! info_log {
    ($($arg:tt)*) => {
        $crate::logger::log("INFO", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! warn_log {
    ($($arg:tt)*) => {
        $crate::logger::log("WARN", module_path!(), format!($($arg)*))
    };
}

#[macro_export]
macro_rules! error_log {
    ($($arg:tt)*) => {
        $crate::logger::log("ERROR", module_path!(), format!($($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ring_buffer_drops_oldest() {
        let mut logger = DebugLogger::new(2);
        logger.log("INFO", "test", "first");
        logger.log("INFO", "test", "second");
        logger.log("INFO", "test", "third");

        let recent = logger.get_recent(10);
        assert_eq!(recent.len(), 2);
        assert!(recent[0].ends_with("third"));
        assert!(recent[1].ends_with("second"));
    }

    #[test]
    fn test_entries_are_appended_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut logger = DebugLogger::new(10);
        logger.set_file_path(dir.path().join("nested").join("debug.log"));
        logger.log("WARN", "consolegpt_core::session", "provider slow");
        logger.log("ERROR", "consolegpt_core::session", "provider failed");

        let content = std::fs::read_to_string(logger.file_path().unwrap()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("[WARN] [consolegpt_core::session] provider slow"));
        assert!(lines[1].contains("[ERROR]"));
    }

    #[test]
    fn test_macros_reach_global_logger() {
        crate::info_log!("macro check {}", 42);
        let recent = get_logger().lock().get_recent(50);
        assert!(recent.iter().any(|l| l.contains("macro check 42")));
    }
}
