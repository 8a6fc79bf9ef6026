//! Application log: a bounded in-memory buffer for the diagnostics view,
//! mirrored to an append-only file under the `logs` directory.

use std::collections::VecDeque;
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use time::macros::format_description;
use time::OffsetDateTime;

/// Entries kept in memory; older ones are evicted first
pub const MEMORY_CAPACITY: usize = 100;

pub const LOG_FILE_NAME: &str = "hikari_downloader.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warning => "WARNING",
            Self::Error => "ERROR",
            Self::Critical => "CRITICAL",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub timestamp: OffsetDateTime,
    pub level: LogLevel,
    pub message: String,
}

impl LogEntry {
    /// `[HH:MM:SS] LEVEL: message`, as shown in the diagnostics view
    pub fn display_line(&self) -> String {
        let clock = self
            .timestamp
            .format(format_description!("[hour]:[minute]:[second]"))
            .unwrap_or_default();
        format!("[{}] {}: {}", clock, self.level, self.message)
    }

    /// `YYYY-MM-DD HH:MM:SS - LEVEL - message`, as written to the log file
    pub fn file_line(&self) -> String {
        let stamp = self
            .timestamp
            .format(format_description!(
                "[year]-[month]-[day] [hour]:[minute]:[second]"
            ))
            .unwrap_or_default();
        format!("{} - {} - {}", stamp, self.level, self.message)
    }
}

struct LoggerInner {
    entries: Mutex<VecDeque<LogEntry>>,
    file: Mutex<Option<File>>,
    path: Option<PathBuf>,
}

/// Cheap to clone; every clone appends to the same buffer and file.
#[derive(Clone)]
pub struct Logger {
    inner: Arc<LoggerInner>,
}

impl Logger {
    /// Log into `<log_dir>/hikari_downloader.log`, creating the directory.
    /// Falls back to memory-only logging if the file cannot be opened.
    pub fn new(log_dir: &Path) -> Self {
        let path = log_dir.join(LOG_FILE_NAME);
        let file = std::fs::create_dir_all(log_dir)
            .and_then(|_| OpenOptions::new().create(true).append(true).open(&path));

        match file {
            Ok(file) => Self::from_parts(Some(file), Some(path)),
            Err(e) => {
                tracing::warn!("Could not open log file {}: {}", path.display(), e);
                Self::from_parts(None, None)
            }
        }
    }

    pub fn memory_only() -> Self {
        Self::from_parts(None, None)
    }

    fn from_parts(file: Option<File>, path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(LoggerInner {
                entries: Mutex::new(VecDeque::with_capacity(MEMORY_CAPACITY)),
                file: Mutex::new(file),
                path,
            }),
        }
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let entry = LogEntry {
            timestamp: OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc()),
            level,
            message: message.into(),
        };

        match level {
            LogLevel::Debug => tracing::debug!("{}", entry.message),
            LogLevel::Info => tracing::info!("{}", entry.message),
            LogLevel::Warning => tracing::warn!("{}", entry.message),
            LogLevel::Error | LogLevel::Critical => tracing::error!("{}", entry.message),
        }

        if let Some(file) = lock(&self.inner.file).as_mut() {
            if let Err(e) = writeln!(file, "{}", entry.file_line()) {
                tracing::warn!("Could not write log file: {}", e);
            }
        }

        let mut entries = lock(&self.inner.entries);
        if entries.len() == MEMORY_CAPACITY {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.log(LogLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    pub fn critical(&self, message: impl Into<String>) {
        self.log(LogLevel::Critical, message);
    }

    /// The last `count` entries, oldest first
    pub fn recent(&self, count: usize) -> Vec<LogEntry> {
        let entries = lock(&self.inner.entries);
        let skip = entries.len().saturating_sub(count);
        entries.iter().skip(skip).cloned().collect()
    }

    /// Empties the in-memory buffer; the file is untouched
    pub fn clear(&self) {
        lock(&self.inner.entries).clear();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger").field("path", &self.inner.path).finish()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Install the console subscriber. `RUST_LOG` overrides the default filter.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "hikari_downloader_lib=warn".into());

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
