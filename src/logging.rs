//! Log destination and level setup.
//!
//! Logs go to the console and to `<dir>/<file name>`; either destination can
//! be switched off. The file rotates at [`LOG_FILE_SIZE`] bytes, keeping
//! [`LOG_FILE_COUNT`] older files as `<file name>.1` (newest) onwards.
//! `RUST_LOG`, when set, takes precedence over the level given on the
//! command line.

use crate::error::LoggingError;
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Mutex;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub const DEFAULT_LOG_DIR: &str = "logs";
pub const DEFAULT_LOG_NAME: &str = "log.bproducer.info";

/// Size at which the log file is rotated.
pub const LOG_FILE_SIZE: usize = 5 * 1024 * 1024;

/// Rotated log files kept besides the live one.
pub const LOG_FILE_COUNT: usize = 5;

/// Levels accepted by `--log-level`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
    Off,
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            "critical" => Ok(LogLevel::Critical),
            "off" => Ok(LogLevel::Off),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warning => LevelFilter::WARN,
            // tracing has nothing above error
            LogLevel::Error | LogLevel::Critical => LevelFilter::ERROR,
            LogLevel::Off => LevelFilter::OFF,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LogOptions {
    pub dir: PathBuf,
    pub file_name: String,
    pub level: Option<String>,
    pub remove_existing: bool,
    pub to_file: bool,
    pub to_console: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_LOG_DIR),
            file_name: DEFAULT_LOG_NAME.to_string(),
            level: None,
            remove_existing: false,
            to_file: true,
            to_console: true,
        }
    }
}

impl LogOptions {
    /// Full path of the log file. Only the base name of `file_name` is used.
    pub fn log_path(&self) -> PathBuf {
        let name = Path::new(&self.file_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_NAME));
        self.dir.join(name)
    }
}

/// Create the log directory and, if asked, remove a previous log file.
///
/// Runs before the subscriber exists, so callers report failures on stderr.
pub fn prepare_log_file(options: &LogOptions) -> Result<PathBuf, LoggingError> {
    if !options.dir.is_dir() {
        std::fs::create_dir_all(&options.dir).map_err(|source| LoggingError::CreateDir {
            path: options.dir.clone(),
            source,
        })?;
    }

    let path = options.log_path();
    if options.remove_existing && path.is_file() {
        std::fs::remove_file(&path).map_err(|source| LoggingError::RemoveFile {
            path: path.clone(),
            source,
        })?;
    }
    Ok(path)
}

fn rotating_file(path: &Path, max_bytes: usize, keep: usize) -> FileRotate<AppendCount> {
    FileRotate::new(
        path,
        AppendCount::new(keep),
        ContentLimit::Bytes(max_bytes),
        Compression::None,
        #[cfg(unix)]
        None,
    )
}

/// Install the global subscriber.
pub fn init(options: &LogOptions) -> Result<(), LoggingError> {
    let parsed = options.level.as_deref().map(LogLevel::from_str);
    let level = match parsed {
        Some(Ok(level)) => level,
        _ => LogLevel::Info,
    };

    let file_layer = if options.to_file {
        let path = prepare_log_file(options)?;
        // Surface an unwritable log file here; the rotating writer only
        // reports it on the first write.
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|source| LoggingError::OpenFile {
                path: path.clone(),
                source,
            })?;
        let file = rotating_file(&path, LOG_FILE_SIZE, LOG_FILE_COUNT);
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let console_layer = options.to_console.then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from(level).into())
                .from_env_lossy(),
        )
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    if let Some(Err(reason)) = parsed {
        tracing::warn!("log level was configured but unreadable ({reason}); using default");
    }
    Ok(())
}
