//! Structured logging with box-drawing output.
//!
//! Every line salatr prints goes through this module so that the scheduler's
//! background tasks, the `status` command and the `watch` loop share one visual
//! style. Output can be silenced at runtime (tests, JSON output), prefixed with
//! wall-clock timestamps (long-running `watch` sessions), or routed to a file.
//!
//! ## Logging Conventions
//!
//! - **`log_block_start!`** opens a new conceptual block (a period change, a day
//!   rollover, loading configuration). Prints an empty `┃` line, then `┣ message`.
//! - **`log_decorated!`** continues a block: `┣ message`.
//! - **`log_indented!`** nests details under the previous line: `┃   message`.
//! - **`log_pipe!`** inserts a bare `┃` spacer, typically before a
//!   `log_warning!`/`log_error!` that starts its own block.
//! - **`log_version!`** / **`log_end!`** frame a session (`┏ salatr vX.Y.Z ━━╸` / `╹`).
//! - **`log_info!`, `log_warning!`, `log_error!`, `log_debug!`, `log_critical!`**
//!   carry a coloured `[LEVEL]` tag after the `┣` marker.

use std::fmt;
use std::io::Write;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Sender, channel};

static LOGGING_ENABLED: AtomicBool = AtomicBool::new(true);
static TIMESTAMPS_ENABLED: AtomicBool = AtomicBool::new(false);
static DEBUG_ENABLED: AtomicBool = AtomicBool::new(false);

// Set once when --log is active
static LOG_CHANNEL: OnceLock<Sender<LogMessage>> = OnceLock::new();

enum LogMessage {
    Formatted(String),
    Shutdown,
}

/// Line shapes understood by [`Log::emit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// `┃` spacer followed by `┣ message`
    BlockStart,
    /// `┣ message`
    Decorated,
    /// `┃   message`
    Indented,
    /// bare `┃`
    Pipe,
    /// `┏ message ━━╸`
    Header,
    /// `╹`
    End,
    /// `┣[LEVEL] message` with the level coloured
    Level(Level),
}

/// Semantic log levels and their terminal colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Debug,
    Warning,
    Error,
    Critical,
}

impl Level {
    fn tag(self) -> &'static str {
        match self {
            Level::Info => "\x1b[32mINFO\x1b[0m",
            Level::Debug => "\x1b[32mDEBUG\x1b[0m",
            Level::Warning => "\x1b[33mWARNING\x1b[0m",
            Level::Error => "\x1b[31mERROR\x1b[0m",
            Level::Critical => "\x1b[31mCRITICAL\x1b[0m",
        }
    }
}

/// Main logging interface.
pub struct Log;

impl Log {
    /// Enable or disable logging globally.
    ///
    /// Used by `status --json` so that only the JSON document reaches stdout,
    /// and by tests that exercise noisy scheduler paths.
    pub fn set_enabled(enabled: bool) {
        LOGGING_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Check if logging is currently enabled.
    pub fn is_enabled() -> bool {
        LOGGING_ENABLED.load(Ordering::SeqCst)
    }

    /// Show `log_debug!` output (`--debug`).
    pub fn set_debug(enabled: bool) {
        DEBUG_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Prefix every line with the local wall-clock time.
    pub fn set_timestamps(enabled: bool) {
        TIMESTAMPS_ENABLED.store(enabled, Ordering::SeqCst);
    }

    /// Start file logging to the specified path.
    ///
    /// Lines are handed to a writer thread; the returned guard flushes and joins
    /// it on drop. Can only be started once per process.
    pub fn start_file_logging(file_path: String) -> anyhow::Result<LoggerGuard> {
        let (tx, rx) = channel();

        LOG_CHANNEL
            .set(tx.clone())
            .map_err(|_| anyhow::anyhow!("Logger channel already initialized"))?;

        let handle = std::thread::spawn(move || {
            let mut file = std::fs::File::create(&file_path)?;

            loop {
                match rx.recv() {
                    Ok(LogMessage::Formatted(text)) => file.write_all(text.as_bytes())?,
                    Ok(LogMessage::Shutdown) | Err(_) => {
                        file.flush()?;
                        break;
                    }
                }
            }

            Ok::<(), anyhow::Error>(())
        });

        Ok(LoggerGuard {
            tx,
            handle: Some(handle),
        })
    }

    /// Format and write one log entry. Called by the logging macros.
    pub fn emit(marker: Marker, message: fmt::Arguments<'_>) {
        if !Self::is_enabled()
            || (marker == Marker::Level(Level::Debug) && !DEBUG_ENABLED.load(Ordering::SeqCst))
        {
            return;
        }
        let prefix = Self::timestamp_prefix();
        let text = match marker {
            Marker::BlockStart => format!("{prefix}┃\n{prefix}┣ {message}\n"),
            Marker::Decorated => format!("{prefix}┣ {message}\n"),
            Marker::Indented => format!("{prefix}┃   {message}\n"),
            Marker::Pipe => format!("{prefix}┃\n"),
            Marker::Header => format!("{prefix}┏ {message} ━━╸\n"),
            Marker::End => format!("{prefix}╹\n"),
            Marker::Level(level) => format!("{prefix}┣[{}] {message}\n", level.tag()),
        };
        write_output(&text);
    }

    fn timestamp_prefix() -> String {
        if TIMESTAMPS_ENABLED.load(Ordering::SeqCst) {
            format!("[{}] ", chrono::Local::now().format("%H:%M:%S"))
        } else {
            String::new()
        }
    }
}

/// Guard for file logging that ensures clean shutdown.
pub struct LoggerGuard {
    tx: Sender<LogMessage>,
    handle: Option<std::thread::JoinHandle<anyhow::Result<()>>>,
}

impl Drop for LoggerGuard {
    fn drop(&mut self) {
        let _ = self.tx.send(LogMessage::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Remove `ESC [ ... m` colour sequences so log files stay plain text.
fn strip_ansi_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '\x1b' && chars.peek() == Some(&'[') {
            chars.next();
            for ch in chars.by_ref() {
                if ch == 'm' {
                    break;
                }
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// Route a formatted line to the log file when active, stdout otherwise.
pub fn write_output(text: &str) {
    if let Some(tx) = LOG_CHANNEL.get() {
        let _ = tx.send(LogMessage::Formatted(strip_ansi_codes(text)));
    } else {
        print!("{text}");
        let _ = std::io::stdout().flush();
    }
}

// # Logging Macros

/// Log a decorated message, typically as part of an existing block.
#[macro_export]
macro_rules! log_decorated {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Decorated,
            format_args!($($arg)*),
        )
    };
}

/// Log an indented message for sub-items or details within a block.
#[macro_export]
macro_rules! log_indented {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Indented,
            format_args!($($arg)*),
        )
    };
}

/// Log a visual pipe separator for vertical spacing.
#[macro_export]
macro_rules! log_pipe {
    () => {
        $crate::common::logger::Log::emit($crate::common::logger::Marker::Pipe, format_args!(""))
    };
}

/// Log a block start message, initiating a new conceptual block of information.
#[macro_export]
macro_rules! log_block_start {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::BlockStart,
            format_args!($($arg)*),
        )
    };
}

/// Log the application version header.
#[macro_export]
macro_rules! log_version {
    () => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Header,
            format_args!("salatr v{}", env!("CARGO_PKG_VERSION")),
        )
    };
}

/// Log the final termination marker.
#[macro_export]
macro_rules! log_end {
    () => {
        $crate::common::logger::Log::emit($crate::common::logger::Marker::End, format_args!(""))
    };
}

/// Log an informational message with a green `[INFO]` tag.
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Level($crate::common::logger::Level::Info),
            format_args!($($arg)*),
        )
    };
}

/// Log a debug/operational message with a green `[DEBUG]` tag.
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Level($crate::common::logger::Level::Debug),
            format_args!($($arg)*),
        )
    };
}

/// Log a warning message with a yellow `[WARNING]` tag.
#[macro_export]
macro_rules! log_warning {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Level($crate::common::logger::Level::Warning),
            format_args!($($arg)*),
        )
    };
}

/// Log an error message with a red `[ERROR]` tag.
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Level($crate::common::logger::Level::Error),
            format_args!($($arg)*),
        )
    };
}

/// Log a critical message with a red `[CRITICAL]` tag.
#[macro_export]
macro_rules! log_critical {
    ($($arg:tt)*) => {
        $crate::common::logger::Log::emit(
            $crate::common::logger::Marker::Level($crate::common::logger::Level::Critical),
            format_args!($($arg)*),
        )
    };
}
