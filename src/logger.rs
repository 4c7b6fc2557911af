//! Logging utilities with colored output and a leveled trace sink.
//!
//! This module provides:
//! - `log!` macro for formatted terminal output with colored prefixes
//! - `debug!` for verbose-only output, `critical!` for failures
//! - `Trace`, the leveled sink handed to modules during execution
//! - `WatchStatus` for watch mode status messages
//!
//! # Example
//!
//! ```ignore
//! log!("engine"; "executing {} pipelines", count);
//!
//! let trace = Trace::new().with_log_file(&path)?;
//! trace.verbose("cache", "removed 3 stale entries");
//! ```

use crossterm::{
    cursor, execute,
    terminal::{Clear, ClearType},
};
use owo_colors::OwoColorize;
use parking_lot::Mutex;
use std::{
    fmt,
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write, stderr, stdout},
    path::Path,
    sync::{
        Arc, LazyLock,
        atomic::{AtomicBool, Ordering},
    },
};

/// Global verbose flag (set by --verbose CLI argument)
static VERBOSE: AtomicBool = AtomicBool::new(false);

/// Set verbose mode globally
pub fn set_verbose(v: bool) {
    VERBOSE.store(v, Ordering::SeqCst);
}

/// Check if verbose mode is enabled
pub fn is_verbose() -> bool {
    VERBOSE.load(Ordering::SeqCst)
}

// ============================================================================
// Log Macros
// ============================================================================

/// Log a message with a colored module prefix
///
/// # Usage
/// ```ignore
/// log!("module"; "message with {} formatting", args);
/// ```
#[macro_export]
macro_rules! log {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::log($module, &format!($($arg)*))
    }};
}

/// Log a debug message (only shown when --verbose is enabled)
#[macro_export]
macro_rules! debug {
    ($module:expr; $($arg:tt)*) => {{
        if $crate::logger::is_verbose() {
            $crate::logger::log($module, &format!($($arg)*))
        }
    }};
}

/// Log a critical message to stderr (always shown)
#[macro_export]
macro_rules! critical {
    ($module:expr; $($arg:tt)*) => {{
        $crate::logger::critical($module, &format!($($arg)*))
    }};
}

// ============================================================================
// Helper Functions
// ============================================================================

/// Log a message with a colored module prefix
#[inline]
pub fn log(module: &str, message: &str) {
    let module_lower = module.to_ascii_lowercase();
    let prefix = colorize_prefix(module, &module_lower);

    let mut stdout = stdout().lock();
    execute!(stdout, Clear(ClearType::UntilNewLine)).ok();
    writeln!(stdout, "{prefix} {message}").ok();
    stdout.flush().ok();
}

/// Log a critical message with a red prefix on stderr
pub fn critical(module: &str, message: &str) {
    let prefix = format!("[{module}]").bright_red().bold().to_string();
    let mut stderr = stderr().lock();
    writeln!(stderr, "{prefix} {}", message.red()).ok();
    stderr.flush().ok();
}

/// Apply color to a module prefix based on module type
#[inline]
fn colorize_prefix(module: &str, module_lower: &str) -> String {
    let prefix = format!("[{module}]");
    match module_lower {
        "engine" => prefix.bright_blue().bold().to_string(),
        "watch" => prefix.bright_green().bold().to_string(),
        "error" => prefix.bright_red().bold().to_string(),
        "cache" => prefix.bright_magenta().bold().to_string(),
        _ => prefix.bright_yellow().bold().to_string(),
    }
}

// ============================================================================
// Trace (leveled sink)
// ============================================================================

/// Severity of a trace message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TraceLevel {
    Critical,
    Information,
    Verbose,
}

impl TraceLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Information => "info",
            Self::Verbose => "verbose",
        }
    }
}

/// Leveled trace sink shared by the engine, the runner and every module.
///
/// Terminal output follows the global verbose flag. When a log file is
/// attached, every message is appended to it regardless of level.
#[derive(Clone, Default)]
pub struct Trace {
    file: Option<Arc<Mutex<BufWriter<File>>>>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a log file (created or appended to).
    pub fn with_log_file(mut self, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        self.file = Some(Arc::new(Mutex::new(BufWriter::new(file))));
        Ok(self)
    }

    pub fn has_log_file(&self) -> bool {
        self.file.is_some()
    }

    pub fn verbose(&self, module: &str, message: impl fmt::Display) {
        self.write(TraceLevel::Verbose, module, &message.to_string());
    }

    pub fn information(&self, module: &str, message: impl fmt::Display) {
        self.write(TraceLevel::Information, module, &message.to_string());
    }

    pub fn critical(&self, module: &str, message: impl fmt::Display) {
        self.write(TraceLevel::Critical, module, &message.to_string());
    }

    fn write(&self, level: TraceLevel, module: &str, message: &str) {
        match level {
            TraceLevel::Critical => critical(module, message),
            TraceLevel::Information => log(module, message),
            TraceLevel::Verbose if is_verbose() => log(module, message),
            TraceLevel::Verbose => {}
        }

        if let Some(file) = &self.file {
            let mut file = file.lock();
            writeln!(file, "{} {:<8} [{module}] {message}", now(), level.label()).ok();
            file.flush().ok();
        }
    }
}

impl fmt::Debug for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Trace")
            .field("log_file", &self.file.is_some())
            .finish()
    }
}

// ============================================================================
// Watch Status (single-line status with overwrite)
// ============================================================================

/// Get current UTC time formatted as HH:MM:SS
fn now() -> String {
    use std::time::SystemTime;
    let secs = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let hours = (secs / 3600) % 24;
    let minutes = (secs / 60) % 60;
    let seconds = secs % 60;
    format!("{hours:02}:{minutes:02}:{seconds:02}")
}

/// Single-line status display for watch mode
///
/// Displays status messages that overwrite the previous output,
/// keeping the terminal clean between re-runs.
pub struct WatchStatus {
    /// Lines of previous output to clear
    last_lines: usize,
}

static WATCH_STATUS: LazyLock<Mutex<WatchStatus>> =
    LazyLock::new(|| Mutex::new(WatchStatus::new()));

impl WatchStatus {
    pub const fn new() -> Self {
        Self { last_lines: 0 }
    }

    /// Display success message (✓ prefix, green).
    pub fn success(&mut self, message: &str) {
        self.display(format!("{}", "✓".green()), message);
    }

    /// Display error message (✗ prefix, red) with optional detail.
    pub fn error(&mut self, summary: &str, detail: &str) {
        let message = if detail.is_empty() {
            summary.to_string()
        } else {
            format!("{summary}\n{detail}")
        };
        self.display(format!("{}", "✗".red()), &message);
    }

    fn display(&mut self, symbol: String, message: &str) {
        let mut stdout = stdout().lock();

        if self.last_lines > 0 {
            #[allow(clippy::cast_possible_truncation)]
            let lines = self.last_lines as u16;
            execute!(stdout, cursor::MoveUp(lines)).ok();
            execute!(stdout, Clear(ClearType::FromCursorDown)).ok();
        }

        let timestamp = format!("[{}]", now()).dimmed().to_string();
        writeln!(stdout, "{timestamp} {symbol} {message}").ok();
        stdout.flush().ok();

        self.last_lines = line_count(message);
    }
}

fn line_count(message: &str) -> usize {
    message.matches('\n').count() + 1
}

/// An error followed by its sources, joined with `: `.
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

/// Global watch status: success
pub fn status_success(message: &str) {
    WATCH_STATUS.lock().success(message);
}

/// Global watch status: error
pub fn status_error(summary: &str, detail: &str) {
    WATCH_STATUS.lock().error(summary, detail);
}

// ============================================================================
// Tests
// ============================================================================
