//! Structured logging for the orchestrator
//!
//! Console logging with a per-run correlation ID, colored level tags, and an
//! optional JSON-lines mode for debug runs. Every recoverable failure inside
//! a phase is reported here with the affected target and operation.

use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    /// Debug level - detailed information for debugging
    Debug = 0,
    /// Info level - phase progress and per-target narration
    Info = 1,
    /// Warning level - recoverable per-target failures
    Warn = 2,
    /// Error level - fatal run errors
    Error = 3,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
        }
    }

    /// Get ANSI color code for console output
    fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Debug => "\x1b[36m", // Cyan
            LogLevel::Info => "\x1b[32m",  // Green
            LogLevel::Warn => "\x1b[33m",  // Yellow
            LogLevel::Error => "\x1b[31m", // Red
        }
    }

    fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// Timestamp when log entry was created
    pub timestamp: DateTime<Utc>,
    /// Log level
    pub level: LogLevel,
    /// Component that emitted the entry (phase or module name)
    pub component: String,
    /// Log message
    pub message: String,
    /// Target IP the entry is about, if any
    pub target: Option<String>,
    /// Correlation ID for the run
    pub run_id: Uuid,
}

/// Console logger shared across phases
#[derive(Debug, Clone)]
pub struct Logger {
    /// Minimum log level to output
    min_level: LogLevel,
    /// Whether to use colored output
    use_color: bool,
    /// Emit JSON lines instead of human-readable lines
    json_output: bool,
    /// Correlation ID identifying this run
    run_id: Uuid,
}

impl Logger {
    /// Create a new logger for a run
    pub fn new(min_level: LogLevel, use_color: bool, json_output: bool) -> Self {
        Self {
            min_level,
            use_color,
            json_output,
            run_id: Uuid::new_v4(),
        }
    }

    /// Get the run correlation ID
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Log a message at the given level
    pub fn log(
        &self,
        level: LogLevel,
        component: &str,
        message: impl Into<String>,
        target: Option<Ipv4Addr>,
    ) {
        if level < self.min_level {
            return;
        }

        let entry = LogEntry {
            timestamp: Utc::now(),
            level,
            component: component.to_string(),
            message: message.into(),
            target: target.map(|ip| ip.to_string()),
            run_id: self.run_id,
        };

        if self.json_output {
            if let Ok(line) = serde_json::to_string(&entry) {
                eprintln!("{}", line);
            }
        } else {
            eprintln!("{}", self.format_entry(&entry));
        }
    }

    /// Log at debug level
    pub fn debug(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Debug, component, message, None);
    }

    /// Log at info level
    pub fn info(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message, None);
    }

    /// Log at info level about a specific target
    pub fn info_target(&self, component: &str, target: Ipv4Addr, message: impl Into<String>) {
        self.log(LogLevel::Info, component, message, Some(target));
    }

    /// Log at warn level
    pub fn warn(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Warn, component, message, None);
    }

    /// Log at warn level about a specific target
    pub fn warn_target(&self, component: &str, target: Ipv4Addr, message: impl Into<String>) {
        self.log(LogLevel::Warn, component, message, Some(target));
    }

    /// Log at error level
    pub fn error(&self, component: &str, message: impl Into<String>) {
        self.log(LogLevel::Error, component, message, None);
    }

    /// Format a log entry for human-readable console output
    fn format_entry(&self, entry: &LogEntry) -> String {
        let level_tag = if self.use_color {
            format!(
                "{}{:5}{}",
                entry.level.color_code(),
                entry.level.as_str(),
                LogLevel::reset_code()
            )
        } else {
            format!("{:5}", entry.level.as_str())
        };

        match &entry.target {
            Some(target) => format!(
                "{} {} [{}] {} - {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                level_tag,
                entry.component,
                target,
                entry.message
            ),
            None => format!(
                "{} {} [{}] {}",
                entry.timestamp.format("%H:%M:%S%.3f"),
                level_tag,
                entry.component,
                entry.message
            ),
        }
    }

    /// Serialize an entry to a JSON line (used by the debug sink)
    pub fn to_json_line(entry: &LogEntry) -> Result<String> {
        Ok(serde_json::to_string(entry)?)
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new(LogLevel::Info, true, false)
    }
}
