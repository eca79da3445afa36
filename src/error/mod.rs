//! Error handling for the subnet latency orchestrator

use thiserror::Error;

/// Custom error types for the orchestrator
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Local interface query failures (missing interface, no IPv4 address/mask)
    #[error("Interface query error: {0}")]
    InterfaceQuery(String),

    /// Discovery produced an empty target set
    #[error("No targets discovered: {0}")]
    NoTargets(String),

    /// Malformed IP address from a discovery source
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Structured parse failure for tool output
    #[error("Parsing error: no '{field}' in line: {raw_line}")]
    Parse { field: String, raw_line: String },

    /// Remote execution errors (ssh/scp)
    #[error("Remote execution error: {0}")]
    Remote(String),

    /// Local benchmark invocation errors
    #[error("Measurement error: {0}")]
    Measurement(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),

    /// I/O errors (file operations, etc.)
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config(message.into())
    }

    /// Create a new interface query error
    pub fn interface_query<S: Into<String>>(message: S) -> Self {
        Self::InterfaceQuery(message.into())
    }

    /// Create a new empty-target-set error
    pub fn no_targets<S: Into<String>>(message: S) -> Self {
        Self::NoTargets(message.into())
    }

    /// Create a new invalid address error
    pub fn invalid_address<S: Into<String>>(message: S) -> Self {
        Self::InvalidAddress(message.into())
    }

    /// Create a new parse error naming the missing field and the offending line
    pub fn parse<F: Into<String>, L: Into<String>>(field: F, raw_line: L) -> Self {
        Self::Parse {
            field: field.into(),
            raw_line: raw_line.into(),
        }
    }

    /// Create a new remote execution error
    pub fn remote<S: Into<String>>(message: S) -> Self {
        Self::Remote(message.into())
    }

    /// Create a new measurement error
    pub fn measurement<S: Into<String>>(message: S) -> Self {
        Self::Measurement(message.into())
    }

    /// Create a new timeout error
    pub fn timeout<S: Into<String>>(message: S) -> Self {
        Self::Timeout(message.into())
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        Self::Io(message.into())
    }

    /// Create a new internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal(message.into())
    }

    /// Get error category for logging and reporting
    pub fn category(&self) -> &'static str {
        match self {
            Self::Config(_) => "CONFIG",
            Self::InterfaceQuery(_) => "INTERFACE",
            Self::NoTargets(_) => "TARGETS",
            Self::InvalidAddress(_) => "ADDRESS",
            Self::Parse { .. } => "PARSE",
            Self::Remote(_) => "REMOTE",
            Self::Measurement(_) => "MEASURE",
            Self::Timeout(_) => "TIMEOUT",
            Self::Io(_) => "IO",
            Self::Internal(_) => "INTERNAL",
        }
    }

    /// Check if error is recoverable within a run (logged, target excluded,
    /// processing continues) as opposed to fatal for the whole run
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Remote(_) | Self::Measurement(_) | Self::Parse { .. } => true,
            Self::Config(_)
            | Self::InterfaceQuery(_)
            | Self::NoTargets(_)
            | Self::InvalidAddress(_)
            | Self::Timeout(_)
            | Self::Io(_)
            | Self::Internal(_) => false,
        }
    }

    /// Get exit code for this error type
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 1,             // Invalid configuration/usage
            Self::InterfaceQuery(_) => 2,     // No usable local interface
            Self::NoTargets(_) => 3,          // Nothing to measure
            Self::InvalidAddress(_) | Self::Parse { .. } => 4, // Bad data from a tool
            Self::Remote(_) => 5,             // Remote execution issues
            Self::Measurement(_) => 6,        // Benchmark client issues
            Self::Timeout(_) => 7,            // Run timeout
            Self::Io(_) => 8,                 // I/O issues
            Self::Internal(_) => 99,          // Internal/unexpected errors
        }
    }

    /// Format error for console display with color coding
    pub fn format_for_console(&self, use_color: bool) -> String {
        let category = self.category();
        let message = self.to_string();

        if use_color {
            use colored::Colorize;
            match self {
                Self::Config(_) | Self::InvalidAddress(_) | Self::Parse { .. } => {
                    format!("[{}] {}", category.red().bold(), message.red())
                }
                Self::InterfaceQuery(_) | Self::NoTargets(_) => {
                    format!("[{}] {}", category.red().bold(), message.bright_red())
                }
                Self::Remote(_) | Self::Measurement(_) => {
                    format!("[{}] {}", category.yellow().bold(), message.yellow())
                }
                Self::Timeout(_) => {
                    format!("[{}] {}", category.blue().bold(), message.blue())
                }
                Self::Io(_) => {
                    format!("[{}] {}", category.cyan().bold(), message.cyan())
                }
                Self::Internal(_) => {
                    format!("[{}] {}", category.bright_red().bold(), message.bright_red())
                }
            }
        } else {
            format!("[{}] {}", category, message)
        }
    }
}

// Standard library error conversions
impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::io(error.to_string())
    }
}

impl From<std::net::AddrParseError> for AppError {
    fn from(error: std::net::AddrParseError) -> Self {
        Self::invalid_address(format!("IP address parse error: {}", error))
    }
}

impl From<std::num::ParseIntError> for AppError {
    fn from(error: std::num::ParseIntError) -> Self {
        Self::internal(format!("Integer parse error: {}", error))
    }
}

impl From<std::num::ParseFloatError> for AppError {
    fn from(error: std::num::ParseFloatError) -> Self {
        Self::internal(format!("Float parse error: {}", error))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::internal(format!("JSON serialization error: {}", error))
    }
}

// Anyhow integration
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(error.to_string())
    }
}

/// Custom Result type for the application
pub type Result<T> = std::result::Result<T, AppError>;
