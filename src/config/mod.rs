//! Configuration loading and validation
//!
//! Builds the run [`Config`] from CLI arguments over defaults and runs the
//! validation pass, collecting non-fatal warnings the way hard errors are
//! kept separate from advisory notes.

use crate::cli::Cli;
use crate::error::{AppError, Result};
use crate::models::Config;

/// Configuration parser that layers CLI arguments over defaults
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        self.cli
            .validate()
            .map_err(AppError::config)?;

        let config = Config {
            password: self.cli.password.clone(),
            output_path: self.cli.output.clone(),
            override_target: self.cli.target,
            use_connection_table: self.cli.connections,
            skip_setup: self.cli.skip_setup,
            concurrency: self.cli.concurrency,
            run_timeout_seconds: self.cli.run_timeout,
            enable_color: self.cli.use_colors(),
            verbose: self.cli.verbose,
            debug: self.cli.debug,
        };

        config.validate()?;

        Ok(config)
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Severity of a validation warning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationLevel {
    /// Informational note
    Info,
    /// Potentially problematic setting
    Warning,
}

/// Non-fatal configuration note surfaced before the run starts
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub level: ValidationLevel,
    pub message: String,
}

impl ValidationWarning {
    fn new(level: ValidationLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
        }
    }

    /// Format the warning for console display
    pub fn format(&self, use_color: bool) -> String {
        let tag = match self.level {
            ValidationLevel::Info => "INFO",
            ValidationLevel::Warning => "WARNING",
        };

        if use_color {
            use colored::Colorize;
            match self.level {
                ValidationLevel::Info => format!("[{}] {}", tag.cyan(), self.message),
                ValidationLevel::Warning => format!("[{}] {}", tag.yellow().bold(), self.message),
            }
        } else {
            format!("[{}] {}", tag, self.message)
        }
    }
}

/// Validate configuration with advisory checks beyond the hard rules
pub fn validate_config(config: &Config) -> Result<Vec<ValidationWarning>> {
    config.validate()?;

    let mut warnings = Vec::new();

    if config.concurrency > 16 {
        warnings.push(ValidationWarning::new(
            ValidationLevel::Warning,
            format!(
                "concurrency {} may overwhelm remote hosts; the agent phases run ssh sessions in parallel",
                config.concurrency
            ),
        ));
    }

    if config.output_path.extension().map(|e| e != "csv").unwrap_or(true) {
        warnings.push(ValidationWarning::new(
            ValidationLevel::Info,
            format!(
                "output path '{}' does not end in .csv",
                config.output_path.display()
            ),
        ));
    }

    if config.skip_setup && config.override_target.is_none() {
        warnings.push(ValidationWarning::new(
            ValidationLevel::Info,
            "agent preparation skipped; measurements assume agents are already running",
        ));
    }

    Ok(warnings)
}
