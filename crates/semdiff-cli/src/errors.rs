//! CLI error types for structured error handling.
//!
//! Typed errors map to specific exit codes; anything else exits with 1.

use std::fmt;

use semdiff_core::SemdiffError;

use crate::constants::exit_codes;

/// CLI-specific errors with associated exit codes.
#[derive(Debug)]
pub enum CliError {
    /// Resource not found (database, student, scale, ...)
    NotFound { message: String, hint: String },

    /// Invalid user input
    InvalidInput(String),

    /// Write rejected by an existing record
    Conflict(String),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::NotFound { message, hint } => {
                if hint.is_empty() {
                    write!(f, "{}", message)
                } else {
                    write!(f, "{}\n{}", message, hint)
                }
            }
            CliError::InvalidInput(message) => write!(f, "{}", message),
            CliError::Conflict(message) => write!(f, "{}", message),
        }
    }
}

impl std::error::Error for CliError {}

impl CliError {
    /// Create a NotFound error with message and hint.
    pub fn not_found(message: impl Into<String>, hint: impl Into<String>) -> Self {
        CliError::NotFound {
            message: message.into(),
            hint: hint.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        CliError::InvalidInput(message.into())
    }

    /// Get the exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::NotFound { .. } => exit_codes::NOT_FOUND,
            CliError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            CliError::Conflict(_) => exit_codes::CONFLICT,
        }
    }
}

/// Exit code for any error surfaced by a command handler.
pub fn exit_code_for(err: &anyhow::Error) -> i32 {
    if let Some(cli) = err.downcast_ref::<CliError>() {
        return cli.exit_code();
    }
    match err.downcast_ref::<SemdiffError>() {
        Some(SemdiffError::NotFound(_)) => exit_codes::NOT_FOUND,
        Some(SemdiffError::Validation(_)) => exit_codes::INVALID_INPUT,
        Some(SemdiffError::Conflict(_)) => exit_codes::CONFLICT,
        _ => 1,
    }
}
