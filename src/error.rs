//! Application error type.
//!
//! Every fallible operation in the crate returns `AppError`. The binary maps
//! each variant onto a process exit code:
//!
//! - `2`: configuration or file I/O problems
//! - `3`: input data that cannot be fitted
//! - `4`: failures inside the fitting engine

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    /// Input rejected before any optimization was attempted.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The isotherm model was asked to evaluate outside its domain.
    #[error("Domain error: {0}")]
    Domain(String),

    /// Misuse of the parameter set (unknown names, bad bounds, ...).
    #[error("Parameter error: {0}")]
    Parameter(String),

    /// The optimizer backend failed outright.
    #[error("Optimizer error: {0}")]
    Optimizer(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl AppError {
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain(message.into())
    }

    pub fn parameter(message: impl Into<String>) -> Self {
        Self::Parameter(message.into())
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::Io(message.into())
    }

    pub fn exit_code(&self) -> u8 {
        match self {
            AppError::Config(_) | AppError::Io(_) => 2,
            AppError::InvalidInput(_) => 3,
            AppError::Domain(_) | AppError::Parameter(_) | AppError::Optimizer(_) => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        assert_eq!(AppError::io("x").exit_code(), 2);
        assert_eq!(AppError::invalid_input("x").exit_code(), 3);
        assert_eq!(AppError::domain("x").exit_code(), 4);
    }

    #[test]
    fn display_includes_class_prefix() {
        let err = AppError::invalid_input("host concentration must be > 0");
        assert_eq!(err.to_string(), "Invalid input: host concentration must be > 0");
    }
}
