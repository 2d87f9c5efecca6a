//! Error types for the Kami engine
//!
//! This module defines the error types used throughout the engine,
//! including presentation, initialization, and frame-protocol misuse.

use std::fmt;

/// Result type for Kami engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kami engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of host or GPU memory
    OutOfMemory,

    /// Invalid resource or parameter (degenerate extent, bad image index, etc.)
    InvalidResource(String),

    /// Initialization failed (device, swap chain, renderer)
    InitializationFailed(String),

    /// Frame protocol misuse by the caller (begin_frame twice, foreign command buffer, etc.)
    ContractViolation(String),
}

impl Error {
    /// Whether this error reports caller misuse rather than an environment failure
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Error::ContractViolation(_))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ContractViolation(msg) => write!(f, "Contract violation: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
