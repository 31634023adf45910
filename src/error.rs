//! Unified error handling for the clipscout crate
//!
//! This module provides a unified error type that consolidates the domain-specific
//! errors into a single `Error` enum, while keeping the domain errors available
//! to the components that raise them.
//!
//! # Architecture
//!
//! - [`ClipscoutErrorTrait`] - Common interface implemented by all error types
//! - [`ErrorCategory`] - Classification of errors for handling strategies
//! - [`Error`] - Unified error enum wrapping all domain-specific errors

use thiserror::Error;

pub use crate::utils::error::{FetchError, RenderError, StorageError};

/// Common trait for all clipscout error types
pub trait ClipscoutErrorTrait: std::error::Error {
    /// Check if the crawl can continue past this error
    fn is_recoverable(&self) -> bool;

    /// Get the error category for handling strategies
    fn category(&self) -> ErrorCategory;
}

/// Classification of errors for handling strategies
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Network-related errors (HTTP, timeout)
    Network,
    /// Browser automation errors
    Render,
    /// Storage and I/O errors
    Storage,
    /// Configuration and validation errors
    Config,
}

impl ErrorCategory {
    /// Short label used in log fields
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Render => "render",
            Self::Storage => "storage",
            Self::Config => "config",
        }
    }
}

/// Unified error type for the clipscout crate
#[derive(Error, Debug)]
pub enum Error {
    /// Link discovery fetch errors
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Render session errors
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Output file errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl ClipscoutErrorTrait for FetchError {
    fn is_recoverable(&self) -> bool {
        true
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Network
    }
}

impl ClipscoutErrorTrait for RenderError {
    fn is_recoverable(&self) -> bool {
        self.is_scoped()
    }

    fn category(&self) -> ErrorCategory {
        ErrorCategory::Render
    }
}

impl ClipscoutErrorTrait for StorageError {
    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::InvalidSeed(_))
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::InvalidSeed(_) => ErrorCategory::Config,
            _ => ErrorCategory::Storage,
        }
    }
}

impl ClipscoutErrorTrait for Error {
    fn is_recoverable(&self) -> bool {
        match self {
            Self::Fetch(e) => e.is_recoverable(),
            Self::Render(e) => e.is_recoverable(),
            Self::Storage(e) => e.is_recoverable(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Fetch(e) => e.category(),
            Self::Render(e) => e.category(),
            Self::Storage(e) => e.category(),
        }
    }
}

/// Result type alias using the unified Error type
pub type Result<T> = std::result::Result<T, Error>;
