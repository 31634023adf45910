//! Error types for the clipscout crawler
//!
//! This module defines the per-concern error types used throughout the application.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching page markup for link discovery
#[derive(Error, Debug)]
pub enum FetchError {
    /// HTTP request error
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status code
    #[error("Server returned status {0}")]
    Status(u16),

    /// Request timeout
    #[error("Request timeout")]
    Timeout,

    /// Invalid URL
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Faults raised by a render session
///
/// Only [`RenderError::ElementAbsent`] is an expected outcome: the page's own
/// script threw because the probed element does not exist.
#[derive(Error, Debug)]
pub enum RenderError {
    /// An uncaught script exception while probing for an element
    #[error("Element absent: {0}")]
    ElementAbsent(String),

    /// Browser process could not be launched or connected
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    /// Navigation command failed
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    /// Script evaluation failed for a reason other than a missing element
    #[error("Script evaluation failed: {0}")]
    Evaluation(String),

    /// Element did not become visible in time
    #[error("Timed out after {secs}s waiting for {selector} to become visible")]
    VisibleTimeout { selector: String, secs: u64 },

    /// Session could not be opened or closed cleanly
    #[error("Session error: {0}")]
    Session(String),
}

impl RenderError {
    /// Whether this fault is the "uncaught/element-absent" classification
    #[must_use]
    pub fn is_element_absent(&self) -> bool {
        matches!(self, Self::ElementAbsent(_))
    }

    /// Whether this fault ends only the current URL rather than the crawl
    #[must_use]
    pub fn is_scoped(&self) -> bool {
        matches!(self, Self::ElementAbsent(_) | Self::VisibleTimeout { .. })
    }
}

/// Errors from the record and listing writers
#[derive(Error, Debug)]
pub enum StorageError {
    /// Output file could not be opened or created
    #[error("Failed to open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Write to an opened file failed
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Domain label could not be derived from the seed URL
    #[error("Cannot derive output name from {0}")]
    InvalidSeed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_element_absent_classification() {
        let err = RenderError::ElementAbsent("Uncaught TypeError".to_string());
        assert!(err.is_element_absent());
        assert!(err.is_scoped());

        let err = RenderError::Evaluation("connection reset".to_string());
        assert!(!err.is_element_absent());
        assert!(!err.is_scoped());
    }

    #[test]
    fn test_visible_timeout_is_scoped() {
        let err = RenderError::VisibleTimeout {
            selector: "#webyclip-widget-3".to_string(),
            secs: 60,
        };
        assert!(err.is_scoped());
        assert!(!err.is_element_absent());
        assert!(err.to_string().contains("#webyclip-widget-3"));
    }
}
