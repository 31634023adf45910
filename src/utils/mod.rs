//! Shared error types for the crawler's components

pub mod error;

pub use error::{FetchError, RenderError, StorageError};
