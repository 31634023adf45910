//! Crawl output
//!
//! Records go through the [`RecordSink`] trait so the dispatcher can be driven
//! against an in-memory sink in tests.

pub mod tsv;

pub use tsv::{OutputPaths, ProcessedUrlWriter, TsvProductWriter};

use crate::models::ProductRecord;
use crate::utils::error::StorageError;

/// Destination for extracted product records
pub trait RecordSink: Send {
    fn write_record(&mut self, record: &ProductRecord) -> Result<(), StorageError>;
}

impl<S: RecordSink + ?Sized> RecordSink for &mut S {
    fn write_record(&mut self, record: &ProductRecord) -> Result<(), StorageError> {
        (**self).write_record(record)
    }
}

/// Sink that keeps records in memory
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Vec<ProductRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ProductRecord] {
        &self.records
    }
}

impl RecordSink for MemorySink {
    fn write_record(&mut self, record: &ProductRecord) -> Result<(), StorageError> {
        self.records.push(record.clone());
        Ok(())
    }
}
