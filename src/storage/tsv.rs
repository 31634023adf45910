//! Tab-separated product records and the processed-URL listing
//!
//! Both files are opened in append mode on every write, so a crawl can be
//! re-run against the same output directory and interrupted at any point
//! without leaving a half-open handle behind.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use super::RecordSink;
use crate::crawler::url::domain_label;
use crate::extract::video::join_video_links;
use crate::models::ProductRecord;
use crate::utils::error::StorageError;

/// Header line written when the product file is first created
pub const PRODUCT_HEADER: &str = "Product_ID\tProduct_URL\tYoutube_Video_URLs";

/// Replace field separators so a value can never split a row
pub fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if matches!(c, '\t' | '\n' | '\r') { ' ' } else { c })
        .collect()
}

/// Format a record as one TSV row, without the line terminator
pub fn format_record(record: &ProductRecord) -> String {
    format!(
        "{}\t{}\t{}",
        sanitize_field(record.product_id()),
        sanitize_field(record.product_url()),
        sanitize_field(&join_video_links(record.video_links()))
    )
}

/// Output file names derived from the crawl seed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPaths {
    pub products: PathBuf,
    pub processed: PathBuf,
}

impl OutputPaths {
    /// `<dir>/<domain>-ProductDetails.tsv` and `<dir>/<domain>-ProcessedURLs.tsv`
    pub fn for_seed(dir: &Path, seed: &str) -> Result<Self, StorageError> {
        let domain =
            domain_label(seed).ok_or_else(|| StorageError::InvalidSeed(seed.to_string()))?;

        Ok(Self {
            products: dir.join(format!("{domain}-ProductDetails.tsv")),
            processed: dir.join(format!("{domain}-ProcessedURLs.tsv")),
        })
    }
}

fn open_append(path: &Path) -> Result<File, StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| StorageError::Open {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| StorageError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Appends product records to the per-domain TSV file
#[derive(Debug)]
pub struct TsvProductWriter {
    path: PathBuf,
}

impl TsvProductWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the product file exists on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Append one record, writing the header first if the file is new
    pub fn append(&self, record: &ProductRecord) -> Result<(), StorageError> {
        let is_new = !self.exists();
        let mut file = open_append(&self.path)?;

        let mut chunk = String::new();
        if is_new {
            chunk.push_str(PRODUCT_HEADER);
            chunk.push('\n');
        }
        chunk.push_str(&format_record(record));
        chunk.push('\n');

        file.write_all(chunk.as_bytes())
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!(path = %self.path.display(), product_id = record.product_id(), "Record appended");
        Ok(())
    }
}

impl RecordSink for TsvProductWriter {
    fn write_record(&mut self, record: &ProductRecord) -> Result<(), StorageError> {
        self.append(record)
    }
}

/// Appends processed URLs, one per line
#[derive(Debug)]
pub struct ProcessedUrlWriter {
    path: PathBuf,
}

impl ProcessedUrlWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append every URL in order
    pub fn write_all(&self, urls: &[String]) -> Result<(), StorageError> {
        let mut file = open_append(&self.path)?;

        let mut body = String::with_capacity(urls.iter().map(|u| u.len() + 1).sum());
        for url in urls {
            body.push_str(url);
            body.push('\n');
        }

        file.write_all(body.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|source| StorageError::Write {
                path: self.path.clone(),
                source,
            })?;

        tracing::info!(path = %self.path.display(), count = urls.len(), "Processed URLs written");
        Ok(())
    }
}
