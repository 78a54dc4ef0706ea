//! CSV persisted record set
//!
//! The record set file is the source of truth for links already harvested.
//! Each run also rewrites a batch file holding only that run's records.

use async_trait::async_trait;
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::domain::collaborators::RecordArchive;
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::listing::ProductLink;
use crate::domain::record::{CanonicalColumn, CanonicalRecord};

pub const LINK_COLUMN: &str = "link";
pub const RAW_ATTRIBUTES_COLUMN: &str = "raw_attributes";

/// Header of the persisted record set.
pub fn record_header() -> Vec<String> {
    let mut header: Vec<String> = ["link", "price", "code", "Name"].iter().map(|h| h.to_string()).collect();
    header.extend(CanonicalColumn::ALL.iter().map(|column| column.label().to_string()));
    header
}

fn record_row(record: &CanonicalRecord) -> Vec<String> {
    let mut row = vec![
        record.link.to_string(),
        record.price.clone(),
        record.code.clone(),
        record.name.clone(),
    ];
    row.extend(
        CanonicalColumn::ALL
            .iter()
            .map(|column| record.get(*column).unwrap_or_default().to_string()),
    );
    row
}

fn storage_error(operation: &'static str) -> impl Fn(csv::Error) -> PipelineError {
    move |e| PipelineError::storage(operation, e)
}

/// Read the link column of a record set file.
fn read_known_links(path: &Path) -> PipelineResult<HashSet<ProductLink>> {
    if !path.exists() {
        debug!("Record set {:?} does not exist yet", path);
        return Ok(HashSet::new());
    }

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(storage_error("known_links"))?;
    let headers = reader.headers().map_err(storage_error("known_links"))?.clone();
    if headers.is_empty() {
        return Ok(HashSet::new());
    }
    let Some(index) = headers.iter().position(|h| h.trim().eq_ignore_ascii_case(LINK_COLUMN)) else {
        return Err(PipelineError::storage(
            "known_links",
            format!("{:?} has no '{LINK_COLUMN}' column", path),
        ));
    };

    let mut links = HashSet::new();
    for row in reader.records() {
        let row = row.map_err(storage_error("known_links"))?;
        if let Some(link) = row.get(index).map(str::trim).filter(|l| !l.is_empty()) {
            links.insert(ProductLink::new(link));
        }
    }
    Ok(links)
}

fn write_batch_file(path: &Path, records: &[CanonicalRecord]) -> PipelineResult<()> {
    ensure_parent(path, "write_batch")?;
    let mut writer = csv::Writer::from_path(path).map_err(storage_error("write_batch"))?;

    let mut header = record_header();
    header.push(RAW_ATTRIBUTES_COLUMN.to_string());
    writer.write_record(&header).map_err(storage_error("write_batch"))?;

    for record in records {
        let raw = serde_json::to_string(&record.source_attributes)
            .map_err(|e| PipelineError::storage("write_batch", e))?;
        let mut row = record_row(record);
        row.push(raw);
        writer.write_record(&row).map_err(storage_error("write_batch"))?;
    }
    writer.flush().map_err(|e| PipelineError::storage("write_batch", e))
}

fn append_file(path: &Path, records: &[CanonicalRecord]) -> PipelineResult<()> {
    ensure_parent(path, "append")?;
    let needs_header = std::fs::metadata(path).map(|m| m.len() == 0).unwrap_or(true);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| PipelineError::storage("append", e))?;

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
    if needs_header {
        writer.write_record(record_header()).map_err(storage_error("append"))?;
    }
    for record in records {
        writer.write_record(record_row(record)).map_err(storage_error("append"))?;
    }
    writer.flush().map_err(|e| PipelineError::storage("append", e))
}

fn ensure_parent(path: &Path, operation: &'static str) -> PipelineResult<()> {
    match path.parent().filter(|p| !p.as_os_str().is_empty()) {
        Some(parent) => std::fs::create_dir_all(parent).map_err(|e| PipelineError::storage(operation, e)),
        None => Ok(()),
    }
}

pub struct CsvRecordSet {
    record_set_path: PathBuf,
    batch_path: PathBuf,
}

impl CsvRecordSet {
    pub fn new(record_set_path: impl Into<PathBuf>, batch_path: impl Into<PathBuf>) -> Self {
        Self {
            record_set_path: record_set_path.into(),
            batch_path: batch_path.into(),
        }
    }

    pub(crate) fn record_set_path(&self) -> &Path {
        &self.record_set_path
    }

    pub(crate) fn batch_path(&self) -> &Path {
        &self.batch_path
    }
}

async fn blocking<T, F>(operation: &'static str, f: F) -> PipelineResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> PipelineResult<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| PipelineError::storage(operation, e))?
}

#[async_trait]
impl RecordArchive for CsvRecordSet {
    async fn known_links(&self) -> PipelineResult<HashSet<ProductLink>> {
        let path = self.record_set_path.clone();
        let links = blocking("known_links", move || read_known_links(&path)).await?;
        info!("📚 {} known links in {:?}", links.len(), self.record_set_path);
        Ok(links)
    }

    async fn write_batch(&self, records: &[CanonicalRecord]) -> PipelineResult<()> {
        let path = self.batch_path.clone();
        let records = records.to_vec();
        let count = records.len();
        blocking("write_batch", move || write_batch_file(&path, &records)).await?;
        info!("💾 Wrote {} records to {:?}", count, self.batch_path);
        Ok(())
    }

    async fn append(&self, records: &[CanonicalRecord]) -> PipelineResult<()> {
        let path = self.record_set_path.clone();
        let records = records.to_vec();
        let count = records.len();
        blocking("append", move || append_file(&path, &records)).await?;
        info!("💾 Appended {} records to {:?}", count, self.record_set_path);
        Ok(())
    }
}
