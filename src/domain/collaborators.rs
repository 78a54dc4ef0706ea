//! Collaborator interfaces
//!
//! The pipeline core only talks to the outside world through these traits:
//! the catalog browser, the visual question answering model, image storage,
//! the persisted record set and the searchable store.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::errors::{PipelineError, PipelineResult};
use super::listing::{ListingPage, ProductLink, ProductPage};
use super::record::{CanonicalColumn, CanonicalRecord, SearchHit};

/// Page fetch collaborator.
#[async_trait]
pub trait CatalogBrowser: Send + Sync {
    /// Load a catalog listing page, waiting at most `wait` for it to render.
    async fn open_listing(&self, url: &str, wait: Duration) -> PipelineResult<ListingPage>;

    /// Load a product detail page, waiting at most `wait` for it to render.
    async fn open_product(&self, url: &str, wait: Duration) -> PipelineResult<ProductPage>;
}

/// One candidate answer of the visual question answering model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedLabel {
    pub label: String,
    pub score: f64,
}

impl RankedLabel {
    pub fn new(label: impl Into<String>, score: f64) -> Self {
        Self {
            label: label.into(),
            score,
        }
    }
}

/// Inference collaborator: image + question in, ranked labels out.
#[async_trait]
pub trait VisualQa: Send + Sync {
    async fn answer(&self, image: &Path, question: &str) -> PipelineResult<Vec<RankedLabel>>;
}

/// Images stored for one product.
#[derive(Debug, Default)]
pub struct ImageBatch {
    pub saved: Vec<PathBuf>,
    pub failures: Vec<PipelineError>,
}

#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Store every image of a product as `{code}_{index+1}.jpg`.
    async fn store_all(&self, code: &str, sources: &[String]) -> ImageBatch;
}

/// Persisted record set: the source of truth for links already harvested.
#[async_trait]
pub trait RecordArchive: Send + Sync {
    async fn known_links(&self) -> PipelineResult<HashSet<ProductLink>>;

    /// Replace the per-run batch file with this run's records.
    async fn write_batch(&self, records: &[CanonicalRecord]) -> PipelineResult<()>;

    /// Append records to the persisted record set.
    async fn append(&self, records: &[CanonicalRecord]) -> PipelineResult<()>;
}

/// Queryable store with a full-text index over the canonical columns.
#[async_trait]
pub trait RecordSink: Send + Sync {
    async fn upsert_batch(&self, records: &[CanonicalRecord]) -> PipelineResult<u64>;

    async fn build_fulltext_index(&self, columns: &[CanonicalColumn]) -> PipelineResult<()>;

    async fn search(&self, query: &str, limit: u32) -> PipelineResult<Vec<SearchHit>>;
}
