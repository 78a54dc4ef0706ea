//! Test utilities for catalog-harvester
//!
//! In-memory collaborators and an isolated SQLite database so that service
//! and pipeline tests never touch the network or the file system.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::domain::collaborators::{CatalogBrowser, ImageBatch, ImageStore, RankedLabel, RecordArchive, VisualQa};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::listing::{ListingPage, ProductLink, ProductPage};
use crate::domain::record::CanonicalRecord;
use crate::infrastructure::DatabaseConnection;

/// Test database configuration
pub struct TestDatabase {
    pub connection: DatabaseConnection,
}

impl TestDatabase {
    /// Create a new in-memory test database
    ///
    /// Each test gets a fresh, clean database state.
    pub async fn new() -> Result<Self> {
        let db = DatabaseConnection::new("sqlite::memory:").await?;
        Ok(Self { connection: db })
    }

    /// Get the database pool for use in stores
    pub fn pool(&self) -> sqlx::Pool<sqlx::Sqlite> {
        self.connection.pool().clone()
    }
}

/// Catalog browser serving canned pages. Unknown URLs time out.
#[derive(Default)]
pub struct FakeCatalogBrowser {
    listings: HashMap<String, ListingPage>,
    products: HashMap<String, ProductPage>,
    product_delay: Option<Duration>,
    listing_visits: Mutex<Vec<String>>,
}

impl FakeCatalogBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_listing(mut self, url: &str, page: ListingPage) -> Self {
        self.listings.insert(url.to_string(), page);
        self
    }

    pub fn with_product(mut self, url: &str, page: ProductPage) -> Self {
        self.products.insert(url.to_string(), page);
        self
    }

    /// Every product page takes `delay` to load.
    pub fn with_product_delay(mut self, delay: Duration) -> Self {
        self.product_delay = Some(delay);
        self
    }

    pub fn listing_visits(&self) -> Vec<String> {
        self.listing_visits.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogBrowser for FakeCatalogBrowser {
    async fn open_listing(&self, url: &str, wait: Duration) -> PipelineResult<ListingPage> {
        self.listing_visits.lock().unwrap().push(url.to_string());
        self.listings
            .get(url)
            .cloned()
            .ok_or_else(|| PipelineError::fetch_timeout(url, wait))
    }

    async fn open_product(&self, url: &str, wait: Duration) -> PipelineResult<ProductPage> {
        if let Some(delay) = self.product_delay {
            tokio::time::sleep(delay).await;
        }
        self.products
            .get(url)
            .cloned()
            .ok_or_else(|| PipelineError::fetch_timeout(url, wait))
    }
}

/// Visual QA model giving the same labels to every question.
pub struct FakeVisualQa {
    labels: Vec<RankedLabel>,
    failing: HashSet<String>,
    calls: AtomicUsize,
}

impl FakeVisualQa {
    pub fn answering(labels: Vec<RankedLabel>) -> Self {
        Self {
            labels,
            failing: HashSet::new(),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing_on(mut self, question: &str) -> Self {
        self.failing.insert(question.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VisualQa for FakeVisualQa {
    async fn answer(&self, _image: &Path, question: &str) -> PipelineResult<Vec<RankedLabel>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.contains(question) {
            return Err(PipelineError::inference_failure(question, "model unavailable"));
        }
        Ok(self.labels.clone())
    }
}

/// Image store that pretends every source was saved.
#[derive(Default)]
pub struct FakeImageStore;

#[async_trait]
impl ImageStore for FakeImageStore {
    async fn store_all(&self, code: &str, sources: &[String]) -> ImageBatch {
        ImageBatch {
            saved: (0..sources.len())
                .map(|i| PathBuf::from(format!("{code}_{}.jpg", i + 1)))
                .collect(),
            failures: Vec::new(),
        }
    }
}

/// Record archive held in memory.
#[derive(Default)]
pub struct MemoryArchive {
    known: HashSet<ProductLink>,
    pub batch: Mutex<Vec<CanonicalRecord>>,
    pub appended: Mutex<Vec<CanonicalRecord>>,
}

impl MemoryArchive {
    pub fn with_known(links: &[&str]) -> Self {
        Self {
            known: links.iter().map(|l| ProductLink::new(*l)).collect(),
            ..Self::default()
        }
    }
}

#[async_trait]
impl RecordArchive for MemoryArchive {
    async fn known_links(&self) -> PipelineResult<HashSet<ProductLink>> {
        Ok(self.known.clone())
    }

    async fn write_batch(&self, records: &[CanonicalRecord]) -> PipelineResult<()> {
        *self.batch.lock().unwrap() = records.to_vec();
        Ok(())
    }

    async fn append(&self, records: &[CanonicalRecord]) -> PipelineResult<()> {
        self.appended.lock().unwrap().extend_from_slice(records);
        Ok(())
    }
}
