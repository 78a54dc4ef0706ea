//! Harvest run orchestration
//!
//! One run: snapshot the known links, enumerate every catalog, drop links
//! already harvested, extract and consolidate each new product in turn, then
//! persist the batch and rebuild the full-text index.

use anyhow::{Context, Result};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::application::run_summary::{RunSummary, Stage};
use crate::domain::collaborators::{CatalogBrowser, ImageStore, RecordArchive, RecordSink, VisualQa};
use crate::domain::attributes::RawAttributeMap;
use crate::domain::errors::PipelineError;
use crate::domain::listing::ProductLink;
use crate::domain::record::{CanonicalColumn, CanonicalRecord};
use crate::domain::services::{
    consolidate, filter_new, normalize_record, parse_description, parse_spec_table, LinkCollector, ProductIdentity,
    VisualAttributeFuser,
};
use crate::infrastructure::config::PipelineConfig;
use crate::infrastructure::{
    CsvRecordSet, DatabaseConnection, HttpCatalogBrowser, HttpClient, HttpVisualQa, ImageDownloader,
    SqliteCatalogStore,
};

/// Spec-table label naming the product category.
const PRODUCT_CATEGORY: &str = "Product Category";

/// The outside world of a run.
#[derive(Clone)]
pub struct PipelineCollaborators {
    pub browser: Arc<dyn CatalogBrowser>,
    pub visual_qa: Arc<dyn VisualQa>,
    pub images: Arc<dyn ImageStore>,
    pub archive: Arc<dyn RecordArchive>,
    pub sink: Arc<dyn RecordSink>,
}

impl PipelineCollaborators {
    /// HTTP, CSV and SQLite collaborators built from the configuration.
    pub async fn from_config(config: &PipelineConfig) -> Result<Self> {
        let http = HttpClient::from_http_config(&config.http).context("Failed to build HTTP client")?;
        let browser = HttpCatalogBrowser::new(http.clone())?;
        let visual_qa = HttpVisualQa::new(http.clone(), config.vision.endpoint.clone());
        let images = ImageDownloader::new(
            http,
            config.image_save_dir.clone(),
            config.image.clone(),
            config.timeouts.image_wait(),
        );
        let archive = CsvRecordSet::new(config.csv_file_path.clone(), config.new_csv_file_path.clone());

        let database_url = config.database_url();
        let db = DatabaseConnection::new(&database_url)
            .await
            .with_context(|| format!("Failed to open database {database_url}"))?;
        let sink = SqliteCatalogStore::new(db.pool().clone(), &config.table_name).await?;

        Ok(Self {
            browser: Arc::new(browser),
            visual_qa: Arc::new(visual_qa),
            images: Arc::new(images),
            archive: Arc::new(archive),
            sink: Arc::new(sink),
        })
    }
}

/// How a run ended.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunSummary),
    /// No new product was found; nothing was written.
    EmptyBatch(RunSummary),
}

impl RunOutcome {
    pub fn summary(&self) -> &RunSummary {
        match self {
            Self::Completed(summary) | Self::EmptyBatch(summary) => summary,
        }
    }
}

pub struct HarvestPipeline {
    config: PipelineConfig,
    collaborators: PipelineCollaborators,
    fuser: VisualAttributeFuser,
}

impl HarvestPipeline {
    pub fn new(config: PipelineConfig, collaborators: PipelineCollaborators) -> Self {
        let fuser = VisualAttributeFuser::new(
            config.vision.questions.clone(),
            config.vision.top_k,
            config.timeouts.inference_wait(),
        );
        Self {
            config,
            collaborators,
            fuser,
        }
    }

    /// Execute one harvest run.
    ///
    /// Per-item failures are collected in the summary. Storage failures
    /// abort the run.
    pub async fn run(&self) -> Result<RunOutcome> {
        let mut summary = RunSummary::start();
        info!("🚀 Harvest run {} starting", summary.run_id);

        let known = self
            .collaborators
            .archive
            .known_links()
            .await
            .context("Failed to load the persisted record set")?;
        info!("📚 {} links already harvested", known.len());

        let links = self.collect_new_links(&known, &mut summary).await;
        summary.new_links = links.len();

        let records = self.harvest_products(&links, &mut summary).await;
        summary.records_harvested = records.len();

        if records.is_empty() {
            summary.finish();
            info!("ℹ️ {}", PipelineError::EmptyBatch);
            summary.log();
            return Ok(RunOutcome::EmptyBatch(summary));
        }

        match self.persist(&records).await {
            Ok(rows) => summary.rows_upserted = rows,
            Err(e) => {
                error!("❌ Persisting run {} failed: {:#}", summary.run_id, e);
                return Err(e);
            }
        }

        summary.finish();
        summary.log();
        Ok(RunOutcome::Completed(summary))
    }

    /// New links of every catalog, in a stable order, each once.
    async fn collect_new_links(&self, known: &HashSet<ProductLink>, summary: &mut RunSummary) -> Vec<ProductLink> {
        let collector = LinkCollector::new(self.collaborators.browser.as_ref(), self.config.link_collector_settings());
        let mut pending: HashSet<ProductLink> = HashSet::new();

        for catalog in self.config.catalog_urls() {
            summary.catalogs += 1;
            let collection = collector.collect_links(catalog).await;
            summary.pages_visited += collection.pages_visited;
            summary.links_collected += collection.links.len();
            for failure in collection.failures {
                summary.record_failure(catalog, Stage::LinkCollection, failure);
            }

            let fresh = filter_new(collection.links, known);
            info!("🆕 {} new links in {}", fresh.len(), catalog);
            pending.extend(fresh);
        }

        let mut links: Vec<ProductLink> = pending.into_iter().collect();
        links.sort();
        links
    }

    async fn harvest_products(&self, links: &[ProductLink], summary: &mut RunSummary) -> Vec<CanonicalRecord> {
        let product_wait = self.config.timeouts.product_wait();
        let mut records = Vec::with_capacity(links.len());

        for (index, link) in links.iter().enumerate() {
            debug!("Product {}/{}: {}", index + 1, links.len(), link);
            let outcome = tokio::time::timeout(product_wait, self.harvest_product(link, summary)).await;
            match outcome {
                Ok(Some(record)) => records.push(record),
                Ok(None) => {}
                Err(_) => {
                    warn!("⏱️ Product {} exceeded {}s, skipped", link, product_wait.as_secs());
                    summary.record_failure(
                        link.as_str(),
                        Stage::ProductPage,
                        PipelineError::fetch_timeout(link.as_str(), product_wait),
                    );
                }
            }
        }

        info!("✅ Harvested {} of {} new products", records.len(), links.len());
        records
    }

    /// Extract, consolidate and normalize one product. `None` when the
    /// product had to be skipped; the reason is in the summary.
    async fn harvest_product(&self, link: &ProductLink, summary: &mut RunSummary) -> Option<CanonicalRecord> {
        let url = link.as_str();
        let page = match self
            .collaborators
            .browser
            .open_product(url, self.config.timeouts.product_wait())
            .await
            .and_then(|page| page.split_title(url).map(|title| (page, title)))
        {
            Ok(loaded) => loaded,
            Err(e) => {
                warn!("⚠️ Product {} skipped: {}", url, e);
                summary.record_failure(url, Stage::ProductPage, e);
                return None;
            }
        };
        let (page, (name, code)) = page;

        let description = parse_description(page.description.as_deref());
        let spec_table = parse_spec_table(&page.spec_rows);

        let images = self.collaborators.images.store_all(&code, &page.image_sources).await;
        for failure in images.failures {
            summary.record_failure(url, Stage::Images, failure);
        }

        let visual = match images.saved.first() {
            Some(image) => {
                let category = spec_table.get(PRODUCT_CATEGORY).unwrap_or_default();
                let inference = self
                    .fuser
                    .infer_visual_attributes(self.collaborators.visual_qa.as_ref(), image, category)
                    .await;
                for failure in inference.failures {
                    summary.record_failure(url, Stage::VisualInference, failure);
                }
                inference.attributes
            }
            None => {
                debug!("No stored image for {}, visual inference skipped", url);
                RawAttributeMap::new()
            }
        };

        let identity = ProductIdentity {
            link: link.clone(),
            price: page.price,
            code,
            name,
            description_raw: page.description,
        };
        let record = normalize_record(consolidate(identity, &[description, spec_table, visual]));
        debug!("Record {} has {} attribute column(s)", record.code, record.attributes.len());
        Some(record)
    }

    async fn persist(&self, records: &[CanonicalRecord]) -> Result<u64> {
        let c = &self.collaborators;
        c.archive
            .write_batch(records)
            .await
            .context("Failed to write the batch file")?;
        c.archive
            .append(records)
            .await
            .context("Failed to append to the record set")?;
        let rows = c.sink.upsert_batch(records).await.context("Failed to upsert records")?;
        c.sink
            .build_fulltext_index(&CanonicalColumn::ALL)
            .await
            .context("Failed to rebuild the full-text index")?;
        info!("💾 Persisted {} records ({} rows affected)", records.len(), rows);
        Ok(rows)
    }
}
