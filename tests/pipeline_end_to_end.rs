//! End-to-end harvest runs against in-memory catalogs

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio_test::assert_ok;

use catalog_harvester::application::{HarvestPipeline, PipelineCollaborators, RunOutcome};
use catalog_harvester::domain::services::link_collector::page_url;
use catalog_harvester::domain::services::{
    consolidate, normalize_record, parse_description, parse_spec_table, ProductIdentity, VisualAttributeFuser,
    VisualQuestionCatalog,
};
use catalog_harvester::domain::{
    CanonicalColumn, CatalogBrowser, ImageBatch, ImageStore, ListingPage, PipelineError, PipelineResult,
    ProductLink, ProductPage, RankedLabel, RecordSink, VisualQa,
};
use catalog_harvester::infrastructure::{CsvRecordSet, DatabaseConnection, PipelineConfig, SqliteCatalogStore};

const CATALOG: &str = "https://shop.test/women/unstitched";
const DESCRIPTION: &str = "Fabric Type: Lawn - Neckline: Round - Shirt Front: Plain";

#[derive(Default)]
struct ScriptedBrowser {
    listings: HashMap<String, ListingPage>,
    products: HashMap<String, ProductPage>,
    visits: Mutex<Vec<String>>,
}

impl ScriptedBrowser {
    fn listing(mut self, url: &str, page: ListingPage) -> Self {
        self.listings.insert(url.to_string(), page);
        self
    }

    fn product(mut self, url: &str, page: ProductPage) -> Self {
        self.products.insert(url.to_string(), page);
        self
    }

    fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogBrowser for ScriptedBrowser {
    async fn open_listing(&self, url: &str, wait: Duration) -> PipelineResult<ListingPage> {
        self.visits.lock().unwrap().push(url.to_string());
        self.listings.get(url).cloned().ok_or_else(|| PipelineError::fetch_timeout(url, wait))
    }

    async fn open_product(&self, url: &str, wait: Duration) -> PipelineResult<ProductPage> {
        self.visits.lock().unwrap().push(url.to_string());
        self.products.get(url).cloned().ok_or_else(|| PipelineError::fetch_timeout(url, wait))
    }
}

/// Model that is never expected to be asked anything.
struct OfflineModel;

#[async_trait]
impl VisualQa for OfflineModel {
    async fn answer(&self, _image: &Path, question: &str) -> PipelineResult<Vec<RankedLabel>> {
        Err(PipelineError::inference_failure(question, "offline"))
    }
}

struct NoImages;

#[async_trait]
impl ImageStore for NoImages {
    async fn store_all(&self, _code: &str, _sources: &[String]) -> ImageBatch {
        ImageBatch::default()
    }
}

fn scenario_product() -> ProductPage {
    ProductPage {
        price: "PKR 4,490".into(),
        title: "Red Lawn Suit | jl-24-101".into(),
        description: Some(DESCRIPTION.into()),
        spec_rows: vec![
            ("Color".into(), "Red".into()),
            ("Size".into(), "M".into()),
            ("Noise".into(), "drop-me".into()),
        ],
        image_sources: Vec::new(),
    }
}

fn single_page(products: &[&str]) -> ListingPage {
    ListingPage {
        total_count: u32::try_from(products.len()).unwrap(),
        is_paginated: false,
        pagination_links: Vec::new(),
        product_links: products.iter().map(|p| p.to_string()).collect(),
    }
}

struct Workspace {
    _dir: TempDir,
    csv: PathBuf,
    batch: PathBuf,
}

impl Workspace {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        Self {
            csv: dir.path().join("products.csv"),
            batch: dir.path().join("new_products.csv"),
            _dir: dir,
        }
    }

    fn config(&self) -> PipelineConfig {
        let mut config = PipelineConfig::new(vec![CATALOG.to_string()]);
        config.csv_file_path = self.csv.clone();
        config.new_csv_file_path = self.batch.clone();
        config
    }
}

fn collaborators(browser: Arc<ScriptedBrowser>, workspace: &Workspace, store: Arc<SqliteCatalogStore>) -> PipelineCollaborators {
    PipelineCollaborators {
        browser,
        visual_qa: Arc::new(OfflineModel),
        images: Arc::new(NoImages),
        archive: Arc::new(CsvRecordSet::new(workspace.csv.clone(), workspace.batch.clone())),
        sink: store,
    }
}

async fn memory_store() -> Arc<SqliteCatalogStore> {
    let db = DatabaseConnection::new("sqlite::memory:").await.unwrap();
    Arc::new(SqliteCatalogStore::new(db.pool().clone(), "products").await.unwrap())
}

#[tokio::test]
async fn consolidated_record_follows_the_canonical_schema() {
    let fuser = VisualAttributeFuser::new(VisualQuestionCatalog::default(), 5, Duration::from_secs(1));
    let visual = fuser
        .infer_visual_attributes(&OfflineModel, Path::new("unused.jpg"), "bedsheets")
        .await;
    assert!(visual.failures.is_empty());

    let page = scenario_product();
    let identity = ProductIdentity {
        link: ProductLink::new("https://shop.test/p/jl-24-101"),
        price: page.price.clone(),
        code: "JL-24-101".into(),
        name: "Red Lawn Suit".into(),
        description_raw: page.description.clone(),
    };
    let raw_maps = [
        parse_description(page.description.as_deref()),
        parse_spec_table(&page.spec_rows),
        visual.attributes,
    ];
    let record = normalize_record(consolidate(identity, &raw_maps));

    assert_eq!(record.get(CanonicalColumn::FabricType), Some("lawn"));
    assert_eq!(record.get(CanonicalColumn::Shirt), Some("plain"));
    assert_eq!(record.get(CanonicalColumn::Color), Some("red"));
    assert_eq!(record.get(CanonicalColumn::Neckline), Some("round"));
    assert!(record.get(CanonicalColumn::Size).is_some());
    assert!(record.attributes.keys().all(|c| CanonicalColumn::ALL.contains(c)));
    assert!(!record.source_attributes.declares("Noise"));
}

#[tokio::test]
async fn paginated_catalog_visits_every_listing_page() {
    let anchors: Vec<String> = (2..=3).map(|n| page_url(CATALOG, n)).collect();
    let page = |products: &[&str]| ListingPage {
        total_count: 100,
        is_paginated: true,
        pagination_links: anchors.clone(),
        product_links: products.iter().map(|p| p.to_string()).collect(),
    };
    let browser = Arc::new(
        ScriptedBrowser::default()
            .listing(CATALOG, page(&[]))
            .listing(&page_url(CATALOG, 1), page(&["https://shop.test/p/1"]))
            .listing(&page_url(CATALOG, 2), page(&["https://shop.test/p/2"]))
            .listing(&page_url(CATALOG, 3), page(&["https://shop.test/p/3"])),
    );
    let workspace = Workspace::new();
    let store = memory_store().await;
    let pipeline = HarvestPipeline::new(workspace.config(), collaborators(browser.clone(), &workspace, store));

    let outcome = assert_ok!(pipeline.run().await);

    let visits = browser.visits();
    for n in 1..=3 {
        assert!(visits.contains(&page_url(CATALOG, n)), "page {n} not visited");
    }
    assert!(!visits.contains(&page_url(CATALOG, 4)));
    // the products themselves time out, so nothing is harvested
    assert!(matches!(outcome, RunOutcome::EmptyBatch(_)));
    assert_eq!(outcome.summary().new_links, 3);
    assert_eq!(outcome.summary().failures.len(), 3);
}

#[tokio::test]
async fn second_run_skips_harvested_links() {
    let product_url = "https://shop.test/p/jl-24-101";
    let browser = Arc::new(
        ScriptedBrowser::default()
            .listing(CATALOG, single_page(&[product_url]))
            .product(product_url, scenario_product()),
    );
    let workspace = Workspace::new();
    let store = memory_store().await;

    let first = HarvestPipeline::new(workspace.config(), collaborators(browser.clone(), &workspace, store.clone()));
    let outcome = assert_ok!(first.run().await);
    let RunOutcome::Completed(summary) = outcome else {
        panic!("first run should store the product");
    };
    assert_eq!(summary.records_harvested, 1);
    assert!(workspace.csv.exists());
    assert!(workspace.batch.exists());

    let hits = assert_ok!(store.search("lawn", 10).await);
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].code, "JL-24-101");
    assert_eq!(hits[0].link, product_url);

    let second = HarvestPipeline::new(workspace.config(), collaborators(browser, &workspace, store.clone()));
    let outcome = assert_ok!(second.run().await);
    assert!(matches!(outcome, RunOutcome::EmptyBatch(_)));
    assert_eq!(outcome.summary().new_links, 0);
}
