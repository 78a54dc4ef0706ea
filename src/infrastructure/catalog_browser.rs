//! HTTP implementation of the catalog browser

use anyhow::Result;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::domain::collaborators::CatalogBrowser;
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::listing::{ListingPage, ProductPage};
use crate::infrastructure::http_client::HttpClient;
use crate::infrastructure::parsing::{ListingPageParser, ProductPageParser};

pub struct HttpCatalogBrowser {
    http_client: HttpClient,
    listing_parser: ListingPageParser,
    product_parser: ProductPageParser,
}

impl HttpCatalogBrowser {
    pub fn new(http_client: HttpClient) -> Result<Self> {
        Ok(Self {
            http_client,
            listing_parser: ListingPageParser::new()?,
            product_parser: ProductPageParser::new()?,
        })
    }

    /// Page body, bounded by `wait`.
    async fn fetch(&self, url: &str, wait: Duration) -> PipelineResult<String> {
        match tokio::time::timeout(wait, self.http_client.fetch_html_string(url)).await {
            Ok(Ok(html)) => {
                debug!("Fetched {} ({} bytes)", url, html.len());
                Ok(html)
            }
            Ok(Err(e)) => Err(PipelineError::fetch_failed(url, e)),
            Err(_) => Err(PipelineError::fetch_timeout(url, wait)),
        }
    }
}

#[async_trait]
impl CatalogBrowser for HttpCatalogBrowser {
    async fn open_listing(&self, url: &str, wait: Duration) -> PipelineResult<ListingPage> {
        let html = self.fetch(url, wait).await?;
        self.listing_parser.parse(&html, url)
    }

    async fn open_product(&self, url: &str, wait: Duration) -> PipelineResult<ProductPage> {
        let html = self.fetch(url, wait).await?;
        self.product_parser.parse(&html, url)
    }
}
