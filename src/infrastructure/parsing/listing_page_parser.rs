//! Catalog listing page parser

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::{debug, warn};
use url::Url;

use super::config::{ListingSelectors, ParsingConfig};
use super::{all_attributes, compile_selectors, first_element, first_text, resolve_url};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::listing::ListingPage;

pub struct ListingPageParser {
    item_count_selectors: Vec<Selector>,
    paging_label_selectors: Vec<Selector>,
    pagination_selectors: Vec<Selector>,
    product_link_selectors: Vec<Selector>,
}

impl ListingPageParser {
    /// Create a new listing parser with default selectors
    pub fn new() -> Result<Self> {
        Self::with_config(&ParsingConfig::default().listing_selectors)
    }

    pub fn with_config(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            item_count_selectors: compile_selectors(&selectors.item_count)?,
            paging_label_selectors: compile_selectors(&selectors.paging_label)?,
            pagination_selectors: compile_selectors(&selectors.pagination_link)?,
            product_link_selectors: compile_selectors(&selectors.product_link)?,
        })
    }

    /// Read item count, paging flag and anchors from a listing page.
    ///
    /// A page without an item count element is reported as
    /// [`PipelineError::ElementMissing`].
    pub fn parse(&self, html: &str, page_url: &str) -> PipelineResult<ListingPage> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        let count_text = first_text(&document, "item count", &self.item_count_selectors)
            .ok_or_else(|| PipelineError::element_missing(page_url, "#toolbar-amount"))?;
        let is_paginated = first_element(&document, &self.paging_label_selectors).is_some();
        let total_count = parse_item_count(&count_text, is_paginated).unwrap_or_else(|| {
            warn!("⚠️ Unreadable item count '{}' on {}", count_text, page_url);
            0
        });

        let pagination_links = all_attributes(&document, &self.pagination_selectors, "href")
            .iter()
            .map(|href| resolve_url(base.as_ref(), href))
            .collect();
        let product_links: Vec<String> = all_attributes(&document, &self.product_link_selectors, "href")
            .iter()
            .map(|href| resolve_url(base.as_ref(), href))
            .collect();

        debug!(
            "Listing {}: total={}, paginated={}, {} product anchors",
            page_url,
            total_count,
            is_paginated,
            product_links.len()
        );

        Ok(ListingPage {
            total_count,
            is_paginated,
            pagination_links,
            product_links,
        })
    }
}

/// Total item count from the toolbar text.
///
/// Paginated catalogs read "Items 1-36 of 100" (last token); single pages
/// read "12 Items" (first token).
pub fn parse_item_count(text: &str, is_paginated: bool) -> Option<u32> {
    let mut tokens = text.split_whitespace();
    let token = if is_paginated { tokens.last() } else { tokens.next() }?;
    let digits: String = token.chars().filter(char::is_ascii_digit).collect();
    digits.parse().ok()
}
