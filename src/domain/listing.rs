//! Catalog listing and product page entities

use serde::{Deserialize, Serialize};
use std::fmt;

use super::errors::{PipelineError, PipelineResult};

/// A catalog page visited during link enumeration.
///
/// Created once per catalog URL and discarded once its product links have
/// been collected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Listing {
    pub url: String,
    pub is_paginated: bool,
    pub total_count: u32,
}

impl Listing {
    pub fn new(url: impl Into<String>, is_paginated: bool, total_count: u32) -> Self {
        Self {
            url: url.into(),
            is_paginated,
            total_count,
        }
    }

    /// Number of catalog pages to visit for the given page size.
    ///
    /// A catalog without a paging indicator is a single page.
    pub fn page_count(&self, page_size: u32) -> u32 {
        if !self.is_paginated || page_size == 0 {
            return 1;
        }
        self.total_count.div_ceil(page_size)
    }
}

/// URL of one product detail page. Links are compared verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductLink(String);

impl ProductLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProductLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductLink {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for ProductLink {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

/// What the catalog browser reads from one listing page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListingPage {
    /// Total number of items the catalog reports.
    pub total_count: u32,
    /// Whether a paging indicator is present.
    pub is_paginated: bool,
    /// Pagination anchors found on the page, in document order.
    pub pagination_links: Vec<String>,
    /// Product detail anchors found on the page, in document order.
    pub product_links: Vec<String>,
}

/// Raw blocks read from a product detail page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductPage {
    pub price: String,
    /// Page title, `"<name> | <code>"` on the catalogs this crate targets.
    pub title: String,
    pub description: Option<String>,
    /// Rows of the specification table as (label, value), in page order.
    pub spec_rows: Vec<(String, String)>,
    pub image_sources: Vec<String>,
}

impl ProductPage {
    /// Split the title on its first `|` into (name, code).
    ///
    /// Both halves are trimmed and the code is uppercased. A title without a
    /// separator or with an empty code is [`PipelineError::MalformedTitle`].
    pub fn split_title(&self, url: &str) -> PipelineResult<(String, String)> {
        let malformed = || PipelineError::MalformedTitle {
            url: url.to_string(),
            title: self.title.clone(),
        };
        let (name, code) = self.title.split_once('|').ok_or_else(malformed)?;
        let code = code.trim();
        if code.is_empty() {
            return Err(malformed());
        }
        Ok((name.trim().to_string(), code.to_uppercase()))
    }
}
