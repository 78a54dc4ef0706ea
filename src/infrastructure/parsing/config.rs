//! Parsing configuration for HTML extraction
//!
//! CSS selectors for the Magento-style storefronts the harvester targets.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParsingConfig {
    pub listing_selectors: ListingSelectors,
    pub product_selectors: ProductSelectors,
}

/// CSS selectors for catalog listing pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    /// Item count text, e.g. "Items 1-36 of 100"
    pub item_count: Vec<String>,

    /// Presence marks a paginated catalog
    pub paging_label: Vec<String>,

    pub pagination_link: Vec<String>,

    pub product_link: Vec<String>,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item_count: vec!["#toolbar-amount".to_string(), ".toolbar-amount".to_string()],
            paging_label: vec!["#paging-label".to_string()],
            pagination_link: vec![".pages-items .page[href]".to_string(), ".pages-items a[href]".to_string()],
            product_link: vec![
                ".product-item .product-item-link[href]".to_string(),
                ".product-item a.product-item-photo[href]".to_string(),
            ],
        }
    }
}

/// CSS selectors for product detail pages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductSelectors {
    pub price: Vec<String>,
    pub title: Vec<String>,
    pub description: Vec<String>,
    /// Rows of the specification table
    pub spec_row: Vec<String>,
    pub spec_label: Vec<String>,
    pub spec_value: Vec<String>,
    pub image: Vec<String>,
}

impl Default for ProductSelectors {
    fn default() -> Self {
        Self {
            price: vec![".product-info-main .price".to_string(), ".price".to_string()],
            title: vec![".page-title .base".to_string(), ".base".to_string()],
            description: vec![
                "[itemprop=description] .value".to_string(),
                "[itemprop=description]".to_string(),
            ],
            spec_row: vec!["#product-attribute-specs-table tbody tr".to_string()],
            spec_label: vec!["th".to_string()],
            spec_value: vec!["td".to_string()],
            image: vec![".MagicToolboxSelectorsContainer img[src]".to_string()],
        }
    }
}
