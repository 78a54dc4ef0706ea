//! Product link enumeration for one catalog
//!
//! The catalog root tells how many items exist and whether the catalog is
//! paginated. Listing pages `1..=page_count` are visited to gather every
//! pagination anchor, then each distinct page is scanned for product links.

use std::collections::{HashMap, HashSet};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::collaborators::CatalogBrowser;
use crate::domain::errors::PipelineError;
use crate::domain::listing::{Listing, ListingPage, ProductLink};

/// Query parameter carrying the listing page number.
pub const PAGE_PARAM: &str = "p";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkCollectorSettings {
    pub page_size: u32,
    /// Wait for the catalog root.
    pub listing_wait: Duration,
    /// Wait for every other listing page.
    pub pagination_wait: Duration,
}

/// Result of enumerating one catalog.
#[derive(Debug, Default)]
pub struct LinkCollection {
    pub links: HashSet<ProductLink>,
    pub pages_visited: usize,
    pub failures: Vec<PipelineError>,
}

/// URL of listing page `page` of a catalog: the catalog URL with `p=page`,
/// replacing any page number already present.
pub fn page_url(catalog_url: &str, page: u32) -> String {
    let Ok(mut url) = Url::parse(catalog_url) else {
        let separator = if catalog_url.contains('?') { '&' } else { '?' };
        return format!("{catalog_url}{separator}{PAGE_PARAM}={page}");
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != PAGE_PARAM)
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair(PAGE_PARAM, &page.to_string());
    url.to_string()
}

/// Ordered set of page URLs.
#[derive(Debug, Default)]
struct PageQueue {
    order: Vec<String>,
    seen: HashSet<String>,
}

impl PageQueue {
    fn push(&mut self, url: &str) -> bool {
        if self.seen.insert(url.to_string()) {
            self.order.push(url.to_string());
            true
        } else {
            false
        }
    }
}

pub struct LinkCollector<'a> {
    browser: &'a dyn CatalogBrowser,
    settings: LinkCollectorSettings,
}

impl<'a> LinkCollector<'a> {
    pub fn new(browser: &'a dyn CatalogBrowser, settings: LinkCollectorSettings) -> Self {
        Self { browser, settings }
    }

    /// Every product link reachable from the catalog.
    ///
    /// A page that fails to load is recorded in `failures` and skipped; only
    /// a failed catalog root leaves the collection empty.
    pub async fn collect_links(&self, catalog_url: &str) -> LinkCollection {
        let mut collection = LinkCollection::default();
        let mut fetched: HashMap<String, ListingPage> = HashMap::new();

        let root = match self.browser.open_listing(catalog_url, self.settings.listing_wait).await {
            Ok(page) => page,
            Err(e) => {
                warn!("⚠️ Catalog {} could not be opened: {}", catalog_url, e);
                collection.failures.push(e);
                return collection;
            }
        };
        collection.pages_visited += 1;

        let listing = Listing::new(catalog_url, root.is_paginated, root.total_count);
        let page_count = listing.page_count(self.settings.page_size);
        info!(
            "📄 Catalog {}: {} items, paginated={}, {} page(s)",
            catalog_url, listing.total_count, listing.is_paginated, page_count
        );

        let mut pages = PageQueue::default();
        pages.push(catalog_url);
        fetched.insert(catalog_url.to_string(), root);

        if listing.is_paginated {
            self.discover_pages(&listing, page_count, &mut pages, &mut fetched, &mut collection)
                .await;
        }

        for url in &pages.order {
            let page = match fetched.remove(url) {
                Some(page) => page,
                None => match self.browser.open_listing(url, self.settings.pagination_wait).await {
                    Ok(page) => {
                        collection.pages_visited += 1;
                        page
                    }
                    Err(e) => {
                        warn!("⚠️ Listing page {} skipped: {}", url, e);
                        collection.failures.push(e);
                        continue;
                    }
                },
            };
            let before = collection.links.len();
            collection
                .links
                .extend(page.product_links.iter().map(|href| ProductLink::new(href.as_str())));
            debug!("Page {}: {} new product links", url, collection.links.len() - before);
        }

        info!(
            "🔗 Catalog {}: {} product links from {} page(s), {} failure(s)",
            catalog_url,
            collection.links.len(),
            pages.order.len(),
            collection.failures.len()
        );
        collection
    }

    /// Visit pages `1..=page_count`, collecting pagination anchors, until the
    /// last page or a page that adds no new anchor.
    async fn discover_pages(
        &self,
        listing: &Listing,
        page_count: u32,
        pages: &mut PageQueue,
        fetched: &mut HashMap<String, ListingPage>,
        collection: &mut LinkCollection,
    ) {
        for number in 1..=page_count {
            let url = page_url(&listing.url, number);
            let page = match self.browser.open_listing(&url, self.settings.pagination_wait).await {
                Ok(page) => page,
                Err(e) => {
                    warn!("⚠️ Pagination page {} skipped: {}", url, e);
                    collection.failures.push(e);
                    continue;
                }
            };
            collection.pages_visited += 1;
            pages.push(&url);

            let mut added = 0;
            for anchor in &page.pagination_links {
                if pages.push(anchor) {
                    added += 1;
                }
            }
            fetched.insert(url.clone(), page);
            debug!("Pagination page {}: {} new anchors", url, added);

            if added == 0 && number > 1 {
                debug!("No new pagination anchors on page {}, stopping discovery", number);
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::FakeCatalogBrowser;

    const ROOT: &str = "https://shop.test/women";

    fn settings() -> LinkCollectorSettings {
        LinkCollectorSettings {
            page_size: 36,
            listing_wait: Duration::from_secs(1),
            pagination_wait: Duration::from_secs(1),
        }
    }

    fn listing(total: u32, paginated: bool, pagination: &[String], products: &[&str]) -> ListingPage {
        ListingPage {
            total_count: total,
            is_paginated: paginated,
            pagination_links: pagination.to_vec(),
            product_links: products.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[test]
    fn test_page_url_sets_page_param() {
        assert_eq!(page_url(ROOT, 2), "https://shop.test/women?p=2");
        assert_eq!(page_url("https://shop.test/women?p=1&dir=asc", 3), "https://shop.test/women?dir=asc&p=3");
    }

    #[tokio::test]
    async fn test_unpaginated_catalog_scans_root_only() {
        let browser = FakeCatalogBrowser::new().with_listing(ROOT, listing(2, false, &[], &["/p/1", "/p/2"]));
        let collection = LinkCollector::new(&browser, settings()).collect_links(ROOT).await;

        assert_eq!(collection.links.len(), 2);
        assert_eq!(browser.listing_visits(), vec![ROOT.to_string()]);
    }

    #[tokio::test]
    async fn test_paginated_catalog_visits_every_page() {
        let anchors: Vec<String> = (2..=3).map(|n| page_url(ROOT, n)).collect();
        let browser = FakeCatalogBrowser::new()
            .with_listing(ROOT, listing(100, true, &anchors, &["/p/1"]))
            .with_listing(&page_url(ROOT, 1), listing(100, true, &anchors, &["/p/1", "/p/2"]))
            .with_listing(&page_url(ROOT, 2), listing(100, true, &anchors, &["/p/3"]))
            .with_listing(&page_url(ROOT, 3), listing(100, true, &anchors, &["/p/4", "/p/1"]));

        let collection = LinkCollector::new(&browser, settings()).collect_links(ROOT).await;

        assert_eq!(collection.links.len(), 4);
        assert!(collection.failures.is_empty());
        let visits = browser.listing_visits();
        for n in 1..=3 {
            assert!(visits.contains(&page_url(ROOT, n)), "page {n} not visited");
        }
        assert!(!visits.contains(&page_url(ROOT, 4)));
    }

    #[tokio::test]
    async fn test_failed_page_is_skipped() {
        let anchors = vec![page_url(ROOT, 2)];
        let browser = FakeCatalogBrowser::new()
            .with_listing(ROOT, listing(40, true, &anchors, &["/p/1"]))
            .with_listing(&page_url(ROOT, 1), listing(40, true, &anchors, &["/p/1"]));

        let collection = LinkCollector::new(&browser, settings()).collect_links(ROOT).await;

        assert_eq!(collection.links.len(), 1);
        assert!(!collection.failures.is_empty());
        assert!(collection.failures.iter().all(PipelineError::is_recoverable));
    }

    #[tokio::test]
    async fn test_failed_root_yields_empty_collection() {
        let browser = FakeCatalogBrowser::new();
        let collection = LinkCollector::new(&browser, settings()).collect_links(ROOT).await;
        assert!(collection.links.is_empty());
        assert_eq!(collection.failures.len(), 1);
    }
}
