//! HTML parsing of catalog listing pages and product detail pages
//!
//! Each field has an ordered list of CSS selectors; the first selector that
//! yields a non-empty result wins.

pub mod config;
pub mod listing_page_parser;
pub mod product_page_parser;

pub use config::{ListingSelectors, ParsingConfig, ProductSelectors};
pub use listing_page_parser::ListingPageParser;
pub use product_page_parser::ProductPageParser;

use anyhow::Result;
use scraper::{ElementRef, Html, Selector};
use tracing::{debug, warn};
use url::Url;

/// Compile selector strings, skipping invalid ones.
///
/// Fails only when none of the strings compiles.
pub(crate) fn compile_selectors(selector_strings: &[String]) -> Result<Vec<Selector>> {
    let mut selectors = Vec::new();
    let mut errors = Vec::new();

    for selector_str in selector_strings {
        match Selector::parse(selector_str) {
            Ok(selector) => selectors.push(selector),
            Err(e) => {
                warn!("Failed to compile selector '{}': {}", selector_str, e);
                errors.push(format!("'{}': {}", selector_str, e));
            }
        }
    }

    if selectors.is_empty() && !selector_strings.is_empty() {
        return Err(anyhow::anyhow!(
            "No valid selectors compiled from {} attempts. Errors: {}",
            selector_strings.len(),
            errors.join(", ")
        ));
    }

    Ok(selectors)
}

/// Visible text of an element with whitespace runs collapsed.
pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().flat_map(str::split_whitespace).collect::<Vec<_>>().join(" ")
}

/// Text of an element keeping line breaks, for free-text blocks.
pub(crate) fn element_block_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::lines)
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// First element matched by the selectors, tried in order.
pub(crate) fn first_element<'a>(html: &'a Html, selectors: &[Selector]) -> Option<ElementRef<'a>> {
    selectors.iter().find_map(|selector| html.select(selector).next())
}

/// First non-empty text found by the selectors, tried in order.
pub(crate) fn first_text(html: &Html, field: &str, selectors: &[Selector]) -> Option<String> {
    for (i, selector) in selectors.iter().enumerate() {
        if let Some(element) = html.select(selector).next() {
            let text = element_text(element);
            if !text.is_empty() {
                debug!("Extracted {} using selector {}", field, i);
                return Some(text);
            }
        }
    }
    None
}

/// Attribute values of every element matched by the first productive selector.
pub(crate) fn all_attributes(html: &Html, selectors: &[Selector], attribute: &str) -> Vec<String> {
    for selector in selectors {
        let values: Vec<String> = html
            .select(selector)
            .filter_map(|element| element.value().attr(attribute))
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .collect();
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}

/// Resolve an href against the page it was found on.
pub(crate) fn resolve_url(base: Option<&Url>, href: &str) -> String {
    match base.and_then(|base| base.join(href).ok()) {
        Some(url) => url.to_string(),
        None => href.to_string(),
    }
}
