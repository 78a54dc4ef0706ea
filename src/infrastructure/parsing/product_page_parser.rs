//! Product detail page parser

use anyhow::Result;
use scraper::{Html, Selector};
use tracing::debug;
use url::Url;

use super::config::{ParsingConfig, ProductSelectors};
use super::{all_attributes, compile_selectors, element_block_text, element_text, first_element, first_text, resolve_url};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::listing::ProductPage;

pub struct ProductPageParser {
    price_selectors: Vec<Selector>,
    title_selectors: Vec<Selector>,
    description_selectors: Vec<Selector>,
    spec_row_selectors: Vec<Selector>,
    spec_label_selectors: Vec<Selector>,
    spec_value_selectors: Vec<Selector>,
    image_selectors: Vec<Selector>,
}

impl ProductPageParser {
    /// Create a new product parser with default selectors
    pub fn new() -> Result<Self> {
        Self::with_config(&ParsingConfig::default().product_selectors)
    }

    pub fn with_config(selectors: &ProductSelectors) -> Result<Self> {
        Ok(Self {
            price_selectors: compile_selectors(&selectors.price)?,
            title_selectors: compile_selectors(&selectors.title)?,
            description_selectors: compile_selectors(&selectors.description)?,
            spec_row_selectors: compile_selectors(&selectors.spec_row)?,
            spec_label_selectors: compile_selectors(&selectors.spec_label)?,
            spec_value_selectors: compile_selectors(&selectors.spec_value)?,
            image_selectors: compile_selectors(&selectors.image)?,
        })
    }

    /// Read price, title, description, spec rows and image sources.
    ///
    /// Price and title are required; everything else may be missing.
    pub fn parse(&self, html: &str, page_url: &str) -> PipelineResult<ProductPage> {
        let document = Html::parse_document(html);
        let base = Url::parse(page_url).ok();

        let price = first_text(&document, "price", &self.price_selectors)
            .ok_or_else(|| PipelineError::element_missing(page_url, ".price"))?;
        let title = first_text(&document, "title", &self.title_selectors)
            .ok_or_else(|| PipelineError::element_missing(page_url, ".base"))?;

        let description = first_element(&document, &self.description_selectors)
            .map(element_block_text)
            .filter(|text| !text.is_empty());

        let spec_rows = self.extract_spec_rows(&document);

        let image_sources = all_attributes(&document, &self.image_selectors, "src")
            .iter()
            .map(|src| resolve_url(base.as_ref(), src))
            .collect::<Vec<_>>();

        debug!(
            "Product {}: {} spec rows, {} images, description={}",
            page_url,
            spec_rows.len(),
            image_sources.len(),
            description.is_some()
        );

        Ok(ProductPage {
            price,
            title,
            description,
            spec_rows,
            image_sources,
        })
    }

    /// (label, value) pairs of the specification table, in page order.
    fn extract_spec_rows(&self, document: &Html) -> Vec<(String, String)> {
        for row_selector in &self.spec_row_selectors {
            let rows: Vec<(String, String)> = document
                .select(row_selector)
                .filter_map(|row| {
                    let label = self
                        .spec_label_selectors
                        .iter()
                        .find_map(|s| row.select(s).next())
                        .map(element_text)
                        .unwrap_or_default();
                    let value = self
                        .spec_value_selectors
                        .iter()
                        .find_map(|s| row.select(s).next())
                        .map(element_text)?;
                    Some((label, value))
                })
                .collect();
            if !rows.is_empty() {
                return rows;
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRODUCT: &str = r#"
        <html><body>
          <h1 class="page-title"><span class="base">Printed Lawn Suit | JL-24-101</span></h1>
          <div class="product-info-main"><span class="price">PKR 3,990</span></div>
          <div itemprop="description"><div class="value">
            Fabric Type: Lawn<br>
            Neckline: Round
          </div></div>
          <table id="product-attribute-specs-table"><tbody>
            <tr><th>Color</th><td>Red</td></tr>
            <tr><th>Size</th><td> M </td></tr>
            <tr><th>Noise</th><td>drop-me</td></tr>
          </tbody></table>
          <div class="MagicToolboxSelectorsContainer">
            <a><img src="https://cdn.shop.test/jl101_1.jpg?width=100&amp;height=78"></a>
            <a><img src="/media/jl101_2.jpg"></a>
          </div>
        </body></html>"#;

    #[test]
    fn test_product_page_blocks() {
        let page = ProductPageParser::new()
            .unwrap()
            .parse(PRODUCT, "https://shop.test/lawn-suit-101.html")
            .unwrap();

        assert_eq!(page.price, "PKR 3,990");
        assert_eq!(page.title, "Printed Lawn Suit | JL-24-101");
        assert_eq!(page.description.as_deref(), Some("Fabric Type: Lawn\nNeckline: Round"));
        assert_eq!(
            page.spec_rows,
            vec![
                ("Color".to_string(), "Red".to_string()),
                ("Size".to_string(), "M".to_string()),
                ("Noise".to_string(), "drop-me".to_string()),
            ]
        );
        assert_eq!(
            page.image_sources,
            vec![
                "https://cdn.shop.test/jl101_1.jpg?width=100&height=78",
                "https://shop.test/media/jl101_2.jpg"
            ]
        );
    }

    #[test]
    fn test_missing_price_is_element_missing() {
        let html = r#"<span class="base">Kurti | K1</span>"#;
        let err = ProductPageParser::new().unwrap().parse(html, "https://shop.test/k").unwrap_err();
        assert!(matches!(err, PipelineError::ElementMissing { ref element, .. } if element == ".price"));
    }

    #[test]
    fn test_optional_blocks_may_be_absent() {
        let html = r#"<span class="price">PKR 1</span><span class="base">Kurti | K1</span>"#;
        let page = ProductPageParser::new().unwrap().parse(html, "https://shop.test/k").unwrap();
        assert!(page.description.is_none());
        assert!(page.spec_rows.is_empty());
        assert!(page.image_sources.is_empty());
    }
}
