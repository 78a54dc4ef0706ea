//! Canonical product records and search results

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use super::attributes::RawAttributeMap;
use super::listing::ProductLink;

/// Published attribute columns of a canonical record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CanonicalColumn {
    #[serde(rename = "Fabric Type")]
    FabricType,
    Neckline,
    Collection,
    Trouser,
    Sleeves,
    Embellishment,
    Color,
    Size,
    Shirt,
    Dupatta,
}

impl CanonicalColumn {
    /// Every canonical column, in persisted column order.
    pub const ALL: [Self; 10] = [
        Self::FabricType,
        Self::Neckline,
        Self::Collection,
        Self::Trouser,
        Self::Sleeves,
        Self::Embellishment,
        Self::Color,
        Self::Size,
        Self::Shirt,
        Self::Dupatta,
    ];

    /// Human-readable label, shared with the raw attribute namespace.
    pub fn label(self) -> &'static str {
        match self {
            Self::FabricType => "Fabric Type",
            Self::Neckline => "Neckline",
            Self::Collection => "Collection",
            Self::Trouser => "Trouser",
            Self::Sleeves => "Sleeves",
            Self::Embellishment => "Embellishment",
            Self::Color => "Color",
            Self::Size => "Size",
            Self::Shirt => "Shirt",
            Self::Dupatta => "Dupatta",
        }
    }

    /// Column name in the SQL store.
    pub fn sql_name(self) -> &'static str {
        match self {
            Self::FabricType => "fabric_type",
            Self::Neckline => "neckline",
            Self::Collection => "collection",
            Self::Trouser => "trouser",
            Self::Sleeves => "sleeves",
            Self::Embellishment => "embellishment",
            Self::Color => "color",
            Self::Size => "size",
            Self::Shirt => "shirt",
            Self::Dupatta => "dupatta",
        }
    }

    /// Columns covered by the full-text index. Size codes are not searchable text.
    pub fn is_fulltext(self) -> bool {
        !matches!(self, Self::Size)
    }

    /// Columns whose values are descriptive phrases rather than codes.
    pub fn is_descriptive(self) -> bool {
        !matches!(self, Self::Size)
    }
}

impl fmt::Display for CanonicalColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The consolidated, normalized record of one product.
///
/// Attribute cells hold space-separated, deduplicated keyword tokens; a
/// column with no tokens is simply not in `attributes`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalRecord {
    pub link: ProductLink,
    pub price: String,
    pub code: String,
    pub name: String,
    pub description_raw: Option<String>,
    pub attributes: BTreeMap<CanonicalColumn, String>,
    /// Merged source attributes the record was built from.
    #[serde(default)]
    pub source_attributes: RawAttributeMap,
}

impl CanonicalRecord {
    pub fn new(link: ProductLink, price: &str, code: &str, name: &str) -> Self {
        Self {
            link,
            price: price.trim().to_string(),
            code: code.trim().to_uppercase(),
            name: name.trim().to_string(),
            description_raw: None,
            attributes: BTreeMap::new(),
            source_attributes: RawAttributeMap::new(),
        }
    }

    pub fn get(&self, column: CanonicalColumn) -> Option<&str> {
        self.attributes.get(&column).map(String::as_str)
    }

    /// Store a cell; a blank value removes the column.
    pub fn set(&mut self, column: CanonicalColumn, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            self.attributes.remove(&column);
        } else {
            self.attributes.insert(column, value);
        }
    }
}

/// One ranked answer of a full-text query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub link: String,
    pub code: String,
    pub relevance: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_is_uppercased() {
        let record = CanonicalRecord::new(ProductLink::new("https://shop.test/p/1"), "PKR 3,990", "jlawn-24-101", "Lawn Suit");
        assert_eq!(record.code, "JLAWN-24-101");
    }

    #[test]
    fn test_blank_cell_removes_column() {
        let mut record = CanonicalRecord::new(ProductLink::new("https://shop.test/p/1"), "", "A1", "");
        record.set(CanonicalColumn::Color, "red");
        assert_eq!(record.get(CanonicalColumn::Color), Some("red"));
        record.set(CanonicalColumn::Color, "  ");
        assert_eq!(record.get(CanonicalColumn::Color), None);
    }

    #[test]
    fn test_size_is_not_fulltext() {
        let indexed: Vec<_> = CanonicalColumn::ALL.into_iter().filter(|c| c.is_fulltext()).collect();
        assert_eq!(indexed.len(), 9);
        assert!(!indexed.contains(&CanonicalColumn::Size));
    }
}
