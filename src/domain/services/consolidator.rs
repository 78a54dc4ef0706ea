//! Consolidation of raw attribute maps into a canonical record
//!
//! The description, spec table and visual maps are merged into one source
//! map, material columns are derived from the design text, the product name
//! is cleaned, and fixed merge groups fold the source columns into the
//! published schema. Source columns outside every group are dropped.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::attributes::RawAttributeMap;
use crate::domain::listing::ProductLink;
use crate::domain::record::{CanonicalColumn, CanonicalRecord};

/// Separator between merged values.
pub const MERGE_SEPARATOR: &str = ", ";

/// A canonical column and the source attributes folded into it, in order.
#[derive(Debug, Clone, Copy)]
pub struct MergeGroup {
    pub destination: CanonicalColumn,
    pub sources: &'static [&'static str],
}

pub const MERGE_GROUPS: [MergeGroup; 10] = [
    MergeGroup {
        destination: CanonicalColumn::Neckline,
        sources: &["Neckline", "Shirt Neckline"],
    },
    MergeGroup {
        destination: CanonicalColumn::FabricType,
        sources: &["Fabric Type", "shirt material", "trouser material", "dupatta material"],
    },
    MergeGroup {
        destination: CanonicalColumn::Collection,
        sources: &["Collection", "Season", "Design", "Product Category", "Type", "Wear Type"],
    },
    MergeGroup {
        destination: CanonicalColumn::Shirt,
        sources: &[
            "Shirt Front",
            "Shirt Pattern",
            "Shirt Back",
            "Style Cut",
            "Shirt Length",
            "Shirt Daman",
            "Length",
        ],
    },
    MergeGroup {
        destination: CanonicalColumn::Trouser,
        sources: &["Trouser", "Trouser Pattern", "Trouser Length", "Trouser Style"],
    },
    MergeGroup {
        destination: CanonicalColumn::Dupatta,
        sources: &["Dupatta Pattern"],
    },
    MergeGroup {
        destination: CanonicalColumn::Color,
        sources: &["Color", "Shirt color", "Trouser Color", "Dupatta Color"],
    },
    MergeGroup {
        destination: CanonicalColumn::Sleeves,
        sources: &["Sleeves", "Sleeves Pattern", "Shirt Sleeves"],
    },
    MergeGroup {
        destination: CanonicalColumn::Embellishment,
        sources: &["Embellishment"],
    },
    MergeGroup {
        destination: CanonicalColumn::Size,
        sources: &["Size"],
    },
];

const DESIGN: &str = "Design";
const PRODUCT_CATEGORY: &str = "Product Category";
const COLOR: &str = "Color";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));
static PIECE_SUFFIX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d*)pc\b").expect("valid piece regex"));

/// Identity fields read from the product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductIdentity {
    pub link: ProductLink,
    pub price: String,
    pub code: String,
    pub name: String,
    pub description_raw: Option<String>,
}

/// Merge raw maps in order into one lowercase source map.
///
/// A label present in several maps keeps each distinct value once, joined by
/// `", "` in map order.
pub fn merge_raw_maps(raw_maps: &[RawAttributeMap]) -> RawAttributeMap {
    let mut merged = RawAttributeMap::new();
    for map in raw_maps {
        for (name, value) in map.iter() {
            let value = value.map(|v| v.trim().to_lowercase()).filter(|v| !v.is_empty());
            let combined = match (merged.get(name), value) {
                (Some(existing), Some(value)) => {
                    if existing.split(MERGE_SEPARATOR).any(|part| part == value) {
                        Some(existing.to_string())
                    } else {
                        Some(format!("{existing}{MERGE_SEPARATOR}{value}"))
                    }
                }
                (Some(existing), None) => Some(existing.to_string()),
                (None, value) => value,
            };
            merged.insert(name, combined);
        }
    }
    merged
}

/// Fold present sources into one value, skipping absent ones.
pub fn merge_group(attributes: &RawAttributeMap, sources: &[&str]) -> Option<String> {
    let present: Vec<&str> = sources
        .iter()
        .filter_map(|source| attributes.get(source))
        .filter(|value| !value.trim().is_empty())
        .collect();
    (!present.is_empty()).then(|| present.join(MERGE_SEPARATOR))
}

/// Split the design text around "with" into per-garment materials.
///
/// `"lawn shirt with cotton trouser and chiffon dupatta"` gives
/// `shirt material = "lawn"`, `trouser material` and `dupatta material` both
/// `"cotton and chiffon"`.
pub fn derive_materials(attributes: &mut RawAttributeMap) {
    let Some(design) = attributes.get(DESIGN).map(str::to_string) else {
        return;
    };

    let spaced = design.replace("with", " with ");
    let mut parts = spaced.split(" with ");
    let shirt = parts.next().map(|p| collapse(&p.replace("shirt", ""))).unwrap_or_default();
    let remainder = parts.collect::<Vec<_>>().join(" ");

    if !shirt.is_empty() {
        attributes.set("shirt material", shirt);
    }
    if remainder.contains("trouser") {
        let trouser = collapse(&remainder.replace("trouser", "").replace("dupatta", ""));
        if !trouser.is_empty() {
            attributes.set("trouser material", trouser);
        }
    }
    if remainder.contains("dupatta") {
        let dupatta = collapse(&remainder.replace("dupatta", "").replace("trouser", ""));
        if !dupatta.is_empty() {
            attributes.set("dupatta material", dupatta);
        }
    }
}

/// Remove the color and the category words from a product name.
pub fn clean_product_name(name: &str, color: Option<&str>, category: Option<&str>) -> String {
    let mut cleaned = name.to_lowercase();
    if let Some(color) = color.map(str::trim).filter(|c| !c.is_empty()) {
        cleaned = cleaned.replace(color, "");
    }
    if let Some(category) = category {
        for token in category.split_whitespace() {
            cleaned = cleaned.replace(token, "");
        }
    }
    let cleaned = collapse(&cleaned);
    collapse(&PIECE_SUFFIX.replace_all(&cleaned, "$1"))
}

fn collapse(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// Build the canonical record of one product from its raw maps, given in
/// extractor order (description, spec table, visual).
pub fn consolidate(identity: ProductIdentity, raw_maps: &[RawAttributeMap]) -> CanonicalRecord {
    let mut sources = merge_raw_maps(raw_maps);
    derive_materials(&mut sources);

    let mut record = CanonicalRecord::new(identity.link, &identity.price, &identity.code, "");
    record.name = clean_product_name(&identity.name, sources.get(COLOR), sources.get(PRODUCT_CATEGORY));
    record.description_raw = identity.description_raw;

    for group in MERGE_GROUPS {
        if let Some(value) = merge_group(&sources, group.sources) {
            record.set(group.destination, value);
        }
    }

    record.source_attributes = sources;
    record
}
