//! Domain services
//!
//! The pure stages of a harvest: link enumeration, deduplication, the three
//! attribute extractors, consolidation and keyword normalization.

pub mod consolidator;
pub mod deduplicator;
pub mod description_parser;
pub mod keyword_normalizer;
pub mod link_collector;
pub mod spec_table_parser;
pub mod visual_fuser;

pub use consolidator::{consolidate, ProductIdentity};
pub use deduplicator::filter_new;
pub use description_parser::{parse_description, DescriptionParser};
pub use keyword_normalizer::{clean_cell, extract_keywords, normalize_cell, normalize_record};
pub use link_collector::{LinkCollection, LinkCollector, LinkCollectorSettings};
pub use spec_table_parser::parse_spec_table;
pub use visual_fuser::{VisualAttributeFuser, VisualInference, VisualQuestionCatalog};
