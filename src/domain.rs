//! Domain module - entities, collaborator interfaces and core services
//!
//! Nothing in here performs I/O directly; pages, images, inference and
//! storage are reached through the traits in [`collaborators`].

pub mod attributes;
pub mod collaborators;
pub mod errors;
pub mod listing;
pub mod record;
pub mod services;

pub use attributes::{AttributeEntry, RawAttributeMap};
pub use collaborators::{CatalogBrowser, ImageBatch, ImageStore, RankedLabel, RecordArchive, RecordSink, VisualQa};
pub use errors::{PipelineError, PipelineResult};
pub use listing::{Listing, ListingPage, ProductLink, ProductPage};
pub use record::{CanonicalColumn, CanonicalRecord, SearchHit};
