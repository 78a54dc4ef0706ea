//! Catalog Harvester - product catalog ingestion
//!
//! Enumerates product links of e-commerce catalogs, extracts attributes from
//! product descriptions, specification tables and images, consolidates them
//! into a fixed schema and persists the result to CSV and a searchable
//! SQLite store.

// Module declarations
pub mod application;
pub mod cli;
pub mod domain;
pub mod infrastructure;

#[cfg(test)]
pub mod test_utils;
