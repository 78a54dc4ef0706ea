//! Infrastructure layer for configuration, logging, HTTP and storage
//!
//! Concrete implementations of the collaborator traits declared in the
//! domain: the HTTP catalog browser, the visual question answering client,
//! the image downloader, the CSV record set and the SQLite store.

pub mod catalog_browser;
pub mod config;
pub mod csv_record_set;
pub mod database_connection;
pub mod http_client;
pub mod image_downloader;
pub mod logging;
pub mod parsing;
pub mod sqlite_catalog_store;
pub mod visual_qa_client;

// Re-export commonly used items
pub use catalog_browser::HttpCatalogBrowser;
pub use config::{ConfigManager, PipelineConfig};
pub use csv_record_set::CsvRecordSet;
pub use database_connection::DatabaseConnection;
pub use http_client::{HttpClient, HttpClientConfig};
pub use image_downloader::ImageDownloader;
pub use logging::{get_log_directory, init_logging, init_logging_with_config};
pub use parsing::{ListingPageParser, ParsingConfig, ProductPageParser};
pub use sqlite_catalog_store::SqliteCatalogStore;
pub use visual_qa_client::HttpVisualQa;
