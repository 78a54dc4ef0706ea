//! Configuration infrastructure
//!
//! The pipeline reads one JSON document. Catalog URLs, file locations and
//! the database target are required; everything else has a default.
//!
//! Lookup order for the document:
//! 1. Path given on the command line
//! 2. `./config.json`
//! 3. `<user config dir>/catalog-harvester/config.json`

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tracing::{info, warn};

use crate::domain::errors::{PipelineError, PipelineResult};
use crate::domain::services::link_collector::LinkCollectorSettings;
use crate::domain::services::visual_fuser::VisualQuestionCatalog;

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Catalog URLs to harvest
    pub main_pages: Vec<String>,

    /// Persisted record set
    pub csv_file_path: PathBuf,

    /// Batch file rewritten with each run's new records
    pub new_csv_file_path: PathBuf,

    pub image_save_dir: PathBuf,

    pub db_host: String,
    pub db_user: String,
    pub db_password: String,

    /// SQLite database file or `sqlite:` URL
    pub db_name: String,

    pub table_name: String,

    /// Products per listing page
    #[serde(default = "defaults::page_size")]
    pub page_size: u32,

    #[serde(default)]
    pub timeouts: TimeoutConfig,

    #[serde(default)]
    pub image: ImageConfig,

    #[serde(default)]
    pub vision: VisionConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounded waits, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutConfig {
    pub listing_wait_secs: u64,
    pub pagination_wait_secs: u64,
    /// Hard limit for one product, extraction through normalization
    pub product_wait_secs: u64,
    pub inference_wait_secs: u64,
    pub image_wait_secs: u64,
}

/// Rendition requested from the image CDN
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    pub width: String,
    pub height: String,
}

/// Visual question answering service
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub endpoint: String,
    /// Ranked answers kept per question
    pub top_k: usize,
    pub questions: VisualQuestionCatalog,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub timeout_secs: u64,
}

/// Logging configuration settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "error", "warn", "info", "debug", "trace"
    pub level: String,

    /// Enable JSON formatted logs
    pub json_format: bool,

    pub console_output: bool,

    pub file_output: bool,

    /// Directory for log files; `./logs` when unset
    pub log_dir: Option<PathBuf>,

    /// Roll the log file over daily instead of writing one file
    pub daily_rotation: bool,

    /// Number of rotated log files to keep
    pub max_files: u32,

    /// Delete surplus rotated files on startup
    pub auto_cleanup_logs: bool,

    /// Module-specific log level filters (e.g., "sqlx": "warn")
    pub module_filters: HashMap<String, String>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            listing_wait_secs: defaults::LISTING_WAIT_SECS,
            pagination_wait_secs: defaults::PAGINATION_WAIT_SECS,
            product_wait_secs: defaults::PRODUCT_WAIT_SECS,
            inference_wait_secs: defaults::INFERENCE_WAIT_SECS,
            image_wait_secs: defaults::IMAGE_WAIT_SECS,
        }
    }
}

impl TimeoutConfig {
    pub fn listing_wait(&self) -> Duration {
        Duration::from_secs(self.listing_wait_secs)
    }

    pub fn pagination_wait(&self) -> Duration {
        Duration::from_secs(self.pagination_wait_secs)
    }

    pub fn product_wait(&self) -> Duration {
        Duration::from_secs(self.product_wait_secs)
    }

    pub fn inference_wait(&self) -> Duration {
        Duration::from_secs(self.inference_wait_secs)
    }

    pub fn image_wait(&self) -> Duration {
        Duration::from_secs(self.image_wait_secs)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            width: defaults::IMAGE_WIDTH.to_string(),
            height: defaults::IMAGE_HEIGHT.to_string(),
        }
    }
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::VISION_ENDPOINT.to_string(),
            top_k: defaults::VISION_TOP_K,
            questions: VisualQuestionCatalog::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::USER_AGENT.to_string(),
            timeout_secs: defaults::REQUEST_TIMEOUT_SECONDS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::LOG_LEVEL.to_string(),
            json_format: false,
            console_output: true,
            file_output: true,
            log_dir: None,
            daily_rotation: false,
            max_files: defaults::LOG_MAX_FILES,
            auto_cleanup_logs: true,
            module_filters: {
                let mut filters = HashMap::new();
                filters.insert("sqlx".to_string(), "warn".to_string());
                filters.insert("reqwest".to_string(), "info".to_string());
                filters.insert("hyper".to_string(), "warn".to_string());
                filters.insert("html5ever".to_string(), "warn".to_string());
                filters
            },
        }
    }
}

impl PipelineConfig {
    /// Minimal configuration for a set of catalogs; paths are relative to
    /// the working directory.
    pub fn new(main_pages: Vec<String>) -> Self {
        Self {
            main_pages,
            csv_file_path: PathBuf::from("products.csv"),
            new_csv_file_path: PathBuf::from("new_products.csv"),
            image_save_dir: PathBuf::from("images"),
            db_host: String::new(),
            db_user: String::new(),
            db_password: String::new(),
            db_name: "catalog.db".to_string(),
            table_name: "products".to_string(),
            page_size: defaults::PAGE_SIZE,
            timeouts: TimeoutConfig::default(),
            image: ImageConfig::default(),
            vision: VisionConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
        }
    }

    /// Reject configurations the pipeline cannot run with.
    pub fn validate(&self) -> PipelineResult<()> {
        if self.main_pages.iter().all(|page| page.trim().is_empty()) {
            return Err(PipelineError::configuration("main_pages", "no catalog URL configured"));
        }
        for (field, path) in [
            ("csv_file_path", &self.csv_file_path),
            ("new_csv_file_path", &self.new_csv_file_path),
            ("image_save_dir", &self.image_save_dir),
        ] {
            if path.as_os_str().is_empty() {
                return Err(PipelineError::configuration(field, "path is empty"));
            }
        }
        if self.csv_file_path == self.new_csv_file_path {
            return Err(PipelineError::configuration(
                "new_csv_file_path",
                "must differ from csv_file_path",
            ));
        }
        if self.db_name.trim().is_empty() {
            return Err(PipelineError::configuration("db_name", "database name is empty"));
        }
        if !is_sql_identifier(&self.table_name) {
            return Err(PipelineError::configuration(
                "table_name",
                format!("'{}' is not a plain SQL identifier", self.table_name),
            ));
        }
        if self.page_size == 0 {
            return Err(PipelineError::configuration("page_size", "must be positive"));
        }
        if self.vision.top_k == 0 {
            return Err(PipelineError::configuration("vision.top_k", "must be positive"));
        }
        Ok(())
    }

    /// SQLite connection URL for `db_name`.
    pub fn database_url(&self) -> String {
        let name = self.db_name.trim();
        if name.starts_with("sqlite:") {
            name.to_string()
        } else {
            format!("sqlite:{name}")
        }
    }

    /// Server connection fields that are set but have no effect on SQLite.
    pub fn unused_database_fields(&self) -> Vec<&'static str> {
        [
            ("db_host", &self.db_host),
            ("db_user", &self.db_user),
            ("db_password", &self.db_password),
        ]
        .into_iter()
        .filter(|(_, value)| !value.trim().is_empty())
        .map(|(field, _)| field)
        .collect()
    }

    pub fn catalog_urls(&self) -> impl Iterator<Item = &str> {
        self.main_pages.iter().map(|page| page.trim()).filter(|page| !page.is_empty())
    }

    pub fn link_collector_settings(&self) -> LinkCollectorSettings {
        LinkCollectorSettings {
            page_size: self.page_size,
            listing_wait: self.timeouts.listing_wait(),
            pagination_wait: self.timeouts.pagination_wait(),
        }
    }
}

pub(crate) fn is_sql_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Configuration manager for loading and saving the pipeline document
pub struct ConfigManager {
    pub config_path: PathBuf,
}

impl ConfigManager {
    /// Get the application configuration directory
    pub fn get_config_dir() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get user config directory")?
            .join(defaults::APP_DIR_NAME);

        Ok(config_dir)
    }

    /// Manager for an explicit document path.
    pub fn with_path(config_path: impl Into<PathBuf>) -> Self {
        Self {
            config_path: config_path.into(),
        }
    }

    /// Resolve the document location: explicit path, then the working
    /// directory, then the user config directory.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Ok(Self::with_path(path));
        }

        let local = PathBuf::from(defaults::CONFIG_FILE_NAME);
        if local.exists() {
            return Ok(Self::with_path(local));
        }

        Ok(Self::with_path(Self::get_config_dir()?.join(defaults::CONFIG_FILE_NAME)))
    }

    /// Load and validate the configuration document.
    pub async fn load_config(&self) -> Result<PipelineConfig> {
        if !self.config_path.exists() {
            anyhow::bail!("Configuration file not found: {:?}", self.config_path);
        }

        let content = fs::read_to_string(&self.config_path)
            .await
            .with_context(|| format!("Failed to read configuration file {:?}", self.config_path))?;

        let config: PipelineConfig = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse configuration file {:?}", self.config_path))?;

        config.validate().context("Invalid configuration")?;

        let unused = config.unused_database_fields();
        if !unused.is_empty() {
            warn!("⚠️  {} set but unused by the SQLite store", unused.join(", "));
        }

        info!("Loaded configuration from: {:?}", self.config_path);
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_config(&self, config: &PipelineConfig) -> Result<()> {
        if let Some(parent) = self.config_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create config directory")?;
        }

        let content = serde_json::to_string_pretty(config).context("Failed to serialize configuration")?;

        fs::write(&self.config_path, content)
            .await
            .context("Failed to write configuration file")?;

        info!("Saved configuration to: {:?}", self.config_path);
        Ok(())
    }

    /// Get the configuration file path
    pub fn config_path(&self) -> &PathBuf {
        &self.config_path
    }
}

/// Default configuration values
pub mod defaults {
    pub const APP_DIR_NAME: &str = "catalog-harvester";

    pub const CONFIG_FILE_NAME: &str = "config.json";

    /// Products per listing page on the target catalogs
    pub const PAGE_SIZE: u32 = 36;

    pub const LISTING_WAIT_SECS: u64 = 30;
    pub const PAGINATION_WAIT_SECS: u64 = 60;
    pub const PRODUCT_WAIT_SECS: u64 = 120;
    pub const INFERENCE_WAIT_SECS: u64 = 60;
    pub const IMAGE_WAIT_SECS: u64 = 60;

    pub const IMAGE_WIDTH: &str = "1000";
    pub const IMAGE_HEIGHT: &str = "778.5";

    pub const VISION_ENDPOINT: &str = "http://127.0.0.1:8000/vqa";
    pub const VISION_TOP_K: usize = 5;

    pub const USER_AGENT: &str = "Mozilla/5.0 (compatible; catalog-harvester/0.1)";
    pub const REQUEST_TIMEOUT_SECONDS: u64 = 30;

    pub const LOG_LEVEL: &str = "info";
    pub const LOG_MAX_FILES: u32 = 7;

    /// Number of search results returned
    pub const SEARCH_LIMIT: u32 = 10;

    pub fn page_size() -> u32 {
        PAGE_SIZE
    }
}
