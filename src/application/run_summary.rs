//! Per-run accounting

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::errors::PipelineError;

/// Pipeline stage an item failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    LinkCollection,
    ProductPage,
    Images,
    VisualInference,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::LinkCollection => "link_collection",
            Self::ProductPage => "product_page",
            Self::Images => "images",
            Self::VisualInference => "visual_inference",
        };
        f.write_str(name)
    }
}

/// A page or product that was skipped, or partly degraded.
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub link: String,
    pub stage: Stage,
    #[serde(serialize_with = "serialize_error")]
    pub error: PipelineError,
}

fn serialize_error<S: serde::Serializer>(error: &PipelineError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&error.to_string())
}

impl ItemFailure {
    pub fn new(link: impl Into<String>, stage: Stage, error: PipelineError) -> Self {
        Self {
            link: link.into(),
            stage,
            error,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub catalogs: usize,
    pub pages_visited: usize,
    pub links_collected: usize,
    pub new_links: usize,
    pub records_harvested: usize,
    pub rows_upserted: u64,
    pub failures: Vec<ItemFailure>,
}

impl RunSummary {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            catalogs: 0,
            pages_visited: 0,
            links_collected: 0,
            new_links: 0,
            records_harvested: 0,
            rows_upserted: 0,
            failures: Vec::new(),
        }
    }

    pub fn record_failure(&mut self, link: impl Into<String>, stage: Stage, error: PipelineError) {
        self.failures.push(ItemFailure::new(link, stage, error));
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn elapsed(&self) -> chrono::Duration {
        self.finished_at.unwrap_or_else(Utc::now) - self.started_at
    }

    /// Failure counts keyed by `stage/kind`.
    pub fn failure_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for failure in &self.failures {
            *counts
                .entry(format!("{}/{}", failure.stage, failure.error.kind()))
                .or_insert(0) += 1;
        }
        counts
    }

    pub fn log(&self) {
        info!(
            "📊 Run {} finished in {}s: {} catalog(s), {} page(s), {} links, {} new, {} harvested, {} rows upserted",
            self.run_id,
            self.elapsed().num_seconds(),
            self.catalogs,
            self.pages_visited,
            self.links_collected,
            self.new_links,
            self.records_harvested,
            self.rows_upserted
        );
        for (kind, count) in self.failure_counts() {
            warn!("⚠️ {} x {}", count, kind);
        }
        for failure in &self.failures {
            tracing::debug!("{} [{}]: {}", failure.link, failure.stage, failure.error);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_failure_counts_group_by_stage_and_kind() {
        let mut summary = RunSummary::start();
        summary.record_failure(
            "https://shop.test/p/1",
            Stage::ProductPage,
            PipelineError::fetch_timeout("https://shop.test/p/1", Duration::from_secs(1)),
        );
        summary.record_failure(
            "https://shop.test/p/2",
            Stage::ProductPage,
            PipelineError::fetch_timeout("https://shop.test/p/2", Duration::from_secs(1)),
        );
        summary.record_failure(
            "https://shop.test/p/2",
            Stage::VisualInference,
            PipelineError::inference_failure("describe the shirt color", "offline"),
        );

        let counts = summary.failure_counts();
        assert_eq!(counts.get("product_page/fetch_timeout"), Some(&2));
        assert_eq!(counts.get("visual_inference/inference_failure"), Some(&1));
    }

    #[test]
    fn test_summary_serializes_errors_as_text() {
        let mut summary = RunSummary::start();
        summary.record_failure("https://shop.test/p/1", Stage::Images, PipelineError::image_download("x", "404"));
        summary.finish();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["failures"][0]["stage"], "images");
        assert_eq!(json["failures"][0]["error"], "Image download from x failed: 404");
        assert!(summary.finished_at.is_some());
    }
}
