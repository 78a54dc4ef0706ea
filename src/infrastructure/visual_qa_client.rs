//! HTTP client for the visual question answering service
//!
//! The service takes the raw image as the request body and the question as
//! the `question` query parameter, and answers with a JSON array of
//! `{"label": ..., "score": ...}` candidates.

use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

use crate::domain::collaborators::{RankedLabel, VisualQa};
use crate::domain::errors::{PipelineError, PipelineResult};
use crate::infrastructure::http_client::HttpClient;

pub struct HttpVisualQa {
    http_client: HttpClient,
    endpoint: String,
}

impl HttpVisualQa {
    pub fn new(http_client: HttpClient, endpoint: impl Into<String>) -> Self {
        Self {
            http_client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl VisualQa for HttpVisualQa {
    async fn answer(&self, image: &Path, question: &str) -> PipelineResult<Vec<RankedLabel>> {
        let bytes = tokio::fs::read(image)
            .await
            .map_err(|e| PipelineError::inference_failure(question, format!("cannot read {}: {e}", image.display())))?;

        let labels: Vec<RankedLabel> = self
            .http_client
            .post_bytes_for_json(&self.endpoint, &[("question", question)], bytes)
            .await
            .map_err(|e| PipelineError::inference_failure(question, e))?;

        debug!("VQA '{}' on {}: {} labels", question, image.display(), labels.len());
        Ok(labels)
    }
}
