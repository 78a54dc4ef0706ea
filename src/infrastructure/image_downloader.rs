//! Product image download
//!
//! Images are fetched at a fixed rendition size and stored as
//! `{code}_{n}.jpg`, `n` counting from 1 in page order.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::domain::collaborators::{ImageBatch, ImageStore};
use crate::domain::errors::PipelineError;
use crate::infrastructure::config::ImageConfig;
use crate::infrastructure::http_client::HttpClient;

/// File name of the `index`-th (0-based) image of a product.
pub fn image_file_name(code: &str, index: usize) -> String {
    format!("{}_{}.jpg", code, index + 1)
}

/// Source URL with its `width` and `height` query parameters set to the
/// configured rendition. Other parameters are kept in order.
pub fn rendition_url(source: &str, image: &ImageConfig) -> String {
    let Ok(mut url) = Url::parse(source) else {
        return source.to_string();
    };
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(key, _)| key != "width" && key != "height")
        .map(|(key, value)| (key.into_owned(), value.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("width", &image.width)
        .append_pair("height", &image.height);
    url.to_string()
}

pub struct ImageDownloader {
    http_client: HttpClient,
    save_dir: PathBuf,
    rendition: ImageConfig,
    wait: Duration,
}

impl ImageDownloader {
    pub fn new(http_client: HttpClient, save_dir: impl Into<PathBuf>, rendition: ImageConfig, wait: Duration) -> Self {
        Self {
            http_client,
            save_dir: save_dir.into(),
            rendition,
            wait,
        }
    }

    async fn download_one(&self, source: &str, target: &Path) -> Result<(), PipelineError> {
        let url = rendition_url(source, &self.rendition);
        let bytes = match tokio::time::timeout(self.wait, self.http_client.fetch_bytes(&url)).await {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => return Err(PipelineError::image_download(&url, e)),
            Err(_) => {
                return Err(PipelineError::image_download(
                    &url,
                    format!("no response within {}s", self.wait.as_secs()),
                ))
            }
        };
        tokio::fs::write(target, &bytes)
            .await
            .map_err(|e| PipelineError::image_download(&url, format!("cannot write {}: {e}", target.display())))?;
        debug!("Saved {} ({} bytes)", target.display(), bytes.len());
        Ok(())
    }
}

#[async_trait]
impl ImageStore for ImageDownloader {
    async fn store_all(&self, code: &str, sources: &[String]) -> ImageBatch {
        let mut batch = ImageBatch::default();
        if sources.is_empty() {
            return batch;
        }

        if let Err(e) = tokio::fs::create_dir_all(&self.save_dir).await {
            warn!("⚠️ Image directory {:?} unavailable: {}", self.save_dir, e);
            batch.failures.extend(
                sources
                    .iter()
                    .map(|source| PipelineError::image_download(source, format!("image directory unavailable: {e}"))),
            );
            return batch;
        }

        for (index, source) in sources.iter().enumerate() {
            let target = self.save_dir.join(image_file_name(code, index));
            match self.download_one(source, &target).await {
                Ok(()) => batch.saved.push(target),
                Err(e) => {
                    warn!("⚠️ Image {} of {} skipped: {}", index + 1, code, e);
                    batch.failures.push(e);
                }
            }
        }

        info!("🖼️ {}: {}/{} images stored", code, batch.saved.len(), sources.len());
        batch
    }
}
