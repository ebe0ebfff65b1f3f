//! Content summarization: attach a short text surrogate to every file.

use async_trait::async_trait;
use tracing::warn;

use crate::error::PipelineError;
use crate::graph::FileItem;

/// External OCR collaborator. Used only for image MIME types; everything
/// else gets the name+link fallback.
#[async_trait]
pub trait TextExtractor: Send + Sync {
    async fn extract_text_from_image(&self, download_url: &str)
        -> Result<String, PipelineError>;
}

/// Extractor that performs no OCR, so every item ends up with the
/// name+link fallback surrogate.
pub struct NoExtraction;

#[async_trait]
impl TextExtractor for NoExtraction {
    async fn extract_text_from_image(
        &self,
        _download_url: &str,
    ) -> Result<String, PipelineError> {
        Err(PipelineError::InvalidInput(
            "text extraction not configured".into(),
        ))
    }
}

/// Attach a surrogate to every item in place. Annotates only: no item is
/// removed, and no surrogate is left unset.
pub async fn summarize<E: TextExtractor + ?Sized>(extractor: &E, items: &mut [FileItem]) {
    for item in items.iter_mut() {
        let is_image = item
            .mime_type()
            .map(|mime| mime.contains("image"))
            .unwrap_or(false);
        let surrogate = match (is_image, item.download_url.clone()) {
            (true, Some(url)) => match extractor.extract_text_from_image(&url).await {
                Ok(text) => text,
                Err(err) => {
                    warn!(item = %item.id, error = %err, "image text extraction failed");
                    item.fallback_surrogate()
                }
            },
            _ => item.fallback_surrogate(),
        };
        item.extracted_text = Some(surrogate);
    }
}
