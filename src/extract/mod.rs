//! Content extraction strategies: verbatim text, PDF documents, images.

pub mod gemini;
pub mod http;
pub mod mistral;

use std::sync::Arc;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::Config;
use crate::domain::{DocumentPage, FileContent, Strategy};
use crate::error::{ExtractError, IngestError};
use crate::scan::ClassifiedFile;
use crate::utils::{decode_text, FileKind};

pub use gemini::GeminiVision;
pub use mistral::MistralOcr;

/// An optional backend, configured or not.
#[derive(Debug, Clone)]
pub enum Capability<T> {
    Available(T),
    Unavailable,
}

impl<T> Capability<T> {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available(_))
    }
}

/// Converts PDF bytes into page-wise markdown.
pub trait DocumentExtractor: Send + Sync {
    fn extract(
        &self,
        bytes: &[u8],
        cancel: &CancelToken,
    ) -> Result<Vec<DocumentPage>, ExtractError>;
}

/// Produces a natural-language description of an image.
pub trait ImageDescriber: Send + Sync {
    fn describe(
        &self,
        bytes: &[u8],
        media_type: &str,
        cancel: &CancelToken,
    ) -> Result<String, ExtractError>;
}

/// The set of extraction backends available to one ingestor.
#[derive(Clone)]
pub struct Extractors {
    documents: Capability<Arc<dyn DocumentExtractor>>,
    images: Capability<Arc<dyn ImageDescriber>>,
}

impl Extractors {
    pub fn new(
        documents: Capability<Arc<dyn DocumentExtractor>>,
        images: Capability<Arc<dyn ImageDescriber>>,
    ) -> Self {
        Self { documents, images }
    }

    /// Text-only extraction.
    pub fn text_only() -> Self {
        Self::new(Capability::Unavailable, Capability::Unavailable)
    }

    /// Enable each backend whose API key is configured.
    pub fn from_config(config: &Config) -> Result<Self, ExtractError> {
        let documents: Capability<Arc<dyn DocumentExtractor>> = match &config.document.api_key {
            Some(key) => {
                let backend = MistralOcr::new(&config.document, key.clone())?;
                Capability::Available(Arc::new(backend))
            }
            None => Capability::Unavailable,
        };
        let images: Capability<Arc<dyn ImageDescriber>> = match &config.vision.api_key {
            Some(key) => {
                let backend = GeminiVision::new(&config.vision, key.clone())?;
                Capability::Available(Arc::new(backend))
            }
            None => Capability::Unavailable,
        };
        debug!(
            "Document extraction {}, image description {}",
            availability(documents.is_available()),
            availability(images.is_available())
        );
        Ok(Self::new(documents, images))
    }

    pub fn documents_available(&self) -> bool {
        self.documents.is_available()
    }

    pub fn images_available(&self) -> bool {
        self.images.is_available()
    }

    /// Produce the content of one classified file.
    ///
    /// Backend failures become [`FileContent::Degraded`]. Only reading the file
    /// and cancellation fail the call.
    pub fn extract(
        &self,
        file: &ClassifiedFile,
        cancel: &CancelToken,
    ) -> Result<FileContent, IngestError> {
        let bytes = std::fs::read(&file.path)
            .map_err(|source| IngestError::Read { path: file.relative_path.clone(), source })?;

        let content = match (file.kind, &self.documents, &self.images) {
            (FileKind::Document, Capability::Available(backend), _) => {
                debug!("Extracting document {}", file.relative_path);
                match backend.extract(&bytes, cancel) {
                    Ok(pages) => FileContent::Document { pages },
                    Err(e) => degraded(Strategy::Document, &file.relative_path, e)?,
                }
            }
            (FileKind::Image, _, Capability::Available(backend)) => {
                debug!("Describing image {}", file.relative_path);
                match backend.describe(&bytes, &file.media_type, cancel) {
                    Ok(description) => FileContent::ImageDescription { description },
                    Err(e) => degraded(Strategy::Image, &file.relative_path, e)?,
                }
            }
            _ => FileContent::Text { text: decode_text(&bytes) },
        };
        Ok(content)
    }
}

fn degraded(
    strategy: Strategy,
    path: &str,
    err: ExtractError,
) -> Result<FileContent, IngestError> {
    if matches!(err, ExtractError::Cancelled) {
        return Err(IngestError::Cancelled);
    }
    let transient = err.is_transient();
    warn!("{} extraction failed for {} (transient: {}): {}", strategy, path, transient, err);
    Ok(FileContent::Degraded { strategy, reason: err.to_string(), transient })
}

fn availability(available: bool) -> &'static str {
    if available {
        "enabled"
    } else {
        "disabled"
    }
}
