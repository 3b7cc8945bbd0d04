mod preprocess;
mod tesseract;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

pub use tesseract::Tesseract;

#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("failed to read image {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("failed to run OCR engine '{binary}': {source}")]
    Unavailable {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("OCR engine failed: {0}")]
    Engine(String),
    #[error("OCR timed out after {}s", .0.as_secs())]
    Timeout(Duration),
    #[error("no text found in image")]
    NoText,
    #[error("OCR task failed: {0}")]
    Internal(String),
}

impl ExtractionError {
    /// Failures caused by the uploaded content rather than by the host.
    pub fn is_unreadable_image(&self) -> bool {
        matches!(
            self,
            ExtractionError::Decode(_) | ExtractionError::Engine(_) | ExtractionError::NoText
        )
    }
}

pub type ExtractFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, ExtractionError>> + Send + 'a>>;

pub trait TextExtractor: Send + Sync {
    fn extract<'a>(&'a self, image_path: &'a Path) -> ExtractFuture<'a>;
}

/// Drops the page separators and trailing whitespace tesseract appends.
pub(crate) fn clean_ocr_output(raw: &str) -> String {
    raw.replace('\u{000C}', "").trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleans_page_separators_and_trailing_space() {
        assert_eq!(clean_ocr_output("Hello World\n\n\u{000C}"), "Hello World");
        assert_eq!(clean_ocr_output("  indented\nline two \n"), "  indented\nline two");
    }

    #[test]
    fn unreadable_image_classification() {
        assert!(ExtractionError::NoText.is_unreadable_image());
        assert!(ExtractionError::Engine("bad".to_string()).is_unreadable_image());
        assert!(!ExtractionError::Timeout(Duration::from_secs(1)).is_unreadable_image());
        assert!(!ExtractionError::Internal("join".to_string()).is_unreadable_image());
    }
}
