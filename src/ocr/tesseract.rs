use anyhow::{Context, Result, anyhow};
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use tempfile::NamedTempFile;
use tokio::process::Command;
use tracing::debug;

use super::{ExtractFuture, ExtractionError, TextExtractor, clean_ocr_output, preprocess};
use crate::settings::Settings;

/// Runs the `tesseract` executable against stored images.
#[derive(Debug, Clone)]
pub struct Tesseract {
    binary: String,
    languages: String,
    psm: u32,
    normalize: bool,
    timeout: Duration,
}

impl Tesseract {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            languages: "eng".to_string(),
            psm: 3,
            normalize: true,
            timeout: Duration::from_secs(60),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            binary: settings.tesseract_path.clone(),
            languages: settings.ocr_languages.clone(),
            psm: settings.ocr_psm,
            normalize: settings.ocr_normalize,
            timeout: settings.ocr_timeout,
        }
    }

    pub fn with_normalize(mut self, normalize: bool) -> Self {
        self.normalize = normalize;
        self
    }

    /// Checks that the configured binary runs; returns its version line.
    pub async fn verify(&self) -> Result<String> {
        let output = Command::new(&self.binary)
            .arg("--version")
            .kill_on_drop(true)
            .output()
            .await
            .with_context(|| {
                format!("failed to run {} --version (is it installed?)", self.binary)
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow!(
                "{} --version failed: {}",
                self.binary,
                stderr.trim()
            ));
        }
        // older releases print the banner on stderr
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let version = stdout
            .lines()
            .chain(stderr.lines())
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or("tesseract")
            .to_string();
        Ok(version)
    }

    async fn extract_text(&self, image_path: &Path) -> Result<String, ExtractionError> {
        let bytes = tokio::fs::read(image_path)
            .await
            .map_err(|source| ExtractionError::Read {
                path: image_path.to_path_buf(),
                source,
            })?;
        let normalize = self.normalize;
        let prepared = tokio::task::spawn_blocking(move || prepare_image(&bytes, normalize))
            .await
            .map_err(|err| ExtractionError::Internal(err.to_string()))??;
        let target = prepared
            .as_ref()
            .map(|tmp| tmp.path())
            .unwrap_or(image_path);

        let raw = self.run(target).await?;
        let text = clean_ocr_output(&raw);
        if text.trim().is_empty() {
            return Err(ExtractionError::NoText);
        }
        debug!(
            "extracted {} characters from {}",
            text.chars().count(),
            image_path.display()
        );
        Ok(text)
    }

    async fn run(&self, path: &Path) -> Result<String, ExtractionError> {
        let output = Command::new(&self.binary)
            .arg(path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.languages)
            .arg("--psm")
            .arg(self.psm.to_string())
            .kill_on_drop(true)
            .output();
        let output = tokio::time::timeout(self.timeout, output)
            .await
            .map_err(|_| ExtractionError::Timeout(self.timeout))?
            .map_err(|source| ExtractionError::Unavailable {
                binary: self.binary.clone(),
                source,
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractionError::Engine(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextExtractor for Tesseract {
    fn extract<'a>(&'a self, image_path: &'a Path) -> ExtractFuture<'a> {
        Box::pin(self.extract_text(image_path))
    }
}

/// Decodes the upload and, when normalizing, writes the grayscale variant
/// to a temporary PNG that lives as long as the returned handle.
fn prepare_image(bytes: &[u8], normalize: bool) -> Result<Option<NamedTempFile>, ExtractionError> {
    let image = image::load_from_memory(bytes)?;
    if !normalize {
        return Ok(None);
    }
    let normalized = preprocess::normalize_for_ocr(&image);
    let mut tmp = tempfile::Builder::new()
        .prefix("image-translator-")
        .suffix(".png")
        .tempfile()
        .map_err(|err| {
            ExtractionError::Internal(format!("failed to create temp file: {}", err))
        })?;
    normalized
        .write_to(&mut tmp, image::ImageFormat::Png)
        .map_err(|err| {
            ExtractionError::Internal(format!("failed to write temp image: {}", err))
        })?;
    tmp.flush().map_err(|err| {
        ExtractionError::Internal(format!("failed to flush temp image: {}", err))
    })?;
    Ok(Some(tmp))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::io::Cursor;

    fn png_bytes() -> Vec<u8> {
        let image = RgbaImage::from_pixel(4, 4, Rgba([20, 20, 20, 255]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(image)
            .write_to(&mut out, image::ImageFormat::Png)
            .unwrap();
        out.into_inner()
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        let err = prepare_image(b"definitely not an image", true).unwrap_err();
        assert!(matches!(err, ExtractionError::Decode(_)));
        assert!(err.is_unreadable_image());
    }

    #[test]
    fn normalized_variant_is_a_readable_png() {
        let tmp = prepare_image(&png_bytes(), true).unwrap().expect("temp file");
        let decoded = image::open(tmp.path()).unwrap();
        assert_eq!(decoded.width(), 4);
        assert!(prepare_image(&png_bytes(), false).unwrap().is_none());
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let engine = Tesseract::new("/nonexistent/bin/tesseract");
        let err = engine.extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Unavailable { .. }));
        assert!(engine.verify().await.is_err());
    }

    #[tokio::test]
    async fn missing_image_is_a_read_error() {
        let engine = Tesseract::new("tesseract").with_normalize(false);
        let err = engine
            .extract(Path::new("/nonexistent/upload.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Read { .. }));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn failing_engine_exit_is_an_engine_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scan.png");
        std::fs::write(&path, png_bytes()).unwrap();
        let engine = Tesseract::new("false").with_normalize(false);
        let err = engine.extract(&path).await.unwrap_err();
        assert!(matches!(err, ExtractionError::Engine(_)));
    }
}
