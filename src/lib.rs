use anyhow::{Context, Result, anyhow};
use std::path::{Path, PathBuf};

pub mod data;
pub mod document;
pub mod logging;
pub mod ocr;
pub mod providers;
pub mod server;
pub mod settings;
pub mod storage;
mod translator;

pub use document::{ComposedDocument, Page, compose};
pub use ocr::{ExtractionError, Tesseract, TextExtractor};
pub use providers::{GoogleTranslate, OpenAI, ProviderKind, Translate};
pub use settings::Settings;
pub use storage::Storage;
pub use translator::{LanguageOutcome, TranslationOutcome, Translator};

#[derive(Debug, Clone)]
pub struct Config {
    pub image: PathBuf,
    pub languages: Vec<String>,
    pub out: PathBuf,
    pub settings_path: Option<String>,
}

/// Runs one local image through OCR, translation and composition, writing
/// the document to `config.out`.
pub async fn run(config: Config) -> Result<ComposedDocument> {
    let settings_path = config.settings_path.as_deref().map(Path::new);
    let settings = settings::load_settings(settings_path)?;

    let file_name = config
        .image
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    if data::image_extension(&file_name).is_none() {
        return Err(anyhow!(
            "unsupported file type '{}' (expected one of: {})",
            config.image.display(),
            data::IMAGE_EXTENSIONS.join(", ")
        ));
    }
    let languages = data::normalize_languages(&config.languages);
    if languages.is_empty() {
        return Err(anyhow!("no target language given"));
    }

    let tesseract = Tesseract::from_settings(&settings);
    let text = tesseract
        .extract(&config.image)
        .await
        .with_context(|| format!("failed to extract text from {}", config.image.display()))?;

    let provider = providers::build_provider(&settings)?;
    let translator = Translator::from_settings(provider, &settings);
    let outcomes = translator.translate_all(&text, &languages).await;

    let document = compose(&outcomes);
    document.write_to(&config.out).await?;
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_config(dir: &Path, image: &str, languages: &[&str]) -> Config {
        Config {
            image: dir.join(image),
            languages: languages.iter().map(|lang| lang.to_string()).collect(),
            out: dir.join("out.docx"),
            settings_path: None,
        }
    }

    #[tokio::test]
    async fn run_rejects_unsupported_image_suffix() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "Hello world").unwrap();
        let config = cli_config(dir.path(), "notes.txt", &["fr"]);
        let out = config.out.clone();

        let err = run(config).await.unwrap_err();
        assert!(err.to_string().starts_with("unsupported file type"));
        assert!(err.to_string().contains("png, jpg, jpeg"));
        assert!(!out.exists());
    }

    #[tokio::test]
    async fn run_requires_a_target_language() {
        let dir = tempfile::tempdir().unwrap();
        for languages in [&[][..], &[" ", ","][..]] {
            let config = cli_config(dir.path(), "scan.png", languages);
            let out = config.out.clone();

            let err = run(config).await.unwrap_err();
            assert_eq!(err.to_string(), "no target language given");
            assert!(!out.exists());
        }
    }
}
