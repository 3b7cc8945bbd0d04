mod docx;

use anyhow::{Context, Result};
use std::path::Path;

use crate::translator::LanguageOutcome;

pub use docx::{Paragraph, read_paragraphs};

pub const HEADING_STYLE: &str = "Heading1";
pub const ERROR_STYLE: &str = "TranslationError";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub heading: String,
    pub body: String,
    pub failed: bool,
}

/// One page per translated language, in request order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ComposedDocument {
    pages: Vec<Page>,
}

pub fn compose(outcomes: &[LanguageOutcome]) -> ComposedDocument {
    let pages = outcomes
        .iter()
        .map(|item| Page {
            heading: format!("Translation in {}", item.lang),
            body: item.outcome.text().to_string(),
            failed: item.outcome.is_failed(),
        })
        .collect();
    ComposedDocument { pages }
}

impl ComposedDocument {
    pub fn pages(&self) -> &[Page] {
        &self.pages
    }

    pub fn to_docx(&self) -> Result<Vec<u8>> {
        docx::write_package(&self.pages)
    }

    /// Renders the package, replaces whatever is at `path` and returns the
    /// written bytes.
    pub async fn write_to(&self, path: &Path) -> Result<Vec<u8>> {
        let bytes = self.to_docx()?;
        tokio::fs::write(path, &bytes)
            .await
            .with_context(|| format!("failed to write document: {}", path.display()))?;
        Ok(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translator::TranslationOutcome;

    fn outcome(lang: &str, outcome: TranslationOutcome) -> LanguageOutcome {
        LanguageOutcome {
            lang: lang.to_string(),
            outcome,
        }
    }

    #[test]
    fn one_page_per_language_in_order() {
        let document = compose(&[
            outcome(
                "fr",
                TranslationOutcome::Translated("Bonjour le monde".to_string()),
            ),
            outcome(
                "de",
                TranslationOutcome::Failed("Error translating to de: boom".to_string()),
            ),
        ]);
        assert_eq!(
            document.pages(),
            &[
                Page {
                    heading: "Translation in fr".to_string(),
                    body: "Bonjour le monde".to_string(),
                    failed: false,
                },
                Page {
                    heading: "Translation in de".to_string(),
                    body: "Error translating to de: boom".to_string(),
                    failed: true,
                },
            ]
        );
    }

    #[tokio::test]
    async fn write_to_replaces_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.docx");
        std::fs::write(&path, b"stale").unwrap();
        let document = compose(&[outcome(
            "es",
            TranslationOutcome::Translated("Hola".to_string()),
        )]);
        let bytes = document.write_to(&path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), bytes);
        let paragraphs = read_paragraphs(&bytes).unwrap();
        assert_eq!(paragraphs[1].text, "Hola");
    }
}
