use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::providers::Translate;
use crate::settings::Settings;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranslationOutcome {
    Translated(String),
    /// Holds `"Error translating to <lang>: <details>"`.
    Failed(String),
}

impl TranslationOutcome {
    pub fn text(&self) -> &str {
        match self {
            TranslationOutcome::Translated(text) | TranslationOutcome::Failed(text) => text,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, TranslationOutcome::Failed(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguageOutcome {
    pub lang: String,
    pub outcome: TranslationOutcome,
}

/// Fans one source text out to every requested language.
#[derive(Clone)]
pub struct Translator {
    provider: Arc<dyn Translate>,
    concurrency: usize,
    timeout: Duration,
}

impl Translator {
    pub fn new(provider: Arc<dyn Translate>) -> Self {
        Self {
            provider,
            concurrency: 4,
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(provider: Arc<dyn Translate>, settings: &Settings) -> Self {
        Self::new(provider)
            .with_concurrency(settings.translation_concurrency)
            .with_timeout(settings.translation_timeout)
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Translates `text` into each language exactly once. The result has one
    /// entry per language in `languages` order; a failing language never
    /// prevents the others from being attempted.
    pub async fn translate_all(&self, text: &str, languages: &[String]) -> Vec<LanguageOutcome> {
        stream::iter(languages.iter().cloned())
            .map(|lang| self.translate_one(text, lang))
            .buffered(self.concurrency)
            .collect()
            .await
    }

    async fn translate_one(&self, text: &str, lang: String) -> LanguageOutcome {
        let call = self.provider.translate(text, &lang);
        let outcome = match tokio::time::timeout(self.timeout, call).await {
            Ok(Ok(translated)) => {
                debug!("{} translated text to {}", self.provider.name(), lang);
                TranslationOutcome::Translated(translated)
            }
            Ok(Err(err)) => {
                warn!("translation to {} failed: {:#}", lang, err);
                TranslationOutcome::Failed(format!("Error translating to {}: {:#}", lang, err))
            }
            Err(_) => {
                warn!("translation to {} timed out after {:?}", lang, self.timeout);
                TranslationOutcome::Failed(format!(
                    "Error translating to {}: timed out after {}s",
                    lang,
                    self.timeout.as_secs_f32()
                ))
            }
        };
        LanguageOutcome { lang, outcome }
    }
}
