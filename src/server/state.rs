use anyhow::Result;
use std::sync::Arc;

use super::form;
use crate::ocr::TextExtractor;
use crate::providers::Translate;
use crate::settings::Settings;
use crate::storage::Storage;
use crate::translator::Translator;

/// Shared by every request; holds no per-request paths.
#[derive(Clone)]
pub struct AppState {
    pub(crate) storage: Storage,
    pub(crate) extractor: Arc<dyn TextExtractor>,
    pub(crate) translator: Translator,
    pub(crate) index_html: Arc<String>,
    pub(crate) max_upload_bytes: usize,
}

impl AppState {
    /// Creates the storage directories and renders the upload form.
    pub fn new(
        settings: &Settings,
        extractor: Arc<dyn TextExtractor>,
        provider: Arc<dyn Translate>,
    ) -> Result<Self> {
        let storage = Storage::from_settings(settings);
        storage.ensure_dirs()?;
        Ok(Self {
            storage,
            extractor,
            translator: Translator::from_settings(provider, settings),
            index_html: Arc::new(form::render_index(&settings.system_languages)?),
            max_upload_bytes: settings.max_upload_bytes,
        })
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }
}
