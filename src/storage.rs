use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::settings::Settings;

/// Uploaded images and composed documents, keyed by request id so that
/// concurrent requests never touch the same path.
#[derive(Debug, Clone)]
pub struct Storage {
    uploads_dir: PathBuf,
    output_dir: PathBuf,
}

impl Storage {
    pub fn new(uploads_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            uploads_dir: uploads_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(&settings.uploads_dir, &settings.output_dir)
    }

    pub fn uploads_dir(&self) -> &Path {
        &self.uploads_dir
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.uploads_dir, &self.output_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }

    pub async fn store_upload(&self, id: Uuid, ext: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.uploads_dir.join(format!("{}.{}", id, ext));
        tokio::fs::write(&path, bytes)
            .await
            .with_context(|| format!("failed to store upload: {}", path.display()))?;
        debug!("stored upload {} ({} bytes)", path.display(), bytes.len());
        Ok(path)
    }

    pub fn output_path(&self, id: Uuid) -> PathBuf {
        self.output_dir.join(format!("{}.docx", id))
    }

    /// Deletes stored uploads and documents last modified more than
    /// `max_age` ago. Returns the number of removed files.
    pub fn sweep_expired(&self, max_age: Duration) -> Result<usize> {
        let now = SystemTime::now();
        let mut removed = 0usize;
        for dir in [&self.uploads_dir, &self.output_dir] {
            if !dir.exists() {
                continue;
            }
            let entries = std::fs::read_dir(dir)
                .with_context(|| format!("failed to read directory: {}", dir.display()))?;
            for entry in entries {
                let entry = entry.with_context(|| "failed to read directory entry")?;
                let meta = entry
                    .metadata()
                    .with_context(|| "failed to read file metadata")?;
                if !meta.is_file() {
                    continue;
                }
                let age = meta
                    .modified()
                    .ok()
                    .and_then(|modified| now.duration_since(modified).ok())
                    .unwrap_or_default();
                if age < max_age {
                    continue;
                }
                match std::fs::remove_file(entry.path()) {
                    Ok(()) => removed += 1,
                    Err(err) => warn!("failed to remove {}: {}", entry.path().display(), err),
                }
            }
        }
        Ok(removed)
    }

    /// Runs `sweep_expired` every `interval` until the runtime shuts down.
    pub fn spawn_retention_task(
        self,
        interval: Duration,
        max_age: Duration,
    ) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let storage = self.clone();
                let swept =
                    tokio::task::spawn_blocking(move || storage.sweep_expired(max_age)).await;
                match swept {
                    Ok(Ok(0)) => {}
                    Ok(Ok(count)) => info!("retention sweep removed {} file(s)", count),
                    Ok(Err(err)) => warn!("retention sweep failed: {:#}", err),
                    Err(err) => warn!("retention sweep task failed: {}", err),
                }
            }
        })
    }
}
