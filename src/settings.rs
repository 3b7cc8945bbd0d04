use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_SETTINGS_TOML: &str = include_str!("../settings.toml");

#[derive(Debug, Clone)]
pub struct Settings {
    pub system_languages: Vec<String>,
    pub server_addr: String,
    pub max_upload_bytes: usize,
    pub uploads_dir: PathBuf,
    pub output_dir: PathBuf,
    pub retention: Option<Duration>,
    pub sweep_interval: Duration,
    pub tesseract_path: String,
    pub ocr_languages: String,
    pub ocr_psm: u32,
    pub ocr_normalize: bool,
    pub ocr_timeout: Duration,
    pub translation_provider: String,
    pub source_lang: String,
    pub translation_concurrency: usize,
    pub translation_timeout: Duration,
    pub translation_model: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            system_languages: Vec::new(),
            server_addr: "127.0.0.1:5000".to_string(),
            max_upload_bytes: 16 * 1024 * 1024,
            uploads_dir: PathBuf::from("uploads"),
            output_dir: PathBuf::from("outputs"),
            retention: None,
            sweep_interval: Duration::from_secs(300),
            tesseract_path: "tesseract".to_string(),
            ocr_languages: "eng".to_string(),
            ocr_psm: 3,
            ocr_normalize: true,
            ocr_timeout: Duration::from_secs(60),
            translation_provider: "google".to_string(),
            source_lang: "auto".to_string(),
            translation_concurrency: 4,
            translation_timeout: Duration::from_secs(30),
            translation_model: None,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    system: Option<SystemSettings>,
    server: Option<ServerSettings>,
    storage: Option<StorageSettings>,
    ocr: Option<OcrSettings>,
    translation: Option<TranslationSettings>,
}

#[derive(Debug, Default, Deserialize)]
struct SystemSettings {
    languages: Option<Vec<String>>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSettings {
    addr: Option<String>,
    max_upload_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct StorageSettings {
    uploads_dir: Option<String>,
    output_dir: Option<String>,
    retention_secs: Option<u64>,
    sweep_interval_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OcrSettings {
    tesseract_path: Option<String>,
    languages: Option<String>,
    psm: Option<u32>,
    normalize: Option<bool>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct TranslationSettings {
    provider: Option<String>,
    source_lang: Option<String>,
    concurrency: Option<usize>,
    timeout_secs: Option<u64>,
    model: Option<String>,
}

pub fn load_settings(extra_path: Option<&Path>) -> Result<Settings> {
    let mut settings = Settings::default();
    settings.merge(parse_settings(DEFAULT_SETTINGS_TOML, Path::new("<builtin>"))?);

    let mut ordered_paths = Vec::new();
    ordered_paths.push(PathBuf::from("settings.toml"));
    ordered_paths.push(PathBuf::from("settings.local.toml"));

    if let Some(home) = home_dir() {
        ordered_paths.push(home.join("settings.toml"));
        ordered_paths.push(home.join("settings.local.toml"));
    }

    if let Some(extra) = extra_path {
        if !extra.exists() {
            return Err(anyhow!("settings file not found: {}", extra.display()));
        }
        ordered_paths.push(extra.to_path_buf());
    }

    for path in ordered_paths {
        if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("failed to read settings: {}", path.display()))?;
            settings.merge(parse_settings(&content, &path)?);
        }
    }

    settings.validate()?;
    Ok(settings)
}

fn parse_settings(content: &str, path: &Path) -> Result<SettingsFile> {
    toml::from_str(content).with_context(|| format!("failed to parse settings: {}", path.display()))
}

impl Settings {
    fn merge(&mut self, incoming: SettingsFile) {
        if let Some(system) = incoming.system {
            if let Some(languages) = system.languages {
                self.system_languages = languages;
            }
        }
        if let Some(server) = incoming.server {
            if let Some(addr) = non_empty(server.addr) {
                self.server_addr = addr;
            }
            if let Some(limit) = server.max_upload_bytes {
                if limit > 0 {
                    self.max_upload_bytes = limit;
                }
            }
        }
        if let Some(storage) = incoming.storage {
            if let Some(dir) = non_empty(storage.uploads_dir) {
                self.uploads_dir = PathBuf::from(dir);
            }
            if let Some(dir) = non_empty(storage.output_dir) {
                self.output_dir = PathBuf::from(dir);
            }
            // zero disables the sweeper
            if let Some(secs) = storage.retention_secs {
                self.retention = (secs > 0).then(|| Duration::from_secs(secs));
            }
            if let Some(secs) = storage.sweep_interval_secs {
                if secs > 0 {
                    self.sweep_interval = Duration::from_secs(secs);
                }
            }
        }
        if let Some(ocr) = incoming.ocr {
            if let Some(path) = non_empty(ocr.tesseract_path) {
                self.tesseract_path = path;
            }
            if let Some(languages) = non_empty(ocr.languages) {
                self.ocr_languages = languages;
            }
            if let Some(psm) = ocr.psm {
                self.ocr_psm = psm;
            }
            if let Some(normalize) = ocr.normalize {
                self.ocr_normalize = normalize;
            }
            if let Some(secs) = ocr.timeout_secs {
                if secs > 0 {
                    self.ocr_timeout = Duration::from_secs(secs);
                }
            }
        }
        if let Some(translation) = incoming.translation {
            if let Some(provider) = non_empty(translation.provider) {
                self.translation_provider = provider.to_lowercase();
            }
            if let Some(lang) = non_empty(translation.source_lang) {
                self.source_lang = lang;
            }
            if let Some(limit) = translation.concurrency {
                if limit > 0 {
                    self.translation_concurrency = limit;
                }
            }
            if let Some(secs) = translation.timeout_secs {
                if secs > 0 {
                    self.translation_timeout = Duration::from_secs(secs);
                }
            }
            if let Some(model) = non_empty(translation.model) {
                self.translation_model = Some(model);
            }
        }
    }

    fn validate(&self) -> Result<()> {
        if self.ocr_psm > 13 {
            return Err(anyhow!(
                "ocr.psm must be between 0 and 13 (got {})",
                self.ocr_psm
            ));
        }
        if self.uploads_dir == self.output_dir {
            return Err(anyhow!(
                "storage.uploads_dir and storage.output_dir must differ ({})",
                self.uploads_dir.display()
            ));
        }
        if let Some(retention) = self.retention {
            // a stored upload must outlive the request that reads it
            let request_budget = self.ocr_timeout + self.translation_timeout;
            if retention < request_budget {
                return Err(anyhow!(
                    "storage.retention_secs ({}) must be at least ocr.timeout_secs + translation.timeout_secs ({})",
                    retention.as_secs(),
                    request_budget.as_secs()
                ));
            }
        }
        Ok(())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

fn home_dir() -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(".image-translator-rust"))
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn merged(toml: &str) -> Settings {
        let mut settings = Settings::default();
        settings.merge(parse_settings(toml, Path::new("test.toml")).unwrap());
        settings
    }

    #[test]
    fn builtin_settings_parse() {
        let settings = merged(DEFAULT_SETTINGS_TOML);
        assert_eq!(settings.tesseract_path, "tesseract");
        assert_eq!(settings.translation_provider, "google");
        assert!(settings.retention.is_none());
        assert!(settings.system_languages.iter().any(|lang| lang == "fr"));
        settings.validate().unwrap();
    }

    #[test]
    fn later_layers_override_earlier_ones() {
        let mut settings = merged(DEFAULT_SETTINGS_TOML);
        settings.merge(
            parse_settings(
                r#"
                [ocr]
                tesseract_path = "/opt/tesseract/bin/tesseract"
                timeout_secs = 5

                [translation]
                provider = "OpenAI"
                concurrency = 0
                "#,
                Path::new("local.toml"),
            )
            .unwrap(),
        );
        assert_eq!(settings.tesseract_path, "/opt/tesseract/bin/tesseract");
        assert_eq!(settings.ocr_timeout, Duration::from_secs(5));
        assert_eq!(settings.translation_provider, "openai");
        assert_eq!(settings.translation_concurrency, 4);
    }

    #[test]
    fn blank_values_are_ignored() {
        let settings = merged(
            r#"
            [ocr]
            tesseract_path = "  "
            [storage]
            uploads_dir = ""
            "#,
        );
        assert_eq!(settings.tesseract_path, "tesseract");
        assert_eq!(settings.uploads_dir, PathBuf::from("uploads"));
    }

    #[test]
    fn retention_zero_keeps_files_forever() {
        let settings = merged("[storage]\nretention_secs = 3600\n");
        assert_eq!(settings.retention, Some(Duration::from_secs(3600)));
        let settings = merged("[storage]\nretention_secs = 0\n");
        assert!(settings.retention.is_none());
    }

    #[test]
    fn shared_storage_directories_are_rejected() {
        let settings = merged("[storage]\nuploads_dir = \"data\"\noutput_dir = \"data\"\n");
        assert!(settings.validate().is_err());
    }

    #[test]
    fn retention_shorter_than_a_request_is_rejected() {
        let settings = merged("[storage]\nretention_secs = 60\n");
        let err = settings.validate().unwrap_err();
        assert!(err.to_string().contains("at least"));
        assert!(err.to_string().contains("(90)"));

        let settings = merged("[storage]\nretention_secs = 90\n");
        assert!(settings.validate().is_ok());
        let settings = merged(
            "[storage]\nretention_secs = 20\n[ocr]\ntimeout_secs = 5\n[translation]\ntimeout_secs = 5\n",
        );
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn missing_extra_settings_file_is_an_error() {
        let err = load_settings(Some(Path::new("/nonexistent/settings.toml"))).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }
}
