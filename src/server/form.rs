use anyhow::{Context, Result};
use serde::Serialize;
use tera::{Context as TeraContext, Tera};

use crate::data;

const INDEX_TEMPLATE: &str = include_str!("templates/index.html.tera");

#[derive(Debug, Serialize)]
struct LanguageOption {
    code: String,
    label: String,
}

/// Renders the upload page offering `languages` as targets.
pub(crate) fn render_index(languages: &[String]) -> Result<String> {
    let options = languages
        .iter()
        .map(|code| LanguageOption {
            code: code.clone(),
            label: language_label(code).unwrap_or(code).to_string(),
        })
        .collect::<Vec<_>>();
    let accept = data::IMAGE_EXTENSIONS
        .iter()
        .map(|ext| format!(".{}", ext))
        .collect::<Vec<_>>()
        .join(",");

    let mut context = TeraContext::new();
    context.insert("languages", &options);
    context.insert("accept", &accept);
    Tera::one_off(INDEX_TEMPLATE, &context, true).with_context(|| "failed to render upload form")
}

fn language_label(code: &str) -> Option<&'static str> {
    let label = match code.to_ascii_lowercase().as_str() {
        "ar" => "Arabic",
        "de" => "German",
        "en" => "English",
        "es" => "Spanish",
        "fr" => "French",
        "hi" => "Hindi",
        "it" => "Italian",
        "ja" => "Japanese",
        "ko" => "Korean",
        "nl" => "Dutch",
        "pl" => "Polish",
        "pt" => "Portuguese",
        "ru" => "Russian",
        "tr" => "Turkish",
        "uk" => "Ukrainian",
        "zh-cn" => "Chinese (Simplified)",
        "zh-tw" => "Chinese (Traditional)",
        _ => return None,
    };
    Some(label)
}
