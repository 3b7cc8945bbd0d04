use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use serde_json::json;

use super::{Translate, TranslateFuture, get_env};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub(crate) const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Translation through the chat completions API.
#[derive(Debug, Clone)]
pub struct OpenAI {
    client: reqwest::Client,
    base_url: String,
    key: String,
    model: String,
    source_lang: String,
}

impl OpenAI {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: get_env("OPENAI_BASE_URL").unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            key: key.into(),
            model: DEFAULT_MODEL.to_string(),
            source_lang: "auto".to_string(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        let model = model.into();
        if !model.trim().is_empty() {
            self.model = model;
        }
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_source_lang(mut self, source_lang: impl Into<String>) -> Self {
        self.source_lang = source_lang.into();
        self
    }

    async fn request(&self, text: &str, target_lang: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "temperature": 0,
            "messages": [
                {"role": "system", "content": system_prompt(&self.source_lang, target_lang)},
                {"role": "user", "content": text}
            ]
        });

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.key)
            .json(&body)
            .send()
            .await
            .with_context(|| "failed to reach OpenAI")?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!(
                "OpenAI API error ({}): {}",
                status,
                extract_openai_error(&text).unwrap_or(text)
            ));
        }
        extract_translation(&text)
    }
}

impl Translate for OpenAI {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn translate<'a>(&'a self, text: &'a str, target_lang: &'a str) -> TranslateFuture<'a> {
        Box::pin(self.request(text, target_lang))
    }
}

fn system_prompt(source_lang: &str, target_lang: &str) -> String {
    let source = if source_lang.eq_ignore_ascii_case("auto") {
        "the detected source language".to_string()
    } else {
        format!("the language with code '{}'", source_lang)
    };
    format!(
        "Translate the user's text from {} into the language with code '{}'. \
         The text was extracted from an image with OCR and may contain line breaks; keep them. \
         Reply with the translation only.",
        source, target_lang
    )
}

fn extract_translation(text: &str) -> Result<String> {
    let payload: ChatResponse =
        serde_json::from_str(text).with_context(|| "failed to parse OpenAI response JSON")?;
    let content = payload
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| anyhow!("no message content returned from OpenAI"))?;
    let content = content.trim();
    if content.is_empty() {
        return Err(anyhow!("OpenAI returned an empty translation"));
    }
    Ok(content.to_string())
}

fn extract_openai_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<OpenAIError>,
    }

    #[derive(Deserialize)]
    struct OpenAIError {
        message: Option<String>,
        code: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    let message = error.message.filter(|value| !value.trim().is_empty())?;
    match error.code.filter(|value| !value.trim().is_empty()) {
        Some(code) => Some(format!("{} | code: {}", message, code)),
        None => Some(message),
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}
