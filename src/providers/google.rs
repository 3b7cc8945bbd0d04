use anyhow::{Context, Result, anyhow};

use super::{Translate, TranslateFuture, get_env};

const DEFAULT_BASE_URL: &str = "https://translate.googleapis.com/translate_a/single";

/// Client for the public Google Translate web endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslate {
    client: reqwest::Client,
    base_url: String,
    source_lang: String,
}

impl GoogleTranslate {
    pub fn new(source_lang: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: get_env("GOOGLE_TRANSLATE_URL")
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            source_lang: source_lang.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn request(&self, text: &str, target_lang: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.base_url)
            .query(&[
                ("client", "gtx"),
                ("sl", self.source_lang.as_str()),
                ("tl", target_lang),
                ("dt", "t"),
            ])
            .form(&[("q", text)])
            .send()
            .await
            .with_context(|| "failed to reach Google Translate")?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(anyhow!(
                "Google Translate error ({}): {}",
                status,
                summarize_body(&body)
            ));
        }
        extract_translation(&body)
    }
}

impl Translate for GoogleTranslate {
    fn name(&self) -> &'static str {
        "google"
    }

    fn translate<'a>(&'a self, text: &'a str, target_lang: &'a str) -> TranslateFuture<'a> {
        Box::pin(self.request(text, target_lang))
    }
}

/// The endpoint answers with nested arrays; the first element holds
/// `[translated, original, ...]` segments, one per sentence.
fn extract_translation(body: &str) -> Result<String> {
    let payload: serde_json::Value =
        serde_json::from_str(body).with_context(|| "failed to parse Google Translate response")?;
    let segments = payload
        .get(0)
        .and_then(|value| value.as_array())
        .ok_or_else(|| anyhow!("Google Translate response has no translation segments"))?;

    let mut translated = String::new();
    for segment in segments {
        if let Some(part) = segment.get(0).and_then(|value| value.as_str()) {
            translated.push_str(part);
        }
    }
    if translated.is_empty() {
        return Err(anyhow!("Google Translate returned an empty translation"));
    }
    Ok(translated)
}

fn summarize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response".to_string();
    }
    // error pages are full HTML documents
    if trimmed.starts_with('<') {
        return "unexpected HTML response".to_string();
    }
    trimmed.chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::serve_local;
    use axum::extract::{Form, Query};
    use axum::http::StatusCode;
    use axum::response::{Html, IntoResponse};
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    /// Echoes the request parameters back as two sentence segments.
    async fn echo_segments(
        Query(query): Query<HashMap<String, String>>,
        Form(form): Form<HashMap<String, String>>,
    ) -> Json<serde_json::Value> {
        let param = |key: &str| query.get(key).cloned().unwrap_or_default();
        let head = format!(
            "{}|{}|{}|{}|",
            param("client"),
            param("sl"),
            param("tl"),
            param("dt")
        );
        let q = form.get("q").cloned().unwrap_or_default();
        Json(serde_json::json!([[[head, "x"], [q, "x"]], null, "en"]))
    }

    async fn rate_limited() -> impl IntoResponse {
        (
            StatusCode::TOO_MANY_REQUESTS,
            Html("<html><body>Our systems have detected unusual traffic</body></html>"),
        )
    }

    async fn local_google() -> GoogleTranslate {
        let router = Router::new()
            .route("/ok", post(echo_segments))
            .route("/limited", post(rate_limited));
        let base_url = serve_local(router).await;
        GoogleTranslate::new("auto").with_base_url(format!("{}/ok", base_url))
    }

    #[tokio::test]
    async fn sends_languages_and_text() {
        let provider = local_google().await;
        let text = provider.translate("Hello & goodbye", "fr").await.unwrap();
        assert_eq!(text, "gtx|auto|fr|t|Hello & goodbye");
    }

    #[tokio::test]
    async fn rate_limit_page_is_summarized() {
        let provider = local_google().await;
        let limited = provider.base_url.replace("/ok", "/limited");
        let provider = provider.with_base_url(limited);
        let err = provider.translate("Hello", "fr").await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Google Translate error (429 Too Many Requests): unexpected HTML response"
        );
    }

    #[test]
    fn joins_sentence_segments() {
        let payload = include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/tests/fixtures/google_translate_response.json"
        ));
        let text = extract_translation(payload).unwrap();
        insta::assert_snapshot!(text, @"Bonjour le monde. Comment allez-vous ?");
    }

    #[test]
    fn rejects_payload_without_segments() {
        let err = extract_translation(r#"[null,null,"en"]"#).unwrap_err();
        assert!(err.to_string().contains("no translation segments"));
        assert!(extract_translation("not json").is_err());
        assert!(extract_translation("[[]]").is_err());
    }

    #[test]
    fn html_error_pages_are_not_echoed() {
        assert_eq!(
            summarize_body("<html><body>Error 400</body></html>"),
            "unexpected HTML response"
        );
        assert_eq!(summarize_body("  "), "empty response");
    }
}
