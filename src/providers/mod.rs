use anyhow::{Result, anyhow};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::settings::Settings;

mod google;
mod openai;

pub use google::GoogleTranslate;
pub use openai::OpenAI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Google,
    OpenAI,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Google => "google",
            ProviderKind::OpenAI => "openai",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        match name.trim().to_lowercase().as_str() {
            "google" | "googletrans" => Ok(ProviderKind::Google),
            "openai" => Ok(ProviderKind::OpenAI),
            other => Err(anyhow!(
                "unknown translation provider '{}' (expected google or openai)",
                other
            )),
        }
    }
}

pub type TranslateFuture<'a> = Pin<Box<dyn Future<Output = Result<String>> + Send + 'a>>;

/// An external translation capability: one attempt per call, no retries.
pub trait Translate: Send + Sync {
    fn name(&self) -> &'static str;
    fn translate<'a>(&'a self, text: &'a str, target_lang: &'a str) -> TranslateFuture<'a>;
}

pub fn build_provider(settings: &Settings) -> Result<Arc<dyn Translate>> {
    let kind = ProviderKind::from_name(&settings.translation_provider)?;
    let provider: Arc<dyn Translate> = match kind {
        ProviderKind::Google => Arc::new(GoogleTranslate::new(settings.source_lang.clone())),
        ProviderKind::OpenAI => {
            let key = resolve_key(kind)?;
            let mut provider = OpenAI::new(key).with_source_lang(settings.source_lang.clone());
            if let Some(model) = settings.translation_model.as_deref() {
                provider = provider.with_model(model);
            }
            Arc::new(provider)
        }
    };
    Ok(provider)
}

pub fn resolve_key(provider: ProviderKind) -> Result<String> {
    match provider {
        ProviderKind::Google => Ok(String::new()),
        ProviderKind::OpenAI => {
            get_env("OPENAI_API_KEY").ok_or_else(|| anyhow!("OPENAI_API_KEY is not set"))
        }
    }
}

pub(crate) fn get_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .filter(|value| !value.trim().is_empty())
}

/// Serves `router` on an ephemeral local port and returns its base url.
#[cfg(test)]
pub(crate) async fn serve_local(router: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
