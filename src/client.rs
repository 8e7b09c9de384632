//! fragment sources: anything that turns (model, prompt) into a stream of text.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::Arc;

use bevy::log::{debug, info};
use futures_lite::{Stream, StreamExt};

use crate::config::AnalyzerConfig;
use crate::error::AnalyzeError;
use crate::{ChatMessage, ChatProvider, LLMBackend, LLMBuilder, LLMProvider};

/// a lazy, finite, non-restartable sequence of response fragments.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, AnalyzeError>> + Send>>;

/// opens one streamed generation per call. no retries, no timeouts: whatever
/// goes wrong comes back as an `AnalyzeError`, either from `stream` itself or
/// as an item of the returned stream.
#[async_trait::async_trait]
pub trait FragmentSource: Send + Sync {
    async fn stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, AnalyzeError>;
}

/// `llm`-backed source (gemini by default).
///
/// - `default`: used for any model without a dedicated provider
/// - `per_model`: providers built for specific model ids
#[derive(Clone)]
pub struct LlmFragmentSource {
    default: Arc<dyn LLMProvider>,
    per_model: HashMap<String, Arc<dyn LLMProvider>>,
}

impl LlmFragmentSource {
    pub fn new(default: Arc<dyn LLMProvider>) -> Self {
        Self { default, per_model: HashMap::new() }
    }

    pub fn with(mut self, model: impl Into<String>, provider: Arc<dyn LLMProvider>) -> Self {
        self.per_model.insert(model.into(), provider);
        self
    }

    /// builds the google provider for `config.model`. the key isn't checked;
    /// a bad one fails the first request.
    pub fn from_config(config: &AnalyzerConfig) -> Result<Self, AnalyzeError> {
        info!(
            target: "bevy_code_analyzer",
            "LlmFragmentSource: model='{}', base_url={:?}, key_present={}",
            config.model, config.base_url, config.has_api_key()
        );
        let provider = build_provider(LLMBackend::Google, config)?;
        Ok(Self::new(provider.clone()).with(config.model.clone(), provider))
    }

    fn get(&self, model: &str) -> Arc<dyn LLMProvider> {
        self.per_model
            .get(model)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

fn build_provider(
    backend: LLMBackend,
    config: &AnalyzerConfig,
) -> Result<Arc<dyn LLMProvider>, AnalyzeError> {
    let mut b = LLMBuilder::new().backend(backend).model(config.model.clone());
    if config.has_api_key() {
        b = b.api_key(config.api_key.clone());
    }
    if let Some(url) = &config.base_url {
        b = b.base_url(url.clone());
    }
    let provider = b.build().map_err(|e| AnalyzeError::Config(e.to_string()))?;
    Ok(provider.into())
}

#[async_trait::async_trait]
impl FragmentSource for LlmFragmentSource {
    async fn stream(&self, model: &str, prompt: &str) -> Result<FragmentStream, AnalyzeError> {
        let provider = self.get(model);
        let messages = vec![ChatMessage::user().content(prompt.to_string()).build()];
        debug!(target: "bevy_code_analyzer", "opening stream: model={} prompt_len={}", model, prompt.len());

        let s = provider.chat_stream(&messages).await?;
        // keep-alive chunks arrive as empty deltas
        let fragments = s.filter_map(|item| match item {
            Ok(text) if text.is_empty() => None,
            Ok(text) => Some(Ok(text)),
            Err(err) => Some(Err(AnalyzeError::from(err))),
        });
        Ok(Box::pin(fragments))
    }
}

/// stands in when no provider could be built at startup, so the failure
/// shows up on the first request like any other.
#[derive(Clone, Debug)]
pub struct UnavailableSource {
    pub reason: String,
}

#[async_trait::async_trait]
impl FragmentSource for UnavailableSource {
    async fn stream(&self, _model: &str, _prompt: &str) -> Result<FragmentStream, AnalyzeError> {
        Err(AnalyzeError::Config(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_source_fails_on_request() {
        let source = UnavailableSource { reason: "no api key".into() };
        let res = pollster::block_on(source.stream("m", "p"));
        match res {
            Err(AnalyzeError::Config(reason)) => assert_eq!(reason, "no api key"),
            _ => panic!("expected config error"),
        }
    }

    #[test]
    fn from_config_builds_without_network() {
        let cfg = AnalyzerConfig::new("test-key");
        let source = LlmFragmentSource::from_config(&cfg).expect("provider builds");
        assert!(source.per_model.contains_key(crate::DEFAULT_MODEL));
    }

    #[test]
    fn unknown_model_falls_back_to_default() {
        let cfg = AnalyzerConfig::new("test-key");
        let source = LlmFragmentSource::from_config(&cfg).expect("provider builds");
        let a = source.get("some-other-model");
        assert!(Arc::ptr_eq(&a, &source.default));
    }
}
