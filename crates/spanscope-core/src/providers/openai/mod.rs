//! OpenAI provider
//!
//! Chat completions with function calling against the OpenAI API or any
//! OpenAI-compatible endpoint.

pub mod provider;
pub mod types;

pub use provider::OpenAIProvider;

use crate::config::DEFAULT_OPENAI_BASE_URL;

/// OpenAI configuration
#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    /// Model name for chat completions
    pub model: String,
    /// Base URL for API requests
    pub base_url: String,
}

impl OpenAIConfig {
    /// Create default configuration
    pub fn default(model: String) -> Self {
        Self {
            model,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }

    /// Create configuration with custom base URL (e.g., for a local gateway)
    pub fn with_base_url(model: String, base_url: String) -> Self {
        Self {
            model,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

/// Builder for OpenAIProvider
pub struct OpenAIBuilder {
    api_key: Option<String>,
    config: Option<OpenAIConfig>,
}

impl OpenAIBuilder {
    /// Create a new builder
    pub fn new() -> Self {
        Self {
            api_key: None,
            config: None,
        }
    }

    /// Set API key
    pub fn with_api_key(mut self, api_key: String, model: String) -> Self {
        self.api_key = Some(api_key);
        self.config = Some(OpenAIConfig::default(model));
        self
    }

    /// Set API key with custom base URL
    pub fn with_api_key_and_base_url(
        mut self,
        api_key: String,
        model: String,
        base_url: String,
    ) -> Self {
        self.api_key = Some(api_key);
        self.config = Some(OpenAIConfig::with_base_url(model, base_url));
        self
    }

    /// Build the provider
    pub fn build(self) -> crate::Result<OpenAIProvider> {
        let api_key = self
            .api_key
            .ok_or_else(|| crate::Error::config_error("API key is required"))?;
        let config = self
            .config
            .ok_or_else(|| crate::Error::config_error("Configuration is required"))?;

        Ok(OpenAIProvider::new(api_key, config))
    }
}

impl Default for OpenAIBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::SpanScopeConfig {
    /// Create the configured OpenAI provider
    pub fn create_openai_provider(&self) -> crate::Result<OpenAIProvider> {
        let api_key = self
            .openai_api_key()
            .map_err(|e| crate::Error::config_error(e.to_string()))?;
        let model = self.model.model_name.clone();

        let builder = match &self.model.base_url {
            Some(base_url) => {
                OpenAIBuilder::new().with_api_key_and_base_url(api_key, model, base_url.clone())
            }
            None => OpenAIBuilder::new().with_api_key(api_key, model),
        };
        builder.build()
    }
}
