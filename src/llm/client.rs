use crate::config::Config;
use crate::types::{AppError, Result, TaskConfig};
use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;
use std::sync::Arc;

/// A finite stream of generated text chunks.
pub type TextStream = BoxStream<'static, Result<String>>;

/// Generic LLM client trait for provider abstraction.
///
/// All providers implement this trait so the pipeline can swap between them
/// per task without changing orchestration code.
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate a completion from a prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Generate with a system prompt
    async fn generate_with_system(&self, system: &str, prompt: &str) -> Result<String>;

    /// Generate a JSON value conforming to the given schema.
    ///
    /// Providers are free to use native JSON modes or plain prompting; either
    /// way the caller receives parsed JSON, never raw text.
    async fn generate_structured(&self, system: &str, prompt: &str, schema: &Value)
        -> Result<Value>;

    /// Stream a completion chunk by chunk
    async fn stream(&self, prompt: &str) -> Result<TextStream>;

    /// Get the model identifier
    fn model_name(&self) -> &str;
}

/// Provider enum for runtime selection from task config.
#[derive(Debug, Clone)]
pub enum Provider {
    OpenAI { api_key: String, model: String },
    Anthropic { api_key: String, model: String },
    Google { api_key: String, model: String },
    XAI { api_key: String, model: String },
}

impl Provider {
    /// Create a client instance for this provider.
    pub fn create_client(&self) -> Result<Arc<dyn LLMClient>> {
        match self {
            Provider::OpenAI { api_key, model } => {
                Ok(Arc::new(super::openai::OpenAICompatClient::new(
                    "https://api.openai.com/v1",
                    api_key.clone(),
                    model.clone(),
                )))
            }
            Provider::Anthropic { api_key, model } => Ok(Arc::new(
                super::anthropic::AnthropicClient::new(api_key.clone(), model.clone()),
            )),
            // Google and xAI expose OpenAI-compatible chat endpoints
            Provider::Google { api_key, model } => {
                Ok(Arc::new(super::openai::OpenAICompatClient::new(
                    "https://generativelanguage.googleapis.com/v1beta/openai",
                    api_key.clone(),
                    model.clone(),
                )))
            }
            Provider::XAI { api_key, model } => {
                Ok(Arc::new(super::openai::OpenAICompatClient::new(
                    "https://api.x.ai/v1",
                    api_key.clone(),
                    model.clone(),
                )))
            }
        }
    }

    /// Get a human-readable name for this provider
    pub fn name(&self) -> &'static str {
        match self {
            Provider::OpenAI { .. } => "OpenAI",
            Provider::Anthropic { .. } => "Anthropic",
            Provider::Google { .. } => "Google",
            Provider::XAI { .. } => "xAI",
        }
    }
}

/// Builds an LLM client for each task from its queue-supplied config.
///
/// Construction failure is a configuration error, fatal to the one task.
pub trait ModelFactory: Send + Sync {
    fn create(&self, config: &TaskConfig) -> Result<Arc<dyn LLMClient>>;
}

/// Factory mapping task config onto [`Provider`] variants, with worker-level
/// API keys as fallback when the task does not carry its own.
pub struct DefaultModelFactory {
    openai_api_key: Option<String>,
    anthropic_api_key: Option<String>,
    google_api_key: Option<String>,
    xai_api_key: Option<String>,
}

impl DefaultModelFactory {
    pub fn new(config: &Config) -> Self {
        Self {
            openai_api_key: config.openai_api_key.clone(),
            anthropic_api_key: config.anthropic_api_key.clone(),
            google_api_key: config.google_api_key.clone(),
            xai_api_key: config.xai_api_key.clone(),
        }
    }

    fn resolve(&self, config: &TaskConfig) -> Result<Provider> {
        let provider = config
            .provider
            .as_deref()
            .unwrap_or("openai")
            .to_lowercase();

        let key_for = |fallback: &Option<String>| -> Result<String> {
            config
                .api_key
                .clone()
                .or_else(|| fallback.clone())
                .ok_or_else(|| {
                    AppError::Configuration(format!(
                        "API key for provider '{}' is required but not provided",
                        provider
                    ))
                })
        };

        match provider.as_str() {
            "openai" => Ok(Provider::OpenAI {
                api_key: key_for(&self.openai_api_key)?,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gpt-4-turbo".to_string()),
            }),
            "anthropic" => Ok(Provider::Anthropic {
                api_key: key_for(&self.anthropic_api_key)?,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "claude-3-opus-20240229".to_string()),
            }),
            "google" => Ok(Provider::Google {
                api_key: key_for(&self.google_api_key)?,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "gemini-pro".to_string()),
            }),
            "xai" => Ok(Provider::XAI {
                api_key: key_for(&self.xai_api_key)?,
                model: config
                    .model
                    .clone()
                    .unwrap_or_else(|| "grok-beta".to_string()),
            }),
            other => Err(AppError::Configuration(format!(
                "Unsupported provider: {}",
                other
            ))),
        }
    }
}

impl ModelFactory for DefaultModelFactory {
    fn create(&self, config: &TaskConfig) -> Result<Arc<dyn LLMClient>> {
        self.resolve(config)?.create_client()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bare_factory() -> DefaultModelFactory {
        DefaultModelFactory {
            openai_api_key: None,
            anthropic_api_key: None,
            google_api_key: None,
            xai_api_key: None,
        }
    }

    #[test]
    fn test_resolve_defaults_to_openai() {
        let factory = bare_factory();
        let config = TaskConfig {
            api_key: Some("sk-test".to_string()),
            ..Default::default()
        };

        let provider = factory.resolve(&config).unwrap();
        match provider {
            Provider::OpenAI { api_key, model } => {
                assert_eq!(api_key, "sk-test");
                assert_eq!(model, "gpt-4-turbo");
            }
            _ => panic!("Expected OpenAI provider"),
        }
    }

    #[test]
    fn test_resolve_unknown_provider_is_configuration_error() {
        let factory = bare_factory();
        let config = TaskConfig {
            provider: Some("cohere".to_string()),
            api_key: Some("key".to_string()),
            ..Default::default()
        };

        match factory.resolve(&config) {
            Err(AppError::Configuration(msg)) => assert!(msg.contains("cohere")),
            other => panic!("Expected configuration error, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_resolve_missing_key_is_configuration_error() {
        let factory = bare_factory();
        let config = TaskConfig {
            provider: Some("anthropic".to_string()),
            ..Default::default()
        };

        assert!(matches!(
            factory.resolve(&config),
            Err(AppError::Configuration(_))
        ));
    }

    #[test]
    fn test_worker_level_key_used_as_fallback() {
        let factory = DefaultModelFactory {
            anthropic_api_key: Some("sk-ant-env".to_string()),
            ..bare_factory()
        };
        let config = TaskConfig {
            provider: Some("anthropic".to_string()),
            model: Some("claude-sonnet-4-20250514".to_string()),
            ..Default::default()
        };

        match factory.resolve(&config).unwrap() {
            Provider::Anthropic { api_key, model } => {
                assert_eq!(api_key, "sk-ant-env");
                assert_eq!(model, "claude-sonnet-4-20250514");
            }
            _ => panic!("Expected Anthropic provider"),
        }
    }
}
