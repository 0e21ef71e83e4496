//! Configuration for the secret store and the generation upstream.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the secret-store-over-HTTP data source.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretStoreConfig {
    /// Base URL of the secret-management endpoint.
    #[serde(default = "default_secret_endpoint")]
    pub endpoint: String,
    /// The single secret name this service may read.
    #[serde(default = "default_secret_name")]
    pub secret_name: String,
    /// Identifier of the signing key presented to the secret store.
    #[serde(default = "default_key_id")]
    pub key_id: String,
    /// Signing key material for the service's own identity.
    #[serde(default)]
    pub signing_key: String,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_secret_endpoint() -> String {
    "https://secrets.internal.invalid".to_string()
}

fn default_secret_name() -> String {
    "OPENAI_SECRET".to_string()
}

fn default_key_id() -> String {
    "storyflow-service".to_string()
}

fn default_timeout() -> f64 {
    30.0
}

impl Default for SecretStoreConfig {
    fn default() -> Self {
        Self {
            endpoint: default_secret_endpoint(),
            secret_name: default_secret_name(),
            key_id: default_key_id(),
            signing_key: String::new(),
            timeout_seconds: default_timeout(),
        }
    }
}

impl SecretStoreConfig {
    /// Creates a new secret-store configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the permitted secret name.
    #[must_use]
    pub fn with_secret_name(mut self, name: impl Into<String>) -> Self {
        self.secret_name = name.into();
        self
    }

    /// Sets the signing key material.
    #[must_use]
    pub fn with_signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = key.into();
        self
    }

    /// Gets the timeout as a `Duration`. Negative or NaN values,
    /// reachable through deserialized config, clamp to zero.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Shape of the upstream text-generation call.
///
/// The two variants carry the same data through different wire shapes;
/// which one the upstream expects is deployment configuration, not a
/// property of the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiStyle {
    /// System + user message list, `/v1/chat/completions`.
    Chat,
    /// Single concatenated prompt, `/v1/completions`.
    Completion,
}

impl Default for ApiStyle {
    fn default() -> Self {
        Self::Chat
    }
}

/// Configuration for the generation upstream call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Base URL of the generation upstream.
    #[serde(default = "default_generation_endpoint")]
    pub endpoint: String,
    /// Wire shape of the upstream call.
    #[serde(default)]
    pub api_style: ApiStyle,
    /// Model identifier sent to the upstream.
    #[serde(default = "default_model")]
    pub model: String,
    /// System instruction constraining tone, length and structure.
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
    /// Maximum tokens to generate, when the upstream wants it explicit.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Sampling temperature.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: f64,
}

fn default_generation_endpoint() -> String {
    "https://api.openai.com".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_system_prompt() -> String {
    "You are a wonderful storyteller. You create wonderful, whimsical and \
     imaginative bedtime stories for children. Your stories are a single page \
     but contain an intro, build up, climax, and happy ending."
        .to_string()
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: default_generation_endpoint(),
            api_style: ApiStyle::default(),
            model: default_model(),
            system_prompt: default_system_prompt(),
            max_tokens: None,
            temperature: None,
            timeout_seconds: default_timeout(),
        }
    }
}

impl GenerationConfig {
    /// Creates a new generation configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the upstream endpoint.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Sets the wire shape.
    #[must_use]
    pub fn with_api_style(mut self, style: ApiStyle) -> Self {
        self.api_style = style;
        self
    }

    /// Sets the model identifier.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Sets the system instruction.
    #[must_use]
    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    /// Sets the maximum generated tokens.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Sets the sampling temperature.
    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Returns the resource path for the configured wire shape.
    #[must_use]
    pub fn resource_path(&self) -> &'static str {
        match self.api_style {
            ApiStyle::Chat => "/v1/chat/completions",
            ApiStyle::Completion => "/v1/completions",
        }
    }

    /// Gets the timeout as a `Duration`. Negative or NaN values,
    /// reachable through deserialized config, clamp to zero.
    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_seconds.max(0.0))
    }
}

/// Combined service configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryflowConfig {
    /// Secret-store configuration.
    #[serde(default)]
    pub secret: SecretStoreConfig,
    /// Generation upstream configuration.
    #[serde(default)]
    pub generation: GenerationConfig,
}

impl StoryflowConfig {
    /// Creates a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the secret-store configuration.
    #[must_use]
    pub fn with_secret(mut self, secret: SecretStoreConfig) -> Self {
        self.secret = secret;
        self
    }

    /// Sets the generation configuration.
    #[must_use]
    pub fn with_generation(mut self, generation: GenerationConfig) -> Self {
        self.generation = generation;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn secret_config_defaults() {
        let config = SecretStoreConfig::default();
        assert_eq!(config.secret_name, "OPENAI_SECRET");
        assert_eq!(config.timeout_seconds, 30.0);
    }

    #[test]
    fn generation_config_paths_follow_api_style() {
        let chat = GenerationConfig::new();
        assert_eq!(chat.resource_path(), "/v1/chat/completions");

        let completion = GenerationConfig::new().with_api_style(ApiStyle::Completion);
        assert_eq!(completion.resource_path(), "/v1/completions");
    }

    #[test]
    fn generation_config_builder() {
        let config = GenerationConfig::new()
            .with_model("gpt-4o-mini")
            .with_max_tokens(512)
            .with_temperature(0.7);

        assert_eq!(config.model, "gpt-4o-mini");
        assert_eq!(config.max_tokens, Some(512));
        assert_eq!(config.temperature, Some(0.7));
    }

    #[test]
    fn hostile_timeouts_clamp_to_zero() {
        let secret: SecretStoreConfig =
            serde_json::from_str(r#"{"timeout_seconds": -1}"#).unwrap();
        assert_eq!(secret.timeout(), std::time::Duration::ZERO);

        let generation: GenerationConfig =
            serde_json::from_str(r#"{"timeout_seconds": -0.5}"#).unwrap();
        assert_eq!(generation.timeout(), std::time::Duration::ZERO);

        let mut nan = GenerationConfig::new();
        nan.timeout_seconds = f64::NAN;
        assert_eq!(nan.timeout(), std::time::Duration::ZERO);
    }

    #[test]
    fn config_deserializes_from_partial_json() {
        let config: StoryflowConfig = serde_json::from_str(
            r#"{"generation": {"api_style": "completion", "max_tokens": 256}}"#,
        )
        .unwrap();

        assert_eq!(config.generation.api_style, ApiStyle::Completion);
        assert_eq!(config.generation.max_tokens, Some(256));
        assert_eq!(config.secret.secret_name, "OPENAI_SECRET");
    }
}
