//! Provider registry: maps a provider name to an adapter constructor.

use std::collections::BTreeMap;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::anthropic::{AnthropicClient, AnthropicSettings};
use super::ProviderAdapter;

/// Per-request provider selection and credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderConfig {
    pub provider: String,
    pub api_key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
}

/// Constructor for one provider's adapter.
pub type ProviderFactory =
    Arc<dyn Fn(&ProviderConfig) -> Arc<dyn ProviderAdapter> + Send + Sync>;

/// Case-insensitive provider lookup table.
///
/// Building an adapter never performs network I/O; connections are opened
/// lazily by [`ProviderAdapter::create_message`].
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the built-in providers, sharing one HTTP client.
    pub fn with_defaults(client: Client, anthropic: AnthropicSettings) -> Self {
        let mut registry = Self::new();
        registry.register("anthropic", move |config: &ProviderConfig| {
            Arc::new(AnthropicClient::new(
                client.clone(),
                config.api_key.clone(),
                config.model.clone(),
                anthropic.clone(),
            )) as Arc<dyn ProviderAdapter>
        });
        registry
    }

    /// Register (or replace) a provider under `name`.
    pub fn register<F>(&mut self, name: &str, factory: F)
    where
        F: Fn(&ProviderConfig) -> Arc<dyn ProviderAdapter> + Send + Sync + 'static,
    {
        self.factories
            .insert(name.trim().to_lowercase(), Arc::new(factory));
    }

    /// Build the adapter named by `config.provider`.
    pub fn build(
        &self,
        config: &ProviderConfig,
    ) -> Result<Arc<dyn ProviderAdapter>, ConfigurationError> {
        let key = config.provider.trim().to_lowercase();
        let factory = self
            .factories
            .get(&key)
            .ok_or_else(|| ConfigurationError::UnsupportedProvider(config.provider.clone()))?;
        tracing::debug!("Building provider adapter: {}", key);
        Ok(factory(config))
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: &str) -> ProviderConfig {
        ProviderConfig {
            provider: provider.to_string(),
            api_key: "sk-test".to_string(),
            model: Some("claude-3-haiku-20240307".to_string()),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive() {
        let registry = ProviderRegistry::with_defaults(Client::new(), AnthropicSettings::default());
        let adapter = registry.build(&config("Anthropic")).unwrap();
        assert_eq!(adapter.model().id, "claude-3-haiku-20240307");
        assert!(registry.build(&config("ANTHROPIC")).is_ok());
    }

    #[test]
    fn test_unsupported_provider() {
        let registry = ProviderRegistry::with_defaults(Client::new(), AnthropicSettings::default());
        let err = registry.build(&config("openai")).err().unwrap();
        assert_eq!(err, ConfigurationError::UnsupportedProvider("openai".to_string()));
        assert_eq!(err.to_string(), "Unsupported provider: openai");
    }

    #[test]
    fn test_providers_listing() {
        let registry = ProviderRegistry::with_defaults(Client::new(), AnthropicSettings::default());
        assert_eq!(registry.providers(), vec!["anthropic".to_string()]);
        assert!(ProviderRegistry::new().providers().is_empty());
    }
}
