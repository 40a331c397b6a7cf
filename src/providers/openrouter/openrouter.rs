use async_trait::async_trait;
use anyhow::Result;
use crate::config::{ProviderConfig, APP_NAME};
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::chat_completion;
use reqwest::Client;

#[derive(Clone)]
pub struct OpenRouterProvider {
    api_key: String,
    system_message: String,
    client: Client,
    config: ProviderConfig,
}

impl OpenRouterProvider {
    pub fn with_config(api_key: String, system_message: String, config: ProviderConfig) -> Self {
        Self {
            api_key,
            system_message,
            client: Client::new(),
            config,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenRouterProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        Ok(Self::with_config(api_key, system_message, ProviderConfig::from_env("openrouter")))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        chat_completion(
            &self.client,
            &self.config.api_url,
            &self.api_key,
            &self.config.model,
            self.config.temperature,
            &self.system_message,
            prompt,
            &[("X-Title", APP_NAME)],
        )
        .await
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }

    fn name(&self) -> &'static str {
        "OpenRouter"
    }
}
