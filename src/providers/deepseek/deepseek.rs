use async_trait::async_trait;
use anyhow::Result;
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::chat_completion;
use reqwest::Client;

#[derive(Clone)]
pub struct DeepSeekProvider {
    api_key: String,
    system_message: String,
    client: Client,
    config: ProviderConfig,
}

impl DeepSeekProvider {
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
impl CompletionProvider for DeepSeekProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        Ok(Self::with_config(api_key, system_message, ProviderConfig::from_env("deepseek")))
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
            &[],
        )
        .await
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }

    fn name(&self) -> &'static str {
        "DeepSeek"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_complete_uses_configured_endpoint() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .json_body_partial(r#"{"model": "deepseek-chat"}"#);
            then.status(200).json_body(json!({
                "choices": [{"message": {"content": "1. Boil water"}}]
            }));
        });

        let provider = DeepSeekProvider::with_config(
            "key".to_string(),
            "You are a chef.".to_string(),
            ProviderConfig {
                model: "deepseek-chat".to_string(),
                api_url: server.url("/v1/chat/completions"),
                temperature: 0.8,
            },
        );

        assert_eq!(provider.complete("pasta").await.unwrap(), "1. Boil water");
        assert_eq!(provider.get_model_info().await.unwrap(), "deepseek-chat");
        mock.assert();
    }
}
