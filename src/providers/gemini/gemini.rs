use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    system_message: String,
    client: Client,
    config: ProviderConfig,
}

impl GeminiProvider {
    pub fn with_config(api_key: String, system_message: String, config: ProviderConfig) -> Self {
        Self {
            api_key,
            system_message,
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.api_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn new(api_key: String, system_message: String) -> Result<Self> {
        Ok(Self::with_config(api_key, system_message, ProviderConfig::from_env("gemini")))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [{
                        "text": format!("{}\n{}", self.system_message, prompt)
                    }]
                }],
                "generationConfig": {
                    "temperature": self.config.temperature
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!("Gemini request failed: Status {}, Body: {}", status, error_text));
        }

        let response_json: Value = response.json().await?;

        response_json["candidates"][0]["content"]["parts"][0]["text"]
            .as_str()
            .map(|s| s.to_string())
            .ok_or_else(|| anyhow!("Invalid response format"))
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.config.model.clone())
    }

    fn name(&self) -> &'static str {
        "Gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_complete_parses_candidate_text() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/gemini-1.5-flash:generateContent")
                .query_param("key", "gkey");
            then.status(200).json_body(json!({
                "candidates": [{"content": {"parts": [{"text": "Serves 4"}]}}]
            }));
        });

        let provider = GeminiProvider::with_config(
            "gkey".to_string(),
            "chef".to_string(),
            ProviderConfig {
                model: "gemini-1.5-flash".to_string(),
                api_url: server.url("/models"),
                temperature: 0.7,
            },
        );

        assert_eq!(provider.complete("soup").await.unwrap(), "Serves 4");
        mock.assert();
    }
}
