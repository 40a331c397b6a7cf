use anyhow::{anyhow, Result};
use base64::{engine::general_purpose, Engine as _};
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;

/// Client for the Hugging Face hosted inference API. One instance is shared by
/// every model stage.
#[derive(Clone)]
pub struct HuggingFaceClient {
    client: Client,
    base_url: String,
    token: Option<String>,
    wait_for_model: bool,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LabelScore {
    pub label: String,
    pub score: f32,
}

#[derive(Debug, Deserialize)]
struct GeneratedText {
    generated_text: String,
}

impl HuggingFaceClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration, wait_for_model: bool) -> Result<Self> {
        let base = url::Url::parse(base_url).map_err(|e| anyhow!("Invalid inference URL {}: {}", base_url, e))?;
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base.as_str().trim_end_matches('/').to_string(),
            token,
            wait_for_model,
        })
    }

    fn request(&self, model: &str) -> RequestBuilder {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, model))
            .header("Content-Type", "application/json");

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {}", token));
        }
        if self.wait_for_model {
            request = request.header("x-wait-for-model", "true");
        }
        request
    }

    async fn call(&self, model: &str, body: Value) -> Result<Value> {
        let response = self.request(model).json(&body).send().await?;

        let status = response.status();
        let text = response.text().await?;
        let value: Value = serde_json::from_str(&text).unwrap_or(Value::String(text));

        if let Some(error) = value.get("error") {
            return Err(anyhow!("{} returned error ({}): {}", model, status, error));
        }
        if !status.is_success() {
            return Err(anyhow!("{} request failed: Status {}, Body: {}", model, status, value));
        }
        Ok(value)
    }

    /// Image captioning (`image-to-text` task).
    pub async fn image_to_text(&self, model: &str, image: &[u8], parameters: Value) -> Result<String> {
        let body = json!({
            "inputs": general_purpose::STANDARD.encode(image),
            "parameters": parameters,
        });
        let value = self.call(model, body).await?;
        first_generated_text(value)
    }

    /// Image classification, best label first.
    pub async fn classify_image(&self, model: &str, image: &[u8], top_k: usize) -> Result<Vec<LabelScore>> {
        let body = json!({
            "inputs": general_purpose::STANDARD.encode(image),
            "parameters": { "top_k": top_k },
        });
        let value = self.call(model, body).await?;

        // Some deployments wrap the list once more
        let value = match value {
            Value::Array(items) if matches!(items.first(), Some(Value::Array(_))) => {
                items.into_iter().next().unwrap_or(Value::Array(Vec::new()))
            }
            other => other,
        };

        let mut labels: Vec<LabelScore> = serde_json::from_value(value)
            .map_err(|e| anyhow!("Unexpected classification response: {}", e))?;
        labels.sort_by(|a, b| b.score.total_cmp(&a.score));
        labels.truncate(top_k);
        Ok(labels)
    }

    /// Sequence-to-sequence generation (`text2text-generation` task).
    pub async fn text_to_text(&self, model: &str, prompt: &str, parameters: Value) -> Result<String> {
        let body = json!({
            "inputs": prompt,
            "parameters": parameters,
        });
        let value = self.call(model, body).await?;
        first_generated_text(value)
    }
}

fn first_generated_text(value: Value) -> Result<String> {
    let outputs: Vec<GeneratedText> = match value {
        Value::Array(_) => serde_json::from_value(value)?,
        Value::Object(_) => vec![serde_json::from_value(value)?],
        other => return Err(anyhow!("Unexpected response: {}", other)),
    };

    outputs
        .into_iter()
        .next()
        .map(|o| o.generated_text.trim().to_string())
        .ok_or_else(|| anyhow!("Empty response"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn client(server: &MockServer, token: Option<&str>) -> HuggingFaceClient {
        HuggingFaceClient::new(
            &server.url("/models"),
            token.map(String::from),
            Duration::from_secs(5),
            true,
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_image_to_text_sends_base64_and_token() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/models/Salesforce/blip-image-captioning-base")
                .header("Authorization", "Bearer hf_test")
                .header("x-wait-for-model", "true")
                .json_body(json!({"inputs": "AQID", "parameters": {"max_length": 50}}));
            then.status(200)
                .json_body(json!([{"generated_text": " a slice of pizza on a plate "}]));
        });

        let caption = client(&server, Some("hf_test"))
            .image_to_text(
                "Salesforce/blip-image-captioning-base",
                &[1, 2, 3],
                json!({"max_length": 50}),
            )
            .await
            .unwrap();

        mock.assert();
        assert_eq!(caption, "a slice of pizza on a plate");
    }

    #[tokio::test]
    async fn test_classify_sorts_and_truncates() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/nateraw/food");
            then.status(200).json_body(json!([
                {"label": "lasagna", "score": 0.1},
                {"label": "pizza", "score": 0.8},
                {"label": "garlic_bread", "score": 0.05}
            ]));
        });

        let labels = client(&server, None)
            .classify_image("nateraw/food", &[0], 2)
            .await
            .unwrap();

        assert_eq!(labels.len(), 2);
        assert_eq!(labels[0].label, "pizza");
        assert_eq!(labels[1].label, "lasagna");
    }

    #[tokio::test]
    async fn test_classify_accepts_nested_list() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/nateraw/food");
            then.status(200)
                .json_body(json!([[{"label": "sushi", "score": 0.9}]]));
        });

        let labels = client(&server, None)
            .classify_image("nateraw/food", &[0], 5)
            .await
            .unwrap();
        assert_eq!(labels, vec![LabelScore { label: "sushi".into(), score: 0.9 }]);
    }

    #[tokio::test]
    async fn test_model_loading_error_is_surfaced() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/google/flan-t5-large");
            then.status(503)
                .json_body(json!({"error": "Model google/flan-t5-large is currently loading", "estimated_time": 20.0}));
        });

        let err = client(&server, None)
            .text_to_text("google/flan-t5-large", "prompt", json!({}))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("currently loading"));
    }

    #[tokio::test]
    async fn test_text_to_text_accepts_single_object() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/models/google/flan-t5-large");
            then.status(200).json_body(json!({"generated_text": "Ingredients: flour"}));
        });

        let text = client(&server, None)
            .text_to_text("google/flan-t5-large", "prompt", json!({"max_length": 600}))
            .await
            .unwrap();
        assert_eq!(text, "Ingredients: flour");
    }

    #[test]
    fn test_invalid_base_url_rejected() {
        assert!(HuggingFaceClient::new("not a url", None, Duration::from_secs(1), false).is_err());
    }
}
