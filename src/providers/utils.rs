use anyhow::{anyhow, Result};
use reqwest::Client;
use serde_json::{json, Value};

/// One request against an OpenAI-compatible `/chat/completions` endpoint.
#[allow(clippy::too_many_arguments)]
pub async fn chat_completion(
    client: &Client,
    api_url: &str,
    api_key: &str,
    model: &str,
    temperature: f32,
    system_message: &str,
    prompt: &str,
    extra_headers: &[(&str, &str)],
) -> Result<String> {
    let mut request = client
        .post(api_url)
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json");

    for (name, value) in extra_headers {
        request = request.header(*name, *value);
    }

    let response = request
        .json(&json!({
            "model": model,
            "messages": [
                {
                    "role": "system",
                    "content": system_message
                },
                {
                    "role": "user",
                    "content": prompt
                }
            ],
            "temperature": temperature
        }))
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let error_text = response.text().await?;
        return Err(anyhow!("API request failed: Status {}, Body: {}", status, error_text));
    }

    let response_json: Value = response.json().await?;

    // Check for API-level errors
    if let Some(error) = response_json.get("error") {
        return Err(anyhow!("API returned error: {}", error));
    }

    response_json
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            let debug_json = serde_json::to_string_pretty(&response_json).unwrap_or_default();
            anyhow!("Invalid response format. Response JSON: {}", debug_json)
        })
}
