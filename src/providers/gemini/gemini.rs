use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::{build_http_client, truncate_for_error};
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct GeminiProvider {
    api_key: String,
    client: Client,
    model: String,
    api_url: String,
    temperature: f32,
}

impl GeminiProvider {
    fn endpoint(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.api_url.trim_end_matches('/'),
            self.model
        )
    }
}

/// Pulls the generated text out of a `generateContent` response.
///
/// Text from every part of the first candidate is concatenated. A blocked
/// prompt or a candidate without text is reported as an error.
pub(crate) fn extract_candidate_text(response: &Value) -> Result<String> {
    if let Some(error) = response.get("error") {
        return Err(anyhow!("API returned error: {}", error));
    }

    if let Some(reason) = response
        .get("promptFeedback")
        .and_then(|feedback| feedback.get("blockReason"))
        .and_then(Value::as_str)
    {
        return Err(anyhow!("Prompt blocked by backend: {}", reason));
    }

    let parts = response
        .get("candidates")
        .and_then(|candidates| candidates.get(0))
        .and_then(|candidate| candidate.get("content"))
        .and_then(|content| content.get("parts"))
        .and_then(Value::as_array)
        .ok_or_else(|| anyhow!("Invalid response format: no candidate content"))?;

    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        let finish_reason = response["candidates"][0]["finishReason"]
            .as_str()
            .unwrap_or("unknown");
        return Err(anyhow!("Candidate contained no text (finish reason: {})", finish_reason));
    }

    Ok(text)
}

#[async_trait]
impl CompletionProvider for GeminiProvider {
    async fn new(api_key: String, config: ProviderConfig) -> Result<Self> {
        Ok(Self {
            api_key,
            client: build_http_client(config.timeout)?,
            model: config.model,
            api_url: config.api_url,
            temperature: config.temperature,
        })
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        let response = self.client
            .post(self.endpoint())
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({
                "contents": [{
                    "role": "user",
                    "parts": [{ "text": prompt }]
                }],
                "generationConfig": {
                    "temperature": self.temperature
                }
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await?;
            return Err(anyhow!(
                "API request failed: Status {}, Body: {}",
                status,
                truncate_for_error(&error_text, 500)
            ));
        }

        let response_json: Value = response.json().await?;
        extract_candidate_text(&response_json)
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }

    fn provider_name(&self) -> &'static str {
        "Gemini"
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }
}
