use async_trait::async_trait;
use anyhow::{Result, anyhow};
use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;
use crate::providers::utils::{build_http_client, truncate_for_error};
use reqwest::Client;
use serde_json::{json, Value};

#[derive(Clone)]
pub struct DeepSeekProvider {
    api_key: String,
    client: Client,
    model: String,
    api_url: String,
    temperature: f32,
}

fn extract_completion(response_json: &Value) -> Result<String> {
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
            let debug_json = serde_json::to_string(response_json).unwrap_or_default();
            anyhow!("Invalid response format. Response JSON: {}", truncate_for_error(&debug_json, 500))
        })
}

#[async_trait]
impl CompletionProvider for DeepSeekProvider {
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
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "user",
                        "content": prompt
                    }
                ],
                "temperature": self.temperature
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
        extract_completion(&response_json)
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok(self.model.clone())
    }

    fn provider_name(&self) -> &'static str {
        "DeepSeek"
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }
}
