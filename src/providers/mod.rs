pub mod deepseek;
pub mod gemini;
pub mod openai;
pub mod traits;
pub mod utils;

#[cfg(test)]
pub mod scripted;

use anyhow::Result;

use crate::config::{ProviderConfig, ProviderKind};
use deepseek::deepseek::DeepSeekProvider;
use gemini::gemini::GeminiProvider;
use openai::openai::OpenAIProvider;
use traits::CompletionProvider;

/// Instantiates the backend selected by `kind`.
pub async fn build_provider(
    kind: ProviderKind,
    api_key: String,
    config: ProviderConfig,
) -> Result<Box<dyn CompletionProvider + Send + Sync>> {
    let provider: Box<dyn CompletionProvider + Send + Sync> = match kind {
        ProviderKind::Gemini => Box::new(GeminiProvider::new(api_key, config).await?),
        ProviderKind::OpenAI => Box::new(OpenAIProvider::new(api_key, config).await?),
        ProviderKind::DeepSeek => Box::new(DeepSeekProvider::new(api_key, config).await?),
    };
    Ok(provider)
}
