pub mod prompts;
pub mod suggestions;

pub use suggestions::{parse_suggestions, render_history};

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;

use crate::providers::traits::CompletionProvider;

/// Placeholder returned by every operation when no backend could be configured.
pub const NOT_INITIALIZED: &str = "Generation backend not initialized.";

/// Outcome of one backend call.
#[derive(Debug, Clone, PartialEq)]
pub enum Generation {
    Success(String),
    Failure(String),
    /// No backend was configured at startup.
    Unavailable,
}

impl Generation {
    /// Generated text, or `fallback` on failure, or [`NOT_INITIALIZED`].
    pub fn or_placeholder(self, fallback: &str) -> String {
        match self {
            Generation::Success(text) => text,
            Generation::Failure(_) => fallback.to_string(),
            Generation::Unavailable => NOT_INITIALIZED.to_string(),
        }
    }
}

/// Wraps the configured backend so that no call can fail outward.
#[derive(Clone)]
pub struct Generator {
    provider: Option<Arc<dyn CompletionProvider + Send + Sync>>,
    timeout: Duration,
}

impl Generator {
    pub fn new(provider: Box<dyn CompletionProvider + Send + Sync>, timeout: Duration) -> Self {
        Self {
            provider: Some(Arc::from(provider)),
            timeout,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            provider: None,
            timeout: Duration::from_secs(0),
        }
    }

    pub fn is_available(&self) -> bool {
        self.provider.is_some()
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider
            .as_ref()
            .map(|p| p.provider_name())
            .unwrap_or("none")
    }

    pub async fn generate(&self, prompt: &str) -> Generation {
        let Some(provider) = self.provider.as_ref() else {
            debug!("Generation skipped: backend not initialized");
            return Generation::Unavailable;
        };

        debug!(
            "Sending {} char prompt to {}",
            prompt.chars().count(),
            provider.provider_name()
        );

        match timeout(self.timeout, provider.complete(prompt)).await {
            Ok(Ok(text)) => Generation::Success(text.trim().to_string()),
            Ok(Err(e)) => {
                warn!("{} generation failed: {}", provider.provider_name(), e);
                Generation::Failure(e.to_string())
            }
            Err(_) => {
                warn!(
                    "{} generation timed out after {:?}",
                    provider.provider_name(),
                    self.timeout
                );
                Generation::Failure(format!("timed out after {:?}", self.timeout))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::ScriptedProvider;

    fn generator(provider: ScriptedProvider) -> Generator {
        Generator::new(Box::new(provider), Duration::from_secs(5))
    }

    #[tokio::test]
    async fn test_success_is_trimmed() {
        let result = generator(ScriptedProvider::constant("  text \n")).generate("p").await;
        assert_eq!(result, Generation::Success("text".to_string()));
    }

    #[tokio::test]
    async fn test_failure_is_captured() {
        let result = generator(ScriptedProvider::failing("quota exceeded")).generate("p").await;
        assert_eq!(result, Generation::Failure("quota exceeded".to_string()));
        assert_eq!(result.or_placeholder("Comparison failed."), "Comparison failed.");
    }

    #[tokio::test]
    async fn test_unavailable_backend_yields_placeholder() {
        let generator = Generator::unavailable();
        assert!(!generator.is_available());
        let result = generator.generate("p").await;
        assert_eq!(result, Generation::Unavailable);
        assert_eq!(result.or_placeholder("Summary generation failed."), NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_slow_backend_times_out() {
        struct Stalled;

        #[async_trait::async_trait]
        impl CompletionProvider for Stalled {
            async fn new(_: String, _: crate::config::ProviderConfig) -> anyhow::Result<Self> {
                Ok(Stalled)
            }
            async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Ok("late".to_string())
            }
            async fn get_model_info(&self) -> anyhow::Result<String> {
                Ok("stalled".to_string())
            }
            fn provider_name(&self) -> &'static str {
                "Stalled"
            }
            fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
                Box::new(Stalled)
            }
        }

        let generator = Generator::new(Box::new(Stalled), Duration::from_millis(50));
        assert!(matches!(generator.generate("p").await, Generation::Failure(_)));
    }
}
