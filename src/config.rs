use std::env;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_OCR_DPI: u32 = 300;
pub const DEFAULT_SESSION_CAPACITY: usize = 256;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("No API key found. Set {0} in your environment or pass --api-key")]
    MissingCredential(&'static str),
    #[error("Unknown provider: {0}. Available providers: gemini, openai, deepseek")]
    UnknownProvider(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Gemini,
    OpenAI,
    DeepSeek,
}

impl ProviderKind {
    pub fn name(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::OpenAI => "openai",
            ProviderKind::DeepSeek => "deepseek",
        }
    }

    /// Environment variable holding this provider's API key.
    pub fn credential_var(&self) -> &'static str {
        match self {
            ProviderKind::Gemini => "GOOGLE_API_KEY",
            ProviderKind::OpenAI => "OPENAI_API_KEY",
            ProviderKind::DeepSeek => "DEEPSEEK_API_KEY",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for ProviderKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(ProviderKind::Gemini),
            "openai" => Ok(ProviderKind::OpenAI),
            "deepseek" => Ok(ProviderKind::DeepSeek),
            other => Err(ConfigError::UnknownProvider(other.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub model: String,
    pub api_url: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn from_env(provider: ProviderKind) -> Self {
        Self::from_vars(provider, |key| env::var(key).ok())
    }

    pub fn from_vars<F>(provider: ProviderKind, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = provider.name().to_uppercase();

        let model_var = match provider {
            ProviderKind::OpenAI => "OPENAI_CHAT_MODEL".to_string(),
            _ => format!("{}_MODEL", prefix),
        };
        let model = lookup(&model_var)
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| match provider {
                ProviderKind::Gemini => "gemini-2.0-flash".to_string(),
                ProviderKind::OpenAI => "gpt-4o-mini".to_string(),
                ProviderKind::DeepSeek => "deepseek-chat".to_string(),
            });

        let api_url = lookup(&format!("{}_API_URL", prefix))
            .unwrap_or_else(|| match provider {
                ProviderKind::Gemini => "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
                ProviderKind::OpenAI => "https://api.openai.com/v1".to_string(),
                ProviderKind::DeepSeek => "https://api.deepseek.com/v1/chat/completions".to_string(),
            });

        let temperature = lookup(&format!("{}_TEMPERATURE", prefix))
            .and_then(|t| t.parse().ok())
            .unwrap_or(0.7);

        let timeout = lookup("LLM_TIMEOUT_SECS")
            .and_then(|t| t.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or_else(|| Duration::from_secs(120));

        Self {
            model,
            api_url,
            temperature,
            timeout,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExtractionConfig {
    /// Directory containing `*.traineddata`; `None` lets tesseract use `TESSDATA_PREFIX`.
    pub tessdata_dir: Option<String>,
    pub ocr_language: String,
    pub ocr_dpi: u32,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            tessdata_dir: None,
            ocr_language: "eng".to_string(),
            ocr_dpi: DEFAULT_OCR_DPI,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider: ProviderKind,
    pub api_key: Option<String>,
    pub provider_config: ProviderConfig,
    pub extraction: ExtractionConfig,
    pub session_capacity: usize,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|key| env::var(key).ok())
    }

    pub fn from_vars<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = match lookup("LLM_PROVIDER") {
            Some(name) if !name.trim().is_empty() => name.parse()?,
            _ => ProviderKind::Gemini,
        };

        let api_key = lookup(provider.credential_var()).filter(|k| !k.trim().is_empty());
        let provider_config = ProviderConfig::from_vars(provider, &lookup);

        let extraction = ExtractionConfig {
            tessdata_dir: lookup("TESSDATA_DIR").filter(|d| !d.trim().is_empty()),
            ocr_language: lookup("OCR_LANG").unwrap_or_else(|| "eng".to_string()),
            ocr_dpi: lookup("OCR_DPI")
                .and_then(|d| d.parse().ok())
                .unwrap_or(DEFAULT_OCR_DPI),
        };

        let session_capacity = lookup("SESSION_CAPACITY")
            .and_then(|c| c.parse().ok())
            .filter(|c: &usize| *c > 0)
            .unwrap_or(DEFAULT_SESSION_CAPACITY);

        Ok(Self {
            provider,
            api_key,
            provider_config,
            extraction,
            session_capacity,
        })
    }

    /// Switches provider, reloading its credential and settings from the environment.
    pub fn with_provider(mut self, provider: ProviderKind) -> Self {
        if provider != self.provider {
            self.provider = provider;
            self.api_key = env::var(provider.credential_var()).ok().filter(|k| !k.trim().is_empty());
            self.provider_config = ProviderConfig::from_env(provider);
        }
        self
    }

    pub fn credential(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .ok_or(ConfigError::MissingCredential(self.provider.credential_var()))
    }
}
