//! Test double for the generation backend: canned replies, injected failures
//! and a record of every prompt it received.

use async_trait::async_trait;
use anyhow::{Result, anyhow};
use parking_lot::Mutex;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::providers::traits::CompletionProvider;

type Responder = dyn Fn(&str) -> Result<String> + Send + Sync;

#[derive(Clone)]
pub struct ScriptedProvider {
    responder: Arc<Responder>,
    prompts: Arc<Mutex<Vec<String>>>,
}

impl ScriptedProvider {
    pub fn replying<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Arc::new(responder),
            prompts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn constant(reply: &str) -> Self {
        let reply = reply.to_string();
        Self::replying(move |_| Ok(reply.clone()))
    }

    pub fn failing(reason: &str) -> Self {
        let reason = reason.to_string();
        Self::replying(move |_| Err(anyhow!(reason.clone())))
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().len()
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().clone()
    }

    pub fn calls_starting_with(&self, prefix: &str) -> usize {
        self.prompts.lock().iter().filter(|p| p.starts_with(prefix)).count()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedProvider {
    async fn new(_api_key: String, _config: ProviderConfig) -> Result<Self> {
        Ok(Self::replying(|prompt| Ok(prompt.to_string())))
    }

    async fn complete(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().push(prompt.to_string());
        (self.responder)(prompt)
    }

    async fn get_model_info(&self) -> Result<String> {
        Ok("scripted".to_string())
    }

    fn provider_name(&self) -> &'static str {
        "Scripted"
    }

    fn clone_box(&self) -> Box<dyn CompletionProvider + Send + Sync> {
        Box::new(self.clone())
    }
}
