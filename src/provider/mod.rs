use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::errors::Result;
use crate::wire::ModelInfo;

pub mod ollama;

/// One non-streaming generation call.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub system: Option<String>,
    pub prompt: String,
    pub temperature: f32,
    pub top_p: f32,
}

#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Returns the raw `response` text of the backend.
    async fn generate(&self, req: &GenerateRequest) -> Result<String>;

    async fn list_models(&self) -> Result<Vec<ModelInfo>>;
}

pub type DynBackend = Arc<dyn LlmBackend>;

pub fn make_backend(cfg: &Config) -> DynBackend {
    Arc::new(ollama::Ollama::new(
        cfg.llm_base_url().ok(),
        Duration::from_secs(cfg.timeout_secs),
    ))
}
