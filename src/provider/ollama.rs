use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{GenerateRequest, LlmBackend};
use crate::errors::{Result, StudioError};
use crate::wire::ModelInfo;

pub struct Ollama {
    url: Option<String>,
    client: Client,
}

#[derive(Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    top_p: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelInfo>,
}

impl Ollama {
    /// `url` is the server base, e.g. `http://localhost:11434`. A missing URL
    /// is reported on each request rather than at construction.
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { url, client }
    }

    fn endpoint(&self, path: &str) -> Result<String> {
        let base = self
            .url
            .as_deref()
            .ok_or_else(|| StudioError::Config("OLLAMA_URL is not set".into()))?;
        Ok(format!("{}/{}", base.trim_end_matches('/'), path))
    }
}

#[async_trait]
impl LlmBackend for Ollama {
    async fn generate(&self, req: &GenerateRequest) -> Result<String> {
        let url = self.endpoint("api/generate")?;
        let body = GenerateBody {
            model: &req.model,
            prompt: &req.prompt,
            system: req.system.as_deref(),
            stream: false,
            options: OllamaOptions { temperature: req.temperature, top_p: req.top_p },
        };

        log::debug!("ollama: POST {} model={}", url, req.model);

        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        let text = resp.text().await?;
        log::debug!("ollama: status {} raw body: {}", status, text);

        if !status.is_success() {
            return Err(StudioError::Backend(format!("ollama responded with status {}: {}", status, text)));
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| StudioError::Malformed(format!("ollama generate body: {}", e)))?;
        Ok(parsed.response)
    }

    async fn list_models(&self) -> Result<Vec<ModelInfo>> {
        let url = self.endpoint("api/tags")?;
        log::debug!("ollama: GET {}", url);

        let resp = self.client.get(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StudioError::Backend(format!("ollama responded with status {}", status)));
        }
        let tags: TagsResponse = resp
            .json()
            .await
            .map_err(|e| StudioError::Malformed(format!("ollama tags body: {}", e)))?;
        Ok(tags.models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req() -> GenerateRequest {
        GenerateRequest {
            model: "llama2".into(),
            system: None,
            prompt: "hi".into(),
            temperature: 0.8,
            top_p: 0.9,
        }
    }

    #[tokio::test]
    async fn missing_url_is_a_config_error() {
        let o = Ollama::new(None, Duration::from_secs(1));
        let err = o.generate(&req()).await.unwrap_err();
        assert!(matches!(err, StudioError::Config(_)));
        assert!(matches!(o.list_models().await.unwrap_err(), StudioError::Config(_)));
    }

    #[tokio::test]
    async fn unreachable_server_is_a_backend_error() {
        // port 9 (discard) is closed on test hosts, so the connect is refused
        let o = Ollama::new(Some("http://127.0.0.1:9".into()), Duration::from_secs(2));
        let err = o.generate(&req()).await.unwrap_err();
        assert!(matches!(err, StudioError::Backend(_)));
    }

    #[test]
    fn endpoint_joins_without_double_slash() {
        let o = Ollama::new(Some("http://host:11434/".into()), Duration::from_secs(1));
        assert_eq!(o.endpoint("api/tags").unwrap(), "http://host:11434/api/tags");
    }

    #[test]
    fn body_omits_missing_system() {
        let r = req();
        let body = GenerateBody {
            model: &r.model,
            prompt: &r.prompt,
            system: None,
            stream: false,
            options: OllamaOptions { temperature: 0.8, top_p: 0.9 },
        };
        let v = serde_json::to_value(&body).unwrap();
        assert!(v.get("system").is_none());
        assert_eq!(v["stream"], false);
    }
}
