use async_trait::async_trait;
use base64::{engine::general_purpose, Engine};
use chrono::Utc;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::config::{Config, ImageBackendKind};
use crate::errors::{Result, StudioError};
use crate::wire::{GenerationOptions, GeneratedImage};

const PLACEHOLDER_SVG: &str = "https://v0.dev/placeholder.svg?height=512&width=512";

/// Turns a prompt into an image URL.
#[async_trait]
pub trait ImageBackend: Send + Sync {
    async fn render(&self, prompt: &str, opts: &GenerationOptions) -> Result<String>;

    fn name(&self) -> &'static str;
}

pub type DynImageBackend = Arc<dyn ImageBackend>;

/// Stable id for a prompt: the first 10 characters of its standard base64.
pub fn placeholder_id(prompt: &str) -> String {
    general_purpose::STANDARD.encode(prompt.as_bytes()).chars().take(10).collect()
}

pub fn placeholder_url(prompt: &str) -> String {
    format!("/api/images/{}", placeholder_id(prompt))
}

/// Where a placeholder image id points to.
pub fn resolve_image(id: &str) -> String {
    format!("{}&text={}", PLACEHOLDER_SVG, id)
}

pub struct Placeholder;

#[async_trait]
impl ImageBackend for Placeholder {
    async fn render(&self, prompt: &str, _opts: &GenerationOptions) -> Result<String> {
        Ok(placeholder_url(prompt))
    }

    fn name(&self) -> &'static str {
        "placeholder"
    }
}

/// Automatic1111/Forge `txt2img` API.
pub struct WebUi {
    url: Option<String>,
    client: Client,
}

impl WebUi {
    pub fn new(url: Option<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { url, client }
    }
}

#[async_trait]
impl ImageBackend for WebUi {
    async fn render(&self, prompt: &str, opts: &GenerationOptions) -> Result<String> {
        let base = self
            .url
            .as_deref()
            .ok_or_else(|| StudioError::Config("COMFYUI_URL is not set".into()))?;
        let url = format!("{}/sdapi/v1/txt2img", base.trim_end_matches('/'));
        let body = json!({
            "prompt": prompt,
            "negative_prompt": "blurry, low quality, distorted, deformed",
            "steps": 25,
            "cfg_scale": 7,
            "width": 512,
            "height": 512,
            "override_settings": { "sd_model_checkpoint": opts.image_model },
            "save_images": false,
            "send_images": true,
        });

        log::debug!("webui: POST {} model={}", url, opts.image_model);
        let resp = self.client.post(&url).json(&body).send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(StudioError::Backend(format!("webui responded with status {}", status)));
        }
        let v: Value = resp
            .json()
            .await
            .map_err(|e| StudioError::Malformed(format!("webui body: {}", e)))?;
        let raw = v["images"][0]
            .as_str()
            .ok_or_else(|| StudioError::Malformed("no images in webui response".into()))?;
        let b64 = raw
            .trim_start_matches("data:image/png;base64,")
            .trim_start_matches("data:image/jpeg;base64,");
        Ok(format!("data:image/png;base64,{}", b64))
    }

    fn name(&self) -> &'static str {
        "webui"
    }
}

pub fn make_image_backend(cfg: &Config) -> DynImageBackend {
    match cfg.image_backend {
        ImageBackendKind::Placeholder => Arc::new(Placeholder),
        ImageBackendKind::Webui => Arc::new(WebUi::new(cfg.image_url.clone(), Duration::from_secs(cfg.timeout_secs))),
    }
}

/// Render `prompt`, falling back to the placeholder when the backend fails.
pub async fn generate(backend: &dyn ImageBackend, prompt: &str, opts: &GenerationOptions) -> GeneratedImage {
    let image_url = match backend.render(prompt, opts).await {
        Ok(url) => url,
        Err(e) => {
            log::warn!("{} image backend failed, using placeholder: {}", backend.name(), e);
            placeholder_url(prompt)
        }
    };
    GeneratedImage { image_url, prompt: prompt.to_string(), timestamp: Utc::now().timestamp_millis() }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_id_is_base64_prefix() {
        // base64("hello world") = aGVsbG8gd29ybGQ=
        assert_eq!(placeholder_id("hello world"), "aGVsbG8gd2");
        assert_eq!(placeholder_url("hello world"), "/api/images/aGVsbG8gd2");
        assert_eq!(placeholder_id("hi"), "aGk=");
    }

    #[test]
    fn resolve_points_at_placeholder_svg() {
        assert_eq!(
            resolve_image("aGVsbG8gd2"),
            "https://v0.dev/placeholder.svg?height=512&width=512&text=aGVsbG8gd2"
        );
    }

    #[tokio::test]
    async fn placeholder_backend_is_deterministic() {
        let opts = GenerationOptions::default();
        let a = generate(&Placeholder, "a cat", &opts).await;
        let b = generate(&Placeholder, "a cat", &opts).await;
        assert_eq!(a.image_url, b.image_url);
        assert_eq!(a.prompt, "a cat");
        assert!(a.timestamp > 0);
    }

    #[tokio::test]
    async fn webui_failure_falls_back_to_placeholder() {
        let opts = GenerationOptions::default();
        let unset = WebUi::new(None, Duration::from_secs(1));
        assert!(matches!(unset.render("x", &opts).await, Err(StudioError::Config(_))));
        assert_eq!(generate(&unset, "a cat", &opts).await.image_url, placeholder_url("a cat"));

        let down = WebUi::new(Some("http://127.0.0.1:9".into()), Duration::from_secs(2));
        assert_eq!(generate(&down, "a cat", &opts).await.image_url, placeholder_url("a cat"));
    }
}
