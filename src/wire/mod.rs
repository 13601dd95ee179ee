use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// ========================================
/// Request/Response shapes of the studio handlers
/// ========================================

/// One selectable option for a wizard step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepOption {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub description: String,
}

impl StepOption {
    pub fn new(id: impl Into<String>, label: impl Into<String>, description: impl Into<String>) -> Self {
        Self { id: id.into(), label: label.into(), description: description.into() }
    }
}

/// Wizard selections: one option per category id.
pub type Selections = BTreeMap<String, StepOption>;

/// Tag-mode keyword. `category` is a catalog category, "custom" or "default".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keyword {
    pub id: String,
    pub label: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationOptions {
    #[serde(default, alias = "model")]
    pub llm_model: String,
    #[serde(default)]
    pub prompt_template: String,
    #[serde(default)]
    pub image_model: String,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            llm_model: "gemma3:1b".into(),
            prompt_template: "illustrious".into(),
            image_model: "sdxl".into(),
        }
    }
}

impl GenerationOptions {
    /// Replace blank fields with the defaults.
    pub fn or_defaults(mut self) -> Self {
        let d = Self::default();
        if self.llm_model.trim().is_empty() { self.llm_model = d.llm_model; }
        if self.prompt_template.trim().is_empty() { self.prompt_template = d.prompt_template; }
        if self.image_model.trim().is_empty() { self.image_model = d.image_model; }
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionSource {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionsRequest {
    #[serde(default, alias = "category")]
    pub step: String,
    #[serde(default)]
    pub selections: Selections,
    #[serde(default, alias = "isReroll")]
    pub reroll: bool,
    /// Labels currently shown; excluded when rerolling.
    #[serde(default)]
    pub previous_options: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionsResponse {
    pub options: Vec<StepOption>,
    pub source: OptionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptRequest {
    #[serde(default)]
    pub selections: Selections,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptResponse {
    pub prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnhanceRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub options: GenerationOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnhanceResponse {
    pub enhanced_prompt: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImageRequest {
    #[serde(default)]
    pub prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<GenerationOptions>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedImage {
    pub image_url: String,
    pub prompt: String,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDetails {
    #[serde(default)]
    pub format: String,
    #[serde(default)]
    pub family: String,
    #[serde(default)]
    pub families: Vec<String>,
    #[serde(default)]
    pub parameter_size: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantization_level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub modified_at: String,
    #[serde(default)]
    pub size: u64,
    #[serde(default)]
    pub digest: String,
    #[serde(default = "empty_details")]
    pub details: ModelDetails,
}

fn empty_details() -> ModelDetails {
    ModelDetails {
        format: String::new(),
        family: String::new(),
        families: Vec::new(),
        parameter_size: String::new(),
        quantization_level: None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModelSource {
    Live,
    Mock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    pub models: Vec<ModelInfo>,
    pub source: ModelSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerState {
    Online,
    Offline,
    Checking,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub llm_server: ServerState,
    pub comfy_server: ServerState,
    pub timestamp: DateTime<Utc>,
}
