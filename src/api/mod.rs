use parking_lot::Mutex;

use crate::assemble;
use crate::catalog;
use crate::config::store::OptionsStore;
use crate::config::{Config, EnhancerKind};
use crate::enhance;
use crate::errors::{Result, StudioError};
use crate::history::{History, HistoryEntry};
use crate::image::{self, DynImageBackend};
use crate::options::{self, OptionQuery};
use crate::provider::{self, DynBackend};
use crate::status::StatusChecker;
use crate::wire::{
    EnhanceRequest, EnhanceResponse, GeneratedImage, GenerationOptions, ImageRequest, ModelDetails, ModelInfo,
    ModelSource, ModelsResponse, OptionsRequest, OptionsResponse, PromptRequest, PromptResponse, StatusResponse,
};

/// The studio's request handlers. Shared behind an `Arc` by the session and
/// its spawned fetch tasks.
pub struct Studio {
    cfg: Config,
    llm: DynBackend,
    images: DynImageBackend,
    store: Mutex<OptionsStore>,
    history: History,
}

impl Studio {
    pub fn open(cfg: Config) -> Result<Self> {
        let llm = provider::make_backend(&cfg);
        let images = image::make_image_backend(&cfg);
        let store = OptionsStore::open(cfg.options_path());
        let history = History::open(&cfg.history_path())?;
        Ok(Self::from_parts(cfg, llm, images, store, history))
    }

    pub fn from_parts(
        cfg: Config,
        llm: DynBackend,
        images: DynImageBackend,
        store: OptionsStore,
        history: History,
    ) -> Self {
        Self { cfg, llm, images, store: Mutex::new(store), history }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn generation_options(&self) -> GenerationOptions {
        self.store.lock().get().clone()
    }

    /// Apply `f` to the stored options and persist the result.
    pub fn update_settings<F>(&self, f: F) -> Result<GenerationOptions>
    where
        F: FnOnce(&mut GenerationOptions),
    {
        let mut store = self.store.lock();
        store.update(f)?;
        Ok(store.get().clone())
    }

    pub async fn generate_options(&self, req: OptionsRequest) -> Result<OptionsResponse> {
        let step = req.step.trim();
        if step.is_empty() {
            return Err(StudioError::MissingInput("step".into()));
        }
        if !catalog::is_known_category(step) {
            return Err(StudioError::UnknownCategory(step.to_string()));
        }
        let model = req
            .model
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| self.generation_options().llm_model);
        let query = OptionQuery {
            category: step.to_string(),
            selections: req.selections,
            reroll: req.reroll,
            exclude: req.previous_options,
            model,
        };
        log::debug!("generate_options: step={} reroll={}", query.category, query.reroll);
        options::generate(self.llm.as_ref(), &query, options::OPTION_COUNT).await
    }

    pub fn assemble_prompt(&self, req: PromptRequest) -> Result<PromptResponse> {
        if req.selections.is_empty() {
            return Err(StudioError::MissingInput("selections".into()));
        }
        if let Some(cat) = req.selections.keys().find(|c| !catalog::is_known_category(c)) {
            return Err(StudioError::UnknownCategory(cat.clone()));
        }
        Ok(PromptResponse { prompt: assemble::assemble(&req.selections) })
    }

    /// Enhance with `strategy`, or the configured strategy when `None`.
    pub async fn enhance_prompt(&self, req: EnhanceRequest, strategy: Option<EnhancerKind>) -> Result<EnhanceResponse> {
        if req.prompt.trim().is_empty() {
            return Err(StudioError::MissingInput("prompt".into()));
        }
        let kind = strategy.unwrap_or(self.cfg.enhancer);
        let opts = req.options.or_defaults();
        log::debug!("enhance_prompt: strategy={:?} template={}", kind, opts.prompt_template);
        let enhanced_prompt = enhance::enhance(kind, self.llm.as_ref(), &req.prompt, &opts).await?;
        Ok(EnhanceResponse { enhanced_prompt })
    }

    pub async fn generate_image(&self, req: ImageRequest) -> Result<GeneratedImage> {
        if req.prompt.trim().is_empty() {
            return Err(StudioError::MissingInput("prompt".into()));
        }
        let opts = req.options.map(GenerationOptions::or_defaults).unwrap_or_else(|| self.generation_options());
        let img = image::generate(self.images.as_ref(), &req.prompt, &opts).await;
        self.history.record(&img)?;
        Ok(img)
    }

    pub fn resolve_image(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(StudioError::MissingInput("id".into()));
        }
        Ok(image::resolve_image(id))
    }

    /// Installed models, or the mock set when the server cannot be asked.
    pub async fn list_models(&self) -> ModelsResponse {
        match self.llm.list_models().await {
            Ok(models) => ModelsResponse { models, source: ModelSource::Live, error: None },
            Err(e) => {
                log::warn!("listing models failed, using mock set: {}", e);
                ModelsResponse { models: mock_models(), source: ModelSource::Mock, error: Some(e.to_string()) }
            }
        }
    }

    pub async fn server_status(&self) -> StatusResponse {
        StatusChecker::from_config(&self.cfg).check_once().await
    }

    pub fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>> {
        self.history.recent(limit)
    }
}

pub fn mock_models() -> Vec<ModelInfo> {
    let model = |name: &str, family: &str, size: u64, digest: &str| ModelInfo {
        name: name.into(),
        modified_at: "2024-03-28T10:23:45Z".into(),
        size,
        digest: digest.into(),
        details: ModelDetails {
            format: "gguf".into(),
            family: family.into(),
            families: vec![family.into()],
            parameter_size: "7B".into(),
            quantization_level: None,
        },
    };
    vec![
        model("llama2", "llama", 4_200_000_000, "sha256:abc123"),
        model("mistral", "mistral", 4_800_000_000, "sha256:def456"),
    ]
}
