use anyhow::Context;
use clap::ValueEnum;
use fs_err as fs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::errors::StudioError;

pub mod store;

/// Used only when development mode is on and no LLM URL is configured.
pub const DEV_LLM_URL: &str = "http://localhost:11434";

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnhancerKind {
    /// Local regex rewrite.
    Pattern,
    /// Free-form rewrite by the LLM.
    Llm,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageBackendKind {
    Placeholder,
    #[value(alias = "sdapi")]
    Webui,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub llm_url: Option<String>,
    pub image_url: Option<String>,
    pub image_backend: ImageBackendKind,
    pub enhancer: EnhancerKind,
    pub dev: bool,
    pub timeout_secs: u64,
    pub status_interval_secs: u64,
    pub data_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            llm_url: None,
            image_url: None,
            image_backend: ImageBackendKind::Placeholder,
            enhancer: EnhancerKind::Pattern,
            dev: false,
            timeout_secs: 60,
            status_interval_secs: 30,
            data_dir: PathBuf::from(".promptsmith"),
        }
    }
}

impl Config {
    /// Defaults, then the TOML file (if any), then the process environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut cfg = match path {
            Some(p) => {
                let raw = fs::read_to_string(p)?;
                toml::from_str::<Config>(&raw).with_context(|| format!("parsing {}", p.display()))?
            }
            None => Config::default(),
        };
        cfg.apply_env(|k| std::env::var(k).ok());
        Ok(cfg)
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        if let Some(url) = non_empty("OLLAMA_URL") {
            self.llm_url = Some(url);
        }
        if let Some(url) = non_empty("COMFYUI_URL") {
            self.image_url = Some(url);
        }
        if let Some(dir) = non_empty("PROMPTSMITH_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(kind) = non_empty("PROMPTSMITH_ENHANCER") {
            match EnhancerKind::from_str(&kind, true) {
                Ok(k) => self.enhancer = k,
                Err(_) => log::warn!("ignoring unknown PROMPTSMITH_ENHANCER value {:?}", kind),
            }
        }
    }

    /// Base URL of the LLM server. Missing configuration is an error outside
    /// development mode.
    pub fn llm_base_url(&self) -> Result<String, StudioError> {
        match self.llm_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => Ok(url.to_string()),
            None if self.dev => Ok(DEV_LLM_URL.to_string()),
            None => Err(StudioError::Config("OLLAMA_URL is not set".into())),
        }
    }

    pub fn options_path(&self) -> PathBuf {
        self.data_dir.join("generation-options.json")
    }

    pub fn history_path(&self) -> PathBuf {
        self.data_dir.join("history.sqlite")
    }
}
