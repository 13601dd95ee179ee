use fs_err as fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::errors::{Result, StudioError};
use crate::wire::GenerationOptions;

/// Persisted generation options. Read once when opened, written through on
/// every change.
#[derive(Debug)]
pub struct OptionsStore {
    path: PathBuf,
    current: GenerationOptions,
}

impl OptionsStore {
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let current = match read_options(&path) {
            Ok(Some(opts)) => opts.or_defaults(),
            Ok(None) => GenerationOptions::default(),
            Err(e) => {
                log::warn!("could not load {}: {}; using defaults", path.display(), e);
                GenerationOptions::default()
            }
        };
        Self { path, current }
    }

    pub fn get(&self) -> &GenerationOptions {
        &self.current
    }

    pub fn set(&mut self, opts: GenerationOptions) -> Result<()> {
        let opts = opts.or_defaults();
        write_atomic(&self.path, &opts)?;
        self.current = opts;
        Ok(())
    }

    pub fn update<F>(&mut self, f: F) -> Result<()>
    where
        F: FnOnce(&mut GenerationOptions),
    {
        let mut next = self.current.clone();
        f(&mut next);
        self.set(next)
    }
}

fn read_options(path: &Path) -> anyhow::Result<Option<GenerationOptions>> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)?;
    Ok(Some(serde_json::from_str(&raw)?))
}

fn write_atomic(path: &Path, opts: &GenerationOptions) -> Result<()> {
    let storage = |e: std::io::Error| StudioError::Storage(format!("{}: {}", path.display(), e));
    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    fs::create_dir_all(dir).map_err(storage)?;

    let json = serde_json::to_string_pretty(opts).map_err(|e| StudioError::Storage(e.to_string()))?;
    let mut tmp = NamedTempFile::new_in(dir).map_err(storage)?;
    tmp.write_all(json.as_bytes()).map_err(storage)?;
    tmp.persist(path).map_err(|e| storage(e.error))?;
    Ok(())
}
