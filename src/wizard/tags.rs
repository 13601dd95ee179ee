use uuid::Uuid;

use crate::assemble;
use crate::catalog;
use crate::errors::{Result, StudioError};
use crate::wire::{Keyword, StepOption};

const DEFAULTS: [(&str, &str); 2] = [("high-quality", "High Quality"), ("detailed", "Detailed")];

/// Tag-mode prompt builder. The quality defaults are always present.
#[derive(Debug, Clone)]
pub struct KeywordBuilder {
    keywords: Vec<Keyword>,
}

impl Default for KeywordBuilder {
    fn default() -> Self {
        let keywords = DEFAULTS
            .iter()
            .map(|(id, label)| Keyword { id: id.to_string(), label: label.to_string(), category: "default".into() })
            .collect();
        Self { keywords }
    }
}

impl KeywordBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keywords(&self) -> &[Keyword] {
        &self.keywords
    }

    pub fn contains(&self, id: &str) -> bool {
        self.keywords.iter().any(|k| k.id == id)
    }

    /// Add the option under `category`, or remove it if already present.
    /// Returns whether it is present afterwards.
    pub fn toggle(&mut self, category: &str, opt: &StepOption) -> Result<bool> {
        if !catalog::TAG_CATEGORIES.iter().any(|c| c.id == category) {
            return Err(StudioError::UnknownCategory(category.to_string()));
        }
        if self.contains(&opt.id) {
            self.remove(&opt.id);
            return Ok(self.contains(&opt.id));
        }
        self.keywords.push(Keyword { id: opt.id.clone(), label: opt.label.clone(), category: category.into() });
        Ok(true)
    }

    /// Remove by id. Defaults are never removed.
    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.keywords.len();
        self.keywords.retain(|k| k.id != id || k.category == "default");
        self.keywords.len() != before
    }

    /// Add free text as a custom keyword. Blank text is ignored.
    pub fn add_custom(&mut self, text: &str) -> Option<&Keyword> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        self.keywords.push(Keyword {
            id: format!("custom-{}", Uuid::new_v4()),
            label: text.to_string(),
            category: "custom".into(),
        });
        self.keywords.last()
    }

    pub fn prompt(&self) -> String {
        assemble::assemble_keywords(&self.keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_survive_remove() {
        let mut b = KeywordBuilder::new();
        assert!(!b.remove("high-quality"));
        let id = b.add_custom("foggy").unwrap().id.clone();
        assert!(b.remove(&id));
        let ids: Vec<_> = b.keywords().iter().map(|k| k.id.as_str()).collect();
        assert_eq!(ids, ["high-quality", "detailed"]);
    }

    #[test]
    fn toggle_adds_then_removes() {
        let mut b = KeywordBuilder::new();
        let neon = StepOption::new("neon", "Neon", "");
        assert!(b.toggle("lighting", &neon).unwrap());
        assert!(b.contains("neon"));
        assert!(!b.toggle("lighting", &neon).unwrap());
        assert_eq!(b.keywords().len(), 2);
    }

    #[test]
    fn toggle_rejects_unknown_category() {
        let mut b = KeywordBuilder::new();
        let err = b.toggle("weather", &StepOption::new("rain", "Rain", "")).unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn toggling_a_default_id_keeps_it() {
        let mut b = KeywordBuilder::new();
        let d = StepOption::new("detailed", "Detailed", "");
        assert!(b.toggle("style", &d).unwrap());
        assert_eq!(b.keywords().iter().filter(|k| k.id == "detailed").count(), 1);
    }

    #[test]
    fn custom_keywords_get_unique_ids() {
        let mut b = KeywordBuilder::new();
        let a = b.add_custom("rain").unwrap().id.clone();
        let c = b.add_custom("rain").unwrap().id.clone();
        assert!(a.starts_with("custom-"));
        assert_ne!(a, c);
        assert!(b.add_custom("   ").is_none());
    }

    #[test]
    fn prompt_ends_with_defaults() {
        let mut b = KeywordBuilder::new();
        b.toggle("subject", &StepOption::new("cityscape", "Cityscape", "")).unwrap();
        b.add_custom("rain-slicked streets");
        assert_eq!(b.prompt(), "Cityscape, rain-slicked streets, High Quality, Detailed");
    }
}
