use regex::Regex;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::OnceLock;

use crate::catalog;
use crate::errors::{Result, StudioError};
use crate::prompt;
use crate::provider::{GenerateRequest, LlmBackend};
use crate::wire::{OptionSource, OptionsResponse, Selections, StepOption};

/// Number of option slots the wizard renders.
pub const OPTION_COUNT: usize = 6;

/// Everything needed to produce one option set.
#[derive(Debug, Clone)]
pub struct OptionQuery {
    pub category: String,
    pub selections: Selections,
    pub reroll: bool,
    /// Labels currently on screen; avoided when rerolling.
    pub exclude: Vec<String>,
    pub model: String,
}

fn fence_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"```[A-Za-z0-9_-]*").expect("fence pattern is valid"))
}

/// Strip markdown code fences, then unwrap a JSON string literal or strip
/// surrounding quote characters.
pub fn clean_response(raw: &str) -> String {
    let without_fences = fence_re().replace_all(raw, "");
    let trimmed = without_fences.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        if let Ok(inner) = serde_json::from_str::<String>(trimmed) {
            return inner.trim().to_string();
        }
    }
    trimmed
        .trim_matches(|c| c == '"' || c == '\'' || c == '`')
        .trim()
        .to_string()
}

/// First balanced `open`..`close` span, ignoring brackets inside JSON strings.
fn extract_balanced(s: &str, open: char, close: char) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_str = false;
    let mut escaped = false;

    for (i, c) in s.char_indices() {
        if in_str {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_str = false,
                _ => {}
            }
            continue;
        }
        if c == '"' && start.is_some() {
            in_str = true;
        } else if c == open {
            if start.is_none() {
                start = Some(i);
            }
            depth += 1;
        } else if c == close && depth > 0 {
            depth -= 1;
            if depth == 0 {
                let st = start?;
                return Some(&s[st..i + c.len_utf8()]);
            }
        }
    }
    None
}

fn parse_value(cleaned: &str) -> Result<Value> {
    match serde_json::from_str::<Value>(cleaned) {
        // a JSON string literal wrapping the payload
        Ok(Value::String(inner)) => serde_json::from_str::<Value>(inner.trim())
            .map_err(|e| StudioError::Malformed(format!("quoted payload is not JSON: {}", e))),
        Ok(v) => Ok(v),
        Err(first) => [('[', ']'), ('{', '}')]
            .iter()
            .filter_map(|&(open, close)| extract_balanced(cleaned, open, close))
            .find_map(|span| serde_json::from_str::<Value>(span).ok())
            .ok_or_else(|| StudioError::Malformed(format!("response is not JSON: {}", first))),
    }
}

fn string_field(item: &Value, key: &str) -> Option<String> {
    item.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Suffix repeated ids with `-2`, `-3`, ... so ids are unique within the set.
fn make_ids_unique(options: &mut [StepOption]) {
    let mut seen: HashSet<String> = HashSet::new();
    for opt in options.iter_mut() {
        if seen.insert(opt.id.clone()) {
            continue;
        }
        let mut n = 2;
        let mut candidate = format!("{}-{}", opt.id, n);
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{}-{}", opt.id, n);
        }
        seen.insert(candidate.clone());
        opt.id = candidate;
    }
}

/// Parse the free-text LLM response into options.
///
/// Accepts a bare array or an object with an `options` array. The whole set
/// is rejected when it is empty or any element lacks a string `id` or `label`.
pub fn parse_options(raw: &str) -> Result<Vec<StepOption>> {
    let cleaned = clean_response(raw);
    let items = match parse_value(&cleaned)? {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("options") {
            Some(Value::Array(items)) => items,
            _ => return Err(StudioError::Malformed("object has no options array".into())),
        },
        other => return Err(StudioError::Malformed(format!("unexpected JSON value: {}", other))),
    };

    if items.is_empty() {
        return Err(StudioError::Malformed("empty option list".into()));
    }

    let mut options = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let id = string_field(item, "id")
            .ok_or_else(|| StudioError::Malformed(format!("option {} has no string id", i)))?;
        let label = string_field(item, "label")
            .ok_or_else(|| StudioError::Malformed(format!("option {} has no string label", i)))?;
        let description = string_field(item, "description").unwrap_or_default();
        options.push(StepOption { id, label, description });
    }
    make_ids_unique(&mut options);
    Ok(options)
}

/// Truncate or pad to exactly `count` options. Padding ids are derived from
/// the category and slot number so they are stable across calls.
pub fn normalize(mut options: Vec<StepOption>, category: &str, count: usize) -> Vec<StepOption> {
    options.truncate(count);
    while options.len() < count {
        let n = options.len() + 1;
        options.push(StepOption::new(format!("{}-option-{}", category, n), format!("Option {}", n), ""));
    }
    make_ids_unique(&mut options);
    options
}

/// Ask the LLM for options. Errors are returned to the caller untouched.
pub async fn from_llm(backend: &dyn LlmBackend, query: &OptionQuery, count: usize) -> Result<Vec<StepOption>> {
    let req = GenerateRequest {
        model: query.model.clone(),
        system: Some(prompt::system_prompt_options()),
        prompt: prompt::user_prompt_options(
            &query.category,
            &query.selections,
            if query.reroll { &query.exclude } else { &[] },
            count,
        ),
        temperature: 0.8,
        top_p: 0.9,
    };
    let text = backend.generate(&req).await?;
    let parsed = parse_options(&text)?;
    Ok(normalize(parsed, &query.category, count))
}

/// Catalog options for the query, normalized to `count`.
pub fn from_catalog(query: &OptionQuery, count: usize) -> Result<Vec<StepOption>> {
    let mut rng = rand::thread_rng();
    let opts = catalog::lookup(
        &query.category,
        &query.selections,
        query.reroll,
        &query.exclude,
        count,
        &mut rng,
    )
    .ok_or_else(|| StudioError::UnknownCategory(query.category.clone()))?;
    Ok(normalize(opts, &query.category, count))
}

/// LLM options with catalog fallback. Only client errors (unknown or empty
/// category) surface; every backend failure degrades to the catalog.
pub async fn generate(backend: &dyn LlmBackend, query: &OptionQuery, count: usize) -> Result<OptionsResponse> {
    if query.category.trim().is_empty() {
        return Err(StudioError::MissingInput("step".into()));
    }
    if !catalog::is_known_category(&query.category) {
        return Err(StudioError::UnknownCategory(query.category.clone()));
    }

    match from_llm(backend, query, count).await {
        Ok(options) => Ok(OptionsResponse { options, source: OptionSource::Llm, error: None }),
        Err(e) => {
            log::warn!("option generation for {} fell back to catalog: {}", query.category, e);
            Ok(OptionsResponse {
                options: from_catalog(query, count)?,
                source: OptionSource::Fallback,
                error: Some(e.to_string()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ModelInfo;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Scripted {
        reply: std::result::Result<String, String>,
        prompts: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn ok(text: &str) -> Self {
            Self { reply: Ok(text.into()), prompts: Mutex::new(Vec::new()) }
        }
        fn failing() -> Self {
            Self { reply: Err("connection refused".into()), prompts: Mutex::new(Vec::new()) }
        }
    }

    #[async_trait]
    impl LlmBackend for Scripted {
        async fn generate(&self, req: &GenerateRequest) -> Result<String> {
            self.prompts.lock().push(req.prompt.clone());
            self.reply.clone().map_err(StudioError::Backend)
        }
        async fn list_models(&self) -> Result<Vec<ModelInfo>> {
            Ok(vec![])
        }
    }

    fn query(category: &str) -> OptionQuery {
        OptionQuery {
            category: category.into(),
            selections: Selections::new(),
            reroll: false,
            exclude: vec![],
            model: "gemma3:1b".into(),
        }
    }

    #[test]
    fn parses_fenced_array() {
        let raw = "```json\n[{\"id\":\"fox\",\"label\":\"red fox\"},{\"id\":\"owl\",\"label\":\"owl\",\"description\":\"A wise bird.\"}]\n```";
        let opts = parse_options(raw).unwrap();
        assert_eq!(opts.len(), 2);
        assert_eq!(opts[0].label, "red fox");
        assert_eq!(opts[0].description, "");
        assert_eq!(opts[1].description, "A wise bird.");
    }

    #[test]
    fn parses_object_with_options_field() {
        let raw = r#"{"options":[{"id":"misty-lake","label":"misty lake","description":"Fog over still water."}]}"#;
        assert_eq!(parse_options(raw).unwrap()[0].id, "misty-lake");
    }

    #[test]
    fn parses_quoted_payload() {
        let raw = r#""[{\"id\":\"a\",\"label\":\"A\"}]""#;
        assert_eq!(parse_options(raw).unwrap()[0].label, "A");
        let single = "'[{\"id\":\"b\",\"label\":\"B\"}]'";
        assert_eq!(parse_options(single).unwrap()[0].label, "B");
        let fenced = "```json\n\"[{\\\"id\\\":\\\"c\\\",\\\"label\\\":\\\"C\\\"}]\"\n```";
        assert_eq!(parse_options(fenced).unwrap()[0].label, "C");
    }

    #[test]
    fn retries_on_embedded_array() {
        let raw = "Sure! Here are your options:\n[{\"id\":\"x\",\"label\":\"brackets ] inside\"}]\nEnjoy.";
        let opts = parse_options(raw).unwrap();
        assert_eq!(opts[0].label, "brackets ] inside");
    }

    #[test]
    fn object_span_is_tried_after_prose_brackets() {
        let raw = "Here are options [as requested]:\n{\"options\":[{\"id\":\"fox\",\"label\":\"fox\"}]}";
        let opts = parse_options(raw).unwrap();
        assert_eq!(opts.len(), 1);
        assert_eq!(opts[0].label, "fox");
    }

    #[test]
    fn rejects_bad_shapes() {
        assert!(parse_options("not json at all").is_err());
        assert!(parse_options("[]").is_err());
        assert!(parse_options(r#"{"choices":[]}"#).is_err());
        assert!(parse_options(r#"[{"id":"a","label":"A"},{"id":3,"label":"B"}]"#).is_err());
        assert!(parse_options(r#"[{"id":"a"}]"#).is_err());
    }

    #[test]
    fn duplicate_ids_become_unique() {
        let opts = parse_options(r#"[{"id":"a","label":"A"},{"id":"a","label":"B"},{"id":"a","label":"C"}]"#).unwrap();
        let ids: Vec<_> = opts.iter().map(|o| o.id.as_str()).collect();
        assert_eq!(ids, ["a", "a-2", "a-3"]);
    }

    #[test]
    fn normalize_pads_and_truncates() {
        let two = vec![StepOption::new("a", "A", ""), StepOption::new("b", "B", "")];
        let padded = normalize(two, "mood", 6);
        assert_eq!(padded.len(), 6);
        assert_eq!(padded[2].id, "mood-option-3");
        assert_eq!(padded[5].label, "Option 6");
        assert_eq!(normalize(padded.clone(), "mood", 6), padded);

        let many: Vec<_> = (0..9).map(|i| StepOption::new(format!("o{}", i), "x", "")).collect();
        assert_eq!(normalize(many, "mood", 6).len(), 6);
    }

    #[tokio::test]
    async fn llm_short_list_is_padded_to_six() {
        let backend = Scripted::ok(r#"[{"id":"cat","label":"cat"}]"#);
        let resp = generate(&backend, &query("subject"), OPTION_COUNT).await.unwrap();
        assert_eq!(resp.source, OptionSource::Llm);
        assert_eq!(resp.options.len(), 6);
        assert_eq!(resp.options[0].label, "cat");
        assert!(resp.error.is_none());
    }

    #[tokio::test]
    async fn unreachable_llm_falls_back_to_six_catalog_options() {
        let backend = Scripted::failing();
        let resp = generate(&backend, &query("setting"), OPTION_COUNT).await.unwrap();
        assert_eq!(resp.source, OptionSource::Fallback);
        assert_eq!(resp.options.len(), 6);
        assert_eq!(resp.options[0].id, "urban");
        assert!(resp.error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn malformed_llm_reply_falls_back() {
        let backend = Scripted::ok("I cannot help with that.");
        let resp = generate(&backend, &query("lighting"), OPTION_COUNT).await.unwrap();
        assert_eq!(resp.source, OptionSource::Fallback);
        assert_eq!(resp.options.len(), 6);
        assert_eq!(resp.options[0].label, "Natural Light");
    }

    #[tokio::test]
    async fn client_errors_skip_the_backend() {
        let backend = Scripted::ok("[]");
        let err = generate(&backend, &query(""), OPTION_COUNT).await.unwrap_err();
        assert!(matches!(err, StudioError::MissingInput(_)));
        let err = generate(&backend, &query("weather"), OPTION_COUNT).await.unwrap_err();
        assert!(matches!(err, StudioError::UnknownCategory(_)));
        assert!(backend.prompts.lock().is_empty());
    }

    #[tokio::test]
    async fn reroll_prompt_lists_labels_to_avoid() {
        let backend = Scripted::ok(r#"[{"id":"a","label":"A"}]"#);
        let mut q = query("style");
        q.reroll = true;
        q.exclude = vec!["Watercolor".into()];
        generate(&backend, &q, OPTION_COUNT).await.unwrap();
        assert!(backend.prompts.lock()[0].contains("Previous options to avoid: Watercolor"));
    }
}
