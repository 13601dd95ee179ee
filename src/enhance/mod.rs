use regex::Regex;
use std::sync::OnceLock;

use crate::config::EnhancerKind;
use crate::errors::Result;
use crate::prompt;
use crate::provider::{GenerateRequest, LlmBackend};
use crate::wire::GenerationOptions;

const QUALITY_SENTENCE: &str = ". The image exhibits exceptional clarity and definition, with perfect lighting balance, \
rich color harmonies, and photorealistic textures. 8K resolution with impeccable detail preservation.";

struct Patterns {
    details: Regex,
    setting: Regex,
    style: Regex,
    mood: Regex,
    elements: Regex,
    composition: Regex,
}

fn patterns() -> &'static Patterns {
    static P: OnceLock<Patterns> = OnceLock::new();
    P.get_or_init(|| {
        let re = |p: &str| Regex::new(p).expect("enhancer pattern is valid");
        Patterns {
            details: re(r"(?i)with ([^,]+(?:details|textures|decoration|patterns))"),
            setting: re(r"(?i)in ([^,]+(?:environment|setting|world|scene))"),
            style: re(r"(?i)style of ([^,]+)"),
            mood: re(r"(?i)with a ([^,]+) mood"),
            elements: re(r"(?i)featuring ([^,]+)"),
            composition: re(r"(?i)with ([^,]+) composition"),
        }
    })
}

fn capture(re: &Regex, text: &str) -> Option<String> {
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// First comma-separated segment, unless it is already a connective clause.
fn subject_clause(prompt: &str) -> Option<&str> {
    let first = prompt.split(',').next()?.trim();
    let lower = first.to_lowercase();
    let connective = ["with ", "in ", "featuring "].iter().any(|c| lower.starts_with(c));
    if first.is_empty() || connective {
        None
    } else {
        Some(first)
    }
}

fn subject_opener(subject: Option<&str>) -> String {
    let Some(subject) = subject else {
        return "A captivating image".to_string();
    };
    let opener = if subject.contains("Portrait") {
        "A captivating and emotive human portrait with striking features"
    } else if subject.contains("Landscape") {
        "A breathtaking landscape with incredible depth and scale"
    } else if subject.contains("Animal") {
        "A majestic animal captured in stunning detail"
    } else if subject.contains("Architecture") {
        "An impressive architectural masterpiece with intricate structural elements"
    } else if subject.contains("Abstract") {
        "A thought-provoking abstract composition with dynamic visual elements"
    } else {
        return format!("A stunning {} with remarkable detail", subject.to_lowercase());
    };
    opener.to_string()
}

/// Local rewrite: pull each clause out of an assembled prompt and re-render
/// it with richer phrasing. Deterministic.
pub fn enhance_pattern(prompt: &str) -> String {
    let p = patterns();
    let mut out = subject_opener(subject_clause(prompt));

    if let Some(details) = capture(&p.details, prompt) {
        out.push_str(&format!(", featuring {} that draw the viewer in", details.to_lowercase()));
    }
    if let Some(setting) = capture(&p.setting, prompt) {
        out.push_str(&format!(", set within a {} that creates a perfect backdrop", setting.to_lowercase()));
    }
    if let Some(elements) = capture(&p.elements, prompt) {
        out.push_str(&format!(", complemented by {} that add depth and interest", elements.to_lowercase()));
    }
    if let Some(composition) = capture(&p.composition, prompt) {
        out.push_str(&format!(
            ", composed with a {} approach that guides the viewer's eye",
            composition.to_lowercase()
        ));
    }
    if let Some(style) = capture(&p.style, prompt) {
        out.push_str(&format!(", rendered in the distinctive style of {} with masterful technique", style));
    }
    if let Some(mood) = capture(&p.mood, prompt) {
        out.push_str(&format!(", evoking a {} atmosphere that resonates with the viewer", mood.to_lowercase()));
    }

    out.push_str(QUALITY_SENTENCE);
    out
}

/// Ask the LLM to rewrite the prompt for the configured template. The reply
/// is returned as-is.
pub async fn enhance_llm(backend: &dyn LlmBackend, prompt: &str, opts: &GenerationOptions) -> Result<String> {
    let req = GenerateRequest {
        model: opts.llm_model.clone(),
        system: Some(prompt::system_prompt_enhance(&opts.prompt_template)),
        prompt: prompt::user_prompt_enhance(prompt),
        temperature: 0.7,
        top_p: 0.9,
    };
    backend.generate(&req).await
}

/// Run exactly one strategy. The LLM strategy's errors propagate.
pub async fn enhance(
    kind: EnhancerKind,
    backend: &dyn LlmBackend,
    prompt: &str,
    opts: &GenerationOptions,
) -> Result<String> {
    match kind {
        EnhancerKind::Pattern => Ok(enhance_pattern(prompt)),
        EnhancerKind::Llm => enhance_llm(backend, prompt, opts).await,
    }
}
