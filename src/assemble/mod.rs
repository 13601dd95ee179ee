use crate::wire::{Keyword, Selections};

/// Quality boilerplate appended to every wizard prompt.
pub const QUALITY_SUFFIX: &str = "high quality, detailed, 8k resolution";

/// Precedence and phrasing of wizard categories. Anything not listed is
/// ignored when assembling a wizard prompt.
const WIZARD_PHRASES: &[(&str, Phrase)] = &[
    ("subject", Phrase::Bare),
    ("details", Phrase::Around("with ", "")),
    ("setting", Phrase::Around("in ", "")),
    ("elements", Phrase::Around("featuring ", "")),
    ("composition", Phrase::Around("with ", " composition")),
    ("style", Phrase::Around("in the style of ", "")),
    ("mood", Phrase::Around("with a ", " mood")),
];

/// Tag-mode extensions, placed after mood.
const TAG_EXTRA_PHRASES: &[(&str, Phrase)] = &[
    ("lighting", Phrase::Around("with ", " lighting")),
    ("color", Phrase::Around("in ", " colors")),
    ("time", Phrase::Around("from ", " era")),
];

#[derive(Debug, Clone, Copy)]
enum Phrase {
    Bare,
    Around(&'static str, &'static str),
}

impl Phrase {
    fn render(self, label: &str) -> String {
        match self {
            Phrase::Bare => label.to_string(),
            Phrase::Around(pre, post) => format!("{}{}{}", pre, label, post),
        }
    }
}

/// Build a prompt from wizard selections. Empty selections yield "".
pub fn assemble(selections: &Selections) -> String {
    let mut parts: Vec<String> = WIZARD_PHRASES
        .iter()
        .filter_map(|(cat, phrase)| selections.get(*cat).map(|opt| phrase.render(&opt.label)))
        .collect();
    if parts.is_empty() {
        return String::new();
    }
    parts.push(QUALITY_SUFFIX.to_string());
    parts.join(", ")
}

/// Build a prompt from tag-mode keywords.
///
/// Catalog categories render in the same precedence as the wizard, with
/// same-category labels joined by " and ". Custom keywords follow in
/// insertion order, then the default keywords close the prompt.
pub fn assemble_keywords(keywords: &[Keyword]) -> String {
    let mut parts: Vec<String> = Vec::new();

    for (cat, phrase) in WIZARD_PHRASES.iter().chain(TAG_EXTRA_PHRASES) {
        let labels: Vec<&str> = keywords
            .iter()
            .filter(|k| k.category == *cat)
            .map(|k| k.label.as_str())
            .collect();
        if !labels.is_empty() {
            parts.push(phrase.render(&labels.join(" and ")));
        }
    }

    for group in ["custom", "default"] {
        parts.extend(keywords.iter().filter(|k| k.category == group).map(|k| k.label.clone()));
    }

    parts.join(", ")
}
