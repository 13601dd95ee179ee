use crate::catalog::WIZARD_STEPS;
use crate::wire::Selections;

fn label_guidelines() -> &'static str {
r#"1. Each option's label MUST be brief:
   - For 'subject': Single word or short phrase (e.g., "cat", "red fox", "old castle")
   - For 'details': 1-2 descriptive words (e.g., "sleeping", "running swiftly")
   - For 'setting': Simple location (e.g., "forest", "misty lake", "city street")
   - For 'style': Single art style (e.g., "watercolor", "pixel art")
   - For 'mood': Single mood word (e.g., "peaceful", "mysterious")
   - For 'elements': Single supporting element (e.g., "moonlight", "falling leaves")
   - For 'composition': Simple framing (e.g., "close-up", "wide shot")
   - For any other category: one or two evocative words"#
}

pub fn system_prompt_options() -> String {
    format!(
"You are an AI assistant for a text-to-image prompt builder. You will generate concise options for each step of the image creation process. Respond strictly in JSON format.

**Response Guidelines**:
{guidelines}

2. Descriptions should be ONE short sentence only.
3. IDs should be kebab-case versions of the labels.

Example response format:
{{
  \"options\": [
    {{
      \"id\": \"sleeping-cat\",
      \"label\": \"sleeping cat\",
      \"description\": \"A cat curled up in a peaceful slumber.\"
    }}
  ]
}}",
guidelines = label_guidelines())
}

/// Prior selections as `category: label` lines in wizard order, then any
/// other categories alphabetically.
pub fn describe_selections(selections: &Selections) -> String {
    let mut lines: Vec<String> = Vec::new();
    for step in WIZARD_STEPS.iter() {
        if let Some(opt) = selections.get(step.id) {
            lines.push(format!("{}: {}", step.id, opt.label));
        }
    }
    for (cat, opt) in selections {
        if !WIZARD_STEPS.iter().any(|s| s.id == cat) {
            lines.push(format!("{}: {}", cat, opt.label));
        }
    }
    lines.join("\n")
}

pub fn user_prompt_options(step: &str, selections: &Selections, avoid: &[String], count: usize) -> String {
    let context = describe_selections(selections);
    let context = if context.is_empty() {
        "No previous selections".to_string()
    } else {
        format!("Previous selections:\n{}", context)
    };
    let avoid = if avoid.is_empty() {
        String::new()
    } else {
        format!("\nPrevious options to avoid: {}\n", avoid.join(", "))
    };

    format!(
"Task: generate_options
Current step: {step}
{context}
{avoid}
Generate {count} options following the system guidelines for response format.
Remember:
- Keep labels brief and specific
- One short sentence for descriptions
- Make each option distinct and creative{reroll}",
step = step,
context = context,
avoid = avoid,
count = count,
reroll = if avoid.is_empty() { "" } else { "\n- Provide completely different options from the ones to avoid" })
}

/// Style hint for the image model family the prompt is written for.
fn template_hint(template: &str) -> &'static str {
    match template.to_ascii_lowercase().as_str() {
        "illustrious" => "The target model is an Illustrious (SDXL anime) checkpoint: favour comma-separated descriptive tags, keep the subject first.",
        "flux" | "flux.1" | "flux1d" | "flux.1-d" => "The target model is Flux.1 Dev: write fluent natural-language sentences, be concrete about lighting and camera.",
        "pony" => "The target model is a Pony Diffusion checkpoint: start with quality tags such as score_9, score_8_up, then comma-separated tags.",
        _ => "Write a single rich natural-language description.",
    }
}

pub fn system_prompt_enhance(template: &str) -> String {
    format!(
"You rewrite text-to-image prompts so they produce striking images.
Keep every subject, setting, style and mood from the original; add vivid but consistent visual detail.
{hint}
Reply with the rewritten prompt only: no preamble, no quotes, no markdown.",
hint = template_hint(template))
}

pub fn user_prompt_enhance(prompt: &str) -> String {
    format!("Rewrite this prompt:\n{}", prompt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::StepOption;

    #[test]
    fn selections_listed_in_step_order() {
        let mut s = Selections::new();
        s.insert("mood".into(), StepOption::new("serene", "Serene", ""));
        s.insert("lighting".into(), StepOption::new("neon", "Neon", ""));
        s.insert("subject".into(), StepOption::new("animal", "Animal", ""));
        assert_eq!(describe_selections(&s), "subject: Animal\nmood: Serene\nlighting: Neon");
    }

    #[test]
    fn options_prompt_mentions_avoid_list_only_on_reroll() {
        let s = Selections::new();
        let first = user_prompt_options("style", &s, &[], 6);
        assert!(first.contains("No previous selections"));
        assert!(!first.contains("avoid"));

        let reroll = user_prompt_options("style", &s, &["Watercolor".into(), "Pop Art".into()], 6);
        assert!(reroll.contains("Previous options to avoid: Watercolor, Pop Art"));
        assert!(reroll.contains("Generate 6 options"));
    }

    #[test]
    fn options_prompt_is_deterministic() {
        let mut s = Selections::new();
        s.insert("subject".into(), StepOption::new("portrait", "Human Portrait", ""));
        assert_eq!(user_prompt_options("details", &s, &[], 6), user_prompt_options("details", &s, &[], 6));
    }

    #[test]
    fn enhance_prompt_carries_template_hint() {
        assert!(system_prompt_enhance("pony").contains("score_9"));
        assert!(system_prompt_enhance("Flux").contains("Flux.1"));
        assert!(system_prompt_enhance("unknown").contains("natural-language"));
    }
}
