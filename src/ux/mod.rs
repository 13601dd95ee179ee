use colored::{ColoredString, Colorize};
use humansize::{format_size, DECIMAL};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::time::Duration;

use crate::history::HistoryEntry;
use crate::wire::{ModelsResponse, OptionSource, ServerState, StatusResponse, StepOption};

pub fn badge(state: ServerState) -> ColoredString {
    match state {
        ServerState::Online => "online".green().bold(),
        ServerState::Offline => "offline".red().bold(),
        ServerState::Checking => "checking".yellow(),
    }
}

pub fn print_status(s: &StatusResponse) {
    println!(
        "{} {}   {} {}   ({})",
        "LLM:".bold(),
        badge(s.llm_server),
        "Image:".bold(),
        badge(s.comfy_server),
        s.timestamp.format("%H:%M:%S")
    );
}

/// Spinner shown while waiting on a backend. Call `finish_and_clear` when done.
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

pub fn heading(title: &str, description: &str) {
    println!("\n{}  {}", title.bold().underline(), description.dimmed());
}

pub fn print_options(options: &[StepOption], origin: (Option<OptionSource>, Option<&str>)) {
    for (i, o) in options.iter().enumerate() {
        if o.description.is_empty() {
            println!("  {}. {}", i + 1, o.label.bold());
        } else {
            println!("  {}. {}  {}", i + 1, o.label.bold(), o.description.dimmed());
        }
    }
    match origin {
        (Some(OptionSource::Fallback), err) => {
            let why = err.unwrap_or("LLM unavailable");
            println!("  {} {}", "[catalog]".yellow(), why.dimmed());
        }
        (Some(OptionSource::Llm), _) => println!("  {}", "[llm]".cyan()),
        (None, _) => {}
    }
}

pub fn print_models(resp: &ModelsResponse) {
    if let Some(err) = &resp.error {
        println!("{} {}", "using mock models:".yellow(), err);
    }
    for m in &resp.models {
        println!(
            "  {:<28} {:>10}  {} {}",
            m.name.bold(),
            format_size(m.size, DECIMAL),
            m.details.family,
            m.details.parameter_size.dimmed()
        );
    }
}

pub fn print_history(entries: &[HistoryEntry]) {
    if entries.is_empty() {
        println!("(no images yet)");
        return;
    }
    for e in entries {
        let when = chrono::DateTime::from_timestamp_millis(e.image.timestamp)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        println!("{}  {}\n    {}", when.dimmed(), e.image.image_url.cyan(), e.image.prompt);
    }
}

pub fn print_prompt(label: &str, prompt: &str) {
    if prompt.is_empty() {
        println!("{} {}", label.bold(), "(empty)".dimmed());
    } else {
        println!("{} {}", label.bold(), prompt);
    }
}

pub fn prompt_marker() {
    print!("{} ", ">".cyan().bold());
    let _ = io::stdout().flush();
}
