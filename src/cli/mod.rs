use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::EnhancerKind;

#[derive(Parser, Debug)]
#[command(name = "promptsmith", version, about = "Guided text-to-image prompt builder backed by a local LLM")]
pub struct Args {
    /// TOML config file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Fall back to http://localhost:11434 when OLLAMA_URL is unset
    #[arg(long, global = true, default_value_t = false)]
    pub dev: bool,

    #[arg(long, global = true, default_value_t = false)]
    pub debug: bool,

    /// Where settings and history are stored
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Generate options for one category
    Options {
        #[arg(long)]
        category: String,
        /// Prior selection as category=label (repeatable)
        #[arg(long = "select", value_parser = parse_pick)]
        selections: Vec<(String, String)>,
        #[arg(long, default_value_t = false)]
        reroll: bool,
        /// Label to avoid when rerolling (repeatable)
        #[arg(long)]
        avoid: Vec<String>,
        #[arg(long)]
        model: Option<String>,
    },
    /// Assemble a prompt from picks
    Assemble {
        /// Use the tag builder instead of the wizard layout
        #[arg(long, default_value_t = false)]
        tags: bool,
        /// category=label (repeatable)
        #[arg(long = "pick", value_parser = parse_pick, required = true)]
        picks: Vec<(String, String)>,
        /// Free-text keyword, tag mode only (repeatable)
        #[arg(long)]
        custom: Vec<String>,
    },
    /// Enhance a prompt
    Enhance {
        #[arg(long)]
        prompt: String,
        #[arg(long, value_enum)]
        strategy: Option<EnhancerKind>,
    },
    /// Generate an image for a prompt
    Generate {
        #[arg(long)]
        prompt: String,
    },
    /// Resolve a placeholder image id
    Image {
        #[arg(long)]
        id: String,
    },
    /// List models on the LLM server
    Models,
    /// Check the LLM and image servers
    Status {
        /// Keep polling until interrupted
        #[arg(long, default_value_t = false)]
        watch: bool,
    },
    /// Show or change generation settings
    Settings {
        #[arg(long)]
        llm_model: Option<String>,
        #[arg(long)]
        template: Option<String>,
        #[arg(long)]
        image_model: Option<String>,
    },
    /// Recently generated images
    History {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Interactive step-by-step builder
    Wizard,
}

pub fn parse_pick(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((cat, label)) if !cat.trim().is_empty() && !label.trim().is_empty() => {
            Ok((cat.trim().to_string(), label.trim().to_string()))
        }
        _ => Err(format!("expected category=label, got {:?}", s)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pick_splits_on_first_equals() {
        assert_eq!(parse_pick("style= Pop Art ").unwrap(), ("style".into(), "Pop Art".into()));
        assert_eq!(parse_pick("subject=a=b").unwrap().1, "a=b");
        assert!(parse_pick("style").is_err());
        assert!(parse_pick("=x").is_err());
    }

    #[test]
    fn parses_subcommands_with_global_flags() {
        let a = Args::try_parse_from([
            "promptsmith", "assemble", "--tags", "--pick", "lighting=Neon", "--pick", "subject=Cat", "--dev",
        ])
        .unwrap();
        assert!(a.dev);
        match a.command {
            Command::Assemble { tags, picks, .. } => {
                assert!(tags);
                assert_eq!(picks.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }

        let e = Args::try_parse_from(["promptsmith", "enhance", "--prompt", "cat", "--strategy", "llm"]).unwrap();
        assert!(matches!(e.command, Command::Enhance { strategy: Some(EnhancerKind::Llm), .. }));
    }
}
