use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

mod api;
mod assemble;
mod catalog;
mod cli;
mod config;
mod enhance;
mod errors;
mod history;
mod image;
mod options;
mod prompt;
mod provider;
mod session;
mod status;
mod ux;
mod wire;
mod wizard;

use cli::{Args, Command};
use wire::{EnhanceRequest, ImageRequest, OptionsRequest, PromptRequest, Selections, StepOption};

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn slug(label: &str) -> String {
    let mut out = String::new();
    for c in label.trim().chars() {
        if c.is_alphanumeric() {
            out.extend(c.to_lowercase());
        } else if !out.ends_with('-') {
            out.push('-');
        }
    }
    out.trim_matches('-').to_string()
}

/// The catalog option whose label matches, or a new option built from the label.
fn pick_option(category: &str, label: &str) -> StepOption {
    catalog::candidates(category, &Selections::new())
        .and_then(|opts| opts.into_iter().find(|o| o.label.eq_ignore_ascii_case(label)))
        .unwrap_or_else(|| StepOption::new(slug(label), label, ""))
}

fn selections_from(picks: &[(String, String)]) -> Selections {
    picks.iter().map(|(cat, label)| (cat.clone(), pick_option(cat, label))).collect()
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let level = if args.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    let mut cfg = config::Config::load(args.config.as_deref()).context("loading configuration")?;
    if args.dev {
        cfg.dev = true;
    }
    if let Some(dir) = &args.data_dir {
        cfg.data_dir = dir.clone();
    }
    log::debug!("config: {:?}", cfg);

    let studio = Arc::new(api::Studio::open(cfg).context("opening studio data")?);

    match args.command {
        Command::Options { category, selections, reroll, avoid, model } => {
            let req = OptionsRequest {
                step: category,
                selections: selections_from(&selections),
                reroll,
                previous_options: avoid,
                model,
            };
            let pb = ux::spinner("asking the LLM for options...");
            let resp = studio.generate_options(req).await;
            pb.finish_and_clear();
            print_json(&resp.context("generating options")?)?;
        }
        Command::Assemble { tags, picks, custom } => {
            if tags {
                let mut builder = wizard::tags::KeywordBuilder::new();
                for (cat, label) in &picks {
                    builder
                        .toggle(cat, &pick_option(cat, label))
                        .with_context(|| format!("adding {}={}", cat, label))?;
                }
                for text in &custom {
                    builder.add_custom(text);
                }
                print_json(&wire::PromptResponse { prompt: builder.prompt() })?;
            } else {
                let req = PromptRequest { selections: selections_from(&picks) };
                print_json(&studio.assemble_prompt(req).context("assembling prompt")?)?;
            }
        }
        Command::Enhance { prompt, strategy } => {
            let req = EnhanceRequest { prompt, options: studio.generation_options() };
            let pb = ux::spinner("enhancing prompt...");
            let resp = studio.enhance_prompt(req, strategy).await;
            pb.finish_and_clear();
            print_json(&resp.context("enhancing prompt")?)?;
        }
        Command::Generate { prompt } => {
            let pb = ux::spinner("generating image...");
            let resp = studio.generate_image(ImageRequest { prompt, options: None }).await;
            pb.finish_and_clear();
            print_json(&resp.context("generating image")?)?;
        }
        Command::Image { id } => {
            println!("{}", studio.resolve_image(&id)?);
        }
        Command::Models => {
            ux::print_models(&studio.list_models().await);
        }
        Command::Status { watch: false } => {
            ux::print_status(&studio.server_status().await);
        }
        Command::Status { watch: true } => {
            let cfg = studio.config();
            let monitor = status::StatusMonitor::start(
                status::StatusChecker::from_config(cfg),
                Duration::from_secs(cfg.status_interval_secs.max(1)),
            );
            let mut rx = monitor.subscribe();
            ux::print_status(&rx.borrow_and_update().clone());
            while rx.changed().await.is_ok() {
                let s = rx.borrow_and_update().clone();
                ux::print_status(&s);
            }
        }
        Command::Settings { llm_model, template, image_model } => {
            let opts = if llm_model.is_none() && template.is_none() && image_model.is_none() {
                studio.generation_options()
            } else {
                studio
                    .update_settings(|o| {
                        if let Some(m) = llm_model {
                            o.llm_model = m;
                        }
                        if let Some(t) = template {
                            o.prompt_template = t;
                        }
                        if let Some(i) = image_model {
                            o.image_model = i;
                        }
                    })
                    .context("saving settings")?
            };
            print_json(&opts)?;
        }
        Command::History { limit } => {
            ux::print_history(&studio.history(limit).context("reading history")?);
        }
        Command::Wizard => {
            session::run(Arc::clone(&studio)).await?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_reuse_catalog_ids() {
        assert_eq!(pick_option("style", "watercolor").id, "watercolor");
        assert_eq!(pick_option("style", "watercolor").label, "Watercolor");
        let custom = pick_option("subject", "Red Fox, sleeping");
        assert_eq!(custom.id, "red-fox-sleeping");
        assert_eq!(custom.label, "Red Fox, sleeping");
    }
}
