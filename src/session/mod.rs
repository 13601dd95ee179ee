use anyhow::Context;
use colored::Colorize;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::api::Studio;
use crate::catalog::WIZARD_STEPS;
use crate::errors::Result;
use crate::options::OPTION_COUNT;
use crate::status::{StatusChecker, StatusMonitor};
use crate::ux;
use crate::wire::{EnhanceRequest, ImageRequest, OptionsRequest, OptionsResponse, StatusResponse};
use crate::wizard::{FetchTicket, Wizard, WizardState};

type Fetched = (FetchTicket, Result<OptionsResponse>);

enum Flow {
    Continue,
    Quit,
}

fn step_help() -> String {
    format!("1-{} select · r reroll · s skip · b back · f finish · x reset · status · q quit", OPTION_COUNT)
}
const DONE_HELP: &str = "enhance · image · edit <text> · clear · b back · x reset · status · q quit";

struct Session {
    studio: Arc<Studio>,
    wizard: Wizard,
    tx: UnboundedSender<Fetched>,
}

impl Session {
    /// Run the ticket on its own task; the result comes back over the channel.
    fn spawn_fetch(&self, ticket: FetchTicket) {
        let studio = Arc::clone(&self.studio);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let req = OptionsRequest {
                step: ticket.category.clone(),
                selections: ticket.selections.clone(),
                reroll: ticket.reroll,
                previous_options: ticket.exclude.clone(),
                model: None,
            };
            let result = studio.generate_options(req).await;
            // receiver gone means the session ended
            let _ = tx.send((ticket, result));
        });
    }

    fn fetch(&self, ticket: Option<FetchTicket>) {
        if let Some(t) = ticket {
            self.spawn_fetch(t);
        }
        self.render();
    }

    fn render(&self) {
        match self.wizard.state() {
            WizardState::Step(i) => {
                let step = &WIZARD_STEPS[i];
                ux::heading(
                    &format!("Step {}/{}: {}", i + 1, WIZARD_STEPS.len(), step.label),
                    step.description,
                );
                if let Some(sel) = self.wizard.selections().get(step.id) {
                    println!("  current: {}", sel.label.green());
                }
                if self.wizard.is_loading() && self.wizard.options().is_empty() {
                    println!("  {}", "fetching options...".dimmed());
                } else {
                    ux::print_options(self.wizard.options(), self.wizard.options_origin());
                }
                ux::print_prompt("prompt:", &self.wizard.effective_prompt());
                println!("{}", step_help().dimmed());
            }
            WizardState::Complete => {
                ux::heading("Your prompt", "ready to enhance or render");
                for step in WIZARD_STEPS.iter() {
                    if let Some(sel) = self.wizard.selections().get(step.id) {
                        println!("  {:<12} {}", step.label.dimmed(), sel.label);
                    }
                }
                let label = if self.wizard.is_edited() { "prompt (edited):" } else { "prompt:" };
                ux::print_prompt(label, &self.wizard.effective_prompt());
                if let Some(e) = self.wizard.enhanced_prompt() {
                    ux::print_prompt("enhanced:", e);
                }
                println!("{}", DONE_HELP.dimmed());
            }
        }
        ux::prompt_marker();
    }

    fn on_fetched(&mut self, ticket: FetchTicket, result: Result<OptionsResponse>) {
        let shown = match result {
            Ok(resp) => self.wizard.apply_options(&ticket, resp),
            Err(e) => {
                let shown = self.wizard.fail_fetch(&ticket, e.to_string());
                if shown {
                    println!("{} {}", "could not load options:".red(), e);
                }
                shown
            }
        };
        if shown {
            self.render();
        }
    }

    async fn on_line(&mut self, line: &str) -> Flow {
        let line = line.trim();
        let (cmd, rest) = line.split_once(' ').unwrap_or((line, ""));

        match (self.wizard.state(), cmd) {
            (_, "q" | "quit" | "exit") => return Flow::Quit,
            (_, "" | "?" | "help") => self.render(),
            (_, "status") => {
                ux::print_status(&self.studio.server_status().await);
                ux::prompt_marker();
            }
            (_, "b" | "back") => {
                let t = self.wizard.back();
                self.fetch(t);
            }
            (_, "x" | "reset") => {
                let t = self.wizard.reset();
                self.fetch(Some(t));
            }
            (WizardState::Step(_), "r" | "reroll") => {
                let t = self.wizard.reroll();
                self.fetch(t);
            }
            (WizardState::Step(_), "s" | "skip") => {
                if self.wizard.state() == WizardState::Step(WIZARD_STEPS.len() - 1) && self.wizard.selections().is_empty() {
                    println!("{}", "select at least one option before finishing".yellow());
                }
                let t = self.wizard.skip();
                self.fetch(t);
            }
            (WizardState::Step(_), "f" | "finish") => {
                if !self.wizard.skip_to_end() {
                    println!("{}", "select at least one option before finishing".yellow());
                }
                self.render();
            }
            (WizardState::Step(_), n) if n.parse::<usize>().is_ok() => {
                let picked = n
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| i.checked_sub(1))
                    .and_then(|i| self.wizard.options().get(i).cloned());
                match picked {
                    Some(opt) => {
                        let t = self.wizard.select_option(opt);
                        self.fetch(t);
                    }
                    None => {
                        println!("{}", "no such option".yellow());
                        ux::prompt_marker();
                    }
                }
            }
            (WizardState::Complete, "edit") => {
                self.wizard.edit_prompt(rest.trim());
                self.render();
            }
            (WizardState::Complete, "clear") => {
                self.wizard.clear_prompt_edit();
                self.render();
            }
            (WizardState::Complete, "enhance") => self.enhance().await,
            (WizardState::Complete, "image") => self.image().await,
            _ => {
                println!("{} {}", "unknown command:".yellow(), line);
                ux::prompt_marker();
            }
        }
        Flow::Continue
    }

    async fn enhance(&mut self) {
        let req = EnhanceRequest {
            prompt: self.wizard.effective_prompt(),
            options: self.studio.generation_options(),
        };
        let pb = ux::spinner("enhancing prompt...");
        let result = self.studio.enhance_prompt(req, None).await;
        pb.finish_and_clear();
        match result {
            Ok(resp) => self.wizard.set_enhanced(resp.enhanced_prompt),
            Err(e) if e.is_client_error() => println!("{} {}", "nothing to enhance:".yellow(), e),
            Err(e) => println!("{} {}", "enhancement failed:".red(), e),
        }
        self.render();
    }

    async fn image(&mut self) {
        let req = ImageRequest { prompt: self.wizard.final_prompt(), options: None };
        let pb = ux::spinner("generating image...");
        let result = self.studio.generate_image(req).await;
        pb.finish_and_clear();
        match result {
            Ok(img) => println!("{} {}", "image:".bold(), img.image_url.cyan()),
            Err(e) => println!("{} {}", "image generation failed:".red(), e),
        }
        ux::prompt_marker();
    }
}

fn status_changed(last: &Option<StatusResponse>, now: &StatusResponse) -> bool {
    match last {
        Some(l) => l.llm_server != now.llm_server || l.comfy_server != now.comfy_server,
        None => true,
    }
}

/// Interactive wizard on stdin/stdout. Server status is polled for as long as
/// the session runs.
pub async fn run(studio: Arc<Studio>) -> anyhow::Result<()> {
    let cfg = studio.config();
    let monitor = StatusMonitor::start(
        StatusChecker::from_config(cfg),
        Duration::from_secs(cfg.status_interval_secs.max(1)),
    );
    let mut status_rx = monitor.subscribe();
    let mut status_alive = true;
    let mut last_status: Option<StatusResponse> = None;

    let (tx, mut rx) = mpsc::unbounded_channel::<Fetched>();
    let (wizard, first) = Wizard::new();
    let mut session = Session { studio: Arc::clone(&studio), wizard, tx };
    session.spawn_fetch(first);
    session.render();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            Some((ticket, result)) = rx.recv() => session.on_fetched(ticket, result),
            changed = status_rx.changed(), if status_alive => {
                if changed.is_err() {
                    status_alive = false;
                    continue;
                }
                let now = status_rx.borrow_and_update().clone();
                if status_changed(&last_status, &now) {
                    println!();
                    ux::print_status(&now);
                    ux::prompt_marker();
                    last_status = Some(now);
                }
            }
            line = lines.next_line() => {
                match line.context("reading stdin")? {
                    Some(l) => {
                        if let Flow::Quit = session.on_line(&l).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    drop(monitor);
    println!();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::ServerState;
    use chrono::Utc;

    fn st(llm: ServerState, img: ServerState) -> StatusResponse {
        StatusResponse { llm_server: llm, comfy_server: img, timestamp: Utc::now() }
    }

    #[test]
    fn status_is_reprinted_only_on_state_change() {
        let first = st(ServerState::Online, ServerState::Offline);
        assert!(status_changed(&None, &first));
        let later = st(ServerState::Online, ServerState::Offline);
        assert!(!status_changed(&Some(first.clone()), &later));
        assert!(status_changed(&Some(first), &st(ServerState::Offline, ServerState::Offline)));
    }

    #[test]
    fn step_help_matches_option_count() {
        assert!(step_help().starts_with(&format!("1-{} select", OPTION_COUNT)));
        assert!(step_help().starts_with("1-6 select"));
    }
}
