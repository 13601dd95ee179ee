use crate::assemble;
use crate::catalog::WIZARD_STEPS;
use crate::wire::{OptionSource, OptionsResponse, Selections, StepOption};

pub mod tags;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardState {
    Step(usize),
    Complete,
}

/// A pending option fetch issued when the wizard enters a step. The caller
/// runs it and hands the result back through [`Wizard::apply_options`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchTicket {
    pub step: usize,
    pub seq: u64,
    pub category: String,
    pub selections: Selections,
    pub reroll: bool,
    pub exclude: Vec<String>,
}

/// Step-by-step builder over the fixed wizard categories.
#[derive(Debug, Default)]
pub struct Wizard {
    state: Option<WizardState>,
    selections: Selections,
    options: Vec<StepOption>,
    source: Option<OptionSource>,
    fetch_error: Option<String>,
    loading: bool,
    seq: u64,
    edited: Option<String>,
    enhanced: Option<String>,
}

impl Wizard {
    /// A wizard at the first step together with the fetch for its options.
    pub fn new() -> (Self, FetchTicket) {
        let mut w = Wizard::default();
        let ticket = w.enter(0, false);
        (w, ticket)
    }

    pub fn state(&self) -> WizardState {
        self.state.unwrap_or(WizardState::Step(0))
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    pub fn options(&self) -> &[StepOption] {
        &self.options
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    /// Where the displayed options came from, and the backend error if they
    /// are catalog fallbacks.
    pub fn options_origin(&self) -> (Option<OptionSource>, Option<&str>) {
        (self.source, self.fetch_error.as_deref())
    }

    fn enter(&mut self, step: usize, reroll: bool) -> FetchTicket {
        let exclude = if reroll {
            self.options.iter().map(|o| o.label.clone()).collect()
        } else {
            Vec::new()
        };
        self.state = Some(WizardState::Step(step));
        self.seq += 1;
        self.loading = true;
        if !reroll {
            self.options.clear();
            self.source = None;
            self.fetch_error = None;
        }
        FetchTicket {
            step,
            seq: self.seq,
            category: WIZARD_STEPS[step].id.to_string(),
            selections: self.selections.clone(),
            reroll,
            exclude,
        }
    }

    fn complete(&mut self) {
        self.state = Some(WizardState::Complete);
        // bump so late results for the last step are discarded
        self.seq += 1;
        self.loading = false;
        self.options.clear();
    }

    fn advance(&mut self, from: usize) -> Option<FetchTicket> {
        if from + 1 < WIZARD_STEPS.len() {
            Some(self.enter(from + 1, false))
        } else {
            self.complete();
            None
        }
    }

    /// Record `opt` for the current step and move on. No-op when complete.
    pub fn select_option(&mut self, opt: StepOption) -> Option<FetchTicket> {
        let WizardState::Step(i) = self.state() else {
            return None;
        };
        self.selections.insert(WIZARD_STEPS[i].id.to_string(), opt);
        self.enhanced = None;
        self.advance(i)
    }

    pub fn back(&mut self) -> Option<FetchTicket> {
        match self.state() {
            WizardState::Step(0) => None,
            WizardState::Step(i) => Some(self.enter(i - 1, false)),
            WizardState::Complete => Some(self.enter(WIZARD_STEPS.len() - 1, false)),
        }
    }

    /// Move on without recording a selection. Leaving the last step needs at
    /// least one selection; otherwise this is a no-op.
    pub fn skip(&mut self) -> Option<FetchTicket> {
        let WizardState::Step(i) = self.state() else {
            return None;
        };
        if i + 1 >= WIZARD_STEPS.len() && self.selections.is_empty() {
            return None;
        }
        self.advance(i)
    }

    pub fn skip_to_end(&mut self) -> bool {
        if self.selections.is_empty() {
            return false;
        }
        self.complete();
        true
    }

    pub fn reset(&mut self) -> FetchTicket {
        self.selections.clear();
        self.edited = None;
        self.enhanced = None;
        self.options.clear();
        self.enter(0, false)
    }

    /// Fetch a different option set for the current step, avoiding the
    /// labels on screen.
    pub fn reroll(&mut self) -> Option<FetchTicket> {
        match self.state() {
            WizardState::Step(i) => Some(self.enter(i, true)),
            WizardState::Complete => None,
        }
    }

    /// Apply a fetch result. Returns false, leaving state untouched, when the
    /// ticket is no longer the latest one for the current step.
    pub fn apply_options(&mut self, ticket: &FetchTicket, resp: OptionsResponse) -> bool {
        let current = ticket.seq == self.seq && self.state() == WizardState::Step(ticket.step);
        if !current {
            log::debug!("dropping stale options for step {} (seq {} != {})", ticket.step, ticket.seq, self.seq);
            return false;
        }
        self.options = resp.options;
        self.source = Some(resp.source);
        self.fetch_error = resp.error;
        self.loading = false;
        true
    }

    /// Record a failed fetch for the current ticket.
    pub fn fail_fetch(&mut self, ticket: &FetchTicket, error: String) -> bool {
        if ticket.seq != self.seq {
            return false;
        }
        self.loading = false;
        self.fetch_error = Some(error);
        true
    }

    pub fn assembled_prompt(&self) -> String {
        assemble::assemble(&self.selections)
    }

    pub fn edit_prompt(&mut self, text: impl Into<String>) {
        self.edited = Some(text.into());
        self.enhanced = None;
    }

    pub fn clear_prompt_edit(&mut self) {
        self.edited = None;
    }

    pub fn is_edited(&self) -> bool {
        self.edited.is_some()
    }

    pub fn effective_prompt(&self) -> String {
        self.edited.clone().unwrap_or_else(|| self.assembled_prompt())
    }

    pub fn set_enhanced(&mut self, text: impl Into<String>) {
        self.enhanced = Some(text.into());
    }

    pub fn enhanced_prompt(&self) -> Option<&str> {
        self.enhanced.as_deref()
    }

    pub fn final_prompt(&self) -> String {
        self.enhanced.clone().unwrap_or_else(|| self.effective_prompt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opt(id: &str) -> StepOption {
        StepOption::new(id, id.to_uppercase(), "")
    }

    fn resp(ids: &[&str]) -> OptionsResponse {
        OptionsResponse {
            options: ids.iter().map(|i| opt(i)).collect(),
            source: OptionSource::Llm,
            error: None,
        }
    }

    #[test]
    fn starts_at_subject_with_a_fetch() {
        let (w, t) = Wizard::new();
        assert_eq!(w.state(), WizardState::Step(0));
        assert_eq!(t.category, "subject");
        assert!(w.is_loading());
    }

    #[test]
    fn select_advances_and_records() {
        let (mut w, _) = Wizard::new();
        let t = w.select_option(opt("cat")).unwrap();
        assert_eq!(w.state(), WizardState::Step(1));
        assert_eq!(t.category, "details");
        assert_eq!(t.selections["subject"].id, "cat");
        assert_eq!(w.selections()["subject"].label, "CAT");
    }

    #[test]
    fn selecting_every_step_completes() {
        let (mut w, _) = Wizard::new();
        for i in 0..WIZARD_STEPS.len() {
            w.select_option(opt(&format!("o{}", i)));
        }
        assert_eq!(w.state(), WizardState::Complete);
        assert_eq!(w.selections().len(), WIZARD_STEPS.len());
        assert!(w.select_option(opt("late")).is_none());
        assert!(!w.selections().values().any(|o| o.id == "late"));
    }

    #[test]
    fn back_is_noop_at_first_step_and_returns_from_complete() {
        let (mut w, _) = Wizard::new();
        assert!(w.back().is_none());
        assert_eq!(w.state(), WizardState::Step(0));

        w.select_option(opt("cat"));
        assert!(w.skip_to_end());
        let t = w.back().unwrap();
        assert_eq!(w.state(), WizardState::Step(WIZARD_STEPS.len() - 1));
        assert_eq!(t.category, "composition");
    }

    #[test]
    fn skip_does_not_record() {
        let (mut w, _) = Wizard::new();
        w.skip().unwrap();
        assert_eq!(w.state(), WizardState::Step(1));
        assert!(w.selections().is_empty());
    }

    #[test]
    fn skip_at_last_step_needs_a_selection() {
        let (mut w, _) = Wizard::new();
        for _ in 0..WIZARD_STEPS.len() - 1 {
            w.skip();
        }
        assert_eq!(w.state(), WizardState::Step(WIZARD_STEPS.len() - 1));
        assert!(w.skip().is_none());
        assert_eq!(w.state(), WizardState::Step(WIZARD_STEPS.len() - 1));

        w.back();
        w.select_option(opt("moody"));
        w.skip();
        assert_eq!(w.state(), WizardState::Complete);
    }

    #[test]
    fn skip_to_end_requires_selection() {
        let (mut w, _) = Wizard::new();
        assert!(!w.skip_to_end());
        assert_eq!(w.state(), WizardState::Step(0));
    }

    #[test]
    fn stale_results_are_discarded() {
        let (mut w, first) = Wizard::new();
        let second = w.select_option(opt("cat")).unwrap();
        assert!(!w.apply_options(&first, resp(&["stale"])));
        assert!(w.options().is_empty());
        assert!(w.apply_options(&second, resp(&["a", "b"])));
        assert_eq!(w.options().len(), 2);
        assert!(!w.is_loading());
    }

    #[test]
    fn reroll_supersedes_previous_fetch_and_excludes_visible_labels() {
        let (mut w, first) = Wizard::new();
        w.apply_options(&first, resp(&["a", "b"]));
        let again = w.reroll().unwrap();
        assert!(again.reroll);
        assert_eq!(again.exclude, ["A", "B"]);
        assert!(!w.apply_options(&first, resp(&["x"])));
        assert!(w.apply_options(&again, resp(&["c"])));
        assert_eq!(w.options()[0].id, "c");
    }

    #[test]
    fn result_for_step_left_behind_is_dropped_even_after_return() {
        let (mut w, t0) = Wizard::new();
        w.skip();
        w.back();
        assert_eq!(w.state(), WizardState::Step(0));
        assert!(!w.apply_options(&t0, resp(&["old"])));
    }

    #[test]
    fn prompt_override_and_enhanced() {
        let (mut w, _) = Wizard::new();
        w.select_option(StepOption::new("landscape", "Landscape", ""));
        assert_eq!(w.effective_prompt(), "Landscape, high quality, detailed, 8k resolution");

        w.edit_prompt("my own words");
        assert_eq!(w.final_prompt(), "my own words");
        w.set_enhanced("better words");
        assert_eq!(w.final_prompt(), "better words");

        w.clear_prompt_edit();
        assert_eq!(w.effective_prompt(), w.assembled_prompt());
    }

    #[test]
    fn reset_clears_everything() {
        let (mut w, _) = Wizard::new();
        w.select_option(opt("cat"));
        w.edit_prompt("x");
        w.set_enhanced("y");
        let t = w.reset();
        assert_eq!(t.step, 0);
        assert_eq!(w.state(), WizardState::Step(0));
        assert!(w.selections().is_empty());
        assert_eq!(w.final_prompt(), "");
    }
}
