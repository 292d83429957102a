//! UI/Progress presentation layer
//!
//! This module handles:
//! - Step progress for the provisioning pipeline
//! - An interactive progress bar using indicatif
//! - Silent progress for quiet mode, dry runs and tests
//!
//! All progress reporting goes through the StepReporter trait, so the
//! pipeline never decides how (or whether) progress is shown.

use console::Style;
use indicatif::{ProgressBar, ProgressStyle};

use crate::pipeline::Step;

/// Progress reporter for pipeline steps
pub trait StepReporter {
    /// A step is about to run
    fn start_step(&mut self, step: Step);

    /// The step that was started finished successfully
    fn finish_step(&mut self, step: Step);

    /// The step that was started failed; no further steps will run
    fn fail_step(&mut self, step: Step, message: &str);

    /// The pipeline is over
    fn finish(&mut self);
}

/// Interactive reporter with a step progress bar
///
/// Completed steps are printed above the bar so the log survives the bar.
pub struct InteractiveStepReporter {
    pb: ProgressBar,
}

impl InteractiveStepReporter {
    pub fn new() -> Self {
        let style = ProgressStyle::default_bar()
            .template("[{bar:20.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let pb = ProgressBar::new(Step::ALL.len() as u64);
        pb.set_style(style);
        Self { pb }
    }
}

impl Default for InteractiveStepReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl StepReporter for InteractiveStepReporter {
    fn start_step(&mut self, step: Step) {
        self.pb.set_message(format!("{}...", step.description()));
    }

    fn finish_step(&mut self, step: Step) {
        let ok = Style::new().green().bold();
        self.pb
            .println(format!("{} {}", ok.apply_to("✓"), step.description()));
        self.pb.inc(1);
    }

    fn fail_step(&mut self, step: Step, message: &str) {
        let failed = Style::new().red().bold();
        self.pb.println(format!(
            "{} {}: {}",
            failed.apply_to("✗"),
            step.description(),
            message
        ));
        self.pb.abandon();
    }

    fn finish(&mut self) {
        if !self.pb.is_finished() {
            self.pb.finish_and_clear();
        }
    }
}

/// Silent reporter
///
/// No-op implementation used with --quiet, --dry-run and in tests.
#[derive(Default)]
pub struct SilentStepReporter;

impl StepReporter for SilentStepReporter {
    fn start_step(&mut self, _step: Step) {}

    fn finish_step(&mut self, _step: Step) {}

    fn fail_step(&mut self, _step: Step, _message: &str) {}

    fn finish(&mut self) {}
}
