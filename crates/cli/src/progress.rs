// crates/cli/src/progress.rs
//! Terminal progress for a running job.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use ssa_report_core::JobProgress;

pub const UPLOAD_MESSAGE: &str = "Uploading...";
pub const REPORT_MESSAGE: &str = "Creating report...";
const DONE_MESSAGE: &str = "Done!";

/// What the user sees about a job: percentage, headline, and any
/// non-fatal errors reported so far.
///
/// Each progress event replaces the percentage. Events without a message or
/// an errors list keep the previous ones.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobProgressState {
    default_message: String,
    progress: u32,
    message: Option<String>,
    errors: Vec<String>,
}

impl JobProgressState {
    pub fn new(default_message: impl Into<String>) -> Self {
        let default_message = default_message.into();
        Self {
            progress: 0,
            message: Some(default_message.clone()),
            errors: Vec::new(),
            default_message,
        }
    }

    pub fn progress(&self) -> u32 {
        self.progress
    }

    /// Current headline; the default message when nothing more specific is
    /// known.
    pub fn message(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.default_message)
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Message with a count of the errors reported so far, as drawn on the
    /// progress bar.
    pub fn headline(&self) -> String {
        match self.errors().len() {
            0 => self.message().to_string(),
            1 => format!("{} (1 warning)", self.message()),
            n => format!("{} ({n} warnings)", self.message()),
        }
    }

    pub fn apply(&mut self, update: &JobProgress) {
        self.progress = update.progress.min(100);

        let next = update.message.as_deref().filter(|m| !m.is_empty());
        if let Some(message) = next {
            self.message = Some(message.to_string());
        } else if self.message.as_deref().map_or(true, str::is_empty) {
            self.message = Some(self.default_message.clone());
        }

        // an empty list clears earlier errors; only a missing one keeps them
        if let Some(errors) = &update.errors {
            self.errors = errors.clone();
        }
    }

    pub fn complete(&mut self) {
        self.progress = 100;
        self.message = Some(DONE_MESSAGE.to_string());
    }

    /// Clear progress after a failure; the error is shown instead.
    pub fn fail(&mut self) {
        self.progress = 0;
        self.message = None;
    }
}

/// [`JobProgressState`] drawn as an `indicatif` bar on stderr.
pub struct ProgressView {
    state: JobProgressState,
    bar: ProgressBar,
}

impl ProgressView {
    pub fn new(default_message: &str) -> Self {
        Self::with_bar(default_message, ProgressBar::new(100))
    }

    /// A view that tracks state without drawing anything.
    pub fn hidden(default_message: &str) -> Self {
        let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
        Self::with_bar(default_message, bar)
    }

    fn with_bar(default_message: &str, bar: ProgressBar) -> Self {
        // the template is a constant; fall back to the default style rather than panic
        if let Ok(style) = ProgressStyle::default_bar()
            .template("  {spinner} {msg}\n  [{bar:40.cyan/blue}] {pos:>3}%")
        {
            bar.set_style(style.progress_chars("=> "));
        }
        bar.enable_steady_tick(Duration::from_millis(100));

        let state = JobProgressState::new(default_message);
        bar.set_message(state.headline());
        Self { state, bar }
    }

    pub fn state(&self) -> &JobProgressState {
        &self.state
    }

    pub fn update(&mut self, update: &JobProgress) {
        self.state.apply(update);
        self.draw();
    }

    /// Mark the job done and leave the bar on screen.
    pub fn finish(&mut self) {
        self.state.complete();
        self.draw();
        self.bar.finish();
    }

    /// Remove the bar after a failure.
    pub fn abandon(&mut self) {
        self.state.fail();
        self.bar.finish_and_clear();
    }

    fn draw(&self) {
        self.bar.set_position(u64::from(self.state.progress()));
        self.bar.set_message(self.state.headline());
    }
}
