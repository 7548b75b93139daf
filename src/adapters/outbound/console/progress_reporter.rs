use crate::ports::outbound::ProgressReporter;
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, PoisonError};

const BAR_TEMPLATE: &str = "   {spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) - {msg}";

/// StderrProgressReporter adapter for reporting progress to stderr
///
/// Writes to stderr so the enriched document on stdout stays clean. One
/// progress bar is kept per run of lookups; a new total starts a new bar.
pub struct StderrProgressReporter {
    progress_bar: Mutex<Option<ProgressBar>>,
}

impl StderrProgressReporter {
    pub fn new() -> Self {
        Self {
            progress_bar: Mutex::new(None),
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        let mut slot = self
            .progress_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        match slot.as_ref() {
            Some(pb) if pb.length() == Some(total as u64) && !pb.is_finished() => pb.clone(),
            _ => {
                if let Some(old) = slot.take() {
                    old.finish_and_clear();
                }
                let pb = ProgressBar::new(total as u64);
                if let Ok(style) = ProgressStyle::default_bar().template(BAR_TEMPLATE) {
                    pb.set_style(style.progress_chars("=>-"));
                }
                *slot = Some(pb.clone());
                pb
            }
        }
    }

    fn finish(&self) {
        let slot = self
            .progress_bar
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(pb) = slot.as_ref() {
            pb.finish_and_clear();
        }
    }
}

impl Default for StderrProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressReporter for StderrProgressReporter {
    fn report(&self, message: &str) {
        self.finish();
        eprintln!("{}", message);
    }

    fn report_progress(&self, current: usize, total: usize, message: Option<&str>) {
        let pb = self.progress_bar(total);
        pb.set_position(current as u64);
        if let Some(msg) = message {
            pb.set_message(msg.to_string());
        }
        if current >= total {
            pb.finish_and_clear();
        }
    }

    fn report_error(&self, message: &str) {
        self.finish();
        eprintln!("{}", message);
    }

    fn report_completion(&self, message: &str) {
        self.finish();
        eprintln!();
        eprintln!("{}", message);
    }
}
