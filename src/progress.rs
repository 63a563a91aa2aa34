//! Progress reporting for synthesis

use declarative::SynthObserver;
use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar advanced once per rendered resource
pub struct BarObserver {
    bar: ProgressBar,
}

impl BarObserver {
    /// Create a bar; `hidden` draws nothing (quiet mode, `--stdout`)
    pub fn new(hidden: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(0)
        };
        bar.set_style(
            ProgressStyle::with_template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=>-"),
        );
        Self { bar }
    }
}

impl SynthObserver for BarObserver {
    fn on_start(&mut self, total: usize) {
        self.bar.set_length(total as u64);
    }

    fn on_resource(&mut self, logical_id: &str, _resource_type: &str) {
        self.bar.set_message(logical_id.to_string());
        self.bar.inc(1);
    }

    fn on_complete(&mut self) {
        self.bar.finish_and_clear();
    }
}

impl Drop for BarObserver {
    fn drop(&mut self) {
        // Synthesis aborted midway
        if !self.bar.is_finished() {
            self.bar.abandon();
        }
    }
}
