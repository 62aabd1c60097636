//! Spinner for network operations, using indicatif.

use std::time::Duration;

use indicatif::{ProgressBar as IndicatifBar, ProgressStyle};

use super::context::UiContext;

/// A spinner for indeterminate progress; inert outside pretty TTY output.
pub struct Spinner {
    bar: Option<IndicatifBar>,
}

impl Spinner {
    pub fn new(ctx: &UiContext, message: &str) -> Self {
        let bar = if ctx.allows_animation() {
            let pb = IndicatifBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}...")
            {
                pb.set_style(
                    style.tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", ""]),
                );
            }
            pb.set_message(message.to_string());
            Some(pb)
        } else {
            None
        };

        Self { bar }
    }

    pub fn start(&self) {
        if let Some(bar) = &self.bar {
            bar.enable_steady_tick(Duration::from_millis(80));
        }
    }

    /// Remove the spinner line without printing anything.
    pub fn clear(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
